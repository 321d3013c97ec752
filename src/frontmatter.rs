//! Splits a source document into its frontmatter block and its Markdown body,
//! and decodes the recognized frontmatter keys into [`Metadata`].
//!
//! A document looks like this:
//!
//! ```md
//! ---
//! date: 05-Mar-2024
//! title: Hello World
//! ---
//! # Hi
//! ```
//!
//! The block is a flat list of `key: value` lines rather than YAML, so it is
//! scanned line by line instead of handed to a deserializer. Parsing is a pure
//! function over the document bytes: [`parse`] returns the decoded
//! [`Metadata`] and the byte offset at which the body starts.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::post::Metadata;

/// The marker that opens and closes the frontmatter block.
pub const DELIMITER: &str = "---";

/// The `chrono` pattern for the `date` key, e.g. `05-Mar-2024`. Values must
/// also have the fixed `DD-Mon-YYYY` shape, which `chrono` alone doesn't
/// enforce (it takes `5-Mar-24` as the year 24).
pub const DATE_FORMAT: &str = "%d-%b-%Y";

/// Selects how the closing delimiter is located.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DelimiterScan {
    /// The closing delimiter is the first line after the opening one that
    /// consists of exactly `---`. Anything after it, including further `---`
    /// lines, belongs to the body.
    #[default]
    Structural,

    /// The closing delimiter is the last occurrence of `---` anywhere in the
    /// document. The body must never contain `---` in this mode, or the
    /// boundary lands inside the body.
    Last,
}

/// Byte ranges of the metadata block and the start of the body.
#[derive(Debug, PartialEq, Eq)]
struct Bounds {
    metadata_start: usize,
    metadata_end: usize,
    body_start: usize,
}

/// Parses the frontmatter of `input` and returns its [`Metadata`] along with
/// the offset of the first body byte.
pub fn parse(input: &[u8], scan: DelimiterScan) -> Result<(Metadata, usize)> {
    let input = std::str::from_utf8(input).map_err(Error::InvalidUtf8)?;
    let bounds = match scan {
        DelimiterScan::Structural => structural_bounds(input)?,
        DelimiterScan::Last => last_bounds(input)?,
    };
    let metadata = decode(&input[bounds.metadata_start..bounds.metadata_end])?;
    Ok((metadata, bounds.body_start))
}

/// A line of the document along with its position. `text` excludes the line
/// break; `end` is the offset just past it.
struct Line<'a> {
    start: usize,
    text: &'a str,
    end: usize,
}

fn lines(input: &str) -> impl Iterator<Item = Line<'_>> {
    let mut offset = 0;
    input.split_inclusive('\n').map(move |raw| {
        let start = offset;
        offset += raw.len();
        Line {
            start,
            text: strip_line_break(raw),
            end: offset,
        }
    })
}

fn strip_line_break(s: &str) -> &str {
    match s.strip_suffix('\n') {
        Some(s) => s.strip_suffix('\r').unwrap_or(s),
        None => s,
    }
}

fn structural_bounds(input: &str) -> Result<Bounds> {
    let mut lines = lines(input);
    let metadata_start = match lines.next() {
        Some(line) if line.text == DELIMITER => line.end,
        _ => return Err(Error::MissingOpeningDelimiter),
    };
    lines
        .find(|line| line.text == DELIMITER)
        .map(|line| Bounds {
            metadata_start,
            metadata_end: line.start,
            body_start: line.end,
        })
        .ok_or(Error::MissingClosingDelimiter)
}

fn last_bounds(input: &str) -> Result<Bounds> {
    if !input.starts_with(DELIMITER) {
        return Err(Error::MissingOpeningDelimiter);
    }

    // there is always at least one line since `input` is non-empty
    let metadata_start = lines(input).next().map_or(input.len(), |l| l.end);
    let closing = match input.rfind(DELIMITER) {
        Some(i) if i >= metadata_start => i,
        _ => return Err(Error::MissingClosingDelimiter),
    };

    let after = closing + DELIMITER.len();
    let line_break = if input[after..].starts_with("\r\n") {
        2
    } else if input[after..].starts_with('\n') {
        1
    } else {
        0
    };

    Ok(Bounds {
        metadata_start,
        metadata_end: strip_line_break(&input[..closing])
            .len()
            .max(metadata_start),
        body_start: after + line_break,
    })
}

/// Decodes the `key: value` lines between the delimiters. Lines split on the
/// first `:`, so values may themselves contain colons.
fn decode(block: &str) -> Result<Metadata> {
    let mut title = None;
    let mut date = None;
    let mut unrecognized = Vec::new();

    for line in block.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let (key, value) = match line.split_once(':') {
            Some((key, value)) => (key.trim(), value.trim()),
            None => {
                unrecognized.push(line.to_owned());
                continue;
            }
        };
        match key {
            "date" => date = Some(parse_date(value)?),
            "title" => title = Some(value.to_owned()),
            _ => unrecognized.push(key.to_owned()),
        }
    }

    Ok(Metadata {
        title: title
            .filter(|t| !t.is_empty())
            .ok_or(Error::MissingKey("title"))?,
        date: date.ok_or(Error::MissingKey("date"))?,
        unrecognized,
    })
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    let invalid = |err| Error::InvalidDate {
        value: value.to_owned(),
        err,
    };
    if !has_date_shape(value) {
        return Err(invalid(None));
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|err| invalid(Some(err)))
}

/// Two digits, a dash, three letters, a dash, four digits.
fn has_date_shape(value: &str) -> bool {
    let b = value.as_bytes();
    b.len() == 11
        && b[..2].iter().all(u8::is_ascii_digit)
        && b[2] == b'-'
        && b[3..6].iter().all(u8::is_ascii_alphabetic)
        && b[6] == b'-'
        && b[7..].iter().all(u8::is_ascii_digit)
}

/// The result of a frontmatter-parse operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a document whose frontmatter cannot be used. Every variant is
/// recoverable: the document is left out of the site and reported.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when the document isn't valid UTF-8.
    #[error("document is not valid UTF-8: {0}")]
    InvalidUtf8(#[source] std::str::Utf8Error),

    /// Returned when the document doesn't begin with the `---` line.
    #[error("document must begin with `---`")]
    MissingOpeningDelimiter,

    /// Returned when the opening `---` was found but the closing one wasn't.
    #[error("missing closing `---`")]
    MissingClosingDelimiter,

    /// Returned when `title` or `date` is absent (or the title is blank).
    #[error("missing required frontmatter key `{0}`")]
    MissingKey(&'static str),

    /// Returned when the `date` value doesn't match `DD-Mon-YYYY` or names a
    /// day that doesn't exist. `err` is unset when the shape is wrong.
    #[error("invalid date `{value}` (expected `DD-Mon-YYYY`, e.g. `05-Mar-2024`)")]
    InvalidDate {
        value: String,
        #[source]
        err: Option<chrono::ParseError>,
    },
}
