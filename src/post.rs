//! Defines the [`Post`] and [`Metadata`] types, the in-memory form of a
//! source document once its frontmatter has been parsed.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::frontmatter::{self, DelimiterScan};

/// The decoded frontmatter of a document. A [`Metadata`] only exists when both
/// the title and the date were present and well-formed; see
/// [`frontmatter::parse`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Metadata {
    /// The post title, trimmed and never empty.
    pub title: String,

    /// The publish date (day granularity).
    pub date: NaiveDate,

    /// Keys (or key-less lines) in the frontmatter block that aren't
    /// recognized. These are reported, not rejected.
    pub unrecognized: Vec<String>,
}

/// A parsed source document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Post {
    /// The file the post was read from. Used to annotate reports.
    pub source: PathBuf,

    /// The post's frontmatter.
    pub metadata: Metadata,

    /// The Markdown body with the frontmatter block and its delimiters
    /// removed.
    pub body: String,
}

impl Post {
    /// Parses a post from the raw bytes of the document at `source`.
    pub fn from_document(
        source: &Path,
        document: &[u8],
        scan: DelimiterScan,
    ) -> frontmatter::Result<Post> {
        let (metadata, body_start) = frontmatter::parse(document, scan)?;
        Ok(Post {
            source: source.to_owned(),
            metadata,
            // `parse` has already validated the whole document as UTF-8
            body: String::from_utf8_lossy(&document[body_start..]).into_owned(),
        })
    }

    pub fn title(&self) -> &str {
        &self.metadata.title
    }

    pub fn date(&self) -> NaiveDate {
        self.metadata.date
    }
}
