//! Implements a custom [`push_html`] that differs from
//! [`pulldown_cmark::html::push_html`] in the ways generated pages need:
//!
//! * soft line breaks are rendered as `<br />` (hard wraps), so a line break
//!   in the source is a line break on the page
//! * void elements are written in XHTML form (`<br />`, `<hr />`, `<img />`)
//! * image alt text is taken from the image's inline content
//! * fenced code blocks are syntax highlighted by a [`Highlighter`]

use pulldown_cmark::escape::{escape_href, escape_html, StrWrite};
use pulldown_cmark::{Alignment, CodeBlockKind, CowStr, Event, LinkType, Tag};
use std::fmt::{self, Display};
use std::io;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

/// The `syntect` theme used for fenced code blocks.
pub const HIGHLIGHT_THEME: &str = "base16-eighties.dark";

/// Highlights code with the default `syntect` syntaxes and
/// [`HIGHLIGHT_THEME`]. Loading the syntaxes is slow, so one highlighter is
/// shared by every post of a build.
pub struct Highlighter {
    syntaxes: SyntaxSet,
    theme: Theme,
}

impl Highlighter {
    pub fn new() -> Highlighter {
        let syntaxes = SyntaxSet::load_defaults_newlines();
        // `remove` rather than `get` to take an owned `Theme`
        let theme = ThemeSet::load_defaults()
            .themes
            .remove(HIGHLIGHT_THEME)
            .unwrap_or_default();
        Highlighter { syntaxes, theme }
    }

    /// Renders `code` as a styled `<pre>` block. The syntax is looked up by
    /// the `language` token first, then guessed from the first line of the
    /// code (shebangs, `<?xml`, ...), and is plain text otherwise.
    pub fn highlight(
        &self,
        code: &str,
        language: Option<&str>,
    ) -> io::Result<String> {
        let first_line = code.lines().next().unwrap_or_default();
        let syntax = language
            .and_then(|lang| self.syntaxes.find_syntax_by_token(lang))
            .or_else(|| self.syntaxes.find_syntax_by_first_line(first_line))
            .unwrap_or_else(|| self.syntaxes.find_syntax_plain_text());
        highlighted_html_for_string(code, &self.syntaxes, syntax, &self.theme)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new()
    }
}

struct Adaptor<'a, T> {
    formatter: &'a mut T,
    result: fmt::Result,
}

impl<T> Adaptor<'_, T> {
    fn handle_result(&mut self, result: fmt::Result) -> io::Result<()> {
        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                self.result = result;
                Err(io::Error::new(io::ErrorKind::Other, e))
            }
        }
    }
}

impl<T: fmt::Write> StrWrite for Adaptor<'_, T> {
    fn write_str(&mut self, s: &str) -> io::Result<()> {
        let result = self.formatter.write_str(s);
        self.handle_result(result)
    }

    fn write_fmt(&mut self, args: fmt::Arguments) -> io::Result<()> {
        let result = self.formatter.write_fmt(args);
        self.handle_result(result)
    }
}

struct EscapeHref<'a>(CowStr<'a>);

impl<'a> Display for EscapeHref<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut adaptor = Adaptor {
            formatter: f,
            result: Ok(()),
        };
        let _ = escape_href(&mut adaptor, &self.0);
        adaptor.result
    }
}

struct EscapeHtml<'a>(CowStr<'a>);

impl<'a> Display for EscapeHtml<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut adaptor = Adaptor {
            formatter: f,
            result: Ok(()),
        };

        let _ = escape_html(&mut adaptor, &self.0);
        adaptor.result
    }
}

enum TableState {
    Head,
    Body,
}

/// A fenced code block being collected until its end tag.
struct FencedCode {
    language: Option<String>,
    text: String,
}

/// Renders markdown [`Event`]s into HTML. This is largely modeled after
/// [`pulldown_cmark`]'s private `HtmlWriter` struct.
pub struct HtmlRenderer<'h> {
    highlighter: &'h Highlighter,
    table_alignments: Vec<Alignment>,
    table_state: TableState,
    table_cell_index: usize,

    /// Nesting depth of images currently open. While non-zero, only text is
    /// written (into the `alt` attribute).
    image_depth: usize,

    /// Set while inside a fenced code block.
    fenced_code: Option<FencedCode>,
}

impl<'a, 'h> HtmlRenderer<'h> {
    pub fn new(highlighter: &'h Highlighter) -> Self {
        HtmlRenderer {
            highlighter,
            table_alignments: Vec::default(),
            table_state: TableState::Head,
            table_cell_index: usize::default(),
            image_depth: 0,
            fenced_code: None,
        }
    }

    pub fn on_event<W: StrWrite>(
        &mut self,
        w: &mut W,
        event: Event<'a>,
    ) -> io::Result<()> {
        if self.image_depth > 0 {
            return self.on_alt_event(w, event);
        }

        match event {
            Event::Start(tag) => self.on_start(w, tag),
            Event::End(tag) => self.on_end(w, tag),
            Event::Code(code) => self.on_code(w, code),
            Event::FootnoteReference(name) => write!(
                w,
                r##"<sup class="footnote-reference"><a href="#{}">{}</a></sup>"##,
                EscapeHtml(name.clone()),
                EscapeHtml(name),
            ),
            Event::HardBreak => self.on_hard_break(w),
            Event::Html(html) => self.on_html(w, html),
            Event::Rule => self.on_rule(w),
            Event::SoftBreak => self.on_soft_break(w),
            Event::TaskListMarker(checked) => {
                self.on_task_list_marker(w, checked)
            }
            Event::Text(text) => self.on_text(w, text),
        }
    }

    /// Handles events nested in an image: text becomes alt text, markup is
    /// dropped, and the final `End(Image)` closes the `<img />` element.
    fn on_alt_event<W: StrWrite>(
        &mut self,
        w: &mut W,
        event: Event<'a>,
    ) -> io::Result<()> {
        match event {
            Event::Start(Tag::Image(..)) => {
                self.image_depth += 1;
                Ok(())
            }
            Event::End(Tag::Image(_, _, title)) => {
                self.image_depth -= 1;
                match self.image_depth {
                    0 => write!(w, r#"" title="{}" />"#, EscapeHtml(title)),
                    _ => Ok(()),
                }
            }
            Event::Text(text) | Event::Code(text) => escape_html(w, &text),
            Event::SoftBreak | Event::HardBreak => w.write_str(" "),
            _ => Ok(()),
        }
    }

    fn on_start<W: StrWrite>(
        &mut self,
        w: &mut W,
        tag: Tag<'a>,
    ) -> io::Result<()> {
        match tag {
            Tag::BlockQuote => w.write_str("<blockquote>\n"),
            Tag::CodeBlock(CodeBlockKind::Fenced(info)) => {
                // written out whole by `on_end`
                self.fenced_code = Some(FencedCode {
                    language: info
                        .split_whitespace()
                        .next()
                        .map(str::to_owned),
                    text: String::new(),
                });
                Ok(())
            }
            Tag::CodeBlock(CodeBlockKind::Indented) => {
                w.write_str("<pre><code>")
            }
            Tag::Emphasis => w.write_str("<em>"),
            Tag::FootnoteDefinition(name) => {
                let name = EscapeHtml(name);
                write!(
                    w,
                    r#"<div class="footnote-definition" id="{}"><sup class="footnote-definition-label">{}</sup>"#,
                    &name, &name,
                )
            }
            Tag::Heading(size) => write!(w, "<h{}>", size),
            Tag::Image(_link_type, dest, _title) => {
                self.image_depth = 1;
                write!(w, r#"<img src="{}" alt=""#, EscapeHref(dest))
            }
            Tag::Item => w.write_str("<li>"),
            Tag::Link(LinkType::Email, dest, title) => write!(
                w,
                r#"<a href="mailto:{}" title="{}">"#,
                EscapeHref(dest),
                EscapeHtml(title),
            ),
            Tag::Link(_link_type, dest, title) => write!(
                w,
                r#"<a href="{}" title="{}">"#,
                EscapeHref(dest),
                EscapeHtml(title),
            ),
            Tag::List(None) => w.write_str("<ul>\n"),
            Tag::List(Some(1)) => w.write_str("<ol>\n"),
            Tag::List(Some(start)) => write!(w, "<ol start=\"{}\">\n", start),
            Tag::Paragraph => w.write_str("<p>"),
            Tag::Strikethrough => w.write_str("<del>"),
            Tag::Strong => w.write_str("<strong>"),
            Tag::Table(alignments) => {
                self.table_alignments = alignments;
                w.write_str("<table>")
            }
            Tag::TableHead => {
                self.table_state = TableState::Head;
                self.table_cell_index = 0;
                w.write_str("<thead><tr>")
            }
            Tag::TableRow => {
                self.table_cell_index = 0;
                w.write_str("<tr>")
            }
            Tag::TableCell => write!(
                w,
                "<{}{}>",
                match self.table_state {
                    TableState::Head => "th",
                    TableState::Body => "td",
                },
                match self.table_alignments.get(self.table_cell_index) {
                    Some(Alignment::Left) => r#" align="left""#,
                    Some(Alignment::Right) => r#" align="right""#,
                    Some(Alignment::Center) => r#" align="center""#,
                    _ => "",
                }
            ),
        }
    }

    fn on_end<W: StrWrite>(&mut self, w: &mut W, tag: Tag) -> io::Result<()> {
        match tag {
            Tag::BlockQuote => w.write_str("</blockquote>\n"),
            Tag::CodeBlock(_) => match self.fenced_code.take() {
                Some(code) => w.write_str(&self.highlighter.highlight(
                    &code.text,
                    code.language.as_deref(),
                )?),
                None => w.write_str("</code></pre>\n"),
            },
            Tag::Emphasis => w.write_str("</em>"),
            Tag::FootnoteDefinition(_) => w.write_str("</div>\n"),
            Tag::Heading(level) => write!(w, "</h{}>\n", level),
            // closed by `on_alt_event`
            Tag::Image(_, _, _) => Ok(()),
            Tag::Item => w.write_str("</li>\n"),
            Tag::Link(_, _, _) => w.write_str("</a>"),
            Tag::List(Some(_)) => w.write_str("</ol>\n"),
            Tag::List(None) => w.write_str("</ul>\n"),
            Tag::Paragraph => w.write_str("</p>\n"),
            Tag::Strikethrough => w.write_str("</del>"),
            Tag::Strong => w.write_str("</strong>"),
            Tag::Table(_) => w.write_str("</tbody></table>\n"),
            Tag::TableHead => {
                self.table_state = TableState::Body;
                w.write_str("</tr></thead><tbody>")
            }
            Tag::TableRow => w.write_str("</tr>"),
            Tag::TableCell => {
                self.table_cell_index += 1;
                w.write_str(match self.table_state {
                    TableState::Head => "</th>",
                    TableState::Body => "</td>",
                })
            }
        }
    }

    fn on_text<W: StrWrite>(
        &mut self,
        w: &mut W,
        s: CowStr,
    ) -> io::Result<()> {
        match &mut self.fenced_code {
            Some(code) => {
                code.text.push_str(&s);
                Ok(())
            }
            None => escape_html(w, &s),
        }
    }

    fn on_code<W: StrWrite>(
        &mut self,
        w: &mut W,
        s: CowStr,
    ) -> io::Result<()> {
        write!(w, "<code>{}</code>", EscapeHtml(s))
    }

    fn on_html<W: StrWrite>(
        &mut self,
        w: &mut W,
        s: CowStr,
    ) -> io::Result<()> {
        w.write_str(&s)
    }

    fn on_soft_break<W: StrWrite>(&mut self, w: &mut W) -> io::Result<()> {
        w.write_str("<br />\n")
    }

    fn on_hard_break<W: StrWrite>(&mut self, w: &mut W) -> io::Result<()> {
        w.write_str("<br />\n")
    }

    fn on_rule<W: StrWrite>(&mut self, w: &mut W) -> io::Result<()> {
        w.write_str("<hr />\n")
    }

    fn on_task_list_marker<W: StrWrite>(
        &mut self,
        w: &mut W,
        checked: bool,
    ) -> io::Result<()> {
        write!(
            w,
            r#"<input disabled="" type="checkbox" {}/>"#,
            match checked {
                true => r#"checked="" "#,
                false => "",
            }
        )
    }
}

/// Converts [`Event`]s into an HTML string much like
/// `pulldown_cmark::html::push_html`. See the module description for how the
/// output differs.
pub fn push_html<'a, I>(
    out: &mut String,
    highlighter: &Highlighter,
    events: I,
) -> io::Result<()>
where
    I: Iterator<Item = Event<'a>>,
{
    let mut renderer = HtmlRenderer::new(highlighter);
    for event in events {
        renderer.on_event(out, event)?;
    }
    Ok(())
}
