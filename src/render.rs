//! The boundary between the site pipeline and the things that produce HTML.
//!
//! [`Render`] is what [`crate::write::Writer`] calls: one method to turn a post
//! body into an HTML fragment and two to wrap content in a full page. The
//! stock implementation, [`TemplateRenderer`], uses [`crate::markdown`] for
//! the former and `gtmpl` templates (Go `text/template` syntax) for the
//! latter.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use gtmpl::{Context, Template, Value};
use pulldown_cmark::escape::escape_html;

use crate::htmlrenderer::Highlighter;
use crate::markdown;

/// The file name of the post page template inside a theme directory.
pub const POST_TEMPLATE: &str = "post.html";

/// The file name of the index page template inside a theme directory.
pub const INDEX_TEMPLATE: &str = "index.html";

/// The values available to a post page.
#[derive(Clone, Copy, Debug)]
pub struct PostPage<'a> {
    pub title: &'a str,
    pub date_label: &'a str,

    /// The rendered body (an HTML fragment).
    pub body: &'a str,

    /// The root link prefix.
    pub root: &'a str,
}

/// One line of the index page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexEntry {
    pub title: String,
    pub date_label: String,
    pub url: String,
}

/// The values available to the index page.
#[derive(Clone, Copy, Debug)]
pub struct IndexPage<'a> {
    pub entries: &'a [IndexEntry],
    pub root: &'a str,
}

/// Produces the HTML the site is made of.
pub trait Render {
    /// Renders a Markdown post body to an HTML fragment.
    fn render_markdown(&self, body: &str) -> Result<String>;

    /// Wraps a rendered post body in a complete HTML document.
    fn render_page(&self, page: &PostPage<'_>) -> Result<String>;

    /// Renders the complete index document.
    fn render_index(&self, index: &IndexPage<'_>) -> Result<String>;
}

/// The post and index templates.
pub struct Theme {
    post_template: Template,
    index_template: Template,
}

impl Theme {
    /// The theme compiled into the binary.
    pub fn builtin() -> Result<Theme> {
        Ok(Theme {
            post_template: parse_template(include_str!("theme/post.html"))?,
            index_template: parse_template(include_str!("theme/index.html"))?,
        })
    }

    /// Loads `post.html` and `index.html` from `dir`.
    pub fn from_directory(dir: &Path) -> Result<Theme> {
        Ok(Theme {
            post_template: parse_template(&read_template(&dir.join(POST_TEMPLATE))?)?,
            index_template: parse_template(&read_template(&dir.join(INDEX_TEMPLATE))?)?,
        })
    }
}

fn read_template(path: &Path) -> Result<String> {
    let mut contents = String::new();
    File::open(path)
        .and_then(|mut file| file.read_to_string(&mut contents))
        .map_err(|err| Error::OpenTemplateFile {
            path: path.to_owned(),
            err,
        })?;
    Ok(contents)
}

fn parse_template(contents: &str) -> Result<Template> {
    let mut template = Template::default();
    template
        .parse(contents)
        .map_err(|e| Error::ParseTemplate(e.to_string()))?;
    Ok(template)
}

/// Renders Markdown with [`markdown::to_html`] and pages with a [`Theme`].
pub struct TemplateRenderer {
    theme: Theme,

    /// The root link prefix, used to rewrite site-absolute links in post
    /// bodies.
    root: String,

    highlighter: Highlighter,
}

impl TemplateRenderer {
    pub fn new(theme: Theme, root: &str) -> TemplateRenderer {
        TemplateRenderer {
            theme,
            root: root.to_owned(),
            highlighter: Highlighter::new(),
        }
    }
}

impl Render for TemplateRenderer {
    fn render_markdown(&self, body: &str) -> Result<String> {
        let mut html = String::with_capacity(body.len() * 3 / 2);
        markdown::to_html(&mut html, body, &self.root, &self.highlighter)
            .map_err(Error::Markdown)?;
        Ok(html)
    }

    fn render_page(&self, page: &PostPage<'_>) -> Result<String> {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("title".to_owned(), Value::String(escape(page.title)?));
        m.insert("date".to_owned(), Value::String(escape(page.date_label)?));
        m.insert("body".to_owned(), Value::String(page.body.to_owned()));
        m.insert("root".to_owned(), Value::String(page.root.to_owned()));
        execute(&self.theme.post_template, Value::Object(m))
    }

    fn render_index(&self, index: &IndexPage<'_>) -> Result<String> {
        let mut posts = Vec::with_capacity(index.entries.len());
        for entry in index.entries {
            let mut m: HashMap<String, Value> = HashMap::new();
            m.insert("title".to_owned(), Value::String(escape(&entry.title)?));
            m.insert("date".to_owned(), Value::String(escape(&entry.date_label)?));
            m.insert("url".to_owned(), Value::String(escape(&entry.url)?));
            posts.push(Value::Object(m));
        }

        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("posts".to_owned(), Value::Array(posts));
        m.insert("root".to_owned(), Value::String(index.root.to_owned()));
        execute(&self.theme.index_template, Value::Object(m))
    }
}

/// HTML-escapes text destined for a template. Templates don't escape on their
/// own.
fn escape(s: &str) -> Result<String> {
    let mut escaped = String::with_capacity(s.len());
    escape_html(&mut escaped, s).map_err(Error::Markdown)?;
    Ok(escaped)
}

fn execute(template: &Template, value: Value) -> Result<String> {
    let context = Context::from(value).map_err(|e| Error::Template(e.to_string()))?;
    let mut out: Vec<u8> = Vec::new();
    template
        .execute(&mut out, &context)
        .map_err(|e| Error::Template(e.to_string()))?;
    String::from_utf8(out).map_err(|e| Error::Template(e.to_string()))
}

/// The result of a rendering operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error producing HTML.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned for I/O problems while opening template files.
    #[error("opening template file `{}`: {err}", .path.display())]
    OpenTemplateFile {
        path: PathBuf,
        #[source]
        err: io::Error,
    },

    /// Returned for errors parsing template files.
    #[error("parsing template: {0}")]
    ParseTemplate(String),

    /// Returned for errors during templating.
    #[error("executing template: {0}")]
    Template(String),

    /// Returned when the Markdown renderer fails.
    #[error("rendering markdown: {0}")]
    Markdown(#[source] io::Error),
}

#[cfg(test)]
mod test {
    use super::*;

    fn renderer(root: &str) -> TemplateRenderer {
        TemplateRenderer::new(Theme::builtin().unwrap(), root)
    }

    #[test]
    fn test_render_page() -> Result<()> {
        let r = renderer("/blog");
        let body = r.render_markdown("# Hi\n")?;
        assert_eq!(body, "<h1>Hi</h1>\n");

        let html = r.render_page(&PostPage {
            title: "Fish & Chips",
            date_label: "Mar 05, 2024",
            body: &body,
            root: "/blog",
        })?;
        assert!(html.contains("<title>Fish &amp; Chips</title>"));
        assert!(html.contains("<time>Mar 05, 2024</time>"));
        assert!(html.contains("<h1>Hi</h1>\n"));
        assert!(html.contains(r#"href="/blog/static/style.css""#));
        Ok(())
    }

    #[test]
    fn test_render_markdown_highlights_code() -> Result<()> {
        let body = renderer("").render_markdown("```sh\necho hi\n```\n")?;
        assert!(body.starts_with("<pre style="), "{}", body);
        assert!(body.contains("echo"));
        Ok(())
    }

    #[test]
    fn test_render_index() -> Result<()> {
        let entries = vec![
            IndexEntry {
                title: String::from("Newer"),
                date_label: String::from("Mar 06, 2024"),
                url: String::from("/2024/03/06/newer/"),
            },
            IndexEntry {
                title: String::from("<Older>"),
                date_label: String::from("Mar 05, 2024"),
                url: String::from("/2024/03/05/older/"),
            },
        ];
        let html = renderer("").render_index(&IndexPage {
            entries: &entries,
            root: "",
        })?;
        let newer = html.find(r#"<a href="/2024/03/06/newer/">Newer</a>"#).unwrap();
        let older = html.find(r#"<a href="/2024/03/05/older/">&lt;Older&gt;</a>"#).unwrap();
        assert!(newer < older);
        Ok(())
    }

    #[test]
    fn test_theme_from_directory() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(POST_TEMPLATE), "[{{ .title }}]{{ .body }}").unwrap();
        std::fs::write(dir.path().join(INDEX_TEMPLATE), "{{ range .posts }}{{ .title }};{{ end }}").unwrap();
        let r = TemplateRenderer::new(Theme::from_directory(dir.path())?, "");

        let page = r.render_page(&PostPage {
            title: "T",
            date_label: "",
            body: "<p>b</p>",
            root: "",
        })?;
        assert_eq!(page, "[T]<p>b</p>");
        Ok(())
    }

    #[test]
    fn test_missing_theme_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Theme::from_directory(dir.path()),
            Err(Error::OpenTemplateFile { .. })
        ));
    }
}
