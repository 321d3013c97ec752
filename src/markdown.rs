//! Converts a post body from Markdown to an HTML fragment.

use crate::htmlrenderer::{Highlighter, HtmlRenderer};
use pulldown_cmark::*;
use std::io;

/// Converts markdown to HTML, writing the result into `w`.
///
/// * `markdown` is the post body.
/// * `root` is the root link prefix. Site-absolute links and image sources
///   (`/static/cat.png`) are rewritten to start with it, so that pages keep
///   working when the site is served from a sub-path.
///
/// * `highlighter` styles fenced code blocks.
///
/// GitHub-flavored extensions (tables, footnotes, strikethrough, task lists)
/// are enabled.
pub fn to_html<W: escape::StrWrite>(
    w: &mut W,
    markdown: &str,
    root: &str,
    highlighter: &Highlighter,
) -> io::Result<()> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    let event_converter = EventConverter {
        root: root.trim_end_matches('/'),
    };
    let mut html_renderer = HtmlRenderer::new(highlighter);
    for ev in Parser::new_ext(markdown, options) {
        html_renderer.on_event(w, event_converter.convert(ev))?;
    }
    Ok(())
}

struct EventConverter<'r> {
    root: &'r str,
}

impl EventConverter<'_> {
    fn convert_dest<'b>(&self, dest: CowStr<'b>) -> CowStr<'b> {
        if self.root.is_empty() || !is_site_absolute(&dest) {
            return dest;
        }
        CowStr::Boxed(format!("{}{}", self.root, dest).into_boxed_str())
    }

    fn convert_tag<'b>(&self, tag: Tag<'b>) -> Tag<'b> {
        match tag {
            Tag::Link(link @ LinkType::Email, dest, title) => {
                Tag::Link(link, dest, title)
            }
            Tag::Link(link, dest, title) => {
                Tag::Link(link, self.convert_dest(dest), title)
            }
            Tag::Image(link, dest, title) => {
                Tag::Image(link, self.convert_dest(dest), title)
            }
            _ => tag,
        }
    }

    fn convert<'b>(&self, ev: Event<'b>) -> Event<'b> {
        match ev {
            Event::Start(tag) => Event::Start(self.convert_tag(tag)),
            _ => ev,
        }
    }
}

/// Reports whether `dest` is a path on this site (`/foo`) as opposed to a
/// relative link, a fragment, or a protocol-relative URL (`//host/foo`).
fn is_site_absolute(dest: &str) -> bool {
    dest.starts_with('/') && !dest.starts_with("//")
}

#[cfg(test)]
mod test {
    use super::*;

    fn render(markdown: &str, root: &str) -> String {
        let mut out = String::new();
        to_html(&mut out, markdown, root, &Highlighter::new()).unwrap();
        out
    }

    #[test]
    fn test_absolute_links_get_root_prefix() {
        assert_eq!(
            render("[home](/index.html) ![x](/static/x.png)", "/blog/"),
            "<p><a href=\"/blog/index.html\" title=\"\">home</a> \
             <img src=\"/blog/static/x.png\" alt=\"x\" title=\"\" /></p>\n"
        );
    }

    #[test]
    fn test_other_links_are_untouched() {
        let markdown = "[a](other.html) [b](https://example.com/) [c](//cdn.example.com/x) [d](#top)";
        assert_eq!(render(markdown, "/blog"), render(markdown, ""));
        assert!(render(markdown, "/blog").contains("href=\"//cdn.example.com/x\""));
    }

    #[test]
    fn test_gfm_extensions() {
        let html = render("~~gone~~\n\n- [x] done\n\n| a |\n|---|\n| 1 |\n", "");
        assert!(html.contains("<del>gone</del>"));
        assert!(html.contains(r#"<input disabled="" type="checkbox" checked="" />"#));
        assert!(html.contains("<table><thead><tr><th>a</th></tr></thead><tbody><tr><td>1</td></tr></tbody></table>"));
    }
}
