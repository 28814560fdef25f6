//! Markdown → HTML conversion.
//!
//! Backed by `pulldown-cmark` with the GitHub extensions enabled. Every
//! heading gets an `id` derived from its visible text so the export engine
//! can build the PDF outline from it.
//!
//! The cover and the body are annotated by two independent calls that
//! differ only in the [`MarkupOptions`] they pass:
//!
//! | pass  | single newline | headings                          |
//! |-------|----------------|-----------------------------------|
//! | body  | `<br />`       | bookmarked                        |
//! | cover | soft break     | `class="no-bookmark"` (no outline) |

use crate::pipeline::extract::Segment;
use once_cell::sync::Lazy;
use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag, TagEnd};
use regex::Regex;

/// Per-pass rendering switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkupOptions {
    /// Render every single newline as a line break.
    pub hard_breaks: bool,
    /// Let headings appear in the PDF outline.
    pub bookmarks: bool,
}

impl MarkupOptions {
    pub const BODY: Self = Self {
        hard_breaks: true,
        bookmarks: true,
    };

    pub const COVER: Self = Self {
        hard_breaks: false,
        bookmarks: false,
    };
}

/// Apply the pass options to every Markdown segment, passing diagram slots
/// through untouched.
pub fn annotate_segments(segments: Vec<Segment>, options: MarkupOptions) -> Vec<Segment> {
    segments
        .into_iter()
        .map(|segment| match segment {
            Segment::Markup(events) => Segment::Markup(annotate(events.into_iter(), options)),
            diagram @ Segment::Diagram(_) => diagram,
        })
        .collect()
}

pub(crate) fn parser_options() -> Options {
    let mut opts = Options::empty();
    opts.insert(Options::ENABLE_TABLES);
    opts.insert(Options::ENABLE_STRIKETHROUGH);
    opts.insert(Options::ENABLE_TASKLISTS);
    opts.insert(Options::ENABLE_FOOTNOTES);
    opts
}

/// Convert one Markdown fragment to HTML.
pub fn render_markdown(markdown: &str, options: MarkupOptions) -> String {
    let parser = Parser::new_ext(markdown, parser_options());
    let events = annotate(parser, options);

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, events.into_iter());
    out
}

/// Apply the pass options to the event stream.
///
/// Heading events are buffered until the heading closes, because the id is
/// derived from text that arrives after the opening tag.
fn annotate<'a>(events: impl Iterator<Item = Event<'a>>, options: MarkupOptions) -> Vec<Event<'a>> {
    let mut out = Vec::new();
    let mut heading: Option<(Tag<'a>, Vec<Event<'a>>)> = None;

    for event in events {
        let event = match event {
            Event::SoftBreak if options.hard_breaks => Event::HardBreak,
            other => other,
        };

        if heading.is_some() {
            if matches!(event, Event::End(TagEnd::Heading(_))) {
                if let Some((tag, inner)) = heading.take() {
                    out.push(Event::Start(identify(tag, &inner, options)));
                    out.extend(inner);
                    out.push(event);
                }
            } else if let Some((_, inner)) = heading.as_mut() {
                inner.push(event);
            }
            continue;
        }

        match event {
            Event::Start(tag @ Tag::Heading { .. }) => heading = Some((tag, Vec::new())),
            other => out.push(other),
        }
    }

    out
}

fn identify<'a>(tag: Tag<'a>, inner: &[Event<'a>], options: MarkupOptions) -> Tag<'a> {
    match tag {
        Tag::Heading {
            level,
            mut classes,
            attrs,
            ..
        } => {
            let text: String = inner
                .iter()
                .filter_map(|e| match e {
                    Event::Text(t) | Event::Code(t) => Some(t.as_ref()),
                    _ => None,
                })
                .collect();
            let slug = heading_id(&text);

            if !options.bookmarks {
                classes.push(CowStr::Borrowed("no-bookmark"));
            }

            Tag::Heading {
                level,
                id: (!slug.is_empty()).then(|| CowStr::from(slug)),
                classes,
                attrs,
            }
        }
        other => other,
    }
}

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static RE_DISALLOWED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_\x{4e00}-\x{9fa5}-]").unwrap());
static RE_DASH_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"-{2,}").unwrap());

/// Derive a heading anchor from its visible text.
///
/// Lowercases, turns whitespace runs into `-`, drops anything that is not
/// an ASCII letter, digit, `_`, `-` or a CJK unified ideograph, collapses
/// dash runs and trims dashes from both ends. Identical headings get
/// identical ids.
pub fn heading_id(text: &str) -> String {
    let lower = text.to_lowercase();
    let dashed = RE_WHITESPACE.replace_all(&lower, "-");
    let kept = RE_DISALLOWED.replace_all(&dashed, "");
    let collapsed = RE_DASH_RUNS.replace_all(&kept, "-");
    collapsed.trim_matches('-').to_string()
}

/// Escape text for use in HTML content or a double-quoted attribute.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_id() {
        assert_eq!(heading_id("Hello World"), "hello-world");
        assert_eq!(heading_id("  API: Overview!  "), "api-overview");
        assert_eq!(heading_id("a -- b"), "a-b");
        assert_eq!(heading_id("snake_case stays"), "snake_case-stays");
        assert_eq!(heading_id("中文 标题"), "中文-标题");
        assert_eq!(heading_id("!!!"), "");
    }

    #[test]
    fn test_heading_id_is_deterministic() {
        assert_eq!(heading_id("Setup"), heading_id("Setup"));
    }

    #[test]
    fn test_body_headings_get_ids() {
        let html = render_markdown("## Getting Started\n", MarkupOptions::BODY);
        assert!(html.contains(r#"<h2 id="getting-started">Getting Started</h2>"#), "{html}");
    }

    #[test]
    fn test_heading_id_includes_inline_code() {
        let html = render_markdown("# The `convert` API\n", MarkupOptions::BODY);
        assert!(html.contains(r#"id="the-convert-api""#), "{html}");
        assert!(html.contains("<code>convert</code>"));
    }

    #[test]
    fn test_cover_headings_are_not_bookmarked() {
        let html = render_markdown("# Annual Report\n", MarkupOptions::COVER);
        assert!(html.contains(r#"id="annual-report""#), "{html}");
        assert!(html.contains(r#"class="no-bookmark""#), "{html}");

        let body = render_markdown("# Annual Report\n", MarkupOptions::BODY);
        assert!(!body.contains("no-bookmark"));
    }

    #[test]
    fn test_hard_breaks_only_in_body() {
        let text = "line one\nline two\n";
        assert!(render_markdown(text, MarkupOptions::BODY).contains("<br />"));
        assert!(!render_markdown(text, MarkupOptions::COVER).contains("<br"));
    }

    #[test]
    fn test_gfm_extensions_and_raw_html() {
        let md = "| a | b |\n|---|---|\n| 1 | 2 |\n\n~~gone~~\n\n<div class=\"page-break\"></div>\n";
        let html = render_markdown(md, MarkupOptions::BODY);
        assert!(html.contains("<table>"));
        assert!(html.contains("<del>gone</del>"));
        assert!(html.contains(r#"<div class="page-break"></div>"#));
    }

    #[test]
    fn test_annotate_segments_threads_diagrams() {
        let mut ex = crate::pipeline::extract::Extractor::new();
        let segs = ex.extract("# Before\none\ntwo\n\n```mermaid\npie\n```\n\nafter\n");
        let out = annotate_segments(segs, MarkupOptions::BODY);
        assert_eq!(out.len(), 3);
        assert_eq!(out[1], Segment::Diagram(0));

        let html = crate::pipeline::extract::reinsert(&out, &Default::default());
        assert!(html.contains(r#"<h1 id="before">Before</h1>"#), "{html}");
        assert!(html.contains("one<br />"), "{html}");
        assert!(html.contains("<p>after</p>"));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#x27;");
    }
}
