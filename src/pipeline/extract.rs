//! Diagram extraction and reinsertion.
//!
//! Each text (cover or body) is parsed once. Fenced code blocks whose
//! language is `mermaid` are lifted out of the event stream and replaced by
//! a typed slot; everything else stays as parsed Markdown events. The HTML
//! writer runs once over the whole stream at reinsertion, so link reference
//! definitions and footnotes resolve across diagrams.
//!
//! ```text
//! "intro\n```mermaid\ngraph TD; A-->B\n```\noutro"
//!     ──extract──▶ [Markup(<p>intro</p> events), Diagram(0), Markup(<p>outro</p> events)]
//!     ──markup───▶ same shape, headings and line breaks annotated
//!     ──reinsert─▶ "<p>intro</p><div class=\"mermaid-diagram\"><img …/></div><p>outro</p>"
//! ```
//!
//! A diagram whose image is missing is reinserted as its [`placeholder`]
//! token so the gap is visible in the PDF.

use crate::pipeline::markup::{escape_html, parser_options};
use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Parser, Tag, TagEnd};
use std::collections::BTreeMap;

/// Info-string language that marks a fenced block as a diagram.
pub const DIAGRAM_LANGUAGE: &str = "mermaid";

/// A piece of an extracted document.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Parsed Markdown, annotated by [`crate::pipeline::markup`].
    Markup(Vec<Event<'static>>),
    /// Slot for the diagram with this index.
    Diagram(usize),
}

/// The definition of one diagram, as written between its fences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramSource {
    /// 0-based, in order of appearance.
    pub index: usize,
    /// Block content, trimmed.
    pub source: String,
}

/// Visible token left in the document for a diagram that failed to render.
pub fn placeholder(index: usize) -> String {
    format!("%%MERMAID_{index}%%")
}

/// Assigns diagram indices across every text it is given.
///
/// Run the cover through the same extractor before the body so indices
/// follow order of appearance in the final document.
#[derive(Debug, Default)]
pub struct Extractor {
    diagrams: Vec<DiagramSource>,
}

impl Extractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `text` and split it into Markdown and diagram segments.
    ///
    /// Diagrams are found wherever the parser sees a fenced block, including
    /// inside list items and block quotes. A fence left open at the end of
    /// its container stays an ordinary code block.
    pub fn extract(&mut self, text: &str) -> Vec<Segment> {
        let mut segments = Vec::new();
        let mut markup: Vec<Event<'static>> = Vec::new();
        let mut diagram: Option<String> = None;

        for (event, range) in Parser::new_ext(text, parser_options()).into_offset_iter() {
            if let Some(source) = diagram.as_mut() {
                match event {
                    Event::Text(chunk) => source.push_str(&chunk),
                    Event::End(TagEnd::CodeBlock) => {
                        let source = diagram.take().unwrap_or_default();
                        if !markup.is_empty() {
                            segments.push(Segment::Markup(std::mem::take(&mut markup)));
                        }
                        let index = self.diagrams.len();
                        self.diagrams.push(DiagramSource {
                            index,
                            source: source.trim().to_string(),
                        });
                        segments.push(Segment::Diagram(index));
                    }
                    _ => {}
                }
                continue;
            }

            if let Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) = &event {
                if is_diagram(info) && is_closed(&text[range]) {
                    diagram = Some(String::new());
                    continue;
                }
            }
            markup.push(event.into_static());
        }

        if !markup.is_empty() {
            segments.push(Segment::Markup(markup));
        }
        segments
    }

    /// Diagrams found so far, in index order.
    pub fn diagrams(&self) -> &[DiagramSource] {
        &self.diagrams
    }

    pub fn into_diagrams(self) -> Vec<DiagramSource> {
        self.diagrams
    }
}

fn is_diagram(info: &CowStr<'_>) -> bool {
    info.split_whitespace().next() == Some(DIAGRAM_LANGUAGE)
}

/// Whether a fenced block's source ends with a matching closing fence.
fn is_closed(block: &str) -> bool {
    let mut lines = block
        .trim_end()
        .lines()
        .map(|line| line.trim_start_matches(|c: char| c == '>' || c.is_whitespace()));

    let Some(opener) = lines.next() else {
        return false;
    };
    let marker = match opener.chars().next() {
        Some(c @ ('`' | '~')) => c,
        _ => return false,
    };
    let len = opener.chars().take_while(|&c| c == marker).count();

    lines.last().is_some_and(|closer| {
        let closer = closer.trim_end();
        closer.len() >= len && closer.chars().all(|c| c == marker)
    })
}

fn diagram_block(index: usize, images: &BTreeMap<usize, String>) -> String {
    match images.get(&index) {
        Some(src) => format!(
            "<div class=\"mermaid-diagram\"><img src=\"{}\" alt=\"Mermaid Diagram {}\" /></div>\n",
            escape_html(src),
            index + 1
        ),
        None => format!(
            "<p class=\"mermaid-unresolved\">{}</p>\n",
            placeholder(index)
        ),
    }
}

/// Write the segments out as one HTML fragment, replacing each diagram
/// slot with its image.
///
/// `images` maps diagram index → image path relative to the styled
/// document. Slots without an entry become their [`placeholder`] token.
pub fn reinsert(segments: &[Segment], images: &BTreeMap<usize, String>) -> String {
    let events = segments.iter().flat_map(|segment| match segment {
        Segment::Markup(events) => events.clone(),
        Segment::Diagram(index) => vec![Event::Html(diagram_block(*index, images).into())],
    });

    let mut out = String::new();
    html::push_html(&mut out, events);
    out
}
