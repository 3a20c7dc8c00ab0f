//! Rich text (Prismic structured text) to HTML
//!
//! Blocks carry their text plus a list of spans addressed by UTF-16 offsets.
//! The markup produced here is untrusted until it has gone through
//! [`Sanitizer::clean`]; templates only ever receive sanitized output.

use serde::{Deserialize, Serialize};

use crate::helpers::html_escape;

/// Kind of a structured-text block
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockKind {
    #[default]
    #[serde(rename = "paragraph")]
    Paragraph,
    #[serde(rename = "heading1")]
    Heading1,
    #[serde(rename = "heading2")]
    Heading2,
    #[serde(rename = "heading3")]
    Heading3,
    #[serde(rename = "heading4")]
    Heading4,
    #[serde(rename = "heading5")]
    Heading5,
    #[serde(rename = "heading6")]
    Heading6,
    #[serde(rename = "preformatted")]
    Preformatted,
    #[serde(rename = "list-item")]
    ListItem,
    #[serde(rename = "o-list-item")]
    OrderedListItem,
    #[serde(rename = "image")]
    Image,
    #[serde(other)]
    Unsupported,
}

/// Kind of an inline span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpanKind {
    #[serde(rename = "strong")]
    Strong,
    #[serde(rename = "em")]
    Em,
    #[serde(rename = "hyperlink")]
    Hyperlink,
    #[serde(rename = "label")]
    Label,
    #[serde(other)]
    Unsupported,
}

/// A block of rich text
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RichTextBlock {
    #[serde(rename = "type", default)]
    pub kind: BlockKind,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub spans: Vec<Span>,
    /// Image blocks only
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub alt: Option<String>,
}

impl RichTextBlock {
    /// A plain paragraph
    pub fn paragraph(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Default::default()
        }
    }
}

/// Inline formatting over `[start, end)` of a block's text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    #[serde(rename = "type")]
    pub kind: SpanKind,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl Span {
    fn open_tag(&self) -> String {
        match self.kind {
            SpanKind::Strong => "<strong>".to_string(),
            SpanKind::Em => "<em>".to_string(),
            SpanKind::Hyperlink => {
                let url = self.data_str("url").unwrap_or("#");
                match self.data_str("target") {
                    Some(target) => format!(
                        r#"<a href="{}" target="{}">"#,
                        html_escape(url),
                        html_escape(target)
                    ),
                    None => format!(r#"<a href="{}">"#, html_escape(url)),
                }
            }
            SpanKind::Label => {
                let label = self.data_str("label").unwrap_or_default();
                format!(r#"<span class="{}">"#, html_escape(label))
            }
            SpanKind::Unsupported => "<span>".to_string(),
        }
    }

    fn close_tag(&self) -> &'static str {
        match self.kind {
            SpanKind::Strong => "</strong>",
            SpanKind::Em => "</em>",
            SpanKind::Hyperlink => "</a>",
            SpanKind::Label | SpanKind::Unsupported => "</span>",
        }
    }

    fn data_str(&self, key: &str) -> Option<&str> {
        self.data.as_ref()?.get(key)?.as_str()
    }
}

/// Convert a sequence of blocks to (unsanitized) HTML
pub fn as_html(blocks: &[RichTextBlock]) -> String {
    let mut html = String::new();
    let mut open_list: Option<&'static str> = None;

    for block in blocks {
        let list_tag = match block.kind {
            BlockKind::ListItem => Some("ul"),
            BlockKind::OrderedListItem => Some("ol"),
            _ => None,
        };

        if open_list != list_tag {
            if let Some(tag) = open_list {
                html.push_str(&format!("</{}>", tag));
            }
            if let Some(tag) = list_tag {
                html.push_str(&format!("<{}>", tag));
            }
            open_list = list_tag;
        }

        html.push_str(&block_html(block));
    }

    if let Some(tag) = open_list {
        html.push_str(&format!("</{}>", tag));
    }

    html
}

fn block_html(block: &RichTextBlock) -> String {
    let inner = || render_spans(&block.text, &block.spans);
    match block.kind {
        BlockKind::Paragraph => format!("<p>{}</p>", inner()),
        BlockKind::Heading1 => format!("<h1>{}</h1>", inner()),
        BlockKind::Heading2 => format!("<h2>{}</h2>", inner()),
        BlockKind::Heading3 => format!("<h3>{}</h3>", inner()),
        BlockKind::Heading4 => format!("<h4>{}</h4>", inner()),
        BlockKind::Heading5 => format!("<h5>{}</h5>", inner()),
        BlockKind::Heading6 => format!("<h6>{}</h6>", inner()),
        BlockKind::Preformatted => format!("<pre>{}</pre>", html_escape(&block.text)),
        BlockKind::ListItem | BlockKind::OrderedListItem => format!("<li>{}</li>", inner()),
        BlockKind::Image => match &block.url {
            Some(url) => format!(
                r#"<p class="block-img"><img src="{}" alt="{}"></p>"#,
                html_escape(url),
                html_escape(block.alt.as_deref().unwrap_or(""))
            ),
            None => String::new(),
        },
        BlockKind::Unsupported => String::new(),
    }
}

/// Apply spans to a block's text. Offsets are UTF-16 code units.
fn render_spans(text: &str, spans: &[Span]) -> String {
    let mut ordered: Vec<&Span> = spans.iter().filter(|s| s.start < s.end).collect();
    // outer spans first when two start together
    ordered.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut out = String::with_capacity(text.len());
    let mut open: Vec<&Span> = Vec::new();
    let mut next = 0;
    let mut pos = 0;

    for ch in text.chars() {
        close_ended(&mut out, &mut open, pos);

        while next < ordered.len() && ordered[next].start <= pos {
            out.push_str(&ordered[next].open_tag());
            open.push(ordered[next]);
            next += 1;
        }

        match ch {
            '\n' => out.push_str("<br />"),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
        pos += ch.len_utf16();
    }

    while let Some(span) = open.pop() {
        out.push_str(span.close_tag());
    }

    out
}

/// Close every open span ending at or before `pos`, reopening the ones that
/// were closed only to keep the markup well nested.
fn close_ended<'a>(out: &mut String, open: &mut Vec<&'a Span>, pos: usize) {
    if !open.iter().any(|s| s.end <= pos) {
        return;
    }

    let mut reopen = Vec::new();
    while let Some(span) = open.pop() {
        out.push_str(span.close_tag());
        if span.end > pos {
            reopen.push(span);
        }
        if !open.iter().any(|s| s.end <= pos) {
            break;
        }
    }

    for span in reopen.into_iter().rev() {
        out.push_str(&span.open_tag());
        open.push(span);
    }
}

/// Allow-list sanitizer for converted rich text
pub struct Sanitizer {
    builder: ammonia::Builder<'static>,
}

impl Sanitizer {
    /// Create the sanitizer used for post bodies
    pub fn new() -> Self {
        let mut builder = ammonia::Builder::default();
        builder
            .add_tag_attributes("span", &["class"])
            .add_tag_attributes("p", &["class"])
            .add_tag_attributes("a", &["target"]);
        Self { builder }
    }

    /// Strip anything outside the allow-list
    pub fn clean(&self, html: &str) -> String {
        self.builder.clean(html).to_string()
    }

    /// Convert and sanitize in one step
    pub fn render(&self, blocks: &[RichTextBlock]) -> String {
        self.clean(&as_html(blocks))
    }
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new()
    }
}
