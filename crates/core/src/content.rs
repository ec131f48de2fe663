//! Story body model.
//!
//! A story body is either a list of structured blocks or a single rich-text
//! HTML document. Rendering lives outside this crate; consumers match on
//! [`StoryContent`] exhaustively.

use serde::{Deserialize, Serialize};

/// Upper bound on blocks in one story body.
pub const MAX_CONTENT_BLOCKS: usize = 500;

/// The body of a story.
///
/// Stored as `{"blocks": [...]}` or `{"html": "..."}`; the field present
/// decides the variant. Bodies written with an extra `format` key still read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoryContent {
    Blocks { blocks: Vec<ContentBlock> },
    RichText { html: String },
}

/// Ordered or bulleted list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    Ordered,
    #[default]
    Unordered,
}

/// One structured block of a story body.
///
/// Field names follow the editor's JSON, so the camelCase spellings
/// (`listType`, `thumbnailUrl`, `aspectRatio`) are accepted on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Paragraph {
        #[serde(default)]
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        color: Option<String>,
    },
    Heading {
        #[serde(default)]
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        color: Option<String>,
    },
    Bold {
        #[serde(default)]
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        color: Option<String>,
    },
    List {
        #[serde(default, alias = "listType")]
        kind: ListKind,
        #[serde(default)]
        items: Vec<String>,
    },
    Separator,
    Image {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        width: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        height: Option<u32>,
    },
    Youtube(EmbeddedVideo),
    Vimeo(EmbeddedVideo),
    /// An uploaded video file played inline.
    Video(EmbeddedVideo),
    Link {
        url: String,
        #[serde(default)]
        text: String,
    },
}

/// A video embed or upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedVideo {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, alias = "thumbnailUrl", skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default, alias = "aspectRatio", skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
}

impl ContentBlock {
    fn text_fragments(&self) -> Vec<&str> {
        match self {
            ContentBlock::Paragraph { text, .. }
            | ContentBlock::Heading { text, .. }
            | ContentBlock::Bold { text, .. }
            | ContentBlock::Link { text, .. } => vec![text.as_str()],
            ContentBlock::List { items, .. } => items.iter().map(String::as_str).collect(),
            ContentBlock::Separator
            | ContentBlock::Image { .. }
            | ContentBlock::Youtube(_)
            | ContentBlock::Vimeo(_)
            | ContentBlock::Video(_) => Vec::new(),
        }
    }
}

impl StoryContent {
    pub fn empty() -> Self {
        StoryContent::Blocks { blocks: Vec::new() }
    }

    /// Number of whitespace-separated words in the readable text.
    pub fn word_count(&self) -> usize {
        match self {
            StoryContent::Blocks { blocks } => blocks
                .iter()
                .flat_map(ContentBlock::text_fragments)
                .map(|text| text.split_whitespace().count())
                .sum(),
            StoryContent::RichText { html } => strip_tags(html).split_whitespace().count(),
        }
    }

    /// Check structural limits. Returns `Ok(())` or an error message.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            StoryContent::Blocks { blocks } if blocks.len() > MAX_CONTENT_BLOCKS => Err(format!(
                "Story content may have at most {MAX_CONTENT_BLOCKS} blocks, got {}",
                blocks.len()
            )),
            StoryContent::Blocks { blocks } => {
                for (index, block) in blocks.iter().enumerate() {
                    if let ContentBlock::List { items, .. } = block {
                        if items.is_empty() {
                            return Err(format!("List block {index} has no items"));
                        }
                    }
                }
                Ok(())
            }
            StoryContent::RichText { .. } => Ok(()),
        }
    }
}

/// Replace markup with spaces so adjacent elements don't merge words.
fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out
}
