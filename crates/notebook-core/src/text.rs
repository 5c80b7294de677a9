//! Plain-text extraction from note HTML and digest helpers.
//!
//! The extractor is a seam: the service layer only depends on
//! [`PlainTextExtractor`], and [`HtmlTextExtractor`] is the default
//! implementation used in production.

use scraper::{Html, Node};

use crate::error::Result;

/// Converts stored note markup into plain text.
pub trait PlainTextExtractor: Send + Sync {
    /// Extract the visible text of `html`.
    ///
    /// Implementations report unusable input as
    /// [`Error::Extraction`](crate::Error::Extraction).
    fn extract(&self, html: &str) -> Result<String>;
}

/// Elements whose contents are never visible text.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Extractor for the HTML produced by the note editor.
///
/// Parses the markup as an HTML5 fragment, concatenates the visible text
/// nodes and removes every whitespace character. Malformed markup is
/// recovered the way a browser would, so extraction does not fail.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlTextExtractor;

impl HtmlTextExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl PlainTextExtractor for HtmlTextExtractor {
    fn extract(&self, html: &str) -> Result<String> {
        let fragment = Html::parse_fragment(html);
        let mut text = String::with_capacity(html.len());

        for node in fragment.tree.root().descendants() {
            let Node::Text(chunk) = node.value() else {
                continue;
            };
            let hidden = node.ancestors().any(|ancestor| {
                matches!(ancestor.value(), Node::Element(el) if HIDDEN_ELEMENTS.contains(&el.name()))
            });
            if !hidden {
                text.extend(chunk.chars().filter(|c| !c.is_whitespace()));
            }
        }

        Ok(text)
    }
}

/// Number of runes in `text`, as stored in the `words` column.
pub fn rune_count(text: &str) -> i32 {
    i32::try_from(text.chars().count()).unwrap_or(i32::MAX)
}

/// First `max_runes` runes of `text`.
pub fn digest(text: &str, max_runes: usize) -> String {
    text.chars().take(max_runes).collect()
}
