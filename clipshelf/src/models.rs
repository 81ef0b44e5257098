//! Core data models for ClipShelf
//!
//! Types with uniffi derives live in `interface`; this module adds the
//! construction rules and display helpers the store relies on.

use crate::interface::{CaptureKind, Content, Item};

impl Item {
    /// Wrap content in a brand new item: fresh id, current timestamp.
    ///
    /// Every insert, move-to-front and pin/unpin transfer goes through here,
    /// so an item never keeps its id across collections.
    pub fn new(content: Content) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content,
            timestamp_unix: chrono::Utc::now().timestamp(),
        }
    }

    /// Same content, new identity
    pub fn renewed(&self) -> Self {
        Self::new(self.content.clone())
    }

    /// Display text (truncated, normalized whitespace) for preview
    pub fn display_text(&self, max_chars: usize) -> String {
        self.content.preview(max_chars)
    }
}

impl Content {
    /// Decode a raw `(kind, payload)` capture event.
    ///
    /// Text payloads must be UTF-8; anything else is rejected.
    pub fn from_event(kind: CaptureKind, payload: Vec<u8>) -> Option<Self> {
        match kind {
            CaptureKind::Text => String::from_utf8(payload).ok().map(Content::text),
            CaptureKind::Image => Some(Content::image(payload)),
        }
    }

    /// Whitespace-normalized, char-truncated preview for list rows
    pub fn preview(&self, max_chars: usize) -> String {
        match self {
            Content::Text { value } => generate_preview(value, max_chars),
            Content::Image { data } => format!("Image ({} bytes)", data.len()),
        }
    }

    /// Case-insensitive substring match used by filtered views.
    /// Images never match a non-empty query.
    pub fn matches_query(&self, query: &str) -> bool {
        if query.is_empty() {
            return true;
        }
        match self {
            Content::Text { value } => value.to_lowercase().contains(&query.to_lowercase()),
            Content::Image { .. } => false,
        }
    }
}

/// Collapse runs of whitespace into single spaces, trim, and cut at `max_chars`
pub fn generate_preview(text: &str, max_chars: usize) -> String {
    text.split_whitespace()
        .flat_map(|word| std::iter::once(' ').chain(word.chars()))
        .skip(1)
        .take(max_chars)
        .collect()
}
