//! ClipShelf FFI Interface Definition
//!
//! This file defines the public interface exposed to Swift via UniFFI.
//! It acts as the source of truth for shared types.

// ═══════════════════════════════════════════════════════════════════════════════
// ENUMS
// ═══════════════════════════════════════════════════════════════════════════════

/// A captured clipboard payload. Immutable once created; equal iff same
/// variant and same bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, uniffi::Enum)]
pub enum Content {
    Text { value: String },
    Image { data: Vec<u8> },
}

impl Content {
    pub fn text(value: impl Into<String>) -> Self {
        Content::Text { value: value.into() }
    }

    pub fn image(data: impl Into<Vec<u8>>) -> Self {
        Content::Image { data: data.into() }
    }

    /// The text payload, if this is text content
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text { value } => Some(value),
            Content::Image { .. } => None,
        }
    }
}

/// Payload kind of a raw capture event delivered by the change source
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum CaptureKind {
    Text,
    Image,
}

/// Content type filter for presentation views
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, uniffi::Enum)]
pub enum ContentFilter {
    #[default]
    All,
    Text,
    Images,
}

impl ContentFilter {
    pub fn matches(&self, content: &Content) -> bool {
        match self {
            ContentFilter::All => true,
            ContentFilter::Text => matches!(content, Content::Text { .. }),
            ContentFilter::Images => matches!(content, Content::Image { .. }),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RECORDS (Structs)
// ═══════════════════════════════════════════════════════════════════════════════

/// An identified, timestamped wrapper around captured content.
///
/// Identity is the `id`: two items compare equal iff their ids match, even if
/// the content differs. Duplicate detection goes through `content` instead.
#[derive(Debug, Clone, uniffi::Record)]
pub struct Item {
    pub id: String,
    pub content: Content,
    pub timestamp_unix: i64,
}

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Item {}

/// Read-only view of both collections, most recent first
#[derive(Debug, Clone, Default, PartialEq, uniffi::Record)]
pub struct HistorySnapshot {
    pub pinned: Vec<Item>,
    pub ephemeral: Vec<Item>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// FOREIGN TRAITS (implemented by the host)
// ═══════════════════════════════════════════════════════════════════════════════

/// Destination for restored content: the system pasteboard in the app,
/// a recorder in tests.
#[uniffi::export(with_foreign)]
pub trait ClipboardSink: Send + Sync {
    fn write_content(&self, content: Content);
}

/// Change notification for renderers. Called after every mutation with the
/// post-mutation state.
#[uniffi::export(with_foreign)]
pub trait HistoryObserver: Send + Sync {
    fn history_changed(&self, snapshot: HistorySnapshot);
}

/// Polled by `ClipboardMonitor`. `change_count` must be cheap; `read` is only
/// called when the count moved.
#[uniffi::export(with_foreign)]
pub trait ClipboardReader: Send + Sync {
    fn change_count(&self) -> i64;
    fn read(&self) -> Option<Content>;
}

/// Sink that drops everything. Used by the CLI and when no pasteboard exists.
pub struct NullSink;

impl ClipboardSink for NullSink {
    fn write_content(&self, _content: Content) {}
}
