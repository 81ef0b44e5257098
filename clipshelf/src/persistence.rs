//! JSON persistence for the two history collections
//!
//! Two independent files, each rewritten atomically (temp file in the same
//! directory, then rename over the target):
//! - pinned:    `[{id, content: {type, value}, timestamp}, ...]`
//! - ephemeral: `{bootSessionId, items: [{id, content, timestamp}, ...]}`
//!
//! Legacy files stored bare `{type, value}` content with no id or timestamp.
//! Decoding tries the current schema first and the legacy schema second; a
//! legacy hit is wrapped in fresh items and re-saved in the current schema.
//! Anything undecodable loads as empty.

use crate::interface::{Content, Item};
use crate::session::BootSessionId;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const PINNED_FILE_NAME: &str = "pinned.json";
pub const EPHEMERAL_FILE_NAME: &str = "history.json";

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Atomic replace failed: {0}")]
    Persist(#[from] tempfile::PersistError),
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Which schema a file decoded with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    Current,
    Legacy,
}

/// Decoded ephemeral container
#[derive(Debug, Clone, PartialEq)]
pub struct EphemeralHistory {
    pub boot_session_id: BootSessionId,
    pub items: Vec<Item>,
}

// ─────────────────────────────────────────────────────────────────────────────
// WIRE TYPES
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
enum ContentRecord {
    Text(String),
    Image(#[serde(deserialize_with = "deserialize_base64")] Vec<u8>),
}

#[derive(Serialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
enum ContentRef<'a> {
    Text(&'a str),
    Image(#[serde(serialize_with = "serialize_base64")] &'a [u8]),
}

#[derive(Deserialize)]
struct ItemRecord {
    id: String,
    content: ContentRecord,
    timestamp: i64,
}

#[derive(Serialize)]
struct ItemRef<'a> {
    id: &'a str,
    content: ContentRef<'a>,
    timestamp: i64,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Container<T> {
    boot_session_id: BootSessionId,
    items: Vec<T>,
}

impl From<ContentRecord> for Content {
    fn from(record: ContentRecord) -> Self {
        match record {
            ContentRecord::Text(value) => Content::Text { value },
            ContentRecord::Image(data) => Content::Image { data },
        }
    }
}

impl<'a> From<&'a Content> for ContentRef<'a> {
    fn from(content: &'a Content) -> Self {
        match content {
            Content::Text { value } => ContentRef::Text(value),
            Content::Image { data } => ContentRef::Image(data),
        }
    }
}

impl From<ItemRecord> for Item {
    fn from(record: ItemRecord) -> Self {
        Item {
            id: record.id,
            content: record.content.into(),
            timestamp_unix: record.timestamp,
        }
    }
}

impl<'a> From<&'a Item> for ItemRef<'a> {
    fn from(item: &'a Item) -> Self {
        ItemRef {
            id: &item.id,
            content: (&item.content).into(),
            timestamp: item.timestamp_unix,
        }
    }
}

fn serialize_base64<T: AsRef<[u8]>, S: Serializer>(bytes: &T, serializer: S) -> Result<S::Ok, S::Error> {
    use base64::Engine;
    serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes.as_ref()))
}

fn deserialize_base64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    use base64::Engine;
    let encoded = String::deserialize(deserializer)?;
    base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(serde::de::Error::custom)
}

/// Legacy content gets a fresh identity; the old format carried none
fn wrap_legacy(records: Vec<ContentRecord>) -> Vec<Item> {
    records.into_iter().map(|r| Item::new(r.into())).collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// ENCODE / DECODE
// ─────────────────────────────────────────────────────────────────────────────

pub fn encode_pinned(items: &[Item]) -> PersistenceResult<Vec<u8>> {
    let records: Vec<ItemRef> = items.iter().map(ItemRef::from).collect();
    Ok(serde_json::to_vec(&records)?)
}

pub fn encode_ephemeral(boot_session_id: BootSessionId, items: &[Item]) -> PersistenceResult<Vec<u8>> {
    let container = Container {
        boot_session_id,
        items: items.iter().map(ItemRef::from).collect::<Vec<_>>(),
    };
    Ok(serde_json::to_vec(&container)?)
}

/// Decode a pinned file, current schema first, legacy second
pub fn decode_pinned(bytes: &[u8]) -> Option<(Vec<Item>, Schema)> {
    if let Ok(records) = serde_json::from_slice::<Vec<ItemRecord>>(bytes) {
        return Some((records.into_iter().map(Item::from).collect(), Schema::Current));
    }
    serde_json::from_slice::<Vec<ContentRecord>>(bytes)
        .ok()
        .map(|records| (wrap_legacy(records), Schema::Legacy))
}

/// Decode an ephemeral container, current schema first, legacy second
pub fn decode_ephemeral(bytes: &[u8]) -> Option<(EphemeralHistory, Schema)> {
    if let Ok(container) = serde_json::from_slice::<Container<ItemRecord>>(bytes) {
        let history = EphemeralHistory {
            boot_session_id: container.boot_session_id,
            items: container.items.into_iter().map(Item::from).collect(),
        };
        return Some((history, Schema::Current));
    }
    serde_json::from_slice::<Container<ContentRecord>>(bytes)
        .ok()
        .map(|container| {
            let history = EphemeralHistory {
                boot_session_id: container.boot_session_id,
                items: wrap_legacy(container.items),
            };
            (history, Schema::Legacy)
        })
}

/// Replace `path` with `bytes` without ever exposing a partial file
pub fn write_atomic(path: &Path, bytes: &[u8]) -> PersistenceResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    temp.persist(path)?;
    Ok(())
}

/// Read a file, treating "not found" (and unreadable files) as absent
fn read_existing(path: &Path) -> Option<Vec<u8>> {
    match std::fs::read(path) {
        Ok(bytes) => Some(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read history file");
            None
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// STORAGE
// ─────────────────────────────────────────────────────────────────────────────

/// Locations of the two history files
#[derive(Debug, Clone)]
pub struct Storage {
    pinned_path: PathBuf,
    ephemeral_path: PathBuf,
}

impl Storage {
    /// Standard file names inside a data directory
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            pinned_path: dir.join(PINNED_FILE_NAME),
            ephemeral_path: dir.join(EPHEMERAL_FILE_NAME),
        }
    }

    pub fn pinned_path(&self) -> &Path {
        &self.pinned_path
    }

    pub fn ephemeral_path(&self) -> &Path {
        &self.ephemeral_path
    }

    pub fn save_pinned(&self, items: &[Item]) -> PersistenceResult<()> {
        write_atomic(&self.pinned_path, &encode_pinned(items)?)?;
        debug!(path = %self.pinned_path.display(), count = items.len(), "Saved pinned items");
        Ok(())
    }

    pub fn save_ephemeral(&self, boot_session_id: BootSessionId, items: &[Item]) -> PersistenceResult<()> {
        write_atomic(&self.ephemeral_path, &encode_ephemeral(boot_session_id, items)?)?;
        debug!(path = %self.ephemeral_path.display(), count = items.len(), "Saved ephemeral items");
        Ok(())
    }

    /// Load pinned items. Missing or undecodable files load as empty;
    /// legacy files are migrated in place.
    pub fn load_pinned(&self) -> Vec<Item> {
        let path = &self.pinned_path;
        let Some(bytes) = read_existing(path) else {
            return Vec::new();
        };
        match decode_pinned(&bytes) {
            Some((items, Schema::Current)) => {
                info!(path = %path.display(), count = items.len(), "Loaded pinned items");
                items
            }
            Some((items, Schema::Legacy)) => {
                info!(path = %path.display(), count = items.len(), "Migrating legacy pinned items");
                if let Err(e) = self.save_pinned(&items) {
                    warn!(path = %path.display(), error = %e, "Failed to re-save migrated pinned items");
                }
                items
            }
            None => {
                warn!(path = %path.display(), "Undecodable pinned file, starting empty");
                Vec::new()
            }
        }
    }

    /// Load ephemeral items for `current` session.
    ///
    /// A container from another boot session is discarded and its file
    /// deleted. Legacy files from the current session are migrated in place.
    pub fn load_ephemeral(&self, current: BootSessionId) -> Vec<Item> {
        let path = &self.ephemeral_path;
        let Some(bytes) = read_existing(path) else {
            return Vec::new();
        };
        let Some((history, schema)) = decode_ephemeral(&bytes) else {
            warn!(path = %path.display(), "Undecodable ephemeral file, starting empty");
            return Vec::new();
        };

        if history.boot_session_id != current {
            info!(
                path = %path.display(),
                stored = %history.boot_session_id,
                current = %current,
                "Discarding ephemeral history from a previous boot session"
            );
            self.remove_ephemeral();
            return Vec::new();
        }

        if schema == Schema::Legacy {
            info!(path = %path.display(), count = history.items.len(), "Migrating legacy ephemeral items");
            if let Err(e) = self.save_ephemeral(current, &history.items) {
                warn!(path = %path.display(), error = %e, "Failed to re-save migrated ephemeral items");
            }
        } else {
            info!(path = %path.display(), count = history.items.len(), "Loaded ephemeral items");
        }
        history.items
    }

    fn remove_ephemeral(&self) {
        match std::fs::remove_file(&self.ephemeral_path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.ephemeral_path.display(), error = %e, "Failed to delete stale ephemeral file"),
        }
    }

    /// Combined size of both files in bytes (missing files count as 0)
    pub fn size_bytes(&self) -> u64 {
        [&self.pinned_path, &self.ephemeral_path]
            .iter()
            .filter_map(|p| std::fs::metadata(p).ok())
            .map(|m| m.len())
            .sum()
    }
}
