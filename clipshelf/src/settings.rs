//! Engine settings
//!
//! Supplied by the host at construction. The CLI loads them from a JSON file;
//! every key is optional so partial files work.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_MAX_PINNED_COUNT: u32 = 12;
pub const DEFAULT_MAX_EPHEMERAL_COUNT: u32 = 100;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Lower bound on the monitor's polling cadence
pub const MIN_POLL_INTERVAL_MS: u64 = 50;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default = "default_max_pinned_count")]
    pub max_pinned_count: u32,
    #[serde(default = "default_max_ephemeral_count")]
    pub max_ephemeral_count: u32,
    /// Clear ephemeral history when the host quits
    #[serde(default)]
    pub clear_on_quit: bool,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_max_pinned_count() -> u32 {
    DEFAULT_MAX_PINNED_COUNT
}
fn default_max_ephemeral_count() -> u32 {
    DEFAULT_MAX_EPHEMERAL_COUNT
}
fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            max_pinned_count: DEFAULT_MAX_PINNED_COUNT,
            max_ephemeral_count: DEFAULT_MAX_EPHEMERAL_COUNT,
            clear_on_quit: false,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl Settings {
    /// Load settings from a JSON file. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "Settings file not found, using defaults");
            return Ok(Self::default());
        }
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn max_pinned(&self) -> usize {
        self.max_pinned_count as usize
    }

    pub fn max_ephemeral(&self) -> usize {
        self.max_ephemeral_count as usize
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.poll_interval_ms.max(MIN_POLL_INTERVAL_MS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.max_pinned(), 12);
        assert_eq!(settings.max_ephemeral(), 100);
        assert!(!settings.clear_on_quit);
        assert_eq!(settings.poll_interval(), std::time::Duration::from_millis(500));
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("settings.json")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"maxEphemeralCount": 5, "clearOnQuit": true}"#).unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.max_ephemeral_count, 5);
        assert!(settings.clear_on_quit);
        assert_eq!(settings.max_pinned_count, DEFAULT_MAX_PINNED_COUNT);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(Settings::load(&path), Err(SettingsError::Json(_))));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = Settings {
            max_pinned_count: 3,
            max_ephemeral_count: 0,
            clear_on_quit: true,
            poll_interval_ms: 250,
        };
        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path).unwrap(), settings);
    }

    #[test]
    fn test_poll_interval_has_floor() {
        let settings = Settings {
            poll_interval_ms: 1,
            ..Settings::default()
        };
        assert_eq!(settings.poll_interval().as_millis() as u64, MIN_POLL_INTERVAL_MS);
    }
}
