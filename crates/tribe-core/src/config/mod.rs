//! Runtime configuration shared by front ends.
//!
//! A `TribeConfig` is stored as pretty JSON. Unknown fields are rejected so a
//! typo never silently falls back to a default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::deadline::Deadline;
use crate::error::{Error, Result};
use crate::sync::DEFAULT_RETRY_LIMIT;
use crate::util::normalize_text_option;

const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 5_000;

/// Settings for opening the store and running operations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TribeConfig {
    /// Database file; front ends pick a platform default when unset
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    /// Root directory of the JSON file sync adapter
    #[serde(default)]
    pub import_dir: Option<PathBuf>,
    /// Deadline applied to each operation; 0 disables it
    #[serde(default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,
    /// Compare-and-swap attempts for sync transitions
    #[serde(default = "default_sync_retry_limit")]
    pub sync_retry_limit: u32,
}

const fn default_operation_timeout_ms() -> u64 {
    DEFAULT_OPERATION_TIMEOUT_MS
}

const fn default_sync_retry_limit() -> u32 {
    DEFAULT_RETRY_LIMIT
}

impl Default for TribeConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            import_dir: None,
            operation_timeout_ms: DEFAULT_OPERATION_TIMEOUT_MS,
            sync_retry_limit: DEFAULT_RETRY_LIMIT,
        }
    }
}

impl TribeConfig {
    /// Load from `path`; a missing file yields the defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        let mut config = serde_json::from_str::<Self>(&raw).map_err(|error| {
            Error::InvalidInput(format!("invalid config at {}: {error}", path.display()))
        })?;
        config.normalize();
        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        let serialized = serde_json::to_string_pretty(&normalized)?;
        std::fs::write(path, format!("{serialized}\n"))?;
        Ok(())
    }

    /// Timeout for a single operation, if any.
    pub const fn operation_timeout(&self) -> Option<Duration> {
        if self.operation_timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.operation_timeout_ms))
        }
    }

    /// A fresh deadline for one operation.
    pub fn deadline(&self) -> Deadline {
        self.operation_timeout()
            .map_or_else(Deadline::none, Deadline::after)
    }

    fn normalize(&mut self) {
        self.database_path = normalize_path(self.database_path.take());
        self.import_dir = normalize_path(self.import_dir.take());
        self.sync_retry_limit = self.sync_retry_limit.max(1);
    }
}

fn normalize_path(path: Option<PathBuf>) -> Option<PathBuf> {
    normalize_text_option(path.map(|path| path.to_string_lossy().into_owned())).map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = TribeConfig::load_from_path(&dir.path().join("none.json")).unwrap();
        assert_eq!(config, TribeConfig::default());
        assert_eq!(config.operation_timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn save_and_load_normalizes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = TribeConfig {
            database_path: Some(PathBuf::from("  ")),
            import_dir: Some(PathBuf::from(" /srv/lists ")),
            operation_timeout_ms: 0,
            sync_retry_limit: 0,
        };

        config.save_to_path(&path).unwrap();
        let loaded = TribeConfig::load_from_path(&path).unwrap();
        assert_eq!(loaded.database_path, None);
        assert_eq!(loaded.import_dir, Some(PathBuf::from("/srv/lists")));
        assert_eq!(loaded.operation_timeout(), None);
        assert_eq!(loaded.sync_retry_limit, 1);
        assert_eq!(loaded.deadline(), Deadline::none());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"operation_timeout": 10}"#).unwrap();

        let error = TribeConfig::load_from_path(&path).unwrap_err();
        assert!(error.to_string().contains("unknown field"));
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"import_dir": "/data/import"}"#).unwrap();

        let config = TribeConfig::load_from_path(&path).unwrap();
        assert_eq!(config.import_dir, Some(PathBuf::from("/data/import")));
        assert_eq!(config.sync_retry_limit, 3);
        assert_eq!(config.operation_timeout_ms, 5_000);
    }
}
