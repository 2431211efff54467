//! Sync configuration embedded in a list, validated as one unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::{SyncSource, SyncStatus};
use crate::error::{Error, Result};

/// The `(source, external id, status, last sync)` tuple of a list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    pub source: SyncSource,
    /// Identifier of the list in the external source; empty when unset.
    #[serde(default)]
    pub external_id: String,
    pub status: SyncStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync_at: Option<DateTime<Utc>>,
}

impl SyncConfig {
    /// Check the tuple with [`validate_sync_config`].
    pub fn validate(&self) -> Result<()> {
        validate_sync_config(
            self.source,
            &self.external_id,
            self.status,
            self.last_sync_at,
        )
    }

    /// Whether the list is tied to any source.
    pub const fn is_enabled(&self) -> bool {
        !matches!(self.source, SyncSource::None)
    }
}

/// Validate that source, external id, status and last-sync time agree.
///
/// A list without a source must be entirely unsynced; an external-map list
/// needs an external id.
pub fn validate_sync_config(
    source: SyncSource,
    external_id: &str,
    status: SyncStatus,
    last_sync_at: Option<DateTime<Utc>>,
) -> Result<()> {
    let external_id = external_id.trim();

    if source == SyncSource::None {
        if status != SyncStatus::None {
            return Err(Error::InvalidSyncConfig(format!(
                "status must be none without a sync source (got {status})"
            )));
        }
        if !external_id.is_empty() {
            return Err(Error::InvalidSyncConfig(
                "external id must be empty without a sync source".to_string(),
            ));
        }
        if last_sync_at.is_some() {
            return Err(Error::InvalidSyncConfig(
                "last sync time must be unset without a sync source".to_string(),
            ));
        }
        return Ok(());
    }

    if source.requires_external_id() && external_id.is_empty() {
        return Err(Error::MissingSyncId(source.to_string()));
    }

    Ok(())
}

/// String-typed entry point, for callers that receive raw values.
pub fn validate_raw_sync_config(
    source: &str,
    external_id: &str,
    status: &str,
    last_sync_at: Option<DateTime<Utc>>,
) -> Result<()> {
    let source = source.parse::<SyncSource>()?;
    let status = status.parse::<SyncStatus>()?;
    validate_sync_config(source, external_id, status, last_sync_at)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_sync_config(SyncSource::None, "", SyncStatus::None, None).is_ok());
        assert!(SyncConfig::default().validate().is_ok());
    }

    #[test]
    fn none_source_rejects_external_id() {
        let error =
            validate_sync_config(SyncSource::None, "x", SyncStatus::None, None).unwrap_err();
        assert!(matches!(error, Error::InvalidSyncConfig(_)));
    }

    #[test]
    fn none_source_rejects_status() {
        let error =
            validate_sync_config(SyncSource::None, "", SyncStatus::Pending, None).unwrap_err();
        assert!(matches!(error, Error::InvalidSyncConfig(_)));
    }

    #[test]
    fn none_source_rejects_last_sync() {
        let error = validate_sync_config(SyncSource::None, "", SyncStatus::None, Some(Utc::now()))
            .unwrap_err();
        assert!(matches!(error, Error::InvalidSyncConfig(_)));
    }

    #[test]
    fn external_map_requires_id() {
        let error = validate_sync_config(SyncSource::ExternalMap, "  ", SyncStatus::Pending, None)
            .unwrap_err();
        assert!(matches!(error, Error::MissingSyncId(_)));
        assert!(
            validate_sync_config(SyncSource::ExternalMap, "abc", SyncStatus::Pending, None).is_ok()
        );
    }

    #[test]
    fn manual_source_may_omit_id() {
        assert!(validate_sync_config(SyncSource::Manual, "", SyncStatus::Synced, None).is_ok());
    }

    #[test]
    fn raw_values_reject_unknown_source() {
        let error = validate_raw_sync_config("carrier-pigeon", "", "none", None).unwrap_err();
        assert!(matches!(error, Error::InvalidSyncSource(_)));
    }
}
