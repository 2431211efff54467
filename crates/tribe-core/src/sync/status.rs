//! Sync status, source and action vocabularies.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Sync status of a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Not synchronized with any source. Initial state.
    #[default]
    None,
    /// Configured or locally changed, waiting for a sync round.
    Pending,
    /// Local and external data agree.
    Synced,
    /// Divergence recorded and awaiting resolution.
    Conflict,
}

impl SyncStatus {
    pub const ALL: [Self; 4] = [Self::None, Self::Pending, Self::Synced, Self::Conflict];

    /// Returns the string representation used in storage and display.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Pending => "pending",
            Self::Synced => "synced",
            Self::Conflict => "conflict",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "pending" => Ok(Self::Pending),
            "synced" => Ok(Self::Synced),
            "conflict" => Ok(Self::Conflict),
            _ => Err(Error::InvalidInput(format!(
                "unknown sync status '{s}' (expected none, pending, synced, conflict)"
            ))),
        }
    }
}

/// External system a list is tied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncSource {
    #[default]
    None,
    /// External maps-list provider.
    ExternalMap,
    Manual,
    Imported,
}

impl SyncSource {
    /// Returns the string representation used in storage and display.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::ExternalMap => "external_map",
            Self::Manual => "manual",
            Self::Imported => "imported",
        }
    }

    /// Whether lists with this source must carry an external id.
    pub const fn requires_external_id(&self) -> bool {
        matches!(self, Self::ExternalMap)
    }
}

impl fmt::Display for SyncSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "none" => Ok(Self::None),
            "external_map" => Ok(Self::ExternalMap),
            "manual" => Ok(Self::Manual),
            "imported" => Ok(Self::Imported),
            _ => Err(Error::InvalidSyncSource(s.to_string())),
        }
    }
}

/// Named actions that drive sync status changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    ConfigureSync,
    SyncComplete,
    ConflictDetected,
    LocalChange,
    RemoteChangeConflict,
    ResolveConflict,
    AutoResolve,
    DisableSync,
}

impl SyncAction {
    pub const ALL: [Self; 8] = [
        Self::ConfigureSync,
        Self::SyncComplete,
        Self::ConflictDetected,
        Self::LocalChange,
        Self::RemoteChangeConflict,
        Self::ResolveConflict,
        Self::AutoResolve,
        Self::DisableSync,
    ];

    /// Returns the string representation used in storage and display.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigureSync => "configure_sync",
            Self::SyncComplete => "sync_complete",
            Self::ConflictDetected => "conflict_detected",
            Self::LocalChange => "local_change",
            Self::RemoteChangeConflict => "remote_change_conflict",
            Self::ResolveConflict => "resolve_conflict",
            Self::AutoResolve => "auto_resolve",
            Self::DisableSync => "disable_sync",
        }
    }
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncAction {
    type Err = Error;

    /// Unknown actions are rejected as an invalid transition.
    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == normalized)
            .ok_or_else(|| Error::InvalidSyncTransition {
                from: "?".to_string(),
                to: "?".to_string(),
                action: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_values() {
        assert_eq!("pending".parse::<SyncStatus>().unwrap(), SyncStatus::Pending);
        assert_eq!(
            "external-map".parse::<SyncSource>().unwrap(),
            SyncSource::ExternalMap
        );
        assert_eq!(
            "auto_resolve".parse::<SyncAction>().unwrap(),
            SyncAction::AutoResolve
        );
    }

    #[test]
    fn unknown_source_is_invalid_sync_source() {
        let error = "dropbox".parse::<SyncSource>().unwrap_err();
        assert!(matches!(error, Error::InvalidSyncSource(source) if source == "dropbox"));
    }

    #[test]
    fn unknown_action_is_invalid_transition() {
        let error = "teleport".parse::<SyncAction>().unwrap_err();
        assert!(matches!(error, Error::InvalidSyncTransition { action, .. } if action == "teleport"));
    }

    #[test]
    fn display_matches_storage_form() {
        for action in SyncAction::ALL {
            assert_eq!(action.to_string().parse::<SyncAction>().unwrap(), action);
        }
        assert_eq!(SyncSource::ExternalMap.to_string(), "external_map");
    }
}
