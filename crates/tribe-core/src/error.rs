//! Error types for tribe-core

use thiserror::Error;

/// Result type alias using tribe-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tribe-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or missing required fields
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// List or item not found (or soft-deleted)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Action is not legal from the current sync status
    #[error("Invalid sync transition: cannot {action} from {from} to {to}")]
    InvalidSyncTransition {
        from: String,
        to: String,
        action: String,
    },

    /// Sync source, external id, status and timestamp disagree
    #[error("Invalid sync config: {0}")]
    InvalidSyncConfig(String),

    /// Unrecognized sync source
    #[error("Invalid sync source: '{0}'")]
    InvalidSyncSource(String),

    /// External-map source without an external id
    #[error("Missing sync id for source '{0}'")]
    MissingSyncId(String),

    /// Conflict id is unknown
    #[error("Sync conflict not found: {0}")]
    ConflictNotFound(String),

    /// Conflict was already resolved
    #[error("Sync conflict already resolved: {0}")]
    ConflictAlreadyResolved(String),

    /// External source could not be reached
    #[error("External source unavailable: {0}")]
    ExternalSourceUnavailable(String),

    /// External source answered with an error
    #[error("External source error: {0}")]
    ExternalSourceError(String),

    /// External source did not answer in time
    #[error("External source timed out: {0}")]
    ExternalSourceTimeout(String),

    /// Caller-supplied deadline expired
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Optimistic sync update kept losing to concurrent writers
    #[error("Concurrent update conflict: {0}")]
    Conflict(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored row could not be decoded
    #[error("Corrupted data: {0}")]
    CorruptedData(String),
}

impl Error {
    /// Stable snake_case name of the error kind, for callers that branch on it.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::NotFound(_) => "not_found",
            Self::InvalidSyncTransition { .. } => "invalid_sync_transition",
            Self::InvalidSyncConfig(_) => "invalid_sync_config",
            Self::InvalidSyncSource(_) => "invalid_sync_source",
            Self::MissingSyncId(_) => "missing_sync_id",
            Self::ConflictNotFound(_) => "conflict_not_found",
            Self::ConflictAlreadyResolved(_) => "conflict_already_resolved",
            Self::ExternalSourceUnavailable(_) => "external_source_unavailable",
            Self::ExternalSourceError(_) => "external_source_error",
            Self::ExternalSourceTimeout(_) => "external_source_timeout",
            Self::Timeout(_) => "timeout",
            Self::Conflict(_) => "conflict",
            Self::Database(_) | Self::LibSql(_) => "database",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
            Self::CorruptedData(_) => "corrupted_data",
        }
    }

    /// Whether retrying the same request later (with backoff) may succeed.
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ExternalSourceUnavailable(_)
                | Self::ExternalSourceError(_)
                | Self::ExternalSourceTimeout(_)
                | Self::Timeout(_)
                | Self::Conflict(_)
        )
    }

    /// Idempotency guards: the requested effect has already happened.
    pub const fn is_already_done(&self) -> bool {
        matches!(
            self,
            Self::ConflictNotFound(_) | Self::ConflictAlreadyResolved(_)
        )
    }
}
