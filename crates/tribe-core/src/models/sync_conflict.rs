//! Sync conflict model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ids::{ConflictId, ItemId, ListId};
use crate::error::{Error, Result};

/// Recorded divergence between local and externally sourced data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConflict {
    /// Conflict record identifier
    pub id: ConflictId,
    /// List involved in the conflict
    pub list_id: ListId,
    /// Item involved; `None` for list-level conflicts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<ItemId>,
    /// Free-form category (e.g. "added", "removed", "modified")
    pub conflict_type: String,
    pub local_data: Value,
    pub remote_data: Value,
    /// How the conflict was settled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Set if and only if the conflict is resolved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl SyncConflict {
    /// Build an open conflict from validated input
    pub fn new(input: NewConflict) -> Result<Self> {
        input.validate()?;
        Ok(Self {
            id: ConflictId::new(),
            list_id: input.list_id,
            item_id: input.item_id,
            conflict_type: input.conflict_type.trim().to_string(),
            local_data: input.local_data,
            remote_data: input.remote_data,
            resolution: None,
            created_at: Utc::now(),
            resolved_at: None,
        })
    }

    pub const fn is_open(&self) -> bool {
        self.resolved_at.is_none()
    }
}

/// Input for recording a conflict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewConflict {
    pub list_id: ListId,
    #[serde(default)]
    pub item_id: Option<ItemId>,
    pub conflict_type: String,
    pub local_data: Value,
    pub remote_data: Value,
}

impl NewConflict {
    pub fn validate(&self) -> Result<()> {
        if self.conflict_type.trim().is_empty() {
            return Err(Error::InvalidInput("conflict type cannot be empty".into()));
        }
        if is_empty_payload(&self.local_data) {
            return Err(Error::InvalidInput("local data cannot be empty".into()));
        }
        if is_empty_payload(&self.remote_data) {
            return Err(Error::InvalidInput("remote data cannot be empty".into()));
        }
        Ok(())
    }
}

/// Null, empty objects, empty arrays and blank strings count as missing.
pub fn is_empty_payload(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::String(text) => text.trim().is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}
