//! Fixed table of legal sync status transitions.

use std::collections::HashMap;
use std::sync::OnceLock;

use super::status::{SyncAction, SyncStatus};
use crate::error::{Error, Result};

const TRANSITIONS: [(SyncStatus, SyncStatus, SyncAction); 10] = [
    (SyncStatus::None, SyncStatus::Pending, SyncAction::ConfigureSync),
    (SyncStatus::Pending, SyncStatus::Synced, SyncAction::SyncComplete),
    (SyncStatus::Pending, SyncStatus::Conflict, SyncAction::ConflictDetected),
    (SyncStatus::Synced, SyncStatus::Pending, SyncAction::LocalChange),
    (SyncStatus::Synced, SyncStatus::Conflict, SyncAction::RemoteChangeConflict),
    (SyncStatus::Conflict, SyncStatus::Pending, SyncAction::ResolveConflict),
    (SyncStatus::Conflict, SyncStatus::Synced, SyncAction::AutoResolve),
    (SyncStatus::Pending, SyncStatus::None, SyncAction::DisableSync),
    (SyncStatus::Synced, SyncStatus::None, SyncAction::DisableSync),
    (SyncStatus::Conflict, SyncStatus::None, SyncAction::DisableSync),
];

/// Immutable lookup of `(from, action) -> to`.
#[derive(Debug)]
pub struct TransitionTable {
    targets: HashMap<(SyncStatus, SyncAction), SyncStatus>,
}

impl TransitionTable {
    fn build() -> Self {
        let targets = TRANSITIONS
            .iter()
            .map(|&(from, to, action)| ((from, action), to))
            .collect();
        Self { targets }
    }

    /// The shared table, built on first use.
    pub fn global() -> &'static Self {
        static TABLE: OnceLock<TransitionTable> = OnceLock::new();
        TABLE.get_or_init(Self::build)
    }

    /// Target status for `action` from `from`, if the pair is legal.
    pub fn target(&self, from: SyncStatus, action: SyncAction) -> Option<SyncStatus> {
        self.targets.get(&(from, action)).copied()
    }

    /// Succeeds only if the triple is in the table.
    pub fn validate(&self, from: SyncStatus, to: SyncStatus, action: SyncAction) -> Result<()> {
        match self.target(from, action) {
            Some(target) if target == to => Ok(()),
            _ => Err(invalid(from, to, action)),
        }
    }

    /// Resolve the target of `action` from `from`, rejecting illegal pairs.
    pub fn resolve(&self, from: SyncStatus, action: SyncAction) -> Result<SyncStatus> {
        self.target(from, action).ok_or_else(|| Error::InvalidSyncTransition {
            from: from.to_string(),
            to: "?".to_string(),
            action: action.to_string(),
        })
    }

    /// Actions that are legal from `from`, in table order.
    pub fn actions_from(&self, from: SyncStatus) -> Vec<SyncAction> {
        TRANSITIONS
            .iter()
            .filter(|(source, _, _)| *source == from)
            .map(|(_, _, action)| *action)
            .collect()
    }
}

fn invalid(from: SyncStatus, to: SyncStatus, action: SyncAction) -> Error {
    Error::InvalidSyncTransition {
        from: from.to_string(),
        to: to.to_string(),
        action: action.to_string(),
    }
}

/// Validate a `(from, to, action)` triple against the table.
pub fn validate_transition(from: SyncStatus, to: SyncStatus, action: SyncAction) -> Result<()> {
    TransitionTable::global().validate(from, to, action)
}
