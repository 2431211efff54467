//! Recording and resolving sync conflicts.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future;
use std::str::FromStr;

use super::machine::{Step, SyncStateMachine, SyncUpdate, DEFAULT_RETRY_LIMIT};
use super::status::{SyncAction, SyncStatus};
use crate::deadline::Deadline;
use crate::error::{Error, Result};
use crate::models::{ConflictId, ListId, NewConflict, SyncConflict};
use crate::store::Storage;

/// How the list leaves `conflict` once its last conflict is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMode {
    /// Back to `pending` for another sync round
    #[default]
    Manual,
    /// Straight to `synced`
    Auto,
}

impl ResolutionMode {
    pub const fn action(self) -> SyncAction {
        match self {
            Self::Manual => SyncAction::ResolveConflict,
            Self::Auto => SyncAction::AutoResolve,
        }
    }
}

impl fmt::Display for ResolutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Manual => "manual",
            Self::Auto => "auto",
        })
    }
}

impl FromStr for ResolutionMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "manual" => Ok(Self::Manual),
            "auto" => Ok(Self::Auto),
            _ => Err(Error::InvalidInput(format!(
                "unknown resolution mode '{s}' (expected manual or auto)"
            ))),
        }
    }
}

/// Result of resolving one conflict.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub conflict: SyncConflict,
    /// Conflicts of the list still open after this one
    pub remaining_open: usize,
    /// List status after any triggered transition
    pub list_status: SyncStatus,
}

/// Creates, lists and resolves conflicts, driving the list's sync status.
pub struct ConflictResolver<'a, S> {
    store: &'a S,
    retry_limit: u32,
}

impl<'a, S: Storage> ConflictResolver<'a, S> {
    pub const fn new(store: &'a S) -> Self {
        Self {
            store,
            retry_limit: DEFAULT_RETRY_LIMIT,
        }
    }

    #[must_use]
    pub const fn with_retry_limit(mut self, retry_limit: u32) -> Self {
        self.retry_limit = retry_limit;
        self
    }

    fn machine(&self) -> SyncStateMachine<'a, S> {
        SyncStateMachine::new(self.store).with_retry_limit(self.retry_limit)
    }

    /// Store a conflict and move the list into `conflict`.
    pub async fn create_conflict(
        &self,
        input: NewConflict,
        deadline: Deadline,
    ) -> Result<SyncConflict> {
        let conflict = SyncConflict::new(input)?;
        let list = deadline
            .run("create_conflict", self.store.get_list(&conflict.list_id))
            .await?
            .ok_or_else(|| Error::NotFound(format!("list {}", conflict.list_id)))?;

        if list.sync.status == SyncStatus::None {
            return Err(Error::InvalidSyncTransition {
                from: SyncStatus::None.to_string(),
                to: SyncStatus::Conflict.to_string(),
                action: SyncAction::ConflictDetected.to_string(),
            });
        }

        deadline.check("create_conflict")?;
        self.store.create_conflict(&conflict).await?;
        tracing::info!(
            conflict_id = %conflict.id,
            list_id = %conflict.list_id,
            conflict_type = %conflict.conflict_type,
            "Sync conflict recorded"
        );

        // Committed; the follow-up transition must not be cut short. A list
        // already in conflict still gets a version bump.
        let followup = self
            .machine()
            .commit_with(
                &conflict.list_id,
                |status| {
                    future::ready(Ok::<_, Error>(match status {
                        SyncStatus::Pending => Step::Apply(SyncAction::ConflictDetected),
                        SyncStatus::Synced => Step::Apply(SyncAction::RemoteChangeConflict),
                        SyncStatus::Conflict => Step::Touch,
                        SyncStatus::None => Step::Skip,
                    }))
                },
                &SyncUpdate::default(),
                Deadline::none(),
            )
            .await;
        if let Err(error) = followup {
            tracing::warn!(
                conflict_id = %conflict.id,
                list_id = %conflict.list_id,
                error = %error,
                "Conflict stored but list status was not updated"
            );
        }

        Ok(conflict)
    }

    /// Resolve a conflict; leave `conflict` once none remain open.
    pub async fn resolve_conflict(
        &self,
        conflict_id: &ConflictId,
        resolution: &str,
        mode: ResolutionMode,
        deadline: Deadline,
    ) -> Result<Resolution> {
        let resolution = resolution.trim();
        if resolution.is_empty() {
            return Err(Error::InvalidInput("resolution cannot be empty".into()));
        }

        let conflict = deadline
            .run("resolve_conflict", self.store.get_conflict(conflict_id))
            .await?
            .ok_or_else(|| Error::ConflictNotFound(conflict_id.to_string()))?;
        if !conflict.is_open() {
            return Err(Error::ConflictAlreadyResolved(conflict_id.to_string()));
        }

        deadline.check("resolve_conflict")?;
        let resolved_at = Utc::now();
        if !self
            .store
            .mark_conflict_resolved(conflict_id, resolution, resolved_at)
            .await?
        {
            return Err(Error::ConflictAlreadyResolved(conflict_id.to_string()));
        }
        tracing::info!(conflict_id = %conflict_id, mode = %mode, "Sync conflict resolved");

        // Open conflicts are counted inside each attempt, against the list
        // version the transition is committed on.
        let store = self.store;
        let list_id = conflict.list_id;
        let action = mode.action();
        let outcome = self
            .machine()
            .commit_with(
                &list_id,
                move |status| async move {
                    if status != SyncStatus::Conflict {
                        return Ok::<_, Error>(Step::Skip);
                    }
                    let open = store
                        .get_conflicts(&list_id)
                        .await?
                        .iter()
                        .filter(|conflict| conflict.is_open())
                        .count();
                    Ok(if open == 0 { Step::Apply(action) } else { Step::Skip })
                },
                &SyncUpdate::default(),
                Deadline::none(),
            )
            .await?;
        let remaining_open = self.open_conflicts(&list_id, Deadline::none()).await?.len();

        Ok(Resolution {
            conflict: SyncConflict {
                resolution: Some(resolution.to_string()),
                resolved_at: Some(resolved_at),
                ..conflict
            },
            remaining_open,
            list_status: outcome.list.sync.status,
        })
    }

    /// All conflicts of a list, resolved and open, in creation order.
    pub async fn list_conflicts(
        &self,
        list_id: &ListId,
        deadline: Deadline,
    ) -> Result<Vec<SyncConflict>> {
        deadline
            .run("list_conflicts", self.store.get_conflicts(list_id))
            .await
    }

    pub async fn open_conflicts(
        &self,
        list_id: &ListId,
        deadline: Deadline,
    ) -> Result<Vec<SyncConflict>> {
        let mut conflicts = self.list_conflicts(list_id, deadline).await?;
        conflicts.retain(SyncConflict::is_open);
        Ok(conflicts)
    }
}
