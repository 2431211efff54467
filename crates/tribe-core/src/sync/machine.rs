//! Sync state machine: the only writer of a list's sync fields.

use std::future::{self, Future};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::config::SyncConfig;
use super::status::{SyncAction, SyncSource, SyncStatus};
use super::transition::TransitionTable;
use crate::deadline::Deadline;
use crate::error::{Error, Result};
use crate::models::{List, ListId};
use crate::store::Storage;

/// Attempts at the compare-and-swap before giving up.
pub const DEFAULT_RETRY_LIMIT: u32 = 3;

/// New field values carried by an action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncUpdate {
    #[serde(default)]
    pub source: Option<SyncSource>,
    #[serde(default)]
    pub external_id: Option<String>,
}

impl SyncUpdate {
    pub fn configure(source: SyncSource, external_id: impl Into<String>) -> Self {
        Self {
            source: Some(source),
            external_id: Some(external_id.into()),
        }
    }
}

/// What one attempt of [`SyncStateMachine::commit_with`] writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Leave the list as is
    Skip,
    /// Commit the transition for this action
    Apply(SyncAction),
    /// Rewrite the current fields unchanged, bumping `sync_version`
    Touch,
}

/// Result of a transition attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionOutcome {
    /// The list as stored after the attempt
    pub list: List,
    /// Action that was committed, if any
    pub applied: Option<SyncAction>,
}

/// Compute the sync config that `action` would produce for `list`.
///
/// Pure: consults the transition table, then validates the full result.
pub fn plan_transition(
    current: &SyncConfig,
    action: SyncAction,
    update: &SyncUpdate,
    now: DateTime<Utc>,
) -> Result<SyncConfig> {
    let target = TransitionTable::global().resolve(current.status, action)?;

    let next = if action == SyncAction::DisableSync {
        SyncConfig::default()
    } else {
        let stamp = matches!(action, SyncAction::SyncComplete | SyncAction::AutoResolve);
        SyncConfig {
            source: update.source.unwrap_or(current.source),
            external_id: update
                .external_id
                .as_deref()
                .map_or_else(|| current.external_id.clone(), |id| id.trim().to_string()),
            status: target,
            last_sync_at: if stamp { Some(now) } else { current.last_sync_at },
        }
    };

    next.validate()?;
    Ok(next)
}

/// Applies named actions to lists through optimistic compare-and-swap.
///
/// No lock is held across storage calls: the machine reads the list,
/// validates, and commits only if the list's `sync_version` is unchanged.
/// A caller that loses the race re-reads and re-validates against the
/// winner's state.
pub struct SyncStateMachine<'a, S> {
    store: &'a S,
    retry_limit: u32,
}

impl<'a, S: Storage> SyncStateMachine<'a, S> {
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

    /// Apply `action` to the list, committing the new sync fields.
    pub async fn apply(
        &self,
        list_id: &ListId,
        action: SyncAction,
        update: &SyncUpdate,
        deadline: Deadline,
    ) -> Result<List> {
        let outcome = self
            .apply_with(list_id, |_| Ok(Some(action)), update, deadline)
            .await?;
        Ok(outcome.list)
    }

    /// Apply the action chosen by `decide` from the freshly read status.
    ///
    /// `decide` runs on every attempt; returning `None` leaves the list as is.
    pub async fn apply_with<F>(
        &self,
        list_id: &ListId,
        decide: F,
        update: &SyncUpdate,
        deadline: Deadline,
    ) -> Result<TransitionOutcome>
    where
        F: Fn(SyncStatus) -> Result<Option<SyncAction>>,
    {
        self.commit_with(
            list_id,
            |status| {
                let step = decide(status).map(|action| action.map_or(Step::Skip, Step::Apply));
                future::ready(step)
            },
            update,
            deadline,
        )
        .await
    }

    /// Commit the [`Step`] chosen by `decide` from the freshly read status.
    ///
    /// `decide` may consult storage; whatever it read is only acted on if the
    /// list's `sync_version` is still the one it was chosen against.
    pub async fn commit_with<F, Fut>(
        &self,
        list_id: &ListId,
        decide: F,
        update: &SyncUpdate,
        deadline: Deadline,
    ) -> Result<TransitionOutcome>
    where
        F: Fn(SyncStatus) -> Fut,
        Fut: Future<Output = Result<Step>>,
    {
        for attempt in 0..=self.retry_limit {
            let mut list = deadline.run("apply", self.load_list(list_id)).await?;
            let (next, action) = match decide(list.sync.status).await? {
                Step::Skip => {
                    return Ok(TransitionOutcome {
                        list,
                        applied: None,
                    })
                }
                Step::Apply(action) => (
                    plan_transition(&list.sync, action, update, Utc::now())?,
                    Some(action),
                ),
                Step::Touch => (list.sync.clone(), None),
            };
            deadline.check("apply")?;

            if self
                .store
                .update_sync_fields(list_id, list.sync_version, &next)
                .await?
            {
                match action {
                    Some(action) => tracing::info!(
                        list_id = %list_id,
                        action = %action,
                        from = %list.sync.status,
                        to = %next.status,
                        "Sync transition committed"
                    ),
                    None => tracing::debug!(
                        list_id = %list_id,
                        status = %next.status,
                        "Sync version bumped"
                    ),
                }
                list.sync = next;
                list.sync_version += 1;
                return Ok(TransitionOutcome {
                    list,
                    applied: action,
                });
            }

            tracing::warn!(
                list_id = %list_id,
                attempt,
                "Sync fields changed concurrently; re-reading list"
            );
        }

        Err(Error::Conflict(format!(
            "list {list_id} kept changing during sync update"
        )))
    }

    async fn load_list(&self, list_id: &ListId) -> Result<List> {
        self.store
            .get_list(list_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("list {list_id}")))
    }
}
