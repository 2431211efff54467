//! Pull and push rounds against a list's external source.

use std::collections::HashMap;
use std::future::Future;

use serde::Serialize;
use serde_json::{json, Value};

use super::adapter::{AdapterRegistry, ExternalItem, SyncAdapter};
use super::conflicts::ConflictResolver;
use super::machine::{SyncStateMachine, SyncUpdate, DEFAULT_RETRY_LIMIT};
use super::status::{SyncAction, SyncStatus};
use crate::deadline::Deadline;
use crate::error::{Error, Result};
use crate::models::{ConflictId, ItemId, List, ListId, ListItem, NewConflict};
use crate::store::Storage;

/// Outcome of a pull round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullReport {
    /// Items returned by the source
    pub fetched: usize,
    /// Conflicts recorded in this round
    pub conflicts: Vec<ConflictId>,
    pub status: SyncStatus,
}

/// Outcome of a push round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushReport {
    pub pushed: usize,
    pub status: SyncStatus,
}

/// One difference between local and remote items.
#[derive(Debug, Clone, PartialEq)]
pub struct Divergence {
    pub item_id: Option<ItemId>,
    pub conflict_type: &'static str,
    pub local_data: Value,
    pub remote_data: Value,
}

fn match_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Compare local items with the remote copy by case-insensitive name.
///
/// Remote-only items are `added`, local-only items `removed`, and items whose
/// locations differ `modified`. Output follows local order, then remote order.
pub fn diff_items(local: &[ListItem], remote: &[ExternalItem]) -> Vec<Divergence> {
    let remote_by_name: HashMap<String, &ExternalItem> = remote
        .iter()
        .map(|item| (match_key(&item.name), item))
        .collect();
    let local_names: Vec<String> = local.iter().map(|item| match_key(&item.name)).collect();

    let mut divergences = Vec::new();
    for (item, key) in local.iter().zip(&local_names) {
        match remote_by_name.get(key) {
            None => divergences.push(Divergence {
                item_id: Some(item.id),
                conflict_type: "removed",
                local_data: json!({ "name": item.name, "location": item.location }),
                remote_data: json!({ "name": item.name, "present": false }),
            }),
            Some(remote) if remote.location != item.location => divergences.push(Divergence {
                item_id: Some(item.id),
                conflict_type: "modified",
                local_data: json!({ "name": item.name, "location": item.location }),
                remote_data: json!({ "name": remote.name, "location": remote.location }),
            }),
            Some(_) => {}
        }
    }

    for remote in remote {
        if !local_names.contains(&match_key(&remote.name)) {
            divergences.push(Divergence {
                item_id: None,
                conflict_type: "added",
                local_data: json!({ "name": remote.name, "present": false }),
                remote_data: json!({ "name": remote.name, "location": remote.location }),
            });
        }
    }

    divergences
}

/// Runs sync rounds, recording divergences as conflicts.
pub struct SyncReconciler<'a, S> {
    store: &'a S,
    adapters: &'a AdapterRegistry,
    retry_limit: u32,
}

impl<'a, S: Storage> SyncReconciler<'a, S> {
    pub const fn new(store: &'a S, adapters: &'a AdapterRegistry) -> Self {
        Self {
            store,
            adapters,
            retry_limit: DEFAULT_RETRY_LIMIT,
        }
    }

    #[must_use]
    pub const fn with_retry_limit(mut self, retry_limit: u32) -> Self {
        self.retry_limit = retry_limit;
        self
    }

    /// Fetch the remote copy and record every divergence.
    pub async fn pull(&self, list_id: &ListId, deadline: Deadline) -> Result<PullReport> {
        let list = self.syncing_list(list_id, deadline).await?;
        let (adapter, external_id) = self.adapter_for(&list)?;

        let remote = call_adapter(deadline, "pull", &external_id, adapter.fetch(&external_id))
            .await
            .inspect_err(|error| {
                tracing::warn!(list_id = %list_id, source = %list.sync.source, "Pull failed: {error}");
            })?;
        let local = deadline.run("pull", self.store.get_items(&[*list_id])).await?;
        let existing = deadline.run("pull", self.store.get_conflicts(list_id)).await?;

        let divergences = diff_items(&local, &remote);
        tracing::debug!(
            list_id = %list_id,
            fetched = remote.len(),
            divergences = divergences.len(),
            "Compared remote items"
        );

        let resolver = ConflictResolver::new(self.store).with_retry_limit(self.retry_limit);
        let mut conflicts = Vec::new();
        for divergence in &divergences {
            let already_open = existing.iter().any(|conflict| {
                conflict.is_open()
                    && conflict.item_id == divergence.item_id
                    && conflict.conflict_type == divergence.conflict_type
                    && conflict.local_data == divergence.local_data
                    && conflict.remote_data == divergence.remote_data
            });
            if already_open {
                continue;
            }

            let conflict = resolver
                .create_conflict(
                    NewConflict {
                        list_id: *list_id,
                        item_id: divergence.item_id,
                        conflict_type: divergence.conflict_type.to_string(),
                        local_data: divergence.local_data.clone(),
                        remote_data: divergence.remote_data.clone(),
                    },
                    deadline,
                )
                .await?;
            conflicts.push(conflict.id);
        }

        let status = if divergences.is_empty() {
            self.complete_if_pending(list_id).await?
        } else {
            self.current_status(list_id).await?
        };

        Ok(PullReport {
            fetched: remote.len(),
            conflicts,
            status,
        })
    }

    /// Send the local items to the source.
    pub async fn push(&self, list_id: &ListId, deadline: Deadline) -> Result<PushReport> {
        let list = self.syncing_list(list_id, deadline).await?;
        if list.sync.status == SyncStatus::Conflict {
            return Err(Error::InvalidSyncTransition {
                from: SyncStatus::Conflict.to_string(),
                to: SyncStatus::Synced.to_string(),
                action: SyncAction::SyncComplete.to_string(),
            });
        }
        let (adapter, external_id) = self.adapter_for(&list)?;

        let items: Vec<ExternalItem> = deadline
            .run("push", self.store.get_items(&[*list_id]))
            .await?
            .iter()
            .map(ExternalItem::from)
            .collect();

        call_adapter(deadline, "push", &external_id, adapter.push(&external_id, &items))
            .await
            .inspect_err(|error| {
                tracing::warn!(list_id = %list_id, source = %list.sync.source, "Push failed: {error}");
            })?;
        tracing::info!(list_id = %list_id, pushed = items.len(), "Pushed list items");

        let status = self.complete_if_pending(list_id).await?;
        Ok(PushReport {
            pushed: items.len(),
            status,
        })
    }

    async fn syncing_list(&self, list_id: &ListId, deadline: Deadline) -> Result<List> {
        let list = deadline
            .run("load_list", self.store.get_list(list_id))
            .await?
            .ok_or_else(|| Error::NotFound(format!("list {list_id}")))?;
        if list.sync.status == SyncStatus::None || !list.sync.is_enabled() {
            return Err(Error::InvalidSyncConfig(format!(
                "list {list_id} is not configured for sync"
            )));
        }
        Ok(list)
    }

    fn adapter_for(&self, list: &List) -> Result<(std::sync::Arc<dyn SyncAdapter>, String)> {
        let adapter = self.adapters.get(list.sync.source)?;
        let external_id = if list.sync.external_id.trim().is_empty() {
            list.id.to_string()
        } else {
            list.sync.external_id.trim().to_string()
        };
        Ok((adapter, external_id))
    }

    async fn complete_if_pending(&self, list_id: &ListId) -> Result<SyncStatus> {
        let outcome = SyncStateMachine::new(self.store)
            .with_retry_limit(self.retry_limit)
            .apply_with(
                list_id,
                |status| Ok((status == SyncStatus::Pending).then_some(SyncAction::SyncComplete)),
                &SyncUpdate::default(),
                Deadline::none(),
            )
            .await?;
        Ok(outcome.list.sync.status)
    }

    async fn current_status(&self, list_id: &ListId) -> Result<SyncStatus> {
        self.store
            .get_list(list_id)
            .await?
            .map(|list| list.sync.status)
            .ok_or_else(|| Error::NotFound(format!("list {list_id}")))
    }
}

/// Run an adapter call under `deadline`.
///
/// Only time spent inside the adapter is reported as
/// `ExternalSourceTimeout`; a deadline that passed before the call is a
/// plain `Timeout`.
async fn call_adapter<T>(
    deadline: Deadline,
    operation: &str,
    external_id: &str,
    call: impl Future<Output = Result<T>>,
) -> Result<T> {
    deadline.check(operation)?;
    let result = match deadline.instant() {
        None => call.await,
        Some(at) => tokio::time::timeout_at(at, call)
            .await
            .unwrap_or_else(|_| Err(Error::Timeout(operation.to_string()))),
    };
    result.map_err(|error| match error {
        Error::Timeout(_) => Error::ExternalSourceTimeout(external_id.to_string()),
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Location, NewList, NewListItem};
    use crate::store::{Catalog, MemoryStore};
    use crate::sync::{JsonFileAdapter, SyncSource};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::time::Duration;

    fn spot(name: &str, latitude: f64) -> Location {
        Location {
            latitude,
            longitude: 13.4,
            address: format!("{name} street"),
        }
    }

    async fn synced_setup(
        store: &MemoryStore,
        source: SyncSource,
        external_id: &str,
    ) -> List {
        let list = store.create_list(NewList::named("Berlin")).await.unwrap();
        SyncStateMachine::new(store)
            .apply(
                &list.id,
                SyncAction::ConfigureSync,
                &SyncUpdate::configure(source, external_id),
                Deadline::none(),
            )
            .await
            .unwrap()
    }

    fn local_item(list_id: ListId, name: &str, location: Option<Location>) -> ListItem {
        let mut input = NewListItem::named(name);
        input.location = location;
        ListItem::new(list_id, input).unwrap()
    }

    #[test]
    fn diff_classifies_added_removed_and_modified() {
        let list_id = ListId::new();
        let local = vec![
            local_item(list_id, "Blue Door", Some(spot("a", 52.5))),
            local_item(list_id, "Old Mill", None),
            local_item(list_id, "Park", None),
        ];
        let remote = vec![
            ExternalItem {
                name: " blue door ".to_string(),
                location: Some(spot("a", 52.6)),
            },
            ExternalItem {
                name: "PARK".to_string(),
                location: None,
            },
            ExternalItem {
                name: "Harbour".to_string(),
                location: None,
            },
        ];

        let kinds: Vec<_> = diff_items(&local, &remote)
            .into_iter()
            .map(|d| (d.conflict_type, d.item_id.is_some()))
            .collect();
        assert_eq!(
            kinds,
            vec![("modified", true), ("removed", true), ("added", false)]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn pull_without_divergence_completes_pending_list() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = JsonFileAdapter::new(dir.path());
        adapter
            .push(
                "berlin",
                &[ExternalItem {
                    name: "Park".to_string(),
                    location: None,
                }],
            )
            .await
            .unwrap();
        let registry = AdapterRegistry::new().with(SyncSource::Imported, Arc::new(adapter));

        let store = MemoryStore::new();
        let list = synced_setup(&store, SyncSource::Imported, "berlin").await;
        store.create_item(&list.id, NewListItem::named("park")).await.unwrap();

        let report = SyncReconciler::new(&store, &registry)
            .pull(&list.id, Deadline::none())
            .await
            .unwrap();
        assert_eq!(report.fetched, 1);
        assert!(report.conflicts.is_empty());
        assert_eq!(report.status, SyncStatus::Synced);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn pull_records_conflicts_once() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = JsonFileAdapter::new(dir.path());
        adapter
            .push(
                "berlin",
                &[ExternalItem {
                    name: "Harbour".to_string(),
                    location: None,
                }],
            )
            .await
            .unwrap();
        let registry = AdapterRegistry::new().with(SyncSource::ExternalMap, Arc::new(adapter));

        let store = MemoryStore::new();
        let list = synced_setup(&store, SyncSource::ExternalMap, "berlin").await;
        let reconciler = SyncReconciler::new(&store, &registry);

        let first = reconciler.pull(&list.id, Deadline::none()).await.unwrap();
        assert_eq!(first.conflicts.len(), 1);
        assert_eq!(first.status, SyncStatus::Conflict);

        let second = reconciler.pull(&list.id, Deadline::none()).await.unwrap();
        assert!(second.conflicts.is_empty());
        assert_eq!(store.get_conflicts(&list.id).await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn push_writes_items_and_completes() {
        let dir = tempfile::tempdir().unwrap();
        let registry = AdapterRegistry::new().with(
            SyncSource::Manual,
            Arc::new(JsonFileAdapter::new(dir.path())),
        );
        let store = MemoryStore::new();
        let list = synced_setup(&store, SyncSource::Manual, "").await;
        store.create_item(&list.id, NewListItem::named("Chess")).await.unwrap();

        let report = SyncReconciler::new(&store, &registry)
            .push(&list.id, Deadline::none())
            .await
            .unwrap();
        assert_eq!(report.pushed, 1);
        assert_eq!(report.status, SyncStatus::Synced);
        // Manual lists without an external id are keyed by list id.
        assert!(dir.path().join(format!("{}.json", list.id)).exists());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn adapter_errors_pass_through_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let registry = AdapterRegistry::new().with(
            SyncSource::ExternalMap,
            Arc::new(JsonFileAdapter::new(dir.path())),
        );
        let store = MemoryStore::new();
        let list = synced_setup(&store, SyncSource::ExternalMap, "missing").await;

        let error = SyncReconciler::new(&store, &registry)
            .pull(&list.id, Deadline::none())
            .await
            .unwrap_err();
        assert!(matches!(error, Error::ExternalSourceUnavailable(_)));
        let stored = store.get_list(&list.id).await.unwrap().unwrap();
        assert_eq!(stored.sync.status, SyncStatus::Pending);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unsynced_list_and_missing_adapter_are_rejected() {
        let registry = AdapterRegistry::new();
        let store = MemoryStore::new();
        let plain = store.create_list(NewList::named("Plain")).await.unwrap();
        let reconciler = SyncReconciler::new(&store, &registry);

        assert!(matches!(
            reconciler.pull(&plain.id, Deadline::none()).await,
            Err(Error::InvalidSyncConfig(_))
        ));

        let synced = synced_setup(&store, SyncSource::Imported, "x").await;
        assert!(matches!(
            reconciler.push(&synced.id, Deadline::none()).await,
            Err(Error::InvalidSyncSource(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn expired_deadline_is_not_blamed_on_the_source() {
        let error = call_adapter(Deadline::after(Duration::ZERO), "push", "abc", async {
            Ok(())
        })
        .await
        .unwrap_err();
        assert!(matches!(error, Error::Timeout(op) if op == "push"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn slow_source_is_external_timeout() {
        let error = call_adapter(
            Deadline::after(Duration::from_millis(10)),
            "pull",
            "abc",
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(Vec::<ExternalItem>::new())
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(error, Error::ExternalSourceTimeout(id) if id == "abc"));
    }
}
