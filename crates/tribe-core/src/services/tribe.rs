//! Service facade used by front ends.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::TribeConfig;
use crate::db::LibSqlStore;
use crate::deadline::Deadline;
use crate::error::{Error, Result};
use crate::menu::MenuGenerator;
use crate::models::{
    ConflictId, ItemId, List, ListId, ListItem, Menu, MenuParams, NewConflict, NewList,
    NewListItem, SyncConflict,
};
use crate::store::{Catalog, MemoryStore, Storage};
use crate::sync::{
    AdapterRegistry, ConflictResolver, JsonFileAdapter, PullReport, PushReport, Resolution,
    ResolutionMode, SyncAction, SyncReconciler, SyncSource, SyncStateMachine, SyncStatus,
    SyncUpdate,
};

/// Every list operation, wired to one store and one set of adapters.
pub struct TribeService<S> {
    store: S,
    adapters: AdapterRegistry,
    config: TribeConfig,
}

impl TribeService<LibSqlStore> {
    /// Open (and migrate) the database file at `path`.
    ///
    /// When `import_dir` is configured, a JSON file adapter rooted there
    /// serves every sync source.
    pub async fn open_path(path: impl AsRef<Path>, config: TribeConfig) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let store = LibSqlStore::open(path).await?;
        tracing::info!("Opened tribe database at {}", path.display());
        Ok(Self::new(store, config))
    }
}

impl TribeService<MemoryStore> {
    /// Service over an in-memory store (primarily for tests).
    pub fn in_memory(config: TribeConfig) -> Self {
        Self::new(MemoryStore::new(), config)
    }
}

impl<S: Storage + Catalog> TribeService<S> {
    pub fn new(store: S, config: TribeConfig) -> Self {
        let mut adapters = AdapterRegistry::new();
        if let Some(dir) = &config.import_dir {
            let adapter = Arc::new(JsonFileAdapter::new(dir));
            for source in [SyncSource::ExternalMap, SyncSource::Manual, SyncSource::Imported] {
                adapters.register(source, adapter.clone());
            }
        }
        Self {
            store,
            adapters,
            config,
        }
    }

    #[must_use]
    pub fn with_adapters(mut self, adapters: AdapterRegistry) -> Self {
        self.adapters = adapters;
        self
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn config(&self) -> &TribeConfig {
        &self.config
    }

    /// Deadline for one operation, from the configured timeout.
    pub fn deadline(&self) -> Deadline {
        self.config.deadline()
    }

    fn machine(&self) -> SyncStateMachine<'_, S> {
        SyncStateMachine::new(&self.store).with_retry_limit(self.config.sync_retry_limit)
    }

    fn resolver(&self) -> ConflictResolver<'_, S> {
        ConflictResolver::new(&self.store).with_retry_limit(self.config.sync_retry_limit)
    }

    fn reconciler(&self) -> SyncReconciler<'_, S> {
        SyncReconciler::new(&self.store, &self.adapters)
            .with_retry_limit(self.config.sync_retry_limit)
    }

    // Lists and items

    pub async fn create_list(&self, input: NewList, deadline: Deadline) -> Result<List> {
        deadline.check("create_list")?;
        let list = self.store.create_list(input).await?;
        tracing::info!(list_id = %list.id, name = %list.name, "List created");
        Ok(list)
    }

    pub async fn lists(&self, deadline: Deadline) -> Result<Vec<List>> {
        deadline.run("lists", self.store.lists()).await
    }

    pub async fn get_list(&self, list_id: &ListId, deadline: Deadline) -> Result<List> {
        deadline
            .run("get_list", self.store.get_list(list_id))
            .await?
            .ok_or_else(|| Error::NotFound(format!("list {list_id}")))
    }

    pub async fn delete_list(&self, list_id: &ListId, deadline: Deadline) -> Result<()> {
        deadline.check("delete_list")?;
        self.store.delete_list(list_id).await?;
        tracing::info!(list_id = %list_id, "List deleted");
        Ok(())
    }

    /// Add an item; a synced list goes back to `pending`.
    pub async fn add_item(
        &self,
        list_id: &ListId,
        input: NewListItem,
        deadline: Deadline,
    ) -> Result<ListItem> {
        deadline.check("add_item")?;
        let item = self.store.create_item(list_id, input).await?;
        self.note_local_change(list_id).await?;
        Ok(item)
    }

    pub async fn list_items(&self, list_id: &ListId, deadline: Deadline) -> Result<Vec<ListItem>> {
        self.get_list(list_id, deadline).await?;
        deadline
            .run("list_items", self.store.get_items(&[*list_id]))
            .await
    }

    pub async fn set_item_available(
        &self,
        item_id: &ItemId,
        available: bool,
        deadline: Deadline,
    ) -> Result<ListItem> {
        let item = self.get_item(item_id, deadline).await?;
        deadline.check("set_item_available")?;
        self.store.set_item_available(item_id, available).await?;
        self.note_local_change(&item.list_id).await?;
        Ok(ListItem { available, ..item })
    }

    async fn get_item(&self, item_id: &ItemId, deadline: Deadline) -> Result<ListItem> {
        deadline
            .run("get_item", self.store.get_item(item_id))
            .await?
            .ok_or_else(|| Error::NotFound(format!("item {item_id}")))
    }

    /// Record that an item was actually consumed, separately from menu draws.
    pub async fn record_item_use(&self, item_id: &ItemId, deadline: Deadline) -> Result<ListItem> {
        let item = self.get_item(item_id, deadline).await?;
        deadline.check("record_item_use")?;
        let now = Utc::now();
        self.store.update_item_stats(item_id, false, now).await?;
        tracing::info!(item_id = %item_id, "Item use recorded");
        Ok(ListItem {
            use_count: item.use_count.saturating_add(1),
            last_used: Some(now),
            ..item
        })
    }

    async fn note_local_change(&self, list_id: &ListId) -> Result<()> {
        self.machine()
            .apply_with(
                list_id,
                |status| Ok((status == SyncStatus::Synced).then_some(SyncAction::LocalChange)),
                &SyncUpdate::default(),
                Deadline::none(),
            )
            .await?;
        Ok(())
    }

    // Sync

    pub async fn apply_sync_action(
        &self,
        list_id: &ListId,
        action: SyncAction,
        update: &SyncUpdate,
        deadline: Deadline,
    ) -> Result<List> {
        self.machine().apply(list_id, action, update, deadline).await
    }

    pub async fn create_conflict(
        &self,
        input: NewConflict,
        deadline: Deadline,
    ) -> Result<SyncConflict> {
        self.resolver().create_conflict(input, deadline).await
    }

    pub async fn resolve_conflict(
        &self,
        conflict_id: &ConflictId,
        resolution: &str,
        mode: ResolutionMode,
        deadline: Deadline,
    ) -> Result<Resolution> {
        self.resolver()
            .resolve_conflict(conflict_id, resolution, mode, deadline)
            .await
    }

    pub async fn list_conflicts(
        &self,
        list_id: &ListId,
        open_only: bool,
        deadline: Deadline,
    ) -> Result<Vec<SyncConflict>> {
        if open_only {
            self.resolver().open_conflicts(list_id, deadline).await
        } else {
            self.resolver().list_conflicts(list_id, deadline).await
        }
    }

    pub async fn pull(&self, list_id: &ListId, deadline: Deadline) -> Result<PullReport> {
        self.reconciler().pull(list_id, deadline).await
    }

    pub async fn push(&self, list_id: &ListId, deadline: Deadline) -> Result<PushReport> {
        self.reconciler().push(list_id, deadline).await
    }

    // Menus

    pub async fn generate_menu(&self, params: &MenuParams, deadline: Deadline) -> Result<Menu> {
        let mut rng = StdRng::from_entropy();
        self.generate_menu_with_rng(params, &mut rng, deadline).await
    }

    pub async fn generate_menu_with_rng<R: Rng>(
        &self,
        params: &MenuParams,
        rng: &mut R,
        deadline: Deadline,
    ) -> Result<Menu> {
        MenuGenerator::new(&self.store)
            .generate_menu(params, rng, deadline)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::{ExternalItem, SyncAdapter};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn service() -> TribeService<MemoryStore> {
        TribeService::in_memory(TribeConfig::default())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn configure_sync_scenario() {
        let service = service();
        let list = service
            .create_list(NewList::named("Date nights"), Deadline::none())
            .await
            .unwrap();
        assert_eq!(list.sync.status, SyncStatus::None);

        let list = service
            .apply_sync_action(
                &list.id,
                SyncAction::ConfigureSync,
                &SyncUpdate::configure(SyncSource::ExternalMap, "abc"),
                Deadline::none(),
            )
            .await
            .unwrap();
        assert_eq!(list.sync.status, SyncStatus::Pending);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn conflict_scenario_returns_to_pending() {
        let service = service();
        let list = service
            .create_list(NewList::named("Cafes"), Deadline::none())
            .await
            .unwrap();
        service
            .apply_sync_action(
                &list.id,
                SyncAction::ConfigureSync,
                &SyncUpdate::configure(SyncSource::ExternalMap, "abc"),
                Deadline::none(),
            )
            .await
            .unwrap();

        let conflict = service
            .create_conflict(
                NewConflict {
                    list_id: list.id,
                    item_id: None,
                    conflict_type: "modified".into(),
                    local_data: json!({"name": "A"}),
                    remote_data: json!({"name": "B"}),
                },
                Deadline::none(),
            )
            .await
            .unwrap();
        assert_eq!(
            service.get_list(&list.id, Deadline::none()).await.unwrap().sync.status,
            SyncStatus::Conflict
        );

        let resolution = service
            .resolve_conflict(&conflict.id, "kept local", ResolutionMode::Manual, Deadline::none())
            .await
            .unwrap();
        assert_eq!(resolution.list_status, SyncStatus::Pending);
        assert!(service
            .list_conflicts(&list.id, true, Deadline::none())
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            service
                .list_conflicts(&list.id, false, Deadline::none())
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn local_change_moves_synced_list_to_pending() {
        let service = service();
        let list = service
            .create_list(NewList::named("Films"), Deadline::none())
            .await
            .unwrap();
        for action in [SyncAction::ConfigureSync, SyncAction::SyncComplete] {
            service
                .apply_sync_action(
                    &list.id,
                    action,
                    &SyncUpdate::configure(SyncSource::Manual, ""),
                    Deadline::none(),
                )
                .await
                .unwrap();
        }

        service
            .add_item(&list.id, NewListItem::named("Alien"), Deadline::none())
            .await
            .unwrap();
        let list = service.get_list(&list.id, Deadline::none()).await.unwrap();
        assert_eq!(list.sync.status, SyncStatus::Pending);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn record_item_use_leaves_menu_stats_alone() {
        let service = service();
        let list = service
            .create_list(NewList::named("Board games"), Deadline::none())
            .await
            .unwrap();
        let item = service
            .add_item(&list.id, NewListItem::named("Go"), Deadline::none())
            .await
            .unwrap();

        let used = service.record_item_use(&item.id, Deadline::none()).await.unwrap();
        assert_eq!(used.use_count, 1);
        assert_eq!(used.chosen_count, 0);

        let stored = service.store().get_item(&item.id).await.unwrap().unwrap();
        assert_eq!(stored.use_count, 1);
        assert_eq!(stored.chosen_count, 0);
        assert!(matches!(
            service.record_item_use(&ItemId::new(), Deadline::none()).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn pull_through_configured_import_dir() {
        let dir = tempfile::tempdir().unwrap();
        JsonFileAdapter::new(dir.path())
            .push(
                "weekend",
                &[ExternalItem {
                    name: "Lake".into(),
                    location: None,
                }],
            )
            .await
            .unwrap();
        let service = TribeService::in_memory(TribeConfig {
            import_dir: Some(dir.path().to_path_buf()),
            ..TribeConfig::default()
        });

        let list = service
            .create_list(NewList::named("Weekend"), Deadline::none())
            .await
            .unwrap();
        service
            .apply_sync_action(
                &list.id,
                SyncAction::ConfigureSync,
                &SyncUpdate::configure(SyncSource::Imported, "weekend"),
                Deadline::none(),
            )
            .await
            .unwrap();

        let report = service.pull(&list.id, Deadline::none()).await.unwrap();
        assert_eq!(report.fetched, 1);
        assert_eq!(report.conflicts.len(), 1);
        assert_eq!(report.status, SyncStatus::Conflict);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn file_backed_service_persists_lists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("tribe.db");

        {
            let service = TribeService::open_path(&path, TribeConfig::default())
                .await
                .unwrap();
            let list = service
                .create_list(NewList::named("Persisted"), Deadline::none())
                .await
                .unwrap();
            service
                .add_item(&list.id, NewListItem::named("One"), Deadline::none())
                .await
                .unwrap();
        }

        let service = TribeService::open_path(&path, TribeConfig::default())
            .await
            .unwrap();
        let lists = service.lists(Deadline::none()).await.unwrap();
        assert_eq!(lists.len(), 1);
        let menu = service
            .generate_menu(&MenuParams::new([lists[0].id], 1), Deadline::none())
            .await
            .unwrap();
        assert_eq!(menu.satisfied, 1);
    }
}
