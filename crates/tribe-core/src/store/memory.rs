//! In-memory store, used for tests and embedding without a database.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::{Catalog, Storage};
use crate::error::{Error, Result};
use crate::models::{
    ConflictId, ItemId, List, ListId, ListItem, NewList, NewListItem, SyncConflict,
};
use crate::sync::SyncConfig;

#[derive(Debug, Default)]
struct State {
    lists: Vec<List>,
    items: Vec<ListItem>,
    conflicts: Vec<SyncConflict>,
}

/// Thread-safe in-memory implementation of [`Storage`] and [`Catalog`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| Error::Database("memory store lock poisoned".to_string()))
    }
}

impl State {
    fn live_list(&self, id: &ListId) -> Option<&List> {
        self.lists.iter().find(|list| list.id == *id && !list.is_deleted)
    }
}

impl Storage for MemoryStore {
    async fn get_list(&self, id: &ListId) -> Result<Option<List>> {
        Ok(self.state()?.live_list(id).cloned())
    }

    async fn get_items(&self, list_ids: &[ListId]) -> Result<Vec<ListItem>> {
        let state = self.state()?;
        Ok(state
            .items
            .iter()
            .filter(|item| list_ids.contains(&item.list_id))
            .cloned()
            .collect())
    }

    async fn update_sync_fields(
        &self,
        list_id: &ListId,
        expected_version: u64,
        sync: &SyncConfig,
    ) -> Result<bool> {
        let mut state = self.state()?;
        let Some(list) = state
            .lists
            .iter_mut()
            .find(|list| list.id == *list_id && !list.is_deleted)
        else {
            return Err(Error::NotFound(list_id.to_string()));
        };
        if list.sync_version != expected_version {
            return Ok(false);
        }
        list.sync = sync.clone();
        list.sync_version += 1;
        list.updated_at = Utc::now();
        Ok(true)
    }

    async fn update_item_stats(
        &self,
        item_id: &ItemId,
        chosen: bool,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let mut state = self.state()?;
        let item = state
            .items
            .iter_mut()
            .find(|item| item.id == *item_id)
            .ok_or_else(|| Error::NotFound(item_id.to_string()))?;
        if chosen {
            item.chosen_count = item.chosen_count.saturating_add(1);
            item.last_chosen = Some(at);
        } else {
            item.use_count = item.use_count.saturating_add(1);
            item.last_used = Some(at);
        }
        item.updated_at = at;
        Ok(())
    }

    async fn create_conflict(&self, conflict: &SyncConflict) -> Result<()> {
        let mut state = self.state()?;
        if state.live_list(&conflict.list_id).is_none() {
            return Err(Error::NotFound(conflict.list_id.to_string()));
        }
        state.conflicts.push(conflict.clone());
        Ok(())
    }

    async fn get_conflict(&self, id: &ConflictId) -> Result<Option<SyncConflict>> {
        let state = self.state()?;
        Ok(state.conflicts.iter().find(|c| c.id == *id).cloned())
    }

    async fn get_conflicts(&self, list_id: &ListId) -> Result<Vec<SyncConflict>> {
        let state = self.state()?;
        Ok(state
            .conflicts
            .iter()
            .filter(|c| c.list_id == *list_id)
            .cloned()
            .collect())
    }

    async fn mark_conflict_resolved(
        &self,
        id: &ConflictId,
        resolution: &str,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut state = self.state()?;
        match state.conflicts.iter_mut().find(|c| c.id == *id) {
            Some(conflict) if conflict.resolved_at.is_none() => {
                conflict.resolution = Some(resolution.to_string());
                conflict.resolved_at = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

impl Catalog for MemoryStore {
    async fn create_list(&self, input: NewList) -> Result<List> {
        let list = List::new(input)?;
        self.state()?.lists.push(list.clone());
        Ok(list)
    }

    async fn lists(&self) -> Result<Vec<List>> {
        let state = self.state()?;
        Ok(state
            .lists
            .iter()
            .filter(|list| !list.is_deleted)
            .cloned()
            .collect())
    }

    async fn delete_list(&self, id: &ListId) -> Result<()> {
        let mut state = self.state()?;
        let list = state
            .lists
            .iter_mut()
            .find(|list| list.id == *id && !list.is_deleted)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        list.is_deleted = true;
        list.updated_at = Utc::now();
        Ok(())
    }

    async fn create_item(&self, list_id: &ListId, input: NewListItem) -> Result<ListItem> {
        let mut state = self.state()?;
        if state.live_list(list_id).is_none() {
            return Err(Error::NotFound(list_id.to_string()));
        }
        let item = ListItem::new(*list_id, input)?;
        state.items.push(item.clone());
        Ok(item)
    }

    async fn get_item(&self, id: &ItemId) -> Result<Option<ListItem>> {
        let state = self.state()?;
        Ok(state.items.iter().find(|item| item.id == *id).cloned())
    }

    async fn set_item_available(&self, id: &ItemId, available: bool) -> Result<()> {
        let mut state = self.state()?;
        let item = state
            .items
            .iter_mut()
            .find(|item| item.id == *id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        item.available = available;
        item.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::{SyncSource, SyncStatus};

    #[tokio::test(flavor = "multi_thread")]
    async fn test_sync_update_is_compare_and_swap() {
        let store = MemoryStore::new();
        let list = store.create_list(NewList::named("Parks")).await.unwrap();
        let pending = SyncConfig {
            source: SyncSource::Manual,
            external_id: String::new(),
            status: SyncStatus::Pending,
            last_sync_at: None,
        };

        assert!(store.update_sync_fields(&list.id, 0, &pending).await.unwrap());
        assert!(!store.update_sync_fields(&list.id, 0, &pending).await.unwrap());

        let stored = store.get_list(&list.id).await.unwrap().unwrap();
        assert_eq!(stored.sync_version, 1);
        assert_eq!(stored.sync.status, SyncStatus::Pending);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_deleted_list_is_hidden() {
        let store = MemoryStore::new();
        let list = store.create_list(NewList::named("Old")).await.unwrap();
        store.delete_list(&list.id).await.unwrap();

        assert!(store.get_list(&list.id).await.unwrap().is_none());
        assert!(store.lists().await.unwrap().is_empty());
        assert!(matches!(
            store.create_item(&list.id, NewListItem::named("x")).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_item_stats_are_independent() {
        let store = MemoryStore::new();
        let list = store.create_list(NewList::named("Games")).await.unwrap();
        let item = store
            .create_item(&list.id, NewListItem::named("Chess"))
            .await
            .unwrap();
        let now = Utc::now();

        store.update_item_stats(&item.id, true, now).await.unwrap();
        store.update_item_stats(&item.id, false, now).await.unwrap();
        store.update_item_stats(&item.id, false, now).await.unwrap();

        let item = store.get_item(&item.id).await.unwrap().unwrap();
        assert_eq!(item.chosen_count, 1);
        assert_eq!(item.use_count, 2);
        assert_eq!(item.last_chosen, Some(now));
        assert_eq!(item.last_used, Some(now));
    }
}
