//! Storage capabilities consumed by the core.
//!
//! The core never talks to a database directly: it asks a [`Storage`] for
//! rows and requests single-row changes. [`Catalog`] adds the list and item
//! CRUD surface used by front ends. Both are implemented by
//! [`crate::db::LibSqlStore`] and by the in-memory [`MemoryStore`].

mod memory;

pub use memory::MemoryStore;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{
    ConflictId, ItemId, List, ListId, ListItem, NewList, NewListItem, SyncConflict,
};
use crate::sync::SyncConfig;

/// Operations the sync and menu engines need from storage.
///
/// Every call is atomic for the single row it touches.
#[allow(async_fn_in_trait)]
pub trait Storage {
    /// Fetch a list; soft-deleted lists are reported as `None`
    async fn get_list(&self, id: &ListId) -> Result<Option<List>>;

    /// All items of the given lists, oldest first
    async fn get_items(&self, list_ids: &[ListId]) -> Result<Vec<ListItem>>;

    /// Replace the sync fields if the list is still at `expected_version`.
    ///
    /// Returns `false` when another writer got there first.
    async fn update_sync_fields(
        &self,
        list_id: &ListId,
        expected_version: u64,
        sync: &SyncConfig,
    ) -> Result<bool>;

    /// Atomically bump selection (`chosen`) or consumption statistics
    async fn update_item_stats(&self, item_id: &ItemId, chosen: bool, at: DateTime<Utc>)
        -> Result<()>;

    async fn create_conflict(&self, conflict: &SyncConflict) -> Result<()>;

    async fn get_conflict(&self, id: &ConflictId) -> Result<Option<SyncConflict>>;

    /// All conflicts of a list in creation order, resolved and open
    async fn get_conflicts(&self, list_id: &ListId) -> Result<Vec<SyncConflict>>;

    /// Resolve a conflict if it is still open; returns `false` otherwise
    async fn mark_conflict_resolved(
        &self,
        id: &ConflictId,
        resolution: &str,
        at: DateTime<Utc>,
    ) -> Result<bool>;
}

/// List and item CRUD
#[allow(async_fn_in_trait)]
pub trait Catalog {
    async fn create_list(&self, input: NewList) -> Result<List>;

    /// Non-deleted lists, oldest first
    async fn lists(&self) -> Result<Vec<List>>;

    /// Soft delete a list
    async fn delete_list(&self, id: &ListId) -> Result<()>;

    async fn create_item(&self, list_id: &ListId, input: NewListItem) -> Result<ListItem>;

    async fn get_item(&self, id: &ItemId) -> Result<Option<ListItem>>;

    async fn set_item_available(&self, id: &ItemId, available: bool) -> Result<()>;
}
