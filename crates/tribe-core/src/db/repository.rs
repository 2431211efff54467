//! libSQL implementation of the storage traits

#![allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)] // SQLite integers are i64

use chrono::{DateTime, Utc};
use libsql::{params, Connection, Row};
use serde_json::Value;
use std::fmt::Display;
use std::str::FromStr;

use super::Database;
use crate::error::{Error, Result};
use crate::models::{
    ConflictId, ItemId, List, ListId, ListItem, Location, NewList, NewListItem, SyncConflict,
};
use crate::store::{Catalog, Storage};
use crate::sync::SyncConfig;

const LIST_COLUMNS: &str = "id, list_type, name, visibility, default_weight, max_items, \
     cooldown_days, sync_source, sync_external_id, sync_status, last_sync_at, sync_version, \
     created_at, updated_at, is_deleted";

const ITEM_COLUMNS: &str = "id, list_id, name, weight, available, seasonal, start_date, \
     end_date, cooldown_days, last_chosen, chosen_count, last_used, use_count, latitude, \
     longitude, address, created_at, updated_at";

const CONFLICT_COLUMNS: &str = "id, list_id, item_id, conflict_type, local_data, remote_data, \
     resolution, created_at, resolved_at";

/// [`Storage`] and [`Catalog`] backed by a libSQL database
pub struct LibSqlStore {
    db: Database,
}

impl LibSqlStore {
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    /// Open (and migrate) a database file
    pub async fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        Ok(Self::new(Database::open(path).await?))
    }

    pub async fn open_in_memory() -> Result<Self> {
        Ok(Self::new(Database::open_in_memory().await?))
    }

    const fn conn(&self) -> &Connection {
        self.db.connection()
    }

    async fn list_is_live(&self, id: &ListId) -> Result<bool> {
        let mut rows = self
            .conn()
            .query(
                "SELECT 1 FROM lists WHERE id = ? AND is_deleted = 0",
                params![id.as_str()],
            )
            .await?;
        Ok(rows.next().await?.is_some())
    }

    fn parse_list(row: &Row) -> Result<List> {
        let source: String = row.get(7)?;
        let status: String = row.get(9)?;
        Ok(List {
            id: parse_column(&row.get::<String>(0)?, "list id")?,
            list_type: parse_column(&row.get::<String>(1)?, "list type")?,
            name: row.get(2)?,
            visibility: parse_column(&row.get::<String>(3)?, "visibility")?,
            default_weight: row.get(4)?,
            max_items: row.get::<Option<i64>>(5)?.map(to_u32).transpose()?,
            cooldown_days: row.get::<Option<i64>>(6)?.map(to_u32).transpose()?,
            sync: SyncConfig {
                source: parse_column(&source, "sync source")?,
                external_id: row.get(8)?,
                status: parse_column(&status, "sync status")?,
                last_sync_at: row.get::<Option<i64>>(10)?.map(from_millis).transpose()?,
            },
            sync_version: row.get::<i64>(11)? as u64,
            created_at: from_millis(row.get(12)?)?,
            updated_at: from_millis(row.get(13)?)?,
            is_deleted: row.get::<i32>(14)? != 0,
        })
    }

    fn parse_item(row: &Row) -> Result<ListItem> {
        let latitude: Option<f64> = row.get(13)?;
        let longitude: Option<f64> = row.get(14)?;
        let address: Option<String> = row.get(15)?;
        let location = match (latitude, longitude, address) {
            (Some(latitude), Some(longitude), Some(address)) => Some(Location {
                latitude,
                longitude,
                address,
            }),
            (None, None, None) => None,
            _ => return Err(Error::CorruptedData("partial item location".into())),
        };

        Ok(ListItem {
            id: parse_column(&row.get::<String>(0)?, "item id")?,
            list_id: parse_column(&row.get::<String>(1)?, "list id")?,
            name: row.get(2)?,
            weight: row.get(3)?,
            available: row.get::<i32>(4)? != 0,
            seasonal: row.get::<i32>(5)? != 0,
            start_date: row.get::<Option<i64>>(6)?.map(from_millis).transpose()?,
            end_date: row.get::<Option<i64>>(7)?.map(from_millis).transpose()?,
            cooldown_days: row.get::<Option<i64>>(8)?.map(to_u32).transpose()?,
            last_chosen: row.get::<Option<i64>>(9)?.map(from_millis).transpose()?,
            chosen_count: to_u32(row.get(10)?)?,
            last_used: row.get::<Option<i64>>(11)?.map(from_millis).transpose()?,
            use_count: to_u32(row.get(12)?)?,
            location,
            created_at: from_millis(row.get(16)?)?,
            updated_at: from_millis(row.get(17)?)?,
        })
    }

    fn parse_conflict(row: &Row) -> Result<SyncConflict> {
        Ok(SyncConflict {
            id: parse_column(&row.get::<String>(0)?, "conflict id")?,
            list_id: parse_column(&row.get::<String>(1)?, "list id")?,
            item_id: row
                .get::<Option<String>>(2)?
                .map(|id| parse_column(&id, "item id"))
                .transpose()?,
            conflict_type: row.get(3)?,
            local_data: serde_json::from_str::<Value>(&row.get::<String>(4)?)?,
            remote_data: serde_json::from_str::<Value>(&row.get::<String>(5)?)?,
            resolution: row.get(6)?,
            created_at: from_millis(row.get(7)?)?,
            resolved_at: row.get::<Option<i64>>(8)?.map(from_millis).transpose()?,
        })
    }
}

fn parse_column<T>(raw: &str, column: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse()
        .map_err(|e| Error::CorruptedData(format!("invalid {column} '{raw}': {e}")))
}

fn from_millis(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| Error::CorruptedData(format!("timestamp out of range: {millis}")))
}

fn to_u32(value: i64) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::CorruptedData(format!("count out of range: {value}")))
}

fn millis(at: Option<DateTime<Utc>>) -> Option<i64> {
    at.map(|at| at.timestamp_millis())
}

impl Storage for LibSqlStore {
    async fn get_list(&self, id: &ListId) -> Result<Option<List>> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {LIST_COLUMNS} FROM lists WHERE id = ? AND is_deleted = 0"),
                params![id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_list(&row)?)),
            None => Ok(None),
        }
    }

    async fn get_items(&self, list_ids: &[ListId]) -> Result<Vec<ListItem>> {
        let mut items = Vec::new();
        for list_id in list_ids {
            let mut rows = self
                .conn()
                .query(
                    &format!(
                        "SELECT {ITEM_COLUMNS} FROM list_items WHERE list_id = ?
                         ORDER BY created_at, id"
                    ),
                    params![list_id.as_str()],
                )
                .await?;
            while let Some(row) = rows.next().await? {
                items.push(Self::parse_item(&row)?);
            }
        }
        Ok(items)
    }

    async fn update_sync_fields(
        &self,
        list_id: &ListId,
        expected_version: u64,
        sync: &SyncConfig,
    ) -> Result<bool> {
        let now = Utc::now().timestamp_millis();
        let rows = self
            .conn()
            .execute(
                "UPDATE lists
                 SET sync_source = ?, sync_external_id = ?, sync_status = ?, last_sync_at = ?,
                     sync_version = sync_version + 1, updated_at = ?
                 WHERE id = ? AND sync_version = ? AND is_deleted = 0",
                params![
                    sync.source.as_str(),
                    sync.external_id.as_str(),
                    sync.status.as_str(),
                    millis(sync.last_sync_at),
                    now,
                    list_id.as_str(),
                    expected_version as i64
                ],
            )
            .await?;

        if rows == 1 {
            return Ok(true);
        }
        if self.list_is_live(list_id).await? {
            Ok(false)
        } else {
            Err(Error::NotFound(list_id.to_string()))
        }
    }

    async fn update_item_stats(
        &self,
        item_id: &ItemId,
        chosen: bool,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let sql = if chosen {
            "UPDATE list_items
             SET chosen_count = chosen_count + 1, last_chosen = ?1, updated_at = ?1
             WHERE id = ?2"
        } else {
            "UPDATE list_items
             SET use_count = use_count + 1, last_used = ?1, updated_at = ?1
             WHERE id = ?2"
        };
        let rows = self
            .conn()
            .execute(sql, params![at.timestamp_millis(), item_id.as_str()])
            .await?;

        if rows == 0 {
            return Err(Error::NotFound(item_id.to_string()));
        }
        Ok(())
    }

    async fn create_conflict(&self, conflict: &SyncConflict) -> Result<()> {
        if !self.list_is_live(&conflict.list_id).await? {
            return Err(Error::NotFound(conflict.list_id.to_string()));
        }
        self.conn()
            .execute(
                &format!("INSERT INTO sync_conflicts ({CONFLICT_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"),
                params![
                    conflict.id.as_str(),
                    conflict.list_id.as_str(),
                    conflict.item_id.map(|id| id.as_str()),
                    conflict.conflict_type.as_str(),
                    serde_json::to_string(&conflict.local_data)?,
                    serde_json::to_string(&conflict.remote_data)?,
                    conflict.resolution.clone(),
                    conflict.created_at.timestamp_millis(),
                    millis(conflict.resolved_at)
                ],
            )
            .await?;
        Ok(())
    }

    async fn get_conflict(&self, id: &ConflictId) -> Result<Option<SyncConflict>> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {CONFLICT_COLUMNS} FROM sync_conflicts WHERE id = ?"),
                params![id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_conflict(&row)?)),
            None => Ok(None),
        }
    }

    async fn get_conflicts(&self, list_id: &ListId) -> Result<Vec<SyncConflict>> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {CONFLICT_COLUMNS} FROM sync_conflicts WHERE list_id = ? ORDER BY seq"
                ),
                params![list_id.as_str()],
            )
            .await?;

        let mut conflicts = Vec::new();
        while let Some(row) = rows.next().await? {
            conflicts.push(Self::parse_conflict(&row)?);
        }
        Ok(conflicts)
    }

    async fn mark_conflict_resolved(
        &self,
        id: &ConflictId,
        resolution: &str,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let rows = self
            .conn()
            .execute(
                "UPDATE sync_conflicts SET resolution = ?, resolved_at = ?
                 WHERE id = ? AND resolved_at IS NULL",
                params![resolution, at.timestamp_millis(), id.as_str()],
            )
            .await?;
        Ok(rows == 1)
    }
}

impl Catalog for LibSqlStore {
    async fn create_list(&self, input: NewList) -> Result<List> {
        let list = List::new(input)?;
        self.conn()
            .execute(
                &format!(
                    "INSERT INTO lists ({LIST_COLUMNS})
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
                ),
                params![
                    list.id.as_str(),
                    list.list_type.as_str(),
                    list.name.as_str(),
                    list.visibility.as_str(),
                    list.default_weight,
                    list.max_items.map(i64::from),
                    list.cooldown_days.map(i64::from),
                    list.sync.source.as_str(),
                    list.sync.external_id.as_str(),
                    list.sync.status.as_str(),
                    millis(list.sync.last_sync_at),
                    list.sync_version as i64,
                    list.created_at.timestamp_millis(),
                    list.updated_at.timestamp_millis(),
                    i32::from(list.is_deleted)
                ],
            )
            .await?;
        Ok(list)
    }

    async fn lists(&self) -> Result<Vec<List>> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {LIST_COLUMNS} FROM lists WHERE is_deleted = 0 ORDER BY created_at, id"
                ),
                (),
            )
            .await?;

        let mut lists = Vec::new();
        while let Some(row) = rows.next().await? {
            lists.push(Self::parse_list(&row)?);
        }
        Ok(lists)
    }

    async fn delete_list(&self, id: &ListId) -> Result<()> {
        let now = Utc::now().timestamp_millis();
        let rows = self
            .conn()
            .execute(
                "UPDATE lists SET is_deleted = 1, updated_at = ? WHERE id = ? AND is_deleted = 0",
                params![now, id.as_str()],
            )
            .await?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn create_item(&self, list_id: &ListId, input: NewListItem) -> Result<ListItem> {
        if !self.list_is_live(list_id).await? {
            return Err(Error::NotFound(list_id.to_string()));
        }
        let item = ListItem::new(*list_id, input)?;
        let location = item.location.as_ref();
        self.conn()
            .execute(
                &format!(
                    "INSERT INTO list_items ({ITEM_COLUMNS})
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
                ),
                params![
                    item.id.as_str(),
                    item.list_id.as_str(),
                    item.name.as_str(),
                    item.weight,
                    i32::from(item.available),
                    i32::from(item.seasonal),
                    millis(item.start_date),
                    millis(item.end_date),
                    item.cooldown_days.map(i64::from),
                    millis(item.last_chosen),
                    i64::from(item.chosen_count),
                    millis(item.last_used),
                    i64::from(item.use_count),
                    location.map(|l| l.latitude),
                    location.map(|l| l.longitude),
                    location.map(|l| l.address.clone()),
                    item.created_at.timestamp_millis(),
                    item.updated_at.timestamp_millis()
                ],
            )
            .await?;
        Ok(item)
    }

    async fn get_item(&self, id: &ItemId) -> Result<Option<ListItem>> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {ITEM_COLUMNS} FROM list_items WHERE id = ?"),
                params![id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_item(&row)?)),
            None => Ok(None),
        }
    }

    async fn set_item_available(&self, id: &ItemId, available: bool) -> Result<()> {
        let now = Utc::now().timestamp_millis();
        let rows = self
            .conn()
            .execute(
                "UPDATE list_items SET available = ?, updated_at = ? WHERE id = ?",
                params![i32::from(available), now, id.as_str()],
            )
            .await?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::{SyncSource, SyncStatus};
    use chrono::Duration;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    async fn setup() -> LibSqlStore {
        LibSqlStore::open_in_memory().await.unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_round_trip() {
        let store = setup().await;
        let mut input = NewList::named("Weekend trips");
        input.max_items = Some(3);
        input.cooldown_days = Some(14);
        let created = store.create_list(input).await.unwrap();

        let fetched = store.get_list(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Weekend trips");
        assert_eq!(fetched.max_items, Some(3));
        assert_eq!(fetched.cooldown_days, Some(14));
        assert_eq!(fetched.sync, SyncConfig::default());
        assert_eq!(
            fetched.created_at.timestamp_millis(),
            created.created_at.timestamp_millis()
        );
        assert_eq!(store.lists().await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_item_with_location_and_season() {
        let store = setup().await;
        let list = store.create_list(NewList::named("Hikes")).await.unwrap();
        let start = Utc::now();
        let mut input = NewListItem::named("Ridge trail")
            .with_weight(2.5)
            .with_season(start, start + Duration::days(30));
        input.location = Some(Location {
            latitude: 46.5,
            longitude: 7.9,
            address: "Grindelwald".into(),
        });
        let item = store.create_item(&list.id, input).await.unwrap();

        let items = store.get_items(&[list.id]).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, item.id);
        assert_eq!(items[0].weight, Some(2.5));
        assert!(items[0].seasonal);
        assert_eq!(items[0].location, item.location);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_sync_fields_compare_and_swap() {
        let store = setup().await;
        let list = store.create_list(NewList::named("Maps")).await.unwrap();
        let pending = SyncConfig {
            source: SyncSource::ExternalMap,
            external_id: "abc".into(),
            status: SyncStatus::Pending,
            last_sync_at: None,
        };

        assert!(store.update_sync_fields(&list.id, 0, &pending).await.unwrap());
        assert!(!store.update_sync_fields(&list.id, 0, &pending).await.unwrap());

        let stored = store.get_list(&list.id).await.unwrap().unwrap();
        assert_eq!(stored.sync, pending);
        assert_eq!(stored.sync_version, 1);

        store.delete_list(&list.id).await.unwrap();
        assert!(matches!(
            store.update_sync_fields(&list.id, 1, &pending).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_item_stats_increment() {
        let store = setup().await;
        let list = store.create_list(NewList::named("Books")).await.unwrap();
        let item = store
            .create_item(&list.id, NewListItem::named("Dune"))
            .await
            .unwrap();
        let at = Utc::now();

        store.update_item_stats(&item.id, true, at).await.unwrap();
        store.update_item_stats(&item.id, true, at).await.unwrap();
        store.update_item_stats(&item.id, false, at).await.unwrap();

        let item = store.get_item(&item.id).await.unwrap().unwrap();
        assert_eq!(item.chosen_count, 2);
        assert_eq!(item.use_count, 1);
        assert_eq!(
            item.last_chosen.map(|t| t.timestamp_millis()),
            Some(at.timestamp_millis())
        );
        assert!(matches!(
            store.update_item_stats(&ItemId::new(), true, at).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_conflicts_in_creation_order() {
        let store = setup().await;
        let list = store.create_list(NewList::named("Cafes")).await.unwrap();
        let make = |conflict_type: &str| {
            SyncConflict::new(crate::models::NewConflict {
                list_id: list.id,
                item_id: None,
                conflict_type: conflict_type.into(),
                local_data: json!({"name": "a"}),
                remote_data: json!({"name": "b"}),
            })
            .unwrap()
        };
        let first = make("added");
        let second = make("removed");
        store.create_conflict(&first).await.unwrap();
        store.create_conflict(&second).await.unwrap();

        let at = Utc::now();
        assert!(store.mark_conflict_resolved(&first.id, "ok", at).await.unwrap());
        assert!(!store.mark_conflict_resolved(&first.id, "again", at).await.unwrap());

        let conflicts = store.get_conflicts(&list.id).await.unwrap();
        assert_eq!(
            conflicts.iter().map(|c| c.id).collect::<Vec<_>>(),
            vec![first.id, second.id]
        );
        assert_eq!(conflicts[0].resolution.as_deref(), Some("ok"));
        assert!(conflicts[1].is_open());
        assert_eq!(conflicts[1].remote_data, json!({"name": "b"}));
    }
}
