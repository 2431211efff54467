//! Database migrations

use crate::error::Result;
use libsql::Connection;

/// Current schema version
const CURRENT_VERSION: i32 = 2;

/// Statements of each schema version, oldest first
const MIGRATIONS: [(i32, &[&str]); 2] = [(1, &V1), (2, &V2)];

/// Bring the schema up to `CURRENT_VERSION`
pub async fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn).await?;
    for (target, statements) in MIGRATIONS {
        if version < target {
            apply(conn, target, statements).await?;
        }
    }
    Ok(())
}

async fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let mut rows = conn
        .query(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            libsql::params![name],
        )
        .await?;
    Ok(match rows.next().await? {
        Some(row) => row.get::<i64>(0)? > 0,
        None => false,
    })
}

/// Highest applied version; 0 for a fresh database
async fn get_version(conn: &Connection) -> Result<i32> {
    if !table_exists(conn, "schema_version").await? {
        return Ok(0);
    }

    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM schema_version", ())
        .await?;
    match rows.next().await? {
        Some(row) => Ok(row.get(0)?),
        None => Ok(0),
    }
}

/// Version 1: lists and their items
const V1: [&str; 7] = [
    "CREATE TABLE IF NOT EXISTS schema_version (
        version INTEGER PRIMARY KEY
    )",
    "CREATE TABLE IF NOT EXISTS lists (
        id TEXT PRIMARY KEY,
        list_type TEXT NOT NULL,
        name TEXT NOT NULL,
        visibility TEXT NOT NULL,
        default_weight REAL NOT NULL CHECK (default_weight > 0),
        max_items INTEGER CHECK (max_items IS NULL OR max_items > 0),
        cooldown_days INTEGER CHECK (cooldown_days IS NULL OR cooldown_days >= 0),
        sync_source TEXT NOT NULL DEFAULT 'none',
        sync_external_id TEXT NOT NULL DEFAULT '',
        sync_status TEXT NOT NULL DEFAULT 'none',
        last_sync_at INTEGER,
        sync_version INTEGER NOT NULL DEFAULT 0,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        is_deleted INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE INDEX IF NOT EXISTS idx_lists_deleted ON lists(is_deleted)",
    "CREATE TABLE IF NOT EXISTS list_items (
        id TEXT PRIMARY KEY,
        list_id TEXT NOT NULL REFERENCES lists(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        weight REAL CHECK (weight IS NULL OR weight > 0),
        available INTEGER NOT NULL DEFAULT 1,
        seasonal INTEGER NOT NULL DEFAULT 0,
        start_date INTEGER,
        end_date INTEGER,
        cooldown_days INTEGER,
        last_chosen INTEGER,
        chosen_count INTEGER NOT NULL DEFAULT 0,
        last_used INTEGER,
        use_count INTEGER NOT NULL DEFAULT 0,
        latitude REAL,
        longitude REAL,
        address TEXT,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        CHECK (
            (latitude IS NULL AND longitude IS NULL AND address IS NULL)
            OR (latitude IS NOT NULL AND longitude IS NOT NULL AND address IS NOT NULL)
        )
    )",
    "CREATE INDEX IF NOT EXISTS idx_list_items_list ON list_items(list_id, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_list_items_last_chosen ON list_items(last_chosen)",
    "INSERT INTO schema_version (version) VALUES (1)",
];

/// Version 2: sync conflict records
const V2: [&str; 4] = [
    "CREATE TABLE IF NOT EXISTS sync_conflicts (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        list_id TEXT NOT NULL REFERENCES lists(id) ON DELETE CASCADE,
        item_id TEXT,
        conflict_type TEXT NOT NULL,
        local_data TEXT NOT NULL,
        remote_data TEXT NOT NULL,
        resolution TEXT,
        created_at INTEGER NOT NULL,
        resolved_at INTEGER
    )",
    "CREATE INDEX IF NOT EXISTS idx_sync_conflicts_list ON sync_conflicts(list_id, seq)",
    "CREATE INDEX IF NOT EXISTS idx_sync_conflicts_open ON sync_conflicts(list_id) WHERE resolved_at IS NULL",
    "INSERT INTO schema_version (version) VALUES (2)",
];

/// Run one version's statements atomically
async fn apply(conn: &Connection, version: i32, statements: &[&str]) -> Result<()> {
    conn.execute("BEGIN TRANSACTION", ()).await?;

    let outcome = async {
        for &stmt in statements {
            conn.execute(stmt, ()).await?;
        }
        conn.execute("COMMIT", ()).await
    }
    .await;

    if let Err(error) = outcome {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(error.into());
    }

    tracing::info!("Migrated database to version {version} of {CURRENT_VERSION}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use libsql::Builder;

    async fn setup() -> Connection {
        let db = Builder::new_local(":memory:").build().await.unwrap();
        db.connect().unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_migrations() {
        let conn = setup().await;
        run(&conn).await.unwrap();

        assert_eq!(get_version(&conn).await.unwrap(), CURRENT_VERSION);
        for table in ["lists", "list_items", "sync_conflicts"] {
            assert!(table_exists(&conn, table).await.unwrap(), "{table} missing");
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_migrations_idempotent() {
        let conn = setup().await;
        run(&conn).await.unwrap();
        run(&conn).await.unwrap();

        assert_eq!(get_version(&conn).await.unwrap(), CURRENT_VERSION);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_partial_location_is_rejected() {
        let conn = setup().await;
        run(&conn).await.unwrap();
        conn.execute(
            "INSERT INTO lists (id, list_type, name, visibility, default_weight, created_at, updated_at)
             VALUES ('l1', 'general', 'L', 'private', 1.0, 0, 0)",
            (),
        )
        .await
        .unwrap();

        let result = conn
            .execute(
                "INSERT INTO list_items (id, list_id, name, latitude, created_at, updated_at)
                 VALUES ('i1', 'l1', 'Half', 1.0, 0, 0)",
                (),
            )
            .await;
        assert!(result.is_err());
    }
}
