//! Database connection management

use crate::error::Result;
use libsql::{Builder, Connection};
use std::path::Path;

use super::migrations;

/// A migrated local libSQL connection
pub struct Database {
    conn: Connection,
}

const PRAGMAS: [(&str, bool); 4] = [
    ("PRAGMA journal_mode = WAL;", false),
    ("PRAGMA synchronous = NORMAL;", false),
    ("PRAGMA foreign_keys = ON;", true),
    ("PRAGMA busy_timeout = 5000;", false),
];

impl Database {
    /// Open (creating if needed) and migrate the database file at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let database = Self::build(&path_str).await?;
        tracing::debug!("Opened database at {path_str}");
        Ok(database)
    }

    pub async fn open_in_memory() -> Result<Self> {
        Self::build(":memory:").await
    }

    async fn build(location: &str) -> Result<Self> {
        let db = Builder::new_local(location).build().await?;
        let database = Self { conn: db.connect()? };
        database.configure().await?;
        database.migrate().await?;
        Ok(database)
    }

    /// Apply connection pragmas; only foreign keys are mandatory.
    async fn configure(&self) -> Result<()> {
        for (pragma, required) in PRAGMAS {
            let applied = self.conn.execute(pragma, ()).await;
            if required {
                applied?;
            }
        }
        Ok(())
    }

    async fn migrate(&self) -> Result<()> {
        migrations::run(&self.conn).await
    }

    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}
