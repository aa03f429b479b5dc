//! SQLite connection pool for the relational metadata backend
//!
//! File databases run in WAL mode with a short busy timeout so request
//! handlers can read while an upload commits. Foreign keys are switched on
//! for every connection; `exif_data` rows depend on it to follow their
//! photo on delete.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use crate::StoreError;

/// Connections kept for a file-backed database
const FILE_POOL_SIZE: u32 = 5;

/// How long a writer waits on a locked database before giving up
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = include_str!("migrations/20260301_initial.sql");

/// Owned handle on the metadata database
pub struct DatabasePool {
    pool: SqlitePool,
}

impl DatabasePool {
    /// Opens (creating if needed) the database at `db_path` and applies the schema
    pub async fn new(db_path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::ConnectionFailed(format!("cannot create {}: {e}", parent.display()))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);
        let pool = Self::open(options, FILE_POOL_SIZE, &db_path.display().to_string()).await?;

        info!(path = %db_path.display(), "Metadata database ready");
        Ok(Self { pool })
    }

    /// Private in-memory database, used by tests
    ///
    /// Each SQLite connection to `:memory:` sees its own database, so the
    /// pool is pinned to a single connection.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;
        let pool = Self::open(options, 1, "memory").await?;

        debug!("In-memory metadata database ready");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn open(
        options: SqliteConnectOptions,
        max_connections: u32,
        label: &str,
    ) -> Result<SqlitePool, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options.foreign_keys(true))
            .await
            .map_err(|e| StoreError::ConnectionFailed(format!("{label}: {e}")))?;

        sqlx::raw_sql(SCHEMA)
            .execute(&pool)
            .await
            .map_err(|e| StoreError::MigrationFailed(e.to_string()))?;

        Ok(pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_database_is_created_with_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("photovault.db");

        let db = DatabasePool::new(&path).await.unwrap();

        assert!(path.exists());
        let fk: (i64,) = sqlx::query_as("PRAGMA foreign_keys")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(fk.0, 1);
    }

    #[tokio::test]
    async fn test_schema_is_reapplied_idempotently() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photovault.db");

        drop(DatabasePool::new(&path).await.unwrap());
        assert!(DatabasePool::new(&path).await.is_ok());
    }
}
