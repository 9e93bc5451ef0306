//! Sync metadata repository implementation

use crate::error::Result;
use libsql::Connection;

const LAST_SYNC_AT_KEY: &str = "last_sync_at";

/// Trait for sync bookkeeping storage (async)
#[allow(async_fn_in_trait)]
pub trait SyncMetaRepository {
    /// Timestamp (unix ms) of the last successful sync pass
    async fn last_sync_at(&self) -> Result<Option<i64>>;

    /// Record the completion time of a successful sync pass
    async fn set_last_sync_at(&self, timestamp: i64) -> Result<()>;
}

/// libSQL implementation of `SyncMetaRepository`
pub struct LibSqlSyncMetaRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlSyncMetaRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl SyncMetaRepository for LibSqlSyncMetaRepository<'_> {
    async fn last_sync_at(&self) -> Result<Option<i64>> {
        let Some(value) = self.get_value(LAST_SYNC_AT_KEY).await? else {
            return Ok(None);
        };
        Ok(value.trim().parse().ok())
    }

    async fn set_last_sync_at(&self, timestamp: i64) -> Result<()> {
        self.set_value(LAST_SYNC_AT_KEY, &timestamp.to_string())
            .await
    }
}

impl LibSqlSyncMetaRepository<'_> {
    async fn get_value(&self, key: &str) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query("SELECT value FROM sync_meta WHERE key = ?", [key])
            .await?;

        if let Some(row) = rows.next().await? {
            let value: String = row.get(0)?;
            Ok(Some(value))
        } else {
            Ok(None)
        }
    }

    async fn set_value(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO sync_meta (key, value) VALUES (?, ?)",
                [key, value],
            )
            .await?;
        Ok(())
    }
}
