//! Conflict history repository

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT

use libsql::Connection;

use super::connection::in_transaction;
use crate::error::Result;
use crate::models::{ConflictDetail, ConflictLogEntry, RecordId, Resolution};

/// Trait for persisted conflict history (async)
#[allow(async_fn_in_trait)]
pub trait ConflictRepository {
    /// Append the conflicts of one pass, all stamped with `resolved_at`
    async fn record(&self, conflicts: &[ConflictDetail], resolved_at: i64) -> Result<()>;

    /// Most recent conflicts first
    async fn list(&self, limit: usize) -> Result<Vec<ConflictLogEntry>>;

    /// Forget all recorded conflicts
    async fn clear(&self) -> Result<usize>;
}

/// libSQL implementation of `ConflictRepository`
pub struct LibSqlConflictRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlConflictRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl ConflictRepository for LibSqlConflictRepository<'_> {
    async fn record(&self, conflicts: &[ConflictDetail], resolved_at: i64) -> Result<()> {
        if conflicts.is_empty() {
            return Ok(());
        }

        in_transaction(self.conn, |conn| async move {
            for detail in conflicts {
                conn.execute(
                    "INSERT INTO sync_conflicts (
                        record_id,
                        resolved_to,
                        local_updated_at,
                        remote_updated_at,
                        resolved_at
                    ) VALUES (?, ?, ?, ?, ?)",
                    libsql::params![
                        detail.conflict.id.to_string(),
                        detail.conflict.resolved_to.as_str().to_string(),
                        detail.local_updated_at,
                        detail.remote_updated_at,
                        resolved_at
                    ],
                )
                .await?;
            }
            Ok(())
        })
        .await
    }

    async fn list(&self, limit: usize) -> Result<Vec<ConflictLogEntry>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, record_id, resolved_to, local_updated_at, remote_updated_at, resolved_at
                 FROM sync_conflicts
                 ORDER BY resolved_at DESC, id DESC
                 LIMIT ?",
                libsql::params![limit as i64],
            )
            .await?;

        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            let record_id: String = row.get(1)?;
            let resolved_to: String = row.get(2)?;
            entries.push(ConflictLogEntry {
                id: row.get(0)?,
                record_id: RecordId::from(record_id.as_str()),
                resolved_to: Resolution::from_db(&resolved_to),
                local_updated_at: row.get(3)?,
                remote_updated_at: row.get(4)?,
                resolved_at: row.get(5)?,
            });
        }
        Ok(entries)
    }

    async fn clear(&self) -> Result<usize> {
        let rows = self.conn.execute("DELETE FROM sync_conflicts", ()).await?;
        Ok(usize::try_from(rows).unwrap_or_default())
    }
}
