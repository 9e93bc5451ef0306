//! Record repository implementation

#![allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)] // SQLite uses i64 for counts and LIMIT

use std::collections::HashSet;

use libsql::{Connection, Row};

use super::connection::in_transaction;
use crate::error::Result;
use crate::models::{Record, RecordId, RecordPatch, RecordStatus};

const RECORD_COLUMNS: &str =
    "id, title, description, status, last_updated, is_synced, is_deleted";

/// Trait for record storage operations (async)
#[allow(async_fn_in_trait)]
pub trait RecordRepository {
    /// All non-deleted records, most recently updated first
    async fn get_all(&self) -> Result<Vec<Record>>;

    /// Every record not yet confirmed synced, tombstones included
    async fn get_unsynced(&self) -> Result<Vec<Record>>;

    /// Fetch one record by id, tombstones included
    async fn get(&self, id: &RecordId) -> Result<Option<Record>>;

    /// Ids of non-deleted records starting with `prefix`
    async fn find_by_prefix(&self, prefix: &str, limit: usize) -> Result<Vec<RecordId>>;

    /// Number of records waiting for a sync pass
    async fn count_unsynced(&self) -> Result<usize>;

    /// Merge a patch over the stored record (or insert it)
    async fn upsert(&self, patch: RecordPatch) -> Result<Option<Record>>;

    /// Tombstone a record; unknown ids are ignored
    async fn soft_delete(&self, id: &RecordId, timestamp: i64) -> Result<()>;

    /// Flag the listed records as synced; unknown ids are ignored
    async fn mark_synced(&self, ids: &[RecordId]) -> Result<usize>;

    /// Flag records as synced only if unchanged since the given version
    async fn confirm_synced(&self, versions: &[(RecordId, i64)]) -> Result<usize>;

    /// Store remote values as synced, skipping rows with a newer pending change,
    /// rows already holding the same synced value, and tombstones for rows
    /// that no longer exist locally
    async fn apply_remote(&self, records: &[Record]) -> Result<usize>;

    /// Physically remove tombstones whose deletion is confirmed synced
    async fn purge_synced_tombstones(&self) -> Result<usize>;

    /// Remove synced records whose id is not in `present`
    async fn remove_synced_absent(&self, present: &HashSet<RecordId>) -> Result<usize>;
}

/// libSQL implementation of `RecordRepository`
pub struct LibSqlRecordRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlRecordRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse a record from a database row
    fn parse_record(row: &Row) -> Result<Record> {
        let id: String = row.get(0)?;
        let status: String = row.get(3)?;
        Ok(Record {
            id: RecordId::from(id.as_str()),
            title: row.get(1)?,
            description: row.get(2)?,
            status: RecordStatus::from_db(&status),
            last_updated: row.get(4)?,
            is_synced: row.get::<i64>(5)? != 0,
            is_deleted: row.get::<i64>(6)? != 0,
        })
    }

    async fn query_records(&self, sql: &str) -> Result<Vec<Record>> {
        let mut rows = self.conn.query(sql, ()).await?;
        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(Self::parse_record(&row)?);
        }
        Ok(records)
    }

    async fn fetch(conn: &Connection, id: &RecordId) -> Result<Option<Record>> {
        let mut rows = conn
            .query(
                &format!("SELECT {RECORD_COLUMNS} FROM records WHERE id = ? LIMIT 1"),
                libsql::params![id.to_string()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_record(&row)?)),
            None => Ok(None),
        }
    }

    async fn write(conn: &Connection, record: &Record) -> Result<()> {
        conn.execute(
            &format!(
                "INSERT OR REPLACE INTO records ({RECORD_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?)"
            ),
            libsql::params![
                record.id.to_string(),
                record.title.clone(),
                record.description.clone(),
                record.status.as_str().to_string(),
                record.last_updated,
                i64::from(record.is_synced),
                i64::from(record.is_deleted)
            ],
        )
        .await?;
        Ok(())
    }
}

impl RecordRepository for LibSqlRecordRepository<'_> {
    async fn get_all(&self) -> Result<Vec<Record>> {
        self.query_records(&format!(
            "SELECT {RECORD_COLUMNS}
             FROM records
             WHERE is_deleted = 0
             ORDER BY last_updated DESC, id ASC"
        ))
        .await
    }

    async fn get_unsynced(&self) -> Result<Vec<Record>> {
        self.query_records(&format!(
            "SELECT {RECORD_COLUMNS}
             FROM records
             WHERE is_synced = 0
             ORDER BY last_updated ASC, id ASC"
        ))
        .await
    }

    async fn get(&self, id: &RecordId) -> Result<Option<Record>> {
        Self::fetch(self.conn, id).await
    }

    async fn find_by_prefix(&self, prefix: &str, limit: usize) -> Result<Vec<RecordId>> {
        // Case-sensitive prefix match
        let mut rows = self
            .conn
            .query(
                "SELECT id FROM records
                 WHERE is_deleted = 0 AND substr(id, 1, length(?1)) = ?1
                 ORDER BY last_updated DESC
                 LIMIT ?2",
                libsql::params![prefix.to_string(), limit as i64],
            )
            .await?;

        let mut ids = Vec::new();
        while let Some(row) = rows.next().await? {
            let id: String = row.get(0)?;
            ids.push(RecordId::from(id.as_str()));
        }
        Ok(ids)
    }

    async fn count_unsynced(&self) -> Result<usize> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM records WHERE is_synced = 0", ())
            .await?;
        let count: i64 = match rows.next().await? {
            Some(row) => row.get(0)?,
            None => 0,
        };
        Ok(usize::try_from(count).unwrap_or_default())
    }

    async fn upsert(&self, patch: RecordPatch) -> Result<Option<Record>> {
        in_transaction(self.conn, |conn| async move {
            let existing = Self::fetch(conn, patch.id()).await?;
            let Some(merged) = patch.apply(existing)? else {
                return Ok(None);
            };
            Self::write(conn, &merged).await?;
            Ok(Some(merged))
        })
        .await
    }

    async fn soft_delete(&self, id: &RecordId, timestamp: i64) -> Result<()> {
        let deleted = self
            .upsert(RecordPatch::Delete {
                id: id.clone(),
                last_updated: timestamp,
            })
            .await?;

        if deleted.is_none() {
            tracing::debug!("soft delete ignored for unknown record {id}");
        }
        Ok(())
    }

    async fn mark_synced(&self, ids: &[RecordId]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        in_transaction(self.conn, |conn| async move {
            let mut updated = 0;
            for id in ids {
                updated += conn
                    .execute(
                        "UPDATE records SET is_synced = 1 WHERE id = ?",
                        libsql::params![id.to_string()],
                    )
                    .await?;
            }
            Ok(updated as usize)
        })
        .await
    }

    async fn confirm_synced(&self, versions: &[(RecordId, i64)]) -> Result<usize> {
        if versions.is_empty() {
            return Ok(0);
        }

        in_transaction(self.conn, |conn| async move {
            let mut updated = 0;
            for (id, version) in versions {
                let rows = conn
                    .execute(
                        "UPDATE records SET is_synced = 1 WHERE id = ? AND last_updated = ?",
                        libsql::params![id.to_string(), *version],
                    )
                    .await?;
                if rows == 0 {
                    tracing::debug!("record {id} changed during sync; left pending");
                }
                updated += rows;
            }
            Ok(updated as usize)
        })
        .await
    }

    async fn apply_remote(&self, records: &[Record]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        in_transaction(self.conn, |conn| async move {
            let mut applied = 0;
            for record in records {
                let current = Self::fetch(conn, &record.id).await?;
                match &current {
                    None if record.is_deleted => {
                        tracing::debug!("remote tombstone for {} has no local row", record.id);
                        continue;
                    }
                    Some(current)
                        if !current.is_synced && current.last_updated > record.last_updated =>
                    {
                        tracing::debug!(
                            "kept newer pending change for {} over remote value",
                            record.id
                        );
                        continue;
                    }
                    Some(current) if current.is_synced && current.same_content(record) => continue,
                    _ => {}
                }

                if let Some(merged) = RecordPatch::Remote(record.clone()).apply(current)? {
                    Self::write(conn, &merged).await?;
                    applied += 1;
                }
            }
            Ok(applied)
        })
        .await
    }

    async fn purge_synced_tombstones(&self) -> Result<usize> {
        let rows = self
            .conn
            .execute(
                "DELETE FROM records WHERE is_deleted = 1 AND is_synced = 1",
                (),
            )
            .await?;
        Ok(rows as usize)
    }

    async fn remove_synced_absent(&self, present: &HashSet<RecordId>) -> Result<usize> {
        in_transaction(self.conn, |conn| async move {
            let mut rows = conn
                .query("SELECT id FROM records WHERE is_synced = 1", ())
                .await?;
            let mut stale = Vec::new();
            while let Some(row) = rows.next().await? {
                let id = RecordId::from(row.get::<String>(0)?.as_str());
                if !present.contains(&id) {
                    stale.push(id);
                }
            }
            drop(rows);

            for id in &stale {
                conn.execute(
                    "DELETE FROM records WHERE id = ? AND is_synced = 1",
                    libsql::params![id.to_string()],
                )
                .await?;
            }
            Ok(stale.len())
        })
        .await
    }
}
