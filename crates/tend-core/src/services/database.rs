//! Shared database service wrapper used by the sync engine and record service.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::db::{
    ConflictRepository, Database, LibSqlConflictRepository, LibSqlRecordRepository,
    LibSqlSyncMetaRepository, RecordRepository, SyncMetaRepository,
};
use crate::models::{ConflictDetail, ConflictLogEntry, Record, RecordId, RecordPatch, RecordStatus};
use crate::util::next_mutation_timestamp;
use crate::Result;

/// Thread-safe service for DB and repository operations.
///
/// Every call takes the database lock for its own duration only, so a sync
/// pass waiting on the remote never blocks local edits.
#[derive(Clone)]
pub struct DatabaseService {
    db: Arc<Mutex<Database>>,
    db_path: Option<PathBuf>,
}

impl DatabaseService {
    /// Open a database service at the given filesystem path.
    pub async fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        tracing::debug!("Opening local store at {}", db_path.display());
        let db = Database::open(&db_path).await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: Some(db_path),
        })
    }

    /// Open an in-memory database service (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: None,
        })
    }

    /// Backing file, if any
    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Non-deleted records, most recently updated first.
    pub async fn list_records(&self) -> Result<Vec<Record>> {
        let db = self.db.lock().await;
        LibSqlRecordRepository::new(db.connection()).get_all().await
    }

    /// Fetch a record by id, tombstones included.
    pub async fn get_record(&self, id: &RecordId) -> Result<Option<Record>> {
        let db = self.db.lock().await;
        LibSqlRecordRepository::new(db.connection()).get(id).await
    }

    /// Ids of live records starting with `prefix`.
    pub async fn find_by_prefix(&self, prefix: &str, limit: usize) -> Result<Vec<RecordId>> {
        let db = self.db.lock().await;
        LibSqlRecordRepository::new(db.connection())
            .find_by_prefix(prefix, limit)
            .await
    }

    pub async fn unsynced_records(&self) -> Result<Vec<Record>> {
        let db = self.db.lock().await;
        LibSqlRecordRepository::new(db.connection())
            .get_unsynced()
            .await
    }

    pub async fn count_unsynced(&self) -> Result<usize> {
        let db = self.db.lock().await;
        LibSqlRecordRepository::new(db.connection())
            .count_unsynced()
            .await
    }

    /// Insert a new unsynced record.
    pub async fn create_record(&self, title: &str, description: &str) -> Result<Record> {
        let db = self.db.lock().await;
        let repo = LibSqlRecordRepository::new(db.connection());
        let patch = RecordPatch::Create {
            id: RecordId::new(),
            title: title.to_string(),
            description: description.to_string(),
            last_updated: next_mutation_timestamp(None),
        };
        repo.upsert(patch)
            .await?
            .ok_or_else(|| crate::Error::Database("create did not store a record".into()))
    }

    /// Replace title and description of a live record.
    pub async fn edit_record(
        &self,
        id: &RecordId,
        title: &str,
        description: &str,
    ) -> Result<Record> {
        let db = self.db.lock().await;
        let repo = LibSqlRecordRepository::new(db.connection());
        let current = Self::live(&repo, id).await?;
        let patch = RecordPatch::Edit {
            id: id.clone(),
            title: title.to_string(),
            description: description.to_string(),
            last_updated: next_mutation_timestamp(Some(current.last_updated)),
        };
        repo.upsert(patch)
            .await?
            .ok_or_else(|| crate::Error::NotFound(id.to_string()))
    }

    /// Set the status of a live record.
    pub async fn set_status(&self, id: &RecordId, status: RecordStatus) -> Result<Record> {
        let db = self.db.lock().await;
        let repo = LibSqlRecordRepository::new(db.connection());
        let current = Self::live(&repo, id).await?;
        let patch = RecordPatch::Status {
            id: id.clone(),
            status,
            last_updated: next_mutation_timestamp(Some(current.last_updated)),
        };
        repo.upsert(patch)
            .await?
            .ok_or_else(|| crate::Error::NotFound(id.to_string()))
    }

    /// Tombstone a record. Returns `false` when the id is unknown.
    pub async fn delete_record(&self, id: &RecordId) -> Result<bool> {
        let db = self.db.lock().await;
        let repo = LibSqlRecordRepository::new(db.connection());
        let Some(current) = repo.get(id).await? else {
            return Ok(false);
        };
        if current.is_deleted {
            return Ok(true);
        }
        repo.soft_delete(id, next_mutation_timestamp(Some(current.last_updated)))
            .await?;
        Ok(true)
    }

    async fn live(repo: &LibSqlRecordRepository<'_>, id: &RecordId) -> Result<Record> {
        repo.get(id)
            .await?
            .filter(|record| !record.is_deleted)
            .ok_or_else(|| crate::Error::NotFound(id.to_string()))
    }

    /// Store remote values as synced unless a newer local change is pending.
    pub async fn apply_remote(&self, records: &[Record]) -> Result<usize> {
        let db = self.db.lock().await;
        LibSqlRecordRepository::new(db.connection())
            .apply_remote(records)
            .await
    }

    /// Mark records synced if they still carry the version that was pushed.
    pub async fn confirm_synced(&self, versions: &[(RecordId, i64)]) -> Result<usize> {
        let db = self.db.lock().await;
        LibSqlRecordRepository::new(db.connection())
            .confirm_synced(versions)
            .await
    }

    pub async fn purge_synced_tombstones(&self) -> Result<usize> {
        let db = self.db.lock().await;
        LibSqlRecordRepository::new(db.connection())
            .purge_synced_tombstones()
            .await
    }

    pub async fn remove_synced_absent(&self, present: &HashSet<RecordId>) -> Result<usize> {
        let db = self.db.lock().await;
        LibSqlRecordRepository::new(db.connection())
            .remove_synced_absent(present)
            .await
    }

    /// Append resolved conflicts to the history.
    pub async fn record_conflicts(
        &self,
        conflicts: &[ConflictDetail],
        resolved_at: i64,
    ) -> Result<()> {
        let db = self.db.lock().await;
        LibSqlConflictRepository::new(db.connection())
            .record(conflicts, resolved_at)
            .await
    }

    /// List recently resolved sync conflicts.
    pub async fn list_conflicts(&self, limit: usize) -> Result<Vec<ConflictLogEntry>> {
        let db = self.db.lock().await;
        LibSqlConflictRepository::new(db.connection())
            .list(limit)
            .await
    }

    pub async fn clear_conflicts(&self) -> Result<usize> {
        let db = self.db.lock().await;
        LibSqlConflictRepository::new(db.connection()).clear().await
    }

    pub async fn last_sync_at(&self) -> Result<Option<i64>> {
        let db = self.db.lock().await;
        LibSqlSyncMetaRepository::new(db.connection())
            .last_sync_at()
            .await
    }

    pub async fn set_last_sync_at(&self, timestamp: i64) -> Result<()> {
        let db = self.db.lock().await;
        LibSqlSyncMetaRepository::new(db.connection())
            .set_last_sync_at(timestamp)
            .await
    }

    /// Store a row exactly as given, flags included.
    #[cfg(test)]
    pub(crate) async fn insert_raw(&self, record: &Record) {
        let db = self.db.lock().await;
        db.connection()
            .execute(
                "INSERT OR REPLACE INTO records
                    (id, title, description, status, last_updated, is_synced, is_deleted)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
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
            .await
            .unwrap();
    }
}
