//! Record service: the single entry point the UI and CLI talk to.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::broadcast;

use super::DatabaseService;
use crate::config::ServiceConfig;
use crate::models::{ConflictLogEntry, Record, RecordId, RecordStatus};
use crate::remote::RemoteStore;
use crate::state::SyncOverview;
use crate::sync::{SyncEngine, SyncEvent, SyncOrchestrator, SyncReport, TriggerOutcome};
use crate::{Error, Result};

/// Number of prefix matches shown when an id prefix is ambiguous
const AMBIGUOUS_MATCH_LIMIT: usize = 3;
const SHORT_ID_LEN: usize = 13;

/// Local-first record operations with background reconciliation.
///
/// Mutations commit to the local store and return immediately; when
/// `sync_on_mutation` is set they also trigger a pass.
pub struct RecordService<R> {
    db: DatabaseService,
    orchestrator: SyncOrchestrator<R>,
    config: ServiceConfig,
}

impl<R> Clone for RecordService<R> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            orchestrator: self.orchestrator.clone(),
            config: self.config,
        }
    }
}

impl<R: RemoteStore + 'static> RecordService<R> {
    /// Open the local store at `db_path`.
    pub async fn open_path(
        db_path: impl Into<PathBuf>,
        remote: R,
        config: ServiceConfig,
    ) -> Result<Self> {
        let db = DatabaseService::open_path(db_path).await?;
        Ok(Self::new(db, Arc::new(remote), config))
    }

    /// In-memory local store (primarily for tests).
    pub async fn open_in_memory(remote: R, config: ServiceConfig) -> Result<Self> {
        let db = DatabaseService::open_in_memory().await?;
        Ok(Self::new(db, Arc::new(remote), config))
    }

    pub fn new(db: DatabaseService, remote: Arc<R>, config: ServiceConfig) -> Self {
        let engine = SyncEngine::new(db.clone(), remote, config.reconcile_options());
        Self {
            orchestrator: SyncOrchestrator::new(engine, config.start_online),
            db,
            config,
        }
    }

    pub const fn database(&self) -> &DatabaseService {
        &self.db
    }

    pub fn remote(&self) -> &Arc<R> {
        self.orchestrator.engine().remote()
    }

    pub const fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Live records, most recently updated first.
    pub async fn load_all(&self) -> Result<Vec<Record>> {
        self.db.list_records().await
    }

    /// A live record by id.
    pub async fn get(&self, id: &RecordId) -> Result<Option<Record>> {
        Ok(self
            .db
            .get_record(id)
            .await?
            .filter(|record| !record.is_deleted))
    }

    /// Resolve a full id or a unique id prefix to a live record id.
    pub async fn resolve_id(&self, query: &str) -> Result<RecordId> {
        let id: RecordId = query.parse()?;
        if self.get(&id).await?.is_some() {
            return Ok(id);
        }

        let mut matches = self
            .db
            .find_by_prefix(id.as_str(), AMBIGUOUS_MATCH_LIMIT)
            .await?;
        match matches.len() {
            0 => Err(Error::NotFound(id.to_string())),
            1 => Ok(matches.remove(0)),
            _ => Err(Error::AmbiguousId {
                query: id.to_string(),
                matches: matches
                    .iter()
                    .map(|id| id.as_str().chars().take(SHORT_ID_LEN).collect())
                    .collect(),
            }),
        }
    }

    /// Create a pending record with a fresh id.
    pub async fn create(&self, title: &str, description: &str) -> Result<Record> {
        let title = required_title(title)?;
        let record = self.db.create_record(title, description.trim()).await?;
        tracing::debug!("Created record {}", record.id);
        self.after_mutation().await;
        Ok(record)
    }

    /// Replace title and description.
    pub async fn update(&self, id: &RecordId, title: &str, description: &str) -> Result<Record> {
        let title = required_title(title)?;
        let record = self.db.edit_record(id, title, description.trim()).await?;
        tracing::debug!("Updated record {}", record.id);
        self.after_mutation().await;
        Ok(record)
    }

    pub async fn toggle_status(&self, id: &RecordId, status: RecordStatus) -> Result<Record> {
        let record = self.db.set_status(id, status).await?;
        tracing::debug!("Record {} is now {}", record.id, record.status);
        self.after_mutation().await;
        Ok(record)
    }

    /// Soft-delete a record. Unknown ids are ignored.
    pub async fn delete(&self, id: &RecordId) -> Result<()> {
        if self.db.delete_record(id).await? {
            tracing::debug!("Deleted record {id}");
            self.after_mutation().await;
        } else {
            tracing::debug!("Delete ignored for unknown record {id}");
        }
        Ok(())
    }

    /// Run a pass now and return its outcome.
    pub async fn run_sync(&self) -> Result<SyncReport> {
        self.orchestrator.sync_now().await
    }

    /// Connectivity input. Reconnecting triggers a pass.
    pub async fn set_online(&self, online: bool) -> Option<TriggerOutcome> {
        self.orchestrator.set_online(online).await
    }

    /// Wait until any running or queued pass has finished.
    pub async fn wait_idle(&self) {
        self.orchestrator.wait_idle().await;
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.orchestrator.subscribe()
    }

    pub async fn pending_count(&self) -> Result<usize> {
        self.db.count_unsynced().await
    }

    /// Most recent conflicts first
    pub async fn conflict_history(&self, limit: usize) -> Result<Vec<ConflictLogEntry>> {
        self.db.list_conflicts(limit).await
    }

    pub async fn clear_conflicts(&self) -> Result<usize> {
        self.db.clear_conflicts().await
    }

    pub async fn status(&self) -> Result<SyncOverview> {
        Ok(SyncOverview {
            status: self.orchestrator.status().await,
            last_sync_at: self.db.last_sync_at().await?,
            pending: self.db.count_unsynced().await?,
        })
    }

    async fn after_mutation(&self) {
        if self.config.sync_on_mutation {
            let outcome = self.orchestrator.trigger().await;
            tracing::debug!("Mutation sync trigger: {outcome:?}");
        }
    }
}

fn required_title(title: &str) -> Result<&str> {
    let title = title.trim();
    if title.is_empty() {
        Err(Error::InvalidInput("record title cannot be empty".into()))
    } else {
        Ok(title)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::remote::{MemoryRemoteStore, RemoteOp};
    use crate::state::SyncStatus;
    use pretty_assertions::assert_eq;

    fn manual() -> ServiceConfig {
        ServiceConfig {
            sync_on_mutation: false,
            ..ServiceConfig::default()
        }
    }

    async fn service(config: ServiceConfig) -> RecordService<MemoryRemoteStore> {
        RecordService::open_in_memory(MemoryRemoteStore::new(), config)
            .await
            .unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn create_rejects_blank_title() {
        let service = service(manual()).await;
        let error = service.create("   ", "body").await.unwrap_err();
        assert!(matches!(error, Error::InvalidInput(_)));
        assert!(service.load_all().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn local_mutations_apply_without_remote() {
        let service = service(manual()).await;
        let record = service.create(" Buy milk ", " 2 litres ").await.unwrap();
        assert_eq!(record.title, "Buy milk");
        assert_eq!(record.description, "2 litres");
        assert_eq!(record.status, RecordStatus::Pending);

        let done = service
            .toggle_status(&record.id, RecordStatus::Completed)
            .await
            .unwrap();
        assert_eq!(done.status, RecordStatus::Completed);

        let edited = service.update(&record.id, "Buy oat milk", "").await.unwrap();
        assert_eq!(edited.status, RecordStatus::Completed);
        assert_eq!(service.pending_count().await.unwrap(), 1);
        assert_eq!(service.remote().calls(RemoteOp::FetchAll).await, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn update_and_toggle_of_unknown_id_are_not_found() {
        let service = service(manual()).await;
        let missing = RecordId::from("missing");

        assert!(matches!(
            service.update(&missing, "x", "").await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            service.toggle_status(&missing, RecordStatus::Completed).await,
            Err(Error::NotFound(_))
        ));
        service.delete(&missing).await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn deleted_record_is_hidden_until_purged() {
        let service = service(manual()).await;
        let record = service.create("temporary", "").await.unwrap();
        service.delete(&record.id).await.unwrap();

        assert!(service.get(&record.id).await.unwrap().is_none());
        assert!(service.load_all().await.unwrap().is_empty());
        assert_eq!(service.pending_count().await.unwrap(), 1);

        let report = service.run_sync().await.unwrap();
        assert_eq!(report.purged, 1);
        assert!(service.database().get_record(&record.id).await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn mutation_triggers_background_sync() {
        let service = service(ServiceConfig::default()).await;
        let record = service.create("auto", "").await.unwrap();

        service.wait_idle().await;

        assert!(service.remote().get(&record.id).await.is_some());
        let overview = service.status().await.unwrap();
        assert_eq!(overview.status, SyncStatus::Synced);
        assert_eq!(overview.pending, 0);
        assert!(overview.last_sync_at.is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn offline_mutations_sync_on_reconnect() {
        let service = service(ServiceConfig::default()).await;
        service.set_online(false).await;
        let record = service.create("written offline", "").await.unwrap();

        assert!(matches!(service.run_sync().await, Err(Error::Offline)));
        assert_eq!(service.status().await.unwrap().status, SyncStatus::Offline);

        let mut events = service.subscribe();
        service.set_online(true).await;
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(event, SyncEvent::Completed { .. }));
        assert!(service.remote().get(&record.id).await.is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn resolve_id_accepts_unique_prefix() {
        let service = service(manual()).await;
        let record = service.create("first", "").await.unwrap();

        assert_eq!(service.resolve_id(record.id.as_str()).await.unwrap(), record.id);
        let prefix: String = record.id.as_str().chars().take(30).collect();
        assert_eq!(service.resolve_id(&prefix).await.unwrap(), record.id);
        assert!(matches!(
            service.resolve_id("zzzz").await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            service.resolve_id("  ").await,
            Err(Error::InvalidInput(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn resolve_id_rejects_ambiguous_prefix() {
        let service = service(manual()).await;
        for id in ["abc-1", "abc-2"] {
            service
                .database()
                .insert_raw(&Record {
                    id: id.into(),
                    title: id.to_string(),
                    description: String::new(),
                    status: RecordStatus::Pending,
                    last_updated: 1,
                    is_synced: false,
                    is_deleted: false,
                })
                .await;
        }

        let error = service.resolve_id("abc").await.unwrap_err();
        assert!(matches!(error, Error::AmbiguousId { ref matches, .. } if matches.len() == 2));
        assert_eq!(service.resolve_id("abc-2").await.unwrap(), RecordId::from("abc-2"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn conflict_history_can_be_cleared() {
        let remote = MemoryRemoteStore::new();
        let service = RecordService::open_in_memory(remote, manual()).await.unwrap();
        let record = service.create("mine", "").await.unwrap();
        service.run_sync().await.unwrap();

        let newer = Record {
            title: "theirs".into(),
            last_updated: record.last_updated + 10_000,
            ..record.synced()
        };
        service.update(&record.id, "mine again", "").await.unwrap();
        service.remote().put(newer).await;
        let report = service.run_sync().await.unwrap();

        assert_eq!(report.conflicts.len(), 1);
        assert_eq!(service.get(&record.id).await.unwrap().unwrap().title, "theirs");
        assert_eq!(service.conflict_history(10).await.unwrap().len(), 1);
        assert_eq!(service.clear_conflicts().await.unwrap(), 1);
        assert!(service.conflict_history(10).await.unwrap().is_empty());
    }
}
