//! Executes one reconciliation pass against the local store and a remote.

use std::sync::Arc;

use serde::Serialize;

use super::plan::{plan_reconciliation, RemoteWrite};
use crate::models::{Record, SyncConflict};
use crate::remote::RemoteStore;
use crate::services::DatabaseService;
use crate::util::now_millis;
use crate::Result;

/// Tunables for a pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Drop synced local records the remote no longer lists
    pub prune_remote_deletions: bool,
}

/// Outcome of a completed pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// Live records after the pass, most recently updated first
    pub records: Vec<Record>,
    pub conflicts: Vec<SyncConflict>,
    /// Remote writes issued
    pub pushed: usize,
    /// Remote values stored locally
    pub pulled: usize,
    /// Tombstones removed after their deletion synced
    pub purged: usize,
    /// Records removed because the remote no longer lists them
    pub pruned: usize,
    pub completed_at: i64,
}

/// Reconciliation engine bound to one local store and one remote.
pub struct SyncEngine<R> {
    db: DatabaseService,
    remote: Arc<R>,
    options: ReconcileOptions,
}

impl<R: RemoteStore> SyncEngine<R> {
    pub const fn new(db: DatabaseService, remote: Arc<R>, options: ReconcileOptions) -> Self {
        Self {
            db,
            remote,
            options,
        }
    }

    pub const fn remote(&self) -> &Arc<R> {
        &self.remote
    }

    pub const fn options(&self) -> ReconcileOptions {
        self.options
    }

    /// Run one pass.
    ///
    /// A remote failure aborts the pass before any local state changes; the
    /// records it covered stay unsynced for the next pass. Remote writes that
    /// already landed are idempotent and simply repeat.
    pub async fn run(&self) -> Result<SyncReport> {
        let local_unsynced = self.db.unsynced_records().await?;
        tracing::info!("Sync pass starting with {} pending change(s)", local_unsynced.len());

        let remote_snapshot = self.remote.fetch_all().await.map_err(|error| {
            tracing::warn!("Fetching remote snapshot failed: {error}");
            error
        })?;

        let mut plan = plan_reconciliation(&local_unsynced, &remote_snapshot);

        for write in &plan.remote_writes {
            let outcome = match write {
                RemoteWrite::Create(record) => self.remote.create(record).await,
                RemoteWrite::Update(record) => self.remote.update(record).await,
                RemoteWrite::Delete(id) => self.remote.delete(id).await,
            };
            if let Err(error) = outcome {
                tracing::warn!("Remote write for {} failed, aborting pass: {error}", write.id());
                return Err(error.into());
            }
        }

        let pulled = self.db.apply_remote(&plan.local_writes).await?;
        let confirmed = self.db.confirm_synced(&plan.resolved).await?;
        if confirmed < plan.resolved.len() {
            tracing::debug!(
                "{} pushed record(s) changed during the pass and stay pending",
                plan.resolved.len() - confirmed
            );
        }

        let pruned = if self.options.prune_remote_deletions {
            plan.remote_ids
                .extend(plan.local_writes.iter().map(|record| record.id.clone()));
            self.db.remove_synced_absent(&plan.remote_ids).await?
        } else {
            0
        };

        let completed_at = now_millis();
        self.db
            .record_conflicts(&plan.conflicts, completed_at)
            .await?;
        let purged = self.db.purge_synced_tombstones().await?;
        self.db.set_last_sync_at(completed_at).await?;

        let conflicts: Vec<SyncConflict> = plan
            .conflicts
            .into_iter()
            .map(|detail| detail.conflict)
            .collect();
        let report = SyncReport {
            records: self.db.list_records().await?,
            pushed: plan.remote_writes.len(),
            pulled,
            purged,
            pruned,
            completed_at,
            conflicts,
        };

        tracing::info!(
            "Sync pass finished: pushed {}, pulled {}, purged {}, pruned {}, {} conflict(s)",
            report.pushed,
            report.pulled,
            report.purged,
            report.pruned,
            report.conflicts.len()
        );
        Ok(report)
    }
}
