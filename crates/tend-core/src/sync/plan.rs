//! Last-write-wins reconciliation planning.
//!
//! Planning is pure: it decides every remote and local write of a pass from
//! two snapshots and performs no I/O. The engine then carries the plan out.

use std::collections::{HashMap, HashSet};

use crate::models::{ConflictDetail, Record, RecordId, Resolution, SyncConflict};

/// Write to issue against the remote store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteWrite {
    Create(Record),
    Update(Record),
    Delete(RecordId),
}

impl RemoteWrite {
    pub const fn id(&self) -> &RecordId {
        match self {
            Self::Create(record) | Self::Update(record) => &record.id,
            Self::Delete(id) => id,
        }
    }
}

/// Every decision of one pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    /// Remote writes, in the order of the local snapshot
    pub remote_writes: Vec<RemoteWrite>,
    /// Remote values to store locally as synced
    pub local_writes: Vec<Record>,
    /// Pushed records and the local version that was pushed
    pub resolved: Vec<(RecordId, i64)>,
    /// Records both sides changed, with the winning side
    pub conflicts: Vec<ConflictDetail>,
    /// Ids the remote holds once the remote writes have landed
    pub remote_ids: HashSet<RecordId>,
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.remote_writes.is_empty() && self.local_writes.is_empty()
    }
}

/// Decide one pass from the local unsynced set and the remote snapshot.
///
/// A record present on both sides goes to the strictly newer side; equal
/// timestamps go to the remote. Every remote record with no pending local
/// change is pulled.
pub fn plan_reconciliation(local_unsynced: &[Record], remote_snapshot: &[Record]) -> ReconcilePlan {
    let mut remote_by_id: HashMap<&RecordId, &Record> = HashMap::new();
    for record in remote_snapshot {
        remote_by_id.entry(&record.id).or_insert(record);
    }

    let mut plan = ReconcilePlan {
        remote_ids: remote_by_id.keys().map(|id| (*id).clone()).collect(),
        ..ReconcilePlan::default()
    };
    let mut handled: HashSet<&RecordId> = HashSet::new();

    for local in local_unsynced {
        if !handled.insert(&local.id) {
            continue;
        }

        let Some(remote) = remote_by_id.get(&local.id).copied() else {
            tracing::debug!("{} is new locally; pushing", local.id);
            push(&mut plan, local, false);
            continue;
        };

        let resolved_to = if local.last_updated > remote.last_updated {
            tracing::debug!(
                "{} local {} beats remote {}",
                local.id,
                local.last_updated,
                remote.last_updated
            );
            push(&mut plan, local, true);
            Resolution::Local
        } else {
            tracing::debug!(
                "{} remote {} beats local {}",
                local.id,
                remote.last_updated,
                local.last_updated
            );
            plan.local_writes.push(remote.synced());
            Resolution::Server
        };

        plan.conflicts.push(ConflictDetail {
            conflict: SyncConflict {
                id: local.id.clone(),
                resolved_to,
            },
            local_updated_at: local.last_updated,
            remote_updated_at: remote.last_updated,
        });
    }

    for remote in remote_snapshot {
        if handled.insert(&remote.id) {
            plan.local_writes.push(remote.synced());
        }
    }

    plan
}

fn push(plan: &mut ReconcilePlan, local: &Record, exists_remotely: bool) {
    let write = if local.is_deleted {
        plan.remote_ids.remove(&local.id);
        RemoteWrite::Delete(local.id.clone())
    } else {
        plan.remote_ids.insert(local.id.clone());
        if exists_remotely {
            RemoteWrite::Update(local.synced())
        } else {
            RemoteWrite::Create(local.synced())
        }
    };
    plan.remote_writes.push(write);
    plan.resolved.push((local.id.clone(), local.last_updated));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordStatus;
    use pretty_assertions::assert_eq;

    fn record(id: &str, title: &str, last_updated: i64, is_synced: bool) -> Record {
        Record {
            id: id.into(),
            title: title.to_string(),
            description: String::new(),
            status: RecordStatus::Pending,
            last_updated,
            is_synced,
            is_deleted: false,
        }
    }

    #[test]
    fn newer_local_change_is_pushed_as_update() {
        let local = record("A", "local", 100, false);
        let remote = record("A", "remote", 50, true);

        let plan = plan_reconciliation(&[local.clone()], &[remote]);

        assert_eq!(plan.remote_writes, vec![RemoteWrite::Update(local.synced())]);
        assert!(plan.local_writes.is_empty());
        assert_eq!(plan.resolved, vec![("A".into(), 100)]);
        assert_eq!(plan.conflicts[0].conflict.resolved_to, Resolution::Local);
    }

    #[test]
    fn newer_remote_value_replaces_local_change() {
        let local = record("B", "local", 50, false);
        let remote = record("B", "remote", 100, true);

        let plan = plan_reconciliation(&[local], &[remote.clone()]);

        assert!(plan.remote_writes.is_empty());
        assert_eq!(plan.local_writes, vec![remote]);
        assert!(plan.resolved.is_empty());
        assert_eq!(plan.conflicts[0].conflict.resolved_to, Resolution::Server);
    }

    #[test]
    fn equal_timestamps_go_to_remote() {
        let local = record("T", "local", 70, false);
        let remote = record("T", "remote", 70, true);

        let plan = plan_reconciliation(&[local], &[remote.clone()]);

        assert!(plan.remote_writes.is_empty());
        assert_eq!(plan.local_writes, vec![remote]);
        assert_eq!(plan.conflicts[0].conflict.resolved_to, Resolution::Server);
    }

    #[test]
    fn new_local_record_is_created_without_conflict() {
        let local = record("D", "fresh", 10, false);

        let plan = plan_reconciliation(&[local.clone()], &[]);

        assert_eq!(plan.remote_writes, vec![RemoteWrite::Create(local.synced())]);
        assert!(plan.conflicts.is_empty());
        assert!(plan.remote_ids.contains(&RecordId::from("D")));
    }

    #[test]
    fn local_tombstone_becomes_remote_delete() {
        let mut tombstone = record("C", "gone", 30, false);
        tombstone.is_deleted = true;

        let absent = plan_reconciliation(&[tombstone.clone()], &[]);
        assert_eq!(absent.remote_writes, vec![RemoteWrite::Delete("C".into())]);
        assert!(absent.conflicts.is_empty());

        let present = plan_reconciliation(&[tombstone], &[record("C", "old", 20, true)]);
        assert_eq!(present.remote_writes, vec![RemoteWrite::Delete("C".into())]);
        assert_eq!(present.resolved, vec![("C".into(), 30)]);
        assert!(!present.remote_ids.contains(&RecordId::from("C")));
    }

    #[test]
    fn untouched_remote_records_are_pulled() {
        let remote = record("E", "from elsewhere", 5, false);

        let plan = plan_reconciliation(&[], &[remote.clone()]);

        assert!(plan.remote_writes.is_empty());
        assert_eq!(plan.local_writes, vec![remote.synced()]);
        assert!(plan.conflicts.is_empty());
    }

    #[test]
    fn local_order_is_preserved_and_duplicates_ignored() {
        let first = record("1", "one", 1, false);
        let second = record("2", "two", 2, false);

        let plan = plan_reconciliation(&[first.clone(), second.clone(), first.clone()], &[]);

        let ids: Vec<_> = plan.remote_writes.iter().map(RemoteWrite::id).cloned().collect();
        assert_eq!(ids, vec![RecordId::from("1"), RecordId::from("2")]);
    }

    #[test]
    fn empty_inputs_produce_empty_plan() {
        assert!(plan_reconciliation(&[], &[]).is_empty());
    }
}
