//! Typed mutations applied through the local store's upsert.
//!
//! Each variant names exactly the fields it writes. Fields a variant does not
//! carry keep their stored value; when no record exists yet they take the
//! insert defaults (empty text, `Pending`, not deleted).

use crate::error::{Error, Result};
use crate::models::{Record, RecordId, RecordStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordPatch {
    /// New record from a local create
    Create {
        id: RecordId,
        title: String,
        description: String,
        last_updated: i64,
    },
    /// Title/description edit of an existing record
    Edit {
        id: RecordId,
        title: String,
        description: String,
        last_updated: i64,
    },
    /// Status change of an existing record
    Status {
        id: RecordId,
        status: RecordStatus,
        last_updated: i64,
    },
    /// Tombstone an existing record
    Delete { id: RecordId, last_updated: i64 },
    /// Full value taken from the remote store, confirmed synced
    Remote(Record),
}

impl RecordPatch {
    /// Id of the record this patch targets
    #[must_use]
    pub const fn id(&self) -> &RecordId {
        match self {
            Self::Create { id, .. }
            | Self::Edit { id, .. }
            | Self::Status { id, .. }
            | Self::Delete { id, .. } => id,
            Self::Remote(record) => &record.id,
        }
    }

    /// Merge this patch over the stored record.
    ///
    /// Returns `Ok(None)` when the patch is a no-op (deleting a missing id)
    /// and `Error::NotFound` when an edit targets a missing id.
    pub fn apply(self, existing: Option<Record>) -> Result<Option<Record>> {
        let merged = match (self, existing) {
            (Self::Remote(record), _) => Record {
                is_synced: true,
                ..record
            },
            (
                Self::Create {
                    id,
                    title,
                    description,
                    last_updated,
                },
                current,
            ) => {
                let current = current.unwrap_or_else(|| blank(id.clone(), last_updated));
                Record {
                    id,
                    title,
                    description,
                    last_updated,
                    is_synced: false,
                    ..current
                }
            }
            (
                Self::Edit {
                    title,
                    description,
                    last_updated,
                    ..
                },
                Some(current),
            ) => Record {
                title,
                description,
                last_updated,
                is_synced: false,
                ..current
            },
            (
                Self::Status {
                    status,
                    last_updated,
                    ..
                },
                Some(current),
            ) => Record {
                status,
                last_updated,
                is_synced: false,
                ..current
            },
            (Self::Delete { last_updated, .. }, Some(current)) => Record {
                is_deleted: true,
                last_updated,
                is_synced: false,
                ..current
            },
            (Self::Delete { .. }, None) => return Ok(None),
            (Self::Edit { id, .. } | Self::Status { id, .. }, None) => {
                return Err(Error::NotFound(id.to_string()))
            }
        };
        Ok(Some(merged))
    }
}

fn blank(id: RecordId, last_updated: i64) -> Record {
    Record {
        id,
        title: String::new(),
        description: String::new(),
        status: RecordStatus::Pending,
        last_updated,
        is_synced: false,
        is_deleted: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn stored() -> Record {
        Record {
            id: "r1".into(),
            title: "Old title".into(),
            description: "Old description".into(),
            status: RecordStatus::Completed,
            last_updated: 100,
            is_synced: true,
            is_deleted: false,
        }
    }

    #[test]
    fn status_patch_retains_text_fields() {
        let merged = RecordPatch::Status {
            id: "r1".into(),
            status: RecordStatus::Pending,
            last_updated: 200,
        }
        .apply(Some(stored()))
        .unwrap()
        .unwrap();

        assert_eq!(
            merged,
            Record {
                status: RecordStatus::Pending,
                last_updated: 200,
                is_synced: false,
                ..stored()
            }
        );
    }

    #[test]
    fn edit_patch_retains_status() {
        let merged = RecordPatch::Edit {
            id: "r1".into(),
            title: "New".into(),
            description: String::new(),
            last_updated: 150,
        }
        .apply(Some(stored()))
        .unwrap()
        .unwrap();

        assert_eq!(merged.title, "New");
        assert_eq!(merged.description, "");
        assert_eq!(merged.status, RecordStatus::Completed);
        assert!(!merged.is_synced);
    }

    #[test]
    fn edit_of_missing_record_is_not_found() {
        let result = RecordPatch::Edit {
            id: "ghost".into(),
            title: "x".into(),
            description: "y".into(),
            last_updated: 1,
        }
        .apply(None);
        assert!(matches!(result, Err(Error::NotFound(id)) if id == "ghost"));
    }

    #[test]
    fn delete_of_missing_record_is_noop() {
        let result = RecordPatch::Delete {
            id: "ghost".into(),
            last_updated: 1,
        }
        .apply(None)
        .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn create_inserts_with_defaults() {
        let created = RecordPatch::Create {
            id: "n1".into(),
            title: "Title".into(),
            description: "Body".into(),
            last_updated: 5,
        }
        .apply(None)
        .unwrap()
        .unwrap();

        assert_eq!(created.status, RecordStatus::Pending);
        assert!(!created.is_deleted);
        assert!(!created.is_synced);
    }

    #[test]
    fn remote_patch_is_always_synced() {
        let remote = Record {
            is_synced: false,
            last_updated: 300,
            ..stored()
        };
        let merged = RecordPatch::Remote(remote.clone())
            .apply(Some(stored()))
            .unwrap()
            .unwrap();
        assert_eq!(merged, remote.synced());
    }
}
