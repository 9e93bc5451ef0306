//! Record model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Error;

/// Identifier for a record.
///
/// Ids minted locally are UUID v7 (time-sortable). Ids that arrive from a
/// remote are opaque and only required to be non-empty.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Create a new unique record ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Borrow the string form of this ID
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RecordId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidInput("record id must not be empty".into()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Completion state of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RecordStatus {
    #[default]
    Pending,
    Completed,
}

impl RecordStatus {
    /// Text stored in the `status` column
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Completed => "Completed",
        }
    }

    /// Parse the stored text. Anything unrecognized reads as `Pending`.
    #[must_use]
    pub fn from_db(value: &str) -> Self {
        if value == "Completed" {
            Self::Completed
        } else {
            Self::Pending
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record in the system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Unique identifier, never changes after creation
    pub id: RecordId,
    pub title: String,
    pub description: String,
    pub status: RecordStatus,
    /// Last mutation timestamp (Unix ms), the only ordering signal for sync
    pub last_updated: i64,
    /// Local copy is known identical to the remote copy
    #[serde(default)]
    pub is_synced: bool,
    /// Tombstone flag, kept until the deletion is confirmed synced
    #[serde(default)]
    pub is_deleted: bool,
}

impl Record {
    /// Create a new unsynced record with a fresh id
    #[must_use]
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: RecordId::new(),
            title: title.into(),
            description: description.into(),
            status: RecordStatus::Pending,
            last_updated: crate::util::now_millis(),
            is_synced: false,
            is_deleted: false,
        }
    }

    /// Copy of this record flagged as synced
    #[must_use]
    pub fn synced(&self) -> Self {
        Self {
            is_synced: true,
            ..self.clone()
        }
    }

    /// Compare the replicated fields, ignoring the local-only synced flag
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        self.id == other.id
            && self.title == other.title
            && self.description == other.description
            && self.status == other.status
            && self.last_updated == other.last_updated
            && self.is_deleted == other.is_deleted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_unique() {
        let id1 = RecordId::new();
        let id2 = RecordId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_record_id_accepts_opaque_remote_ids() {
        let id: RecordId = " 1699999999999-k3j2h ".parse().unwrap();
        assert_eq!(id.as_str(), "1699999999999-k3j2h");
        assert!("   ".parse::<RecordId>().is_err());
    }

    #[test]
    fn test_record_new() {
        let record = Record::new("Buy milk", "2 litres");
        assert_eq!(record.status, RecordStatus::Pending);
        assert!(!record.is_synced);
        assert!(!record.is_deleted);
        assert!(record.last_updated > 0);
    }

    #[test]
    fn test_status_db_roundtrip_defaults_to_pending() {
        assert_eq!(RecordStatus::from_db("Completed"), RecordStatus::Completed);
        assert_eq!(RecordStatus::from_db("Pending"), RecordStatus::Pending);
        assert_eq!(RecordStatus::from_db("garbage"), RecordStatus::Pending);
    }

    #[test]
    fn test_wire_shape_is_camel_case() {
        let record = Record {
            id: "a1".into(),
            title: "t".into(),
            description: "d".into(),
            status: RecordStatus::Completed,
            last_updated: 42,
            is_synced: true,
            is_deleted: false,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["lastUpdated"], 42);
        assert_eq!(json["isSynced"], true);
        assert_eq!(json["status"], "Completed");

        let parsed: Record = serde_json::from_str(
            r#"{"id":"b2","title":"x","description":"","status":"Pending","lastUpdated":7}"#,
        )
        .unwrap();
        assert!(!parsed.is_deleted);
        assert!(!parsed.is_synced);
    }

    #[test]
    fn test_same_content_ignores_synced_flag() {
        let record = Record::new("a", "b");
        assert!(record.same_content(&record.synced()));
    }
}
