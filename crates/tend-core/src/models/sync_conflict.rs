//! Sync conflict model

use serde::{Deserialize, Serialize};

use super::RecordId;

/// Which side's value survived a conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    /// The pending local change overwrote the remote value
    Local,
    /// The remote value overwrote the pending local change
    Server,
}

impl Resolution {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Server => "server",
        }
    }

    /// Parse the stored text; unknown values read as `Server`.
    #[must_use]
    pub fn from_db(value: &str) -> Self {
        if value == "local" {
            Self::Local
        } else {
            Self::Server
        }
    }

    /// User-facing banner text for this outcome
    #[must_use]
    pub const fn banner(self) -> &'static str {
        match self {
            Self::Local => "Local change synced",
            Self::Server => "Server update applied",
        }
    }
}

/// Conflict resolved during one sync pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConflict {
    pub id: RecordId,
    pub resolved_to: Resolution,
}

/// A conflict with the timestamps both sides carried when it was resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictDetail {
    pub conflict: SyncConflict,
    pub local_updated_at: i64,
    pub remote_updated_at: i64,
}

/// Persisted history row for a resolved conflict
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictLogEntry {
    /// Conflict row identifier
    pub id: i64,
    /// Record involved in the conflict
    pub record_id: RecordId,
    /// Winning side
    pub resolved_to: Resolution,
    /// Pending local timestamp at the time of the pass
    pub local_updated_at: i64,
    /// Remote timestamp at the time of the pass
    pub remote_updated_at: i64,
    /// Resolution timestamp (unix ms)
    pub resolved_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_serializes_as_id_and_resolved_to() {
        let conflict = SyncConflict {
            id: "A".into(),
            resolved_to: Resolution::Local,
        };
        assert_eq!(
            serde_json::to_string(&conflict).unwrap(),
            r#"{"id":"A","resolvedTo":"local"}"#
        );
    }

    #[test]
    fn resolution_banner_text() {
        assert_eq!(Resolution::Server.banner(), "Server update applied");
        assert_eq!(Resolution::from_db("local"), Resolution::Local);
        assert_eq!(Resolution::from_db("server"), Resolution::Server);
    }
}
