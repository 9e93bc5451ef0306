//! Shared sync state types.

use serde::Serialize;

/// Sync status shown to the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Offline,
    Syncing,
    Synced,
    Error,
    /// Online, no pass has run yet
    Idle,
}

impl SyncStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::Syncing => "syncing",
            Self::Synced => "synced",
            Self::Error => "error",
            Self::Idle => "idle",
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Status plus the bookkeeping a status line needs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOverview {
    pub status: SyncStatus,
    /// Unix ms of the last successful pass
    pub last_sync_at: Option<i64>,
    /// Records waiting for a pass
    pub pending: usize,
}
