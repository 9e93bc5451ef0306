//! Runtime configuration for the record service.

use serde::{Deserialize, Serialize};

use crate::sync::ReconcileOptions;

/// Options the record service is constructed with.
///
/// Deserializes from partial JSON; missing fields take their defaults.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServiceConfig {
    /// Trigger a sync pass after every local mutation while online
    pub sync_on_mutation: bool,
    /// Remove synced local records the remote no longer lists
    pub prune_remote_deletions: bool,
    /// Connectivity assumed at startup
    pub start_online: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            sync_on_mutation: true,
            prune_remote_deletions: false,
            start_online: true,
        }
    }
}

impl ServiceConfig {
    pub const fn reconcile_options(&self) -> ReconcileOptions {
        ReconcileOptions {
            prune_remote_deletions: self.prune_remote_deletions,
        }
    }
}
