//! Error types for tend-core

use std::sync::Arc;

use thiserror::Error;

use crate::remote::RemoteError;

/// Result type alias using tend-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tend-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Id prefix matched more than one record
    #[error("ID prefix '{query}' is ambiguous; matches: {}", .matches.join(", "))]
    AmbiguousId { query: String, matches: Vec<String> },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Remote store unavailable or failing during a sync pass
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Sync requested while connectivity is down
    #[error("Sync unavailable while offline")]
    Offline,

    /// The orchestrator went away before the requested pass finished
    #[error("Sync aborted: {0}")]
    SyncAborted(String),

    /// A pass run by the orchestrator failed; shared with every waiter
    #[error("Sync failed: {0}")]
    SyncFailed(Arc<Error>),
}

impl Error {
    /// Local durable storage failed; the triggering operation did not apply.
    pub fn is_storage_failure(&self) -> bool {
        match self {
            Self::Database(_) | Self::LibSql(_) | Self::Io(_) => true,
            Self::SyncFailed(inner) => inner.is_storage_failure(),
            _ => false,
        }
    }

    /// Failure that a later sync pass may recover from.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Remote(_) | Self::Offline | Self::SyncAborted(_) => true,
            Self::SyncFailed(inner) => inner.is_transient(),
            _ => false,
        }
    }
}
