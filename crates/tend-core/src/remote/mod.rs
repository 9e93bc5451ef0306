//! Remote store contract
//!
//! The remote is the authoritative copy that every client converges on. It
//! is reachable only while online and is treated as per-record CRUD: every
//! write is an idempotent upsert or delete keyed by record id, so a sync pass
//! can be re-run after a partial failure without extra bookkeeping.

mod file;
mod memory;

use std::future::Future;

use thiserror::Error;

use crate::models::{Record, RecordId};

pub use file::FileRemoteStore;
pub use memory::{MemoryRemoteStore, RemoteOp};

/// Failure talking to the remote store. Always treated as transient.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote unavailable: {0}")]
    Unavailable(String),
    #[error("remote I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("remote data unreadable: {0}")]
    Corrupt(String),
}

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Authoritative copy of the record set.
pub trait RemoteStore: Send + Sync {
    /// Current snapshot. Contains tombstones only if the remote keeps them.
    fn fetch_all(&self) -> impl Future<Output = RemoteResult<Vec<Record>>> + Send;

    /// Insert or replace a record by id
    fn create(&self, record: &Record) -> impl Future<Output = RemoteResult<()>> + Send;

    /// Insert or replace a record by id
    fn update(&self, record: &Record) -> impl Future<Output = RemoteResult<()>> + Send;

    /// Remove a record; a missing id is not an error
    fn delete(&self, id: &RecordId) -> impl Future<Output = RemoteResult<()>> + Send;
}
