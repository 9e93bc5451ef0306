//! tend-core - Core library for tend
//!
//! This crate contains the record model, the local store, the remote store
//! contract and the last-write-wins reconciliation engine used by every tend
//! interface.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod remote;
pub mod services;
pub mod state;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{Record, RecordId, RecordStatus, Resolution, SyncConflict};
