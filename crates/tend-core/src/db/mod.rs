//! Local store for tend

mod conflict_repository;
mod connection;
mod migrations;
mod repository;
mod sync_meta_repository;

pub use conflict_repository::{ConflictRepository, LibSqlConflictRepository};
pub use connection::Database;
pub use repository::{LibSqlRecordRepository, RecordRepository};
pub use sync_meta_repository::{LibSqlSyncMetaRepository, SyncMetaRepository};
