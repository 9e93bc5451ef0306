//! Data models for tend

mod patch;
mod record;
mod sync_conflict;

pub use patch::RecordPatch;
pub use record::{Record, RecordId, RecordStatus};
pub use sync_conflict::{ConflictDetail, ConflictLogEntry, Resolution, SyncConflict};
