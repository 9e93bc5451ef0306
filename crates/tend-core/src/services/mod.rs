//! Shared services used across clients.

mod database;
mod records;

pub use database::DatabaseService;
pub use records::RecordService;
