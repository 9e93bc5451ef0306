//! Reconciliation between the local store and the remote store.

mod engine;
mod orchestrator;
mod plan;

pub use engine::{ReconcileOptions, SyncEngine, SyncReport};
pub use orchestrator::{SyncEvent, SyncOrchestrator, SyncPhase, TriggerOutcome};
pub use plan::{plan_reconciliation, ReconcilePlan, RemoteWrite};
