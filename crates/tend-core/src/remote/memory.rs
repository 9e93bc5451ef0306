//! In-process remote store with failure injection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;

use super::{RemoteError, RemoteResult, RemoteStore};
use crate::models::{Record, RecordId};

/// Remote operation kinds, used to target injected failures and count calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOp {
    FetchAll,
    Create,
    Update,
    Delete,
}

#[derive(Debug, Default)]
struct MemoryState {
    /// Newest creations first, as the remote lists them
    records: Vec<Record>,
    fail_any: usize,
    fail_ops: HashMap<RemoteOp, usize>,
    calls: HashMap<RemoteOp, usize>,
}

impl MemoryState {
    fn enter(&mut self, op: RemoteOp) -> RemoteResult<()> {
        *self.calls.entry(op).or_default() += 1;

        if let Some(remaining) = self.fail_ops.get_mut(&op).filter(|left| **left > 0) {
            *remaining -= 1;
            return Err(RemoteError::Unavailable(format!("injected {op:?} failure")));
        }
        if self.fail_any > 0 {
            self.fail_any -= 1;
            return Err(RemoteError::Unavailable(format!("injected {op:?} failure")));
        }
        Ok(())
    }

    fn upsert(&mut self, record: &Record) {
        if let Some(existing) = self.records.iter_mut().find(|item| item.id == record.id) {
            *existing = record.clone();
        } else {
            self.records.insert(0, record.clone());
        }
    }
}

/// Remote store held in memory.
///
/// Every call can be delayed by a fixed latency and made to fail on demand,
/// which lets tests exercise aborted passes and overlapping triggers.
#[derive(Debug, Default)]
pub struct MemoryRemoteStore {
    state: Mutex<MemoryState>,
    latency: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with the given records already present
    pub fn with_records(records: impl IntoIterator<Item = Record>) -> Self {
        let mut state = MemoryState::default();
        for record in records {
            state.upsert(&record);
        }
        Self {
            state: Mutex::new(state),
            ..Self::default()
        }
    }

    /// Delay every call by `latency`
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Fail the next `times` calls of any kind
    pub async fn fail_next(&self, times: usize) {
        self.state.lock().await.fail_any = times;
    }

    /// Fail the next `times` calls of `op`
    pub async fn fail_op(&self, op: RemoteOp, times: usize) {
        self.state.lock().await.fail_ops.insert(op, times);
    }

    /// Write a record directly, as another client would
    pub async fn put(&self, record: Record) {
        self.state.lock().await.upsert(&record);
    }

    /// Remove a record directly, as another client would
    pub async fn remove(&self, id: &RecordId) {
        self.state.lock().await.records.retain(|item| &item.id != id);
    }

    pub async fn get(&self, id: &RecordId) -> Option<Record> {
        self.state
            .lock()
            .await
            .records
            .iter()
            .find(|item| &item.id == id)
            .cloned()
    }

    pub async fn snapshot(&self) -> Vec<Record> {
        self.state.lock().await.records.clone()
    }

    /// Number of calls made for `op`, failed ones included
    pub async fn calls(&self, op: RemoteOp) -> usize {
        self.state
            .lock()
            .await
            .calls
            .get(&op)
            .copied()
            .unwrap_or_default()
    }

    /// Highest number of calls that were in progress at the same time
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn call<T>(
        &self,
        op: RemoteOp,
        body: impl FnOnce(&mut MemoryState) -> T + Send,
    ) -> RemoteResult<T> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let result = {
            let mut state = self.state.lock().await;
            state.enter(op).map(|()| body(&mut state))
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

impl RemoteStore for MemoryRemoteStore {
    async fn fetch_all(&self) -> RemoteResult<Vec<Record>> {
        self.call(RemoteOp::FetchAll, |state| state.records.clone())
            .await
    }

    async fn create(&self, record: &Record) -> RemoteResult<()> {
        self.call(RemoteOp::Create, |state| state.upsert(record)).await
    }

    async fn update(&self, record: &Record) -> RemoteResult<()> {
        self.call(RemoteOp::Update, |state| state.upsert(record)).await
    }

    async fn delete(&self, id: &RecordId) -> RemoteResult<()> {
        self.call(RemoteOp::Delete, |state| {
            state.records.retain(|item| &item.id != id);
        })
        .await
    }
}
