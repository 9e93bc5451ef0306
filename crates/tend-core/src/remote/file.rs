//! Remote store persisted as a JSON file

use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::Mutex;

use super::{RemoteError, RemoteResult, RemoteStore};
use crate::models::{Record, RecordId};

/// Remote store backed by a single JSON array on disk.
///
/// Stands in for a hosted backend: several local databases can point at the
/// same file and converge through it. Newly created records are listed first.
///
/// Read-modify-write cycles are serialized within one process only. Two
/// processes writing the same file at once can lose an update.
#[derive(Debug)]
pub struct FileRemoteStore {
    path: PathBuf,
    latency: Option<Duration>,
    lock: Mutex<()>,
}

impl FileRemoteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            latency: None,
            lock: Mutex::new(()),
        }
    }

    /// Delay every call by `latency` to mimic a network round trip
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    async fn modify(
        &self,
        change: impl FnOnce(&mut Vec<Record>) + Send + 'static,
    ) -> RemoteResult<()> {
        self.simulate_latency().await;
        let _guard = self.lock.lock().await;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let mut records = read_records(&path)?;
            change(&mut records);
            write_records(&path, &records)
        })
        .await
        .map_err(std::io::Error::from)?
    }
}

fn read_records(path: &Path) -> RemoteResult<Vec<Record>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(error) if error.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(error) => return Err(error.into()),
    };

    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    serde_json::from_str(&content)
        .map_err(|error| RemoteError::Corrupt(format!("{}: {error}", path.display())))
}

fn write_records(path: &Path, records: &[Record]) -> RemoteResult<()> {
    let content = serde_json::to_string_pretty(records)
        .map_err(|error| RemoteError::Corrupt(error.to_string()))?;
    atomic_write(path, content.as_bytes())?;
    Ok(())
}

fn upsert(records: &mut Vec<Record>, record: Record) {
    if let Some(existing) = records.iter_mut().find(|item| item.id == record.id) {
        *existing = record;
    } else {
        records.insert(0, record);
    }
}

/// Write to a sibling temp file, flush it to disk, then rename over `path`.
fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("json.tmp");
    {
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(content)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }

    fs::rename(&temp_path, path)
}

impl RemoteStore for FileRemoteStore {
    async fn fetch_all(&self) -> RemoteResult<Vec<Record>> {
        self.simulate_latency().await;
        let _guard = self.lock.lock().await;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || read_records(&path))
            .await
            .map_err(std::io::Error::from)?
    }

    async fn create(&self, record: &Record) -> RemoteResult<()> {
        let record = record.clone();
        self.modify(move |records| upsert(records, record)).await
    }

    async fn update(&self, record: &Record) -> RemoteResult<()> {
        let record = record.clone();
        self.modify(move |records| upsert(records, record)).await
    }

    async fn delete(&self, id: &RecordId) -> RemoteResult<()> {
        let id = id.clone();
        self.modify(move |records| records.retain(|item| item.id != id))
            .await
    }
}
