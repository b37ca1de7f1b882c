//! Append-only decision log.
//!
//! Every applied decision is recorded as a [`PropositionLog`] entry. Entries
//! double as labeled training data for the predictive service, so a failed
//! append must surface to the caller rather than drop silently.
//!
//! Two stores are provided: [`MemoryLogStore`] for tests and embedded use,
//! and [`FileLogStore`] which writes each record through to a JSONL file and
//! reloads it on open.

use crate::types::{AlertCategory, Decision};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use thiserror::Error;

/// Errors from decision-log stores.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to write log entry: {0}")]
    Write(#[source] std::io::Error),

    #[error("failed to open log file: {0}")]
    Open(#[source] std::io::Error),

    #[error("failed to encode log entry: {0}")]
    Encode(#[from] serde_json::Error),
}

/// One recorded decision, with the features later used for training.
///
/// Append-only: never mutated after it is written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropositionLog {
    pub alert_id: String,
    pub request_id: String,
    pub proposition_id: String,
    pub decision: Decision,
    pub outcome: Option<String>,
    pub recorded_at: DateTime<Utc>,
    pub alert_severity: u8,
    pub alert_category: AlertCategory,
    pub proposition_confidence: f64,
    pub fetch_latency_ms: u64,
}

/// Append-only store of decision records.
///
/// `append` is the only mutator. `query` returns the most recent entries
/// first, optionally filtered by alert id. Implementations must tolerate
/// concurrent appends without losing writes; retention is out of scope.
pub trait DecisionLogStore: Send + Sync {
    fn append(&self, entry: PropositionLog) -> Result<(), StoreError>;

    fn query(&self, alert_id: Option<&str>, limit: usize) -> Vec<PropositionLog>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn query_slice(entries: &[PropositionLog], alert_id: Option<&str>, limit: usize) -> Vec<PropositionLog> {
    entries
        .iter()
        .rev()
        .filter(|e| alert_id.map_or(true, |id| e.alert_id == id))
        .take(limit)
        .cloned()
        .collect()
}

/// In-memory decision log.
#[derive(Default)]
pub struct MemoryLogStore {
    entries: RwLock<Vec<PropositionLog>>,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write all entries as JSON lines, for training export.
    pub fn export_jsonl<W: Write>(&self, mut writer: W) -> Result<(), StoreError> {
        for entry in self.entries.read().iter() {
            serde_json::to_writer(&mut writer, entry)?;
            writer.write_all(b"\n").map_err(StoreError::Write)?;
        }
        Ok(())
    }
}

impl DecisionLogStore for MemoryLogStore {
    fn append(&self, entry: PropositionLog) -> Result<(), StoreError> {
        self.entries.write().push(entry);
        Ok(())
    }

    fn query(&self, alert_id: Option<&str>, limit: usize) -> Vec<PropositionLog> {
        query_slice(&self.entries.read(), alert_id, limit)
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }
}

/// JSONL-backed decision log.
///
/// Appends write through to the file before the in-memory index is updated,
/// so an entry is never visible to `query` unless it is durable.
pub struct FileLogStore {
    inner: Mutex<FileLogInner>,
}

struct FileLogInner {
    file: File,
    entries: Vec<PropositionLog>,
}

impl FileLogStore {
    /// Open (or create) a JSONL log file, loading any existing entries.
    ///
    /// Lines that fail to parse are skipped with a warning rather than
    /// rejecting the whole file; the log may legitimately contain records
    /// from older schema versions.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let mut entries = Vec::new();

        if path.exists() {
            let reader = BufReader::new(File::open(path).map_err(StoreError::Open)?);
            for line in reader.lines() {
                let line = line.map_err(StoreError::Open)?;
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<PropositionLog>(&line) {
                    Ok(entry) => entries.push(entry),
                    Err(error) => {
                        tracing::warn!(%error, "skipping unparseable decision log line");
                    }
                }
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(StoreError::Open)?;

        Ok(Self {
            inner: Mutex::new(FileLogInner { file, entries }),
        })
    }
}

impl DecisionLogStore for FileLogStore {
    fn append(&self, entry: PropositionLog) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let mut line = serde_json::to_vec(&entry)?;
        line.push(b'\n');
        inner.file.write_all(&line).map_err(StoreError::Write)?;
        inner.file.flush().map_err(StoreError::Write)?;
        inner.entries.push(entry);
        Ok(())
    }

    fn query(&self, alert_id: Option<&str>, limit: usize) -> Vec<PropositionLog> {
        query_slice(&self.inner.lock().entries, alert_id, limit)
    }

    fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }
}
