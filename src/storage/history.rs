//! Append-only run history
//!
//! Every run attempt leaves exactly one immutable record. The log is a flat
//! JSONL file: one JSON object per line, appended and never rewritten.
//! Queries read the whole file back, filter, and return records newest
//! first, which is plenty for the volumes a publishing schedule produces.
//! A torn or hand-mangled line is skipped with a warning instead of taking
//! the whole history down.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::models::{HistoryRecord, RecordStatus, RunKind};

/// Filter for history queries; unset fields match everything
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    pub account_id: Option<String>,
    pub date: Option<NaiveDate>,
    pub kind: Option<RunKind>,
    pub status: Option<RecordStatus>,
    pub limit: Option<usize>,
}

impl HistoryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_account(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    pub fn on_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn of_kind(mut self, kind: RunKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_status(mut self, status: RecordStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn latest(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn matches(&self, record: &HistoryRecord) -> bool {
        if let Some(account_id) = &self.account_id {
            if &record.account_id != account_id {
                return false;
            }
        }
        if let Some(date) = self.date {
            // stored calendar date, never recomputed from the timestamp
            if record.date != date {
                return false;
            }
        }
        if let Some(kind) = self.kind {
            if record.kind != kind {
                return false;
            }
        }
        if let Some(status) = self.status {
            if record.status != status {
                return false;
            }
        }
        true
    }
}

/// Flat-file append-only record store
#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl HistoryStore {
    /// Open a store at the given path, creating parent directories
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create history directory: {}", parent.display()))?;
        }
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record. Records are immutable once written.
    pub fn append(&self, record: &HistoryRecord) -> Result<()> {
        let mut line = serde_json::to_string(record).context("Failed to serialize history record")?;
        line.push('\n');

        // one write call per record, serialized within the process
        let _guard = self.write_lock.lock();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open history file: {}", self.path.display()))?;
        file.write_all(line.as_bytes())
            .with_context(|| format!("Failed to append history record: {}", self.path.display()))?;

        debug!(
            account_id = %record.account_id,
            kind = %record.kind,
            status = %record.status,
            "history record appended"
        );
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<HistoryRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open history file: {}", self.path.display()))?;
        let reader = BufReader::new(file);

        let mut records = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line.with_context(|| {
                format!("Failed to read history file: {}", self.path.display())
            })?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<HistoryRecord>(&line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(line = index + 1, error = %e, "skipping malformed history line");
                }
            }
        }
        Ok(records)
    }

    /// Query records matching the filter, most recent first
    pub fn query(&self, filter: &HistoryFilter) -> Result<Vec<HistoryRecord>> {
        let mut records: Vec<HistoryRecord> = self
            .read_all()?
            .into_iter()
            .filter(|r| filter.matches(r))
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = filter.limit {
            records.truncate(limit);
        }
        Ok(records)
    }

    /// The `n` most recent records of any kind
    pub fn recent(&self, n: usize) -> Result<Vec<HistoryRecord>> {
        self.query(&HistoryFilter::new().latest(n))
    }

    /// Count records matching the filter
    pub fn count(&self, filter: &HistoryFilter) -> Result<usize> {
        Ok(self.query(filter)?.len())
    }
}
