//! Append-only change log sinks.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::ValueEnum;
use parking_lot::Mutex;
use tracing::warn;

use crate::error::{CovtrackError, Result};
use crate::model::ChangeLogRecord;

/// On-disk encoding of the change log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// One YAML list; every append adds one `- ` item.
    #[default]
    Yaml,
    /// JSON Lines; one object per line.
    Json,
}

/// Serialize a single record as it appears in the log.
pub fn render_record(record: &ChangeLogRecord, format: LogFormat) -> Result<String> {
    match format {
        LogFormat::Yaml => serde_yaml::to_string(std::slice::from_ref(record))
            .map_err(|e| CovtrackError::Serialize(e.to_string())),
        LogFormat::Json => {
            let mut line = serde_json::to_string(record)
                .map_err(|e| CovtrackError::Serialize(e.to_string()))?;
            line.push('\n');
            Ok(line)
        }
    }
}

/// A durable, ordered destination for change log records.
pub trait ChangeLog {
    /// Append exactly one record. Earlier records are never rewritten.
    fn append(&mut self, record: &ChangeLogRecord) -> Result<()>;
}

/// File-backed change log. The first append of a `FileChangeLog` truncates
/// the target, so each process lifetime starts a fresh log.
pub struct FileChangeLog {
    path: PathBuf,
    format: LogFormat,
    started: bool,
}

impl FileChangeLog {
    pub fn new(path: impl Into<PathBuf>, format: LogFormat) -> Self {
        Self {
            path: path.into(),
            format,
            started: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> LogFormat {
        self.format
    }

    fn write(&self, text: &str) -> io::Result<()> {
        let mut options = OpenOptions::new();
        options.create(true);
        if self.started {
            options.append(true);
        } else {
            options.write(true).truncate(true);
        }
        let mut file = options.open(&self.path)?;
        append_whole(&mut file, text.as_bytes())
    }
}

/// A log destination that can be cut back to an earlier length.
trait Truncate: Write {
    fn len(&self) -> io::Result<u64>;
    fn truncate(&mut self, len: u64) -> io::Result<()>;
    fn sync(&mut self) -> io::Result<()>;
}

impl Truncate for File {
    fn len(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }
}

/// Write and sync `bytes`, or leave `dest` at its old length. A record is
/// either fully in the log or not in it at all.
fn append_whole<T: Truncate>(dest: &mut T, bytes: &[u8]) -> io::Result<()> {
    let start = dest.len()?;
    let result = dest.write_all(bytes).and_then(|()| dest.sync());
    if result.is_err() {
        if let Err(e) = dest.truncate(start) {
            warn!(error = %e, len = start, "failed to roll back partial change log append");
        }
    }
    result
}

impl ChangeLog for FileChangeLog {
    fn append(&mut self, record: &ChangeLogRecord) -> Result<()> {
        let text = render_record(record, self.format)?;
        self.write(&text).map_err(|source| CovtrackError::WriteFailure {
            path: self.path.clone(),
            source,
        })?;
        self.started = true;
        Ok(())
    }
}

/// In-memory change log. Clones share the same record list, so a caller can
/// keep one handle for reading while another is owned by a tracker.
#[derive(Debug, Clone, Default)]
pub struct MemoryChangeLog {
    records: Arc<Mutex<Vec<ChangeLogRecord>>>,
}

impl MemoryChangeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<ChangeLogRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl ChangeLog for MemoryChangeLog {
    fn append(&mut self, record: &ChangeLogRecord) -> Result<()> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}
