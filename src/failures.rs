//! # Failure Log
//!
//! Append-only journal of rows that failed to update. Each line is one
//! structured JSON record with the row's keys, original and attempted
//! values and the error. Appends are mutex-serialized and flushed
//! immediately so the journal survives a crash. The journal never affects
//! checkpoint progress; a failed row is recorded and the batch continues.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// One row that could not be updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedRow {
    /// Table the row belongs to
    pub table_name: String,

    /// Primary key values identifying the row
    pub primary_key_values: BTreeMap<String, String>,

    /// Original cell values (enabled columns only)
    pub original_values: BTreeMap<String, Option<String>>,

    /// Values the engine attempted to write
    pub obfuscated_values: BTreeMap<String, Option<String>>,

    /// Why the row failed
    pub error_message: String,

    /// When the failure was recorded
    pub timestamp: DateTime<Utc>,
}

/// Append-only failure journal for one run.
pub struct FailureLog {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
    records: AtomicU64,
}

impl FailureLog {
    /// Default journal directory.
    pub const DEFAULT_ROOT: &'static str = "logs/failures";

    /// Open a journal for `database` under `root`.
    ///
    /// The file is named `<database>_failures_<timestamp>.log` and starts
    /// with human-readable header comments.
    pub fn open(root: impl AsRef<Path>, database: &str) -> std::io::Result<Self> {
        let root = root.as_ref();
        std::fs::create_dir_all(root)?;

        let started = Utc::now();
        let path = root.join(format!(
            "{}_failures_{}.log",
            database,
            started.format("%Y%m%d_%H%M%S")
        ));

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "# Failure log for database '{}'", database)?;
        writeln!(writer, "# Run: {}", Uuid::new_v4())?;
        writeln!(writer, "# Started: {}", started.to_rfc3339())?;
        writeln!(writer, "# One JSON record per line")?;
        writer.flush()?;

        Ok(Self {
            path,
            writer: Mutex::new(writer),
            records: AtomicU64::new(0),
        })
    }

    /// Append one failed row and flush.
    pub fn record(&self, row: &FailedRow) -> std::io::Result<()> {
        let line = serde_json::to_string(row)?;
        let mut writer = self.writer.lock();
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        self.records.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Write the trailing completion marker.
    pub fn complete(&self) -> std::io::Result<()> {
        let mut writer = self.writer.lock();
        writeln!(writer, "# Completed: {}", Utc::now().to_rfc3339())?;
        writer.flush()
    }

    /// Number of records appended by this process.
    pub fn count(&self) -> u64 {
        self.records.load(Ordering::Relaxed)
    }

    /// Path of the journal file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed_row(table: &str, pk: u64, error: &str) -> FailedRow {
        FailedRow {
            table_name: table.to_string(),
            primary_key_values: BTreeMap::from([("Id".to_string(), pk.to_string())]),
            original_values: BTreeMap::from([(
                "Email".to_string(),
                Some("jane@corp.com".to_string()),
            )]),
            obfuscated_values: BTreeMap::from([("Email".to_string(), None)]),
            error_message: error.to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_records_are_line_oriented_json() {
        let dir = tempfile::tempdir().unwrap();
        let journal = FailureLog::open(dir.path(), "crm").unwrap();
        journal.record(&failed_row("dbo.Customers", 7, "timeout")).unwrap();
        journal.record(&failed_row("dbo.Customers", 8, "timeout")).unwrap();
        journal.complete().unwrap();
        assert_eq!(journal.count(), 2);

        let contents = std::fs::read_to_string(journal.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert!(lines[0].starts_with("# Failure log for database 'crm'"));
        assert!(lines.last().unwrap().starts_with("# Completed:"));

        let records: Vec<FailedRow> = lines
            .iter()
            .filter(|l| !l.starts_with('#'))
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].primary_key_values["Id"], "7");
        assert_eq!(records[1].error_message, "timeout");
    }

    #[test]
    fn test_records_survive_without_complete_marker() {
        let dir = tempfile::tempdir().unwrap();
        let journal = FailureLog::open(dir.path(), "crm").unwrap();
        journal.record(&failed_row("t", 1, "boom")).unwrap();
        // No complete(); the record must already be on disk.
        let contents = std::fs::read_to_string(journal.path()).unwrap();
        assert!(contents.lines().any(|l| l.contains("boom")));
    }
}
