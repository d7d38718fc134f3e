//! # Checkpoint Store
//!
//! Durable per-run progress, keyed by the config hash:
//! - One JSON document per run under `checkpoints/`
//! - Atomic saves: write to `.tmp`, rename over the live file; readers see
//!   the old or the new state, never a torn one
//! - Saves are serialized by a process-wide mutex inside the store
//! - Completed runs delete their checkpoint; failed runs preserve it

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Checkpoint error types
#[derive(Error, Debug)]
pub enum CheckpointError {
    /// I/O error reading or writing checkpoint files
    #[error("Checkpoint I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Checkpoint file held invalid JSON
    #[error("Checkpoint file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Result type for checkpoint operations
pub type Result<T> = std::result::Result<T, CheckpointError>;

/// Overall run status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Run is underway
    InProgress,
    /// Every table completed
    Completed,
    /// At least one table failed
    Failed,
}

/// Per-table status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableStatus {
    /// No batch has been read yet
    NotStarted,
    /// Batches are being processed
    InProgress,
    /// All rows processed
    Completed,
    /// Worker hit an unrecoverable error
    Failed,
}

/// Progress of one read batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchProgress {
    /// Ordinal of the batch within its table, from zero
    pub batch_number: u64,

    /// Row offset the batch was read at
    pub offset: u64,

    /// Number of rows in the batch
    pub size: u64,

    /// True only after the batch's UPDATEs committed
    pub is_processed: bool,

    /// Rows actually written
    pub rows_processed: u64,

    /// Error recorded when the batch failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Progress of one table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableProgress {
    /// Fully qualified table name
    pub table_name: String,

    /// Table status
    pub status: TableStatus,

    /// Row count at run start (after conditions)
    pub total_rows: u64,

    /// Sum of sizes of processed batches
    pub processed_rows: u64,

    /// Batch records in offset order
    #[serde(default)]
    pub batches: Vec<BatchProgress>,
}

impl TableProgress {
    /// Whether the batch at `offset` already committed.
    pub fn batch_is_processed(&self, offset: u64) -> bool {
        self.batches
            .iter()
            .any(|b| b.offset == offset && b.is_processed)
    }

    /// Record a committed batch and recompute the processed row count.
    pub fn record_batch(&mut self, batch_number: u64, offset: u64, size: u64, rows_written: u64) {
        match self.batches.iter_mut().find(|b| b.offset == offset) {
            Some(batch) => {
                batch.is_processed = true;
                batch.rows_processed = rows_written;
                batch.error_message = None;
            }
            None => self.batches.push(BatchProgress {
                batch_number,
                offset,
                size,
                is_processed: true,
                rows_processed: rows_written,
                error_message: None,
            }),
        }
        self.processed_rows = self
            .batches
            .iter()
            .filter(|b| b.is_processed)
            .map(|b| b.size)
            .sum();
    }

    /// Record a failed batch without marking it processed.
    pub fn record_batch_failure(&mut self, batch_number: u64, offset: u64, size: u64, error: &str) {
        match self.batches.iter_mut().find(|b| b.offset == offset) {
            Some(batch) => batch.error_message = Some(error.to_string()),
            None => self.batches.push(BatchProgress {
                batch_number,
                offset,
                size,
                is_processed: false,
                rows_processed: 0,
                error_message: Some(error.to_string()),
            }),
        }
    }
}

/// Durable state of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointState {
    /// Hash of the mapping document this run executes
    pub config_hash: String,

    /// Database the run targets
    pub database_name: String,

    /// When the run first started
    pub started_at: DateTime<Utc>,

    /// Last save time
    pub last_updated_at: DateTime<Utc>,

    /// Run status
    pub status: RunStatus,

    /// Per-table progress
    #[serde(default)]
    pub tables: Vec<TableProgress>,

    /// Sum of processed rows across tables
    pub total_rows_processed: u64,
}

impl CheckpointState {
    /// Fresh state for a new run.
    pub fn new(config_hash: &str, database_name: &str) -> Self {
        let now = Utc::now();
        Self {
            config_hash: config_hash.to_string(),
            database_name: database_name.to_string(),
            started_at: now,
            last_updated_at: now,
            status: RunStatus::InProgress,
            tables: Vec::new(),
            total_rows_processed: 0,
        }
    }

    /// Fetch or create the record for one table.
    pub fn table_mut(&mut self, table_name: &str) -> &mut TableProgress {
        if let Some(index) = self.tables.iter().position(|t| t.table_name == table_name) {
            return &mut self.tables[index];
        }
        self.tables.push(TableProgress {
            table_name: table_name.to_string(),
            status: TableStatus::NotStarted,
            total_rows: 0,
            processed_rows: 0,
            batches: Vec::new(),
        });
        self.tables.last_mut().unwrap()
    }

    /// Recompute the run-wide processed row count.
    pub fn refresh_totals(&mut self) {
        self.total_rows_processed = self.tables.iter().map(|t| t.processed_rows).sum();
    }

    /// Whether the state describes a run an operator may resume.
    pub fn is_resumable(&self) -> bool {
        matches!(self.status, RunStatus::InProgress | RunStatus::Failed)
    }
}

/// Durable checkpoint store rooted at a directory.
pub struct CheckpointStore {
    root: PathBuf,
    save_lock: Mutex<u64>,
}

impl CheckpointStore {
    /// Default checkpoint directory.
    pub const DEFAULT_ROOT: &'static str = "checkpoints";

    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            save_lock: Mutex::new(0),
        })
    }

    fn path_for(&self, config_hash: &str) -> PathBuf {
        self.root.join(format!("checkpoint_{}.json", config_hash))
    }

    /// Load the state for a config hash, if one exists.
    pub fn load(&self, config_hash: &str) -> Result<Option<CheckpointState>> {
        let path = self.path_for(config_hash);
        if !path.is_file() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    /// Save a state atomically.
    ///
    /// Writes `<file>.tmp` and renames it over the live file while holding
    /// the store's mutex, so concurrent saves from different workers are
    /// serialized and readers never observe a torn file. The run-wide row
    /// count must not decrease between saves.
    pub fn save(&self, state: &CheckpointState) -> Result<()> {
        let mut last_total = self.save_lock.lock();

        if state.total_rows_processed < *last_total {
            log::warn!(
                "Checkpoint row count regressed ({} -> {}); keeping the save but this \
                 indicates a worker accounting bug",
                *last_total,
                state.total_rows_processed
            );
            debug_assert!(false, "checkpoint total_rows_processed regressed");
        }
        *last_total = state.total_rows_processed;

        let mut snapshot = state.clone();
        snapshot.last_updated_at = Utc::now();

        let path = self.path_for(&state.config_hash);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(&snapshot)?;
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &path)?;

        Ok(())
    }

    /// Delete the checkpoint for a config hash.
    pub fn clear(&self, config_hash: &str) -> Result<()> {
        let path = self.path_for(config_hash);
        if path.is_file() {
            std::fs::remove_file(&path)?;
        }
        Ok(())
    }

    /// The store's root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }
}
