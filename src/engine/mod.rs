//! # Obfuscation Engine
//!
//! Coordinator-fanout-join over per-table workers:
//! - The coordinator orders tables by priority and runs up to
//!   `ParallelThreads` workers concurrently; extra tables queue
//! - Each worker is single-threaded internally and processes its table's
//!   batches in strictly increasing offset order
//! - Cancellation is cooperative: workers observe the flag between
//!   batches; an in-flight sub-batch runs to completion
//! - The referential integrity resolver rewires related columns at load
//!   time so the pure generator alone guarantees cross-table consistency

use crate::cache::{CacheError, CacheStats};
use crate::checkpoint::{CheckpointError, RunStatus, TableStatus};
use crate::config::ConfigError;
use crate::db::DbError;
use crate::generator::GeneratorError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Engine error types
#[derive(Error, Debug)]
pub enum EngineError {
    /// Configuration problem
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Database problem
    #[error(transparent)]
    Db(#[from] DbError),

    /// Checkpoint store problem
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    /// Mapping cache problem
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Generator setup problem (bad custom type or validation regex)
    #[error(transparent)]
    Generator(#[from] GeneratorError),

    /// Filesystem problem (failure log, report)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Strict referential integrity found divergent column declarations
    #[error(
        "Relationship '{relationship}': column {table}.{column} declares data type \
         '{found}' but the primary column requires '{expected}'"
    )]
    RelationshipMismatch {
        /// Relationship name
        relationship: String,
        /// Related table
        table: String,
        /// Related column
        column: String,
        /// Primary column's data type
        expected: String,
        /// Related column's declared data type
        found: String,
    },
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

// Module declarations
pub mod coordinator;
pub mod progress;
pub mod resolver;
pub mod worker;

// Re-exports for convenience
pub use coordinator::{Engine, EngineOptions};
pub use resolver::resolve_relationships;

/// Final state of one table's run.
#[derive(Debug, Clone)]
pub struct TableOutcome {
    /// Fully qualified table name
    pub table_name: String,

    /// Terminal status
    pub status: TableStatus,

    /// Rows the run was meant to touch
    pub total_rows: u64,

    /// Rows in committed batches
    pub processed_rows: u64,

    /// Rows recorded in the failure log
    pub failed_rows: u64,

    /// Wall-clock duration of the worker
    pub duration: Duration,

    /// Terminal error, if the table failed
    pub error: Option<String>,
}

/// Aggregated result of one engine run.
#[derive(Debug)]
pub struct RunOutcome {
    /// Overall run status
    pub status: RunStatus,

    /// Whether the run ended on a cancellation signal
    pub cancelled: bool,

    /// Per-table outcomes in processing order
    pub tables: Vec<TableOutcome>,

    /// Rows in committed batches across tables
    pub total_rows_processed: u64,

    /// Failure log records across tables
    pub total_failed_rows: u64,

    /// Report location, when one was written
    pub report_path: Option<PathBuf>,

    /// Failure log location
    pub failure_log_path: PathBuf,

    /// Mapping cache counters at run end
    pub cache_stats: CacheStats,

    /// Wall-clock run duration
    pub duration: Duration,
}

impl RunOutcome {
    /// Process exit code for this outcome.
    ///
    /// `0` success, `4` partial failure, `5` cancelled.
    pub fn exit_code(&self) -> i32 {
        if self.cancelled {
            5
        } else if self
            .tables
            .iter()
            .any(|t| t.status == TableStatus::Failed)
        {
            4
        } else {
            0
        }
    }
}
