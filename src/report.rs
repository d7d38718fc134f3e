//! # Run Reports
//!
//! JSON summary of a completed run: per-table counts, durations and
//! throughput plus run-wide totals. Written to
//! `reports/<db>-obfuscation-<ts>.json` unless the mapping names an
//! explicit path.

use crate::engine::TableOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Default report directory.
pub const DEFAULT_ROOT: &str = "reports";

/// Per-table section of the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableReport {
    /// Fully qualified table name
    pub name: String,

    /// Terminal status
    pub status: String,

    /// Rows in scope for the run
    pub total_rows: u64,

    /// Rows in committed batches
    pub processed_rows: u64,

    /// Rows recorded in the failure journal
    pub failed_rows: u64,

    /// Worker wall-clock duration
    pub duration_ms: u64,

    /// Processing rate
    pub rows_per_second: f64,
}

/// Run-wide totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportTotals {
    /// Tables processed
    pub tables: usize,

    /// Rows processed across tables
    pub rows_processed: u64,

    /// Rows failed across tables
    pub rows_failed: u64,
}

/// The run report document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    /// Unique id of this run
    pub run_id: Uuid,

    /// Database the run targeted
    pub database: String,

    /// Config hash of the mapping
    pub config_hash: String,

    /// Whether the run was a dry run
    pub dry_run: bool,

    /// Run start time
    pub started_at: DateTime<Utc>,

    /// Report generation time
    pub finished_at: DateTime<Utc>,

    /// Per-table sections
    pub tables: Vec<TableReport>,

    /// Run-wide totals
    pub totals: ReportTotals,
}

/// Build and write the report, returning its path.
pub fn write_report(
    root: &Path,
    explicit_path: Option<&str>,
    database: &str,
    config_hash: &str,
    dry_run: bool,
    started_at: DateTime<Utc>,
    outcomes: &[TableOutcome],
) -> std::io::Result<PathBuf> {
    let finished_at = Utc::now();

    let tables: Vec<TableReport> = outcomes
        .iter()
        .map(|o| {
            let seconds = o.duration.as_secs_f64();
            TableReport {
                name: o.table_name.clone(),
                status: format!("{:?}", o.status),
                total_rows: o.total_rows,
                processed_rows: o.processed_rows,
                failed_rows: o.failed_rows,
                duration_ms: o.duration.as_millis() as u64,
                rows_per_second: if seconds > 0.0 {
                    o.processed_rows as f64 / seconds
                } else {
                    0.0
                },
            }
        })
        .collect();

    let report = RunReport {
        run_id: Uuid::new_v4(),
        database: database.to_string(),
        config_hash: config_hash.to_string(),
        dry_run,
        started_at,
        finished_at,
        totals: ReportTotals {
            tables: tables.len(),
            rows_processed: tables.iter().map(|t| t.processed_rows).sum(),
            rows_failed: tables.iter().map(|t| t.failed_rows).sum(),
        },
        tables,
    };

    let path = match explicit_path {
        Some(p) => PathBuf::from(p),
        None => root.join(format!(
            "{}-obfuscation-{}.json",
            database,
            finished_at.format("%Y%m%d_%H%M%S")
        )),
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, serde_json::to_string_pretty(&report)?)?;

    Ok(path)
}
