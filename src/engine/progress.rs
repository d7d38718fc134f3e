//! Per-table progress reporting.
//!
//! One throttled log line per table with throughput and an ETA, plus a
//! final summary line when the table finishes.

use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Minimum interval between progress lines for one table.
const REPORT_INTERVAL: Duration = Duration::from_secs(2);

/// Throttled progress reporter for one table.
pub struct ProgressTracker {
    table: String,
    total_rows: u64,
    started: Instant,
    last_report: Mutex<Instant>,
}

impl ProgressTracker {
    /// Start tracking a table.
    pub fn new(table: &str, total_rows: u64) -> Self {
        let now = Instant::now();
        Self {
            table: table.to_string(),
            total_rows,
            started: now,
            last_report: Mutex::new(now),
        }
    }

    /// Report progress; rate-limited to one line per interval.
    pub fn update(&self, processed_rows: u64) {
        let mut last = self.last_report.lock();
        if last.elapsed() < REPORT_INTERVAL {
            return;
        }
        *last = Instant::now();
        drop(last);

        let elapsed = self.started.elapsed().as_secs_f64();
        let rate = if elapsed > 0.0 {
            processed_rows as f64 / elapsed
        } else {
            0.0
        };
        let percent = if self.total_rows > 0 {
            processed_rows as f64 * 100.0 / self.total_rows as f64
        } else {
            100.0
        };
        let eta = if rate > 0.0 && processed_rows < self.total_rows {
            format!(
                ", ETA {}s",
                ((self.total_rows - processed_rows) as f64 / rate).ceil() as u64
            )
        } else {
            String::new()
        };

        log::info!(
            "[{}] {}/{} rows ({:.1}%) at {:.0} rows/s{}",
            self.table,
            processed_rows,
            self.total_rows,
            percent,
            rate,
            eta
        );
    }

    /// Emit the final line for the table.
    pub fn finish(&self, processed_rows: u64, failed_rows: u64) {
        let elapsed = self.started.elapsed();
        log::info!(
            "[{}] done: {} rows processed, {} failed in {:.1}s",
            self.table,
            processed_rows,
            failed_rows,
            elapsed.as_secs_f64()
        );
    }

    /// Elapsed time since tracking started.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}
