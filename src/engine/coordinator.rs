//! Engine coordinator.
//!
//! Owns the run: resolves relationships, connects, loads or creates the
//! checkpoint, fans out table workers bounded by `ParallelThreads`, joins
//! them and settles the terminal state (checkpoint cleared on success,
//! preserved on failure or cancellation, report written on success).

use super::resolver::resolve_relationships;
use super::worker::{CheckpointHandle, TableWorker};
use super::{Result, RunOutcome, TableOutcome};
use crate::cache::MappingCache;
use crate::checkpoint::{CheckpointState, CheckpointStore, RunStatus, TableStatus};
use crate::config::{loader, MappingDocument};
use crate::db::{self, SqlDialect};
use crate::failures::FailureLog;
use crate::generator::Generator;
use crate::report;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Engine runtime options.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Resume a matching checkpoint instead of starting fresh
    pub resume: bool,

    /// Checkpoint directory
    pub checkpoint_root: PathBuf,

    /// Failure journal directory
    pub failure_log_root: PathBuf,

    /// Report directory (unless the mapping names an explicit path)
    pub report_root: PathBuf,

    /// Install the SIGINT handler (on for the CLI, off for tests)
    pub install_signal_handler: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            resume: false,
            checkpoint_root: PathBuf::from(CheckpointStore::DEFAULT_ROOT),
            failure_log_root: PathBuf::from(FailureLog::DEFAULT_ROOT),
            report_root: PathBuf::from(report::DEFAULT_ROOT),
            install_signal_handler: false,
        }
    }
}

/// The obfuscation engine.
pub struct Engine {
    doc: MappingDocument,
    config_hash: String,
    options: EngineOptions,
}

impl Engine {
    /// Build an engine over a loaded mapping document.
    pub fn new(doc: MappingDocument, config_hash: impl Into<String>) -> Self {
        Self {
            doc,
            config_hash: config_hash.into(),
            options: EngineOptions::default(),
        }
    }

    /// Replace the runtime options.
    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// Run the engine to completion.
    pub async fn run(mut self) -> Result<RunOutcome> {
        let run_started = Instant::now();
        let started_at = chrono::Utc::now();

        resolve_relationships(&mut self.doc)?;

        let global = Arc::new(self.doc.global.clone());
        let generator = Arc::new(Generator::new(&global, &self.doc.data_types)?);
        let database = loader::database_name(&global.connection_string);
        let dialect = SqlDialect::from_url(&global.connection_string);

        let pool = db::connect(&global).await?;

        let store = Arc::new(CheckpointStore::open(&self.options.checkpoint_root)?);
        let state = if self.options.resume {
            store.load(&self.config_hash)?
        } else {
            store.clear(&self.config_hash)?;
            None
        };
        let state = match state {
            Some(mut resumed) => {
                log::info!(
                    "Resuming run {} started {} ({} rows already processed)",
                    self.config_hash,
                    resumed.started_at,
                    resumed.total_rows_processed
                );
                resumed.status = RunStatus::InProgress;
                resumed
            }
            None => CheckpointState::new(&self.config_hash, &database),
        };
        let checkpoint = CheckpointHandle::new(state, store.clone());

        let cache = Arc::new(MappingCache::new(global.max_cache_size));
        let cache_dir = PathBuf::from(&global.mapping_cache_directory);
        let loaded = cache.load_from_disk(&cache_dir, &database, |dt| generator.is_cached(dt))?;
        if loaded > 0 {
            log::info!("Loaded {} persisted cache entries", loaded);
        }

        let failures = Arc::new(FailureLog::open(&self.options.failure_log_root, &database)?);

        let cancel = Arc::new(AtomicBool::new(false));
        if self.options.install_signal_handler {
            install_sigint_watcher(cancel.clone());
        }

        // Priority ascending, declaration order breaking ties.
        let mut ordered: Vec<_> = self
            .doc
            .tables
            .iter()
            .filter(|t| t.enabled && t.enabled_columns().next().is_some())
            .cloned()
            .collect();
        ordered.sort_by_key(|t| t.priority);

        log::info!(
            "Obfuscating {} table(s) across {} worker(s)",
            ordered.len(),
            global.parallel_threads
        );

        let semaphore = Arc::new(Semaphore::new(global.parallel_threads));
        let mut join_set: JoinSet<(usize, TableOutcome)> = JoinSet::new();

        for (index, spec) in ordered.into_iter().enumerate() {
            let worker = TableWorker {
                spec,
                global: global.clone(),
                generator: generator.clone(),
                cache: cache.clone(),
                failures: failures.clone(),
                pool: pool.clone(),
                dialect,
                checkpoint: checkpoint.clone(),
                cancel: cancel.clone(),
            };
            let semaphore = semaphore.clone();
            join_set.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("semaphore never closes");
                (index, worker.run().await)
            });
        }

        let mut outcomes: Vec<(usize, TableOutcome)> = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(entry) => outcomes.push(entry),
                Err(e) => log::error!("worker task panicked: {}", e),
            }
        }
        outcomes.sort_by_key(|(index, _)| *index);
        let tables: Vec<TableOutcome> = outcomes.into_iter().map(|(_, o)| o).collect();

        let cancelled = cancel.load(Ordering::Relaxed);
        let any_failed = tables.iter().any(|t| t.status == TableStatus::Failed);

        let status = if cancelled {
            // Leave the persisted status InProgress so the run is resumable.
            RunStatus::InProgress
        } else if any_failed {
            RunStatus::Failed
        } else {
            RunStatus::Completed
        };

        let mut report_path = None;
        match status {
            RunStatus::Completed => {
                cache.flush_to_disk(&cache_dir, &database)?;
                store.clear(&self.config_hash)?;
                if self.doc.post_processing.generate_report {
                    let path = report::write_report(
                        &self.options.report_root,
                        self.doc.post_processing.report_path.as_deref(),
                        &database,
                        &self.config_hash,
                        global.dry_run,
                        started_at,
                        &tables,
                    )?;
                    log::info!("Report written to {}", path.display());
                    report_path = Some(path);
                }
            }
            RunStatus::Failed => {
                checkpoint.with_state(|s| s.status = RunStatus::Failed);
                checkpoint.flush()?;
                log::error!(
                    "Run failed; checkpoint preserved at {}",
                    store.root().join(format!("checkpoint_{}.json", self.config_hash)).display()
                );
            }
            RunStatus::InProgress => {
                checkpoint.flush()?;
                log::warn!("Run cancelled; checkpoint preserved for resume");
            }
        }

        failures.complete()?;

        let outcome = RunOutcome {
            status,
            cancelled,
            total_rows_processed: tables.iter().map(|t| t.processed_rows).sum(),
            total_failed_rows: tables.iter().map(|t| t.failed_rows).sum(),
            report_path,
            failure_log_path: failures.path().to_path_buf(),
            cache_stats: cache.stats(),
            duration: run_started.elapsed(),
            tables,
        };

        log_summary(&outcome);
        Ok(outcome)
    }
}

/// First SIGINT flips the cooperative flag; a second forces exit 5.
fn install_sigint_watcher(cancel: Arc<AtomicBool>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupt received; finishing in-flight sub-batches then stopping");
            cancel.store(true, Ordering::Relaxed);
            if tokio::signal::ctrl_c().await.is_ok() {
                log::error!("Second interrupt; terminating immediately");
                std::process::exit(5);
            }
        }
    });
}

fn log_summary(outcome: &RunOutcome) {
    log::info!(
        "Run {:?}: {} rows processed, {} failed across {} table(s) in {:.1}s",
        outcome.status,
        outcome.total_rows_processed,
        outcome.total_failed_rows,
        outcome.tables.len(),
        outcome.duration.as_secs_f64()
    );
    for table in &outcome.tables {
        log::info!(
            "  {}: {:?} ({}/{} rows, {} failed)",
            table.table_name,
            table.status,
            table.processed_rows,
            table.total_rows,
            table.failed_rows
        );
    }
    let stats = &outcome.cache_stats;
    log::info!(
        "Cache: {} entries, {} hits, {} misses, {} pass-throughs",
        stats.entries,
        stats.hits,
        stats.misses,
        stats.pass_throughs
    );
}
