//! Table worker.
//!
//! Drives one table end to end: checkpoint entry, batch iteration in
//! offset order, per-cell generation through the cache, fallback policy,
//! sub-batched writes, failure journaling and checkpoint marking. A batch
//! is marked processed only after every sub-batch committed; a batch with
//! any write failure is left unmarked so a resume re-executes it, which
//! is value-idempotent because the generator is deterministic.

use super::progress::ProgressTracker;
use super::{Result, TableOutcome};
use crate::cache::MappingCache;
use crate::checkpoint::{CheckpointState, CheckpointStore, TableStatus};
use crate::config::{FallbackAction, FallbackSpec, GlobalSettings, TableSpec};
use crate::db::{BatchReader, BatchWriter, CellValue, RowUpdate, SqlDialect, TableRow};
use crate::failures::{FailedRow, FailureLog};
use crate::generator::{CompiledValidation, Generator};
use chrono::Utc;
use parking_lot::Mutex;
use sqlx::AnyPool;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Checkpoint flush cadence: whichever comes first.
const FLUSH_EVERY_BATCHES: u32 = 5;
const FLUSH_EVERY: Duration = Duration::from_secs(10);

struct FlushMeta {
    batches_since_flush: u32,
    last_flush: Instant,
}

/// Shared handle over the run's checkpoint state.
///
/// Workers mutate their own table record under the state mutex; saves go
/// through the store, which serializes and renames atomically.
#[derive(Clone)]
pub struct CheckpointHandle {
    state: Arc<Mutex<CheckpointState>>,
    store: Arc<CheckpointStore>,
    flush_meta: Arc<Mutex<FlushMeta>>,
}

impl CheckpointHandle {
    /// Wrap a state and its store.
    pub fn new(state: CheckpointState, store: Arc<CheckpointStore>) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
            store,
            flush_meta: Arc::new(Mutex::new(FlushMeta {
                batches_since_flush: 0,
                last_flush: Instant::now(),
            })),
        }
    }

    /// Run a closure against the mutable state.
    pub fn with_state<R>(&self, f: impl FnOnce(&mut CheckpointState) -> R) -> R {
        f(&mut self.state.lock())
    }

    /// Snapshot the current state.
    pub fn snapshot(&self) -> CheckpointState {
        self.state.lock().clone()
    }

    /// Persist the state now.
    pub fn flush(&self) -> crate::checkpoint::Result<()> {
        let snapshot = {
            let mut state = self.state.lock();
            state.refresh_totals();
            state.clone()
        };
        self.store.save(&snapshot)
    }

    /// Persist the state if the debounce window elapsed.
    pub fn flush_after_batch(&self) -> crate::checkpoint::Result<()> {
        let due = {
            let mut meta = self.flush_meta.lock();
            meta.batches_since_flush += 1;
            if meta.batches_since_flush >= FLUSH_EVERY_BATCHES
                || meta.last_flush.elapsed() >= FLUSH_EVERY
            {
                meta.batches_since_flush = 0;
                meta.last_flush = Instant::now();
                true
            } else {
                false
            }
        };
        if due {
            self.flush()
        } else {
            Ok(())
        }
    }
}

/// Per-column execution plan with validation compiled once.
struct ColumnPlan {
    name: String,
    data_type: String,
    preserve_length: bool,
    only_if_not_null: bool,
    fallback: Option<FallbackSpec>,
    validation: Option<CompiledValidation>,
    cached: bool,
}

fn build_plans(spec: &TableSpec, generator: &Generator) -> Result<Vec<ColumnPlan>> {
    let mut plans = Vec::new();
    for column in spec.enabled_columns() {
        let validation = column
            .validation
            .as_ref()
            .map(CompiledValidation::compile)
            .transpose()?;
        plans.push(ColumnPlan {
            name: column.name.clone(),
            data_type: column.data_type.clone(),
            preserve_length: column.preserve_length,
            only_if_not_null: column.only_if_not_null(),
            fallback: column.fallback.clone(),
            validation,
            cached: generator.is_cached(&column.data_type),
        });
    }
    Ok(plans)
}

/// Values carried alongside an update for failure journaling.
struct RowMeta {
    key_values: BTreeMap<String, String>,
    originals: BTreeMap<String, Option<String>>,
    attempted: BTreeMap<String, Option<String>>,
}

enum RowAction {
    Update(RowUpdate, RowMeta),
    Skip,
}

/// Worker driving one table.
pub struct TableWorker {
    /// Table spec (after relationship resolution)
    pub spec: TableSpec,
    /// Global settings
    pub global: Arc<GlobalSettings>,
    /// Shared generator
    pub generator: Arc<Generator>,
    /// Shared mapping cache
    pub cache: Arc<MappingCache>,
    /// Shared failure journal
    pub failures: Arc<FailureLog>,
    /// Connection pool (one connection in use at a time per worker)
    pub pool: AnyPool,
    /// SQL dialect
    pub dialect: SqlDialect,
    /// Shared checkpoint handle
    pub checkpoint: CheckpointHandle,
    /// Cooperative cancellation flag, observed between batches
    pub cancel: Arc<AtomicBool>,
}

impl TableWorker {
    /// Process the table to a terminal state.
    pub async fn run(self) -> TableOutcome {
        let started = Instant::now();
        let table_name = self.spec.full_name.clone();

        match self.process(started).await {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("[{}] worker failed: {}", table_name, e);
                let (total, processed) = self.checkpoint.with_state(|s| {
                    let table = s.table_mut(&table_name);
                    table.status = TableStatus::Failed;
                    (table.total_rows, table.processed_rows)
                });
                if let Err(save_err) = self.checkpoint.flush() {
                    log::error!("[{}] checkpoint save failed: {}", table_name, save_err);
                }
                TableOutcome {
                    table_name,
                    status: TableStatus::Failed,
                    total_rows: total,
                    processed_rows: processed,
                    failed_rows: 0,
                    duration: started.elapsed(),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    async fn process(&self, started: Instant) -> Result<TableOutcome> {
        let table_name = self.spec.full_name.clone();
        let timeout = Duration::from_secs(self.global.command_timeout_seconds);
        let batch_size = self.spec.effective_batch_size(self.global.batch_size);

        let reader = BatchReader::new(&self.pool, self.dialect, &self.spec, timeout);
        let writer = BatchWriter::new(
            &self.pool,
            self.dialect,
            &self.spec.full_name,
            self.global.sql_batch_size,
            timeout,
            self.global.dry_run,
        );
        let plans = build_plans(&self.spec, &self.generator)?;

        // Checkpoint entry: reuse a resumed record, count rows for a new one.
        let resumed_total = self.checkpoint.with_state(|s| {
            let table = s.table_mut(&table_name);
            if table.status == TableStatus::Completed {
                Some(None)
            } else if table.total_rows > 0 || !table.batches.is_empty() {
                Some(Some(table.total_rows))
            } else {
                None
            }
        });

        if let Some(None) = resumed_total {
            log::info!("[{}] already completed in a previous run", table_name);
            let (total, processed) = self.checkpoint.with_state(|s| {
                let table = s.table_mut(&table_name);
                (table.total_rows, table.processed_rows)
            });
            return Ok(TableOutcome {
                table_name,
                status: TableStatus::Completed,
                total_rows: total,
                processed_rows: processed,
                failed_rows: 0,
                duration: started.elapsed(),
                error: None,
            });
        }

        let total_rows = match resumed_total {
            Some(Some(total)) => total,
            _ => reader.count_rows().await?,
        };

        self.checkpoint.with_state(|s| {
            let table = s.table_mut(&table_name);
            table.total_rows = total_rows;
            table.status = TableStatus::InProgress;
        });
        self.checkpoint.flush()?;

        log::info!(
            "[{}] {} rows in batches of {}{}",
            table_name,
            total_rows,
            batch_size,
            if self.global.dry_run { " (dry run)" } else { "" }
        );

        let progress = ProgressTracker::new(&table_name, total_rows);
        let mut batch_number: u64 = 0;
        let mut offset: u64 = 0;
        let mut failed_batches: u64 = 0;
        let mut failed_rows: u64 = 0;
        let mut cancelled = false;

        while total_rows > 0 {
            if self.cancel.load(Ordering::Relaxed) {
                cancelled = true;
                break;
            }

            // Resumed batches are skipped without touching the database.
            let already_done = self
                .checkpoint
                .with_state(|s| s.table_mut(&table_name).batch_is_processed(offset));
            if already_done {
                log::debug!("[{}] skipping committed batch at offset {}", table_name, offset);
                batch_number += 1;
                offset += batch_size;
                if offset >= total_rows {
                    break;
                }
                continue;
            }

            let page = match reader.fetch_page(offset, batch_size).await {
                Ok(page) => page,
                Err(e) => {
                    log::error!("[{}] batch at offset {} unreadable: {}", table_name, offset, e);
                    self.checkpoint.with_state(|s| {
                        s.table_mut(&table_name).record_batch_failure(
                            batch_number,
                            offset,
                            batch_size,
                            &e.to_string(),
                        )
                    });
                    failed_batches += 1;
                    batch_number += 1;
                    offset += batch_size;
                    if offset >= total_rows {
                        break;
                    }
                    continue;
                }
            };
            if page.is_empty() {
                break;
            }
            let page_len = page.len() as u64;

            let mut updates = Vec::new();
            let mut metas = Vec::new();
            for row in &page {
                match self.obfuscate_row(row, &plans, &mut failed_rows)? {
                    RowAction::Update(update, meta) => {
                        updates.push(update);
                        metas.push(meta);
                    }
                    RowAction::Skip => {}
                }
            }

            let mut batch_ok = true;
            let mut rows_written = 0u64;
            for result in writer.write_updates(&updates).await {
                match result.outcome {
                    Ok(written) => rows_written += written,
                    Err(e) => {
                        batch_ok = false;
                        let message = e.to_string();
                        log::error!(
                            "[{}] sub-batch at offset {} failed: {}",
                            table_name,
                            offset,
                            message
                        );
                        for meta in metas.iter().skip(result.start).take(result.len) {
                            self.failures.record(&FailedRow {
                                table_name: table_name.clone(),
                                primary_key_values: meta.key_values.clone(),
                                original_values: meta.originals.clone(),
                                obfuscated_values: meta.attempted.clone(),
                                error_message: message.clone(),
                                timestamp: Utc::now(),
                            })?;
                            failed_rows += 1;
                        }
                    }
                }
            }

            if batch_ok {
                self.checkpoint.with_state(|s| {
                    let table = s.table_mut(&table_name);
                    table.record_batch(batch_number, offset, page_len, rows_written);
                    s.refresh_totals();
                });
                self.checkpoint.flush_after_batch()?;
            } else {
                failed_batches += 1;
                self.checkpoint.with_state(|s| {
                    s.table_mut(&table_name).record_batch_failure(
                        batch_number,
                        offset,
                        page_len,
                        "one or more sub-batches failed",
                    )
                });
            }

            let processed = self
                .checkpoint
                .with_state(|s| s.table_mut(&table_name).processed_rows);
            progress.update(processed);

            batch_number += 1;
            offset += batch_size;
            if page_len < batch_size {
                break;
            }
        }

        let processed = self
            .checkpoint
            .with_state(|s| s.table_mut(&table_name).processed_rows);

        let status = if cancelled {
            TableStatus::InProgress
        } else if failed_batches > 0 || processed < total_rows {
            TableStatus::Failed
        } else {
            TableStatus::Completed
        };

        self.checkpoint.with_state(|s| {
            let table = s.table_mut(&table_name);
            table.status = status;
            s.refresh_totals();
        });
        self.checkpoint.flush()?;
        progress.finish(processed, failed_rows);

        Ok(TableOutcome {
            table_name,
            status,
            total_rows,
            processed_rows: processed,
            failed_rows,
            duration: started.elapsed(),
            error: None,
        })
    }

    /// Compute the update for one row, applying per-cell fallback policy.
    fn obfuscate_row(
        &self,
        row: &TableRow,
        plans: &[ColumnPlan],
        failed_rows: &mut u64,
    ) -> Result<RowAction> {
        let key_values: BTreeMap<String, String> = row
            .key
            .iter()
            .map(|(name, value)| (name.clone(), value.as_text().unwrap_or_default()))
            .collect();
        let originals: BTreeMap<String, Option<String>> = row
            .values
            .iter()
            .map(|(name, value)| (name.clone(), value.as_text()))
            .collect();

        let mut changes: Vec<(String, CellValue)> = Vec::new();
        let mut attempted: BTreeMap<String, Option<String>> = BTreeMap::new();

        for (plan, (_, original)) in plans.iter().zip(row.values.iter()) {
            if original.is_null() {
                if plan.only_if_not_null {
                    continue;
                }
                if let Some(fallback) = &plan.fallback {
                    if fallback.on_error == FallbackAction::UseDefault {
                        let default = fallback.default_value.clone().unwrap_or_default();
                        attempted.insert(plan.name.clone(), Some(default.clone()));
                        changes.push((plan.name.clone(), CellValue::Text(default)));
                    }
                }
                continue;
            }

            let Some(original_text) = original.as_text() else {
                continue;
            };

            let generated = self.cache.get_or_create(
                &plan.data_type,
                &original_text,
                plan.cached,
                || {
                    self.generator.generate(
                        &plan.data_type,
                        &original_text,
                        plan.preserve_length,
                        plan.validation.as_ref(),
                    )
                },
            );

            match generated {
                Ok(synthetic) => {
                    if synthetic != original_text {
                        attempted.insert(plan.name.clone(), Some(synthetic.clone()));
                        changes.push((plan.name.clone(), CellValue::Text(synthetic)));
                    }
                }
                Err(e) => {
                    self.failures.record(&FailedRow {
                        table_name: self.spec.full_name.clone(),
                        primary_key_values: key_values.clone(),
                        original_values: BTreeMap::from([(
                            plan.name.clone(),
                            Some(original_text.clone()),
                        )]),
                        obfuscated_values: BTreeMap::from([(plan.name.clone(), None)]),
                        error_message: e.to_string(),
                        timestamp: Utc::now(),
                    })?;
                    *failed_rows += 1;

                    let action = plan
                        .fallback
                        .as_ref()
                        .map(|f| f.on_error)
                        .unwrap_or(FallbackAction::UseOriginal);
                    match action {
                        FallbackAction::UseOriginal => {}
                        FallbackAction::UseDefault => {
                            let default = plan
                                .fallback
                                .as_ref()
                                .and_then(|f| f.default_value.clone())
                                .unwrap_or_default();
                            attempted.insert(plan.name.clone(), Some(default.clone()));
                            changes.push((plan.name.clone(), CellValue::Text(default)));
                        }
                        FallbackAction::Skip => return Ok(RowAction::Skip),
                    }
                }
            }
        }

        if changes.is_empty() {
            return Ok(RowAction::Skip);
        }

        Ok(RowAction::Update(
            RowUpdate {
                key: row.key.clone(),
                changes,
            },
            RowMeta {
                key_values,
                originals,
                attempted,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MappingDocument;

    fn mapping(json: &str) -> MappingDocument {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_build_plans_compiles_validation_once() {
        let doc = mapping(
            r#"{
            "Global": {"ConnectionString": "sqlite::memory:", "GlobalSeed": "s"},
            "Tables": [{
                "fullName": "t",
                "primaryKey": ["id"],
                "columns": [
                    {"name": "email", "dataType": "Email",
                     "validation": {"regex": "^.+@.+$"}},
                    {"name": "off", "dataType": "Phone", "enabled": false}
                ]
            }]
        }"#,
        );
        let generator = Generator::new(&doc.global, &doc.data_types).unwrap();
        let plans = build_plans(&doc.tables[0], &generator).unwrap();
        assert_eq!(plans.len(), 1);
        assert!(plans[0].validation.is_some());
        assert!(!plans[0].cached);
    }

    #[test]
    fn test_build_plans_rejects_bad_regex() {
        let doc = mapping(
            r#"{
            "Global": {"ConnectionString": "sqlite::memory:", "GlobalSeed": "s"},
            "Tables": [{
                "fullName": "t",
                "primaryKey": ["id"],
                "columns": [{"name": "email", "dataType": "Email",
                             "validation": {"regex": "["}}]
            }]
        }"#,
        );
        let generator = Generator::new(&doc.global, &doc.data_types).unwrap();
        assert!(build_plans(&doc.tables[0], &generator).is_err());
    }
}
