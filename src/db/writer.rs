//! Sub-batched batch writer.
//!
//! Updates are grouped into sub-batches of `sqlBatchSize` rows; each
//! sub-batch runs inside one transaction, one parameterized UPDATE per
//! row. A failed or timed-out sub-batch rolls back and is reported
//! without aborting the remaining sub-batches. In dry-run mode every
//! statement is prepared against the database but nothing commits.

use super::{quote_ident, CellValue, DbError, Result, SqlDialect};
use sqlx::{AnyPool, Executor};
use std::time::Duration;

/// One row's pending update: key columns plus changed cells.
#[derive(Debug, Clone)]
pub struct RowUpdate {
    /// Primary key values identifying the row
    pub key: Vec<(String, CellValue)>,

    /// Columns to write, with their new values
    pub changes: Vec<(String, CellValue)>,
}

/// Outcome of one sub-batch.
#[derive(Debug)]
pub struct SubBatchResult {
    /// Index of the first update in the caller's slice
    pub start: usize,

    /// Number of updates in the sub-batch
    pub len: usize,

    /// Rows written on success, error on failure
    pub outcome: Result<u64>,
}

/// Transactional writer for one table.
pub struct BatchWriter<'a> {
    pool: &'a AnyPool,
    dialect: SqlDialect,
    table: String,
    sql_batch_size: usize,
    timeout: Duration,
    dry_run: bool,
}

impl<'a> BatchWriter<'a> {
    /// Build a writer for a table.
    pub fn new(
        pool: &'a AnyPool,
        dialect: SqlDialect,
        table_full_name: &str,
        sql_batch_size: u64,
        timeout: Duration,
        dry_run: bool,
    ) -> Self {
        Self {
            pool,
            dialect,
            table: quote_ident(table_full_name),
            sql_batch_size: sql_batch_size.max(1) as usize,
            timeout,
            dry_run,
        }
    }

    /// Write a batch of updates as sub-batches.
    ///
    /// Returns one result per sub-batch, in order. Rows without changes
    /// must be filtered out by the caller; every update here is written.
    pub async fn write_updates(&self, updates: &[RowUpdate]) -> Vec<SubBatchResult> {
        let mut results = Vec::new();

        for (chunk_index, chunk) in updates.chunks(self.sql_batch_size).enumerate() {
            let start = chunk_index * self.sql_batch_size;
            let outcome = if self.dry_run {
                self.validate_sub_batch(chunk).await
            } else {
                self.commit_sub_batch(chunk).await
            };
            results.push(SubBatchResult {
                start,
                len: chunk.len(),
                outcome,
            });
        }

        results
    }

    fn update_sql(&self, update: &RowUpdate) -> String {
        let mut placeholder = 0;
        let assignments: Vec<String> = update
            .changes
            .iter()
            .map(|(column, _)| {
                placeholder += 1;
                format!("{} = {}", quote_ident(column), self.dialect.placeholder(placeholder))
            })
            .collect();
        let predicates: Vec<String> = update
            .key
            .iter()
            .map(|(column, _)| {
                placeholder += 1;
                format!("{} = {}", quote_ident(column), self.dialect.placeholder(placeholder))
            })
            .collect();

        format!(
            "UPDATE {} SET {} WHERE {}",
            self.table,
            assignments.join(", "),
            predicates.join(" AND ")
        )
    }

    async fn commit_sub_batch(&self, chunk: &[RowUpdate]) -> Result<u64> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::BatchWrite(e.to_string()))?;

        let mut written = 0u64;
        for update in chunk {
            let sql = self.update_sql(update);
            let mut query = sqlx::query(&sql);
            for (_, value) in &update.changes {
                query = value.bind_to(query);
            }
            for (_, value) in &update.key {
                query = value.bind_to(query);
            }

            let execution = tokio::time::timeout(self.timeout, query.execute(&mut *tx)).await;
            match execution {
                Ok(Ok(result)) => written += result.rows_affected(),
                Ok(Err(e)) => {
                    let _ = tx.rollback().await;
                    return Err(DbError::BatchWrite(e.to_string()));
                }
                Err(_) => {
                    let _ = tx.rollback().await;
                    return Err(DbError::Timeout {
                        seconds: self.timeout.as_secs(),
                    });
                }
            }
        }

        tx.commit()
            .await
            .map_err(|e| DbError::BatchWrite(e.to_string()))?;
        Ok(written)
    }

    /// Dry run: prepare every statement so syntax and column references are
    /// checked by the database, log what would happen, commit nothing.
    async fn validate_sub_batch(&self, chunk: &[RowUpdate]) -> Result<u64> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| DbError::BatchWrite(e.to_string()))?;

        for update in chunk {
            let sql = self.update_sql(update);
            conn.prepare(sql.as_str())
                .await
                .map_err(|e| DbError::BatchWrite(e.to_string()))?;

            let key: Vec<String> = update
                .key
                .iter()
                .map(|(c, v)| format!("{}={}", c, v.as_text().unwrap_or_default()))
                .collect();
            log::info!(
                "DRY RUN {}: would update {} column(s) where {}",
                self.table,
                update.changes.len(),
                key.join(", ")
            );
        }

        Ok(chunk.len() as u64)
    }
}
