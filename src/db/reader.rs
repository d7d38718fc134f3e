//! Paginated batch reader.
//!
//! Pages are read in strictly increasing offset order by each table
//! worker, ordered by the primary-key tuple so pagination is stable.
//! Only the primary key and the enabled columns are selected; nothing
//! else leaves the database.

use super::{quote_ident, CellValue, DbError, Result, SqlDialect};
use crate::config::TableSpec;
use sqlx::AnyPool;
use std::time::Duration;

/// Read retry budget before a batch is declared failed.
const READ_ATTEMPTS: u32 = 3;

/// Base backoff between read retries.
const READ_BACKOFF: Duration = Duration::from_millis(500);

/// One row read from a page: primary key plus enabled columns.
#[derive(Debug, Clone)]
pub struct TableRow {
    /// Primary key values, aligned with the table's key columns
    pub key: Vec<(String, CellValue)>,

    /// Enabled column values, aligned with the mapping's column order
    pub values: Vec<(String, CellValue)>,
}

/// Paginated reader for one table.
pub struct BatchReader<'a> {
    pool: &'a AnyPool,
    dialect: SqlDialect,
    table: String,
    key_columns: Vec<String>,
    value_columns: Vec<String>,
    where_clause: Option<String>,
    max_rows: Option<u64>,
    timeout: Duration,
}

impl<'a> BatchReader<'a> {
    /// Build a reader for a table spec.
    pub fn new(
        pool: &'a AnyPool,
        dialect: SqlDialect,
        spec: &TableSpec,
        timeout: Duration,
    ) -> Self {
        let conditions = spec.conditions.clone().unwrap_or_default();
        Self {
            pool,
            dialect,
            table: quote_ident(&spec.full_name),
            key_columns: spec.primary_key.clone(),
            value_columns: spec.enabled_columns().map(|c| c.name.clone()).collect(),
            where_clause: conditions.where_clause,
            max_rows: conditions.max_rows,
            timeout,
        }
    }

    fn where_fragment(&self) -> String {
        match &self.where_clause {
            Some(clause) if !clause.trim().is_empty() => format!(" WHERE {}", clause),
            _ => String::new(),
        }
    }

    fn order_fragment(&self) -> String {
        let keys: Vec<String> = self.key_columns.iter().map(|c| quote_ident(c)).collect();
        format!(" ORDER BY {}", keys.join(", "))
    }

    /// Count the rows the run will touch, after conditions and `maxRows`.
    pub async fn count_rows(&self) -> Result<u64> {
        let sql = format!(
            "SELECT COUNT(*) FROM {}{}",
            self.table,
            self.where_fragment()
        );

        let count: i64 = self
            .with_retries(|| async {
                sqlx::query_scalar(&sql)
                    .fetch_one(self.pool)
                    .await
                    .map_err(DbError::from)
            })
            .await?;

        let count = count.max(0) as u64;
        Ok(match self.max_rows {
            Some(cap) => count.min(cap),
            None => count,
        })
    }

    /// Fetch one page of rows at `offset`.
    ///
    /// The page honors `maxRows`: a page that would cross the cap is
    /// shortened, and pages past it are empty.
    pub async fn fetch_page(&self, offset: u64, limit: u64) -> Result<Vec<TableRow>> {
        let effective_limit = match self.max_rows {
            Some(cap) if offset >= cap => return Ok(Vec::new()),
            Some(cap) => limit.min(cap - offset),
            None => limit,
        };

        let mut select_columns: Vec<String> =
            self.key_columns.iter().map(|c| quote_ident(c)).collect();
        select_columns.extend(self.value_columns.iter().map(|c| quote_ident(c)));

        let sql = format!(
            "SELECT {} FROM {}{}{} LIMIT {} OFFSET {}",
            select_columns.join(", "),
            self.table,
            self.where_fragment(),
            self.order_fragment(),
            effective_limit,
            offset
        );
        log::trace!("[{}] page query: {}", self.table, sql);

        let rows = self
            .with_retries(|| async {
                sqlx::query(&sql)
                    .fetch_all(self.pool)
                    .await
                    .map_err(DbError::from)
            })
            .await?;

        let mut page = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut key = Vec::with_capacity(self.key_columns.len());
            for (i, name) in self.key_columns.iter().enumerate() {
                key.push((name.clone(), CellValue::decode(row, i)?));
            }
            let mut values = Vec::with_capacity(self.value_columns.len());
            for (i, name) in self.value_columns.iter().enumerate() {
                values.push((
                    name.clone(),
                    CellValue::decode(row, self.key_columns.len() + i)?,
                ));
            }
            page.push(TableRow { key, values });
        }

        Ok(page)
    }

    /// Run a read with timeout, retrying with exponential backoff.
    async fn with_retries<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut last_error = String::new();

        for attempt in 0..READ_ATTEMPTS {
            if attempt > 0 {
                let backoff = READ_BACKOFF * 2u32.pow(attempt - 1);
                tokio::time::sleep(backoff).await;
            }

            match tokio::time::timeout(self.timeout, operation()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => {
                    log::warn!(
                        "[{}] read attempt {}/{} failed: {}",
                        self.table,
                        attempt + 1,
                        READ_ATTEMPTS,
                        e
                    );
                    last_error = e.to_string();
                }
                Err(_) => {
                    log::warn!(
                        "[{}] read attempt {}/{} timed out",
                        self.table,
                        attempt + 1,
                        READ_ATTEMPTS
                    );
                    last_error = format!("timed out after {:?}", self.timeout);
                }
            }
        }

        Err(DbError::BatchRead {
            attempts: READ_ATTEMPTS,
            message: last_error,
        })
    }
}
