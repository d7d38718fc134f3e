//! Schema verification for `--verify-mappings`.
//!
//! Checks every mapped table and column against the live catalog:
//! `information_schema.columns` on PostgreSQL, `pragma_table_info` on
//! SQLite. Missing objects are reported, not fixed; the mapping stays
//! authoritative.

use super::{Result, SqlDialect};
use crate::config::TableSpec;
use sqlx::AnyPool;
use std::collections::HashSet;

/// One discrepancy between the mapping and the live schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaIssue {
    /// The table does not exist (or has no visible columns)
    MissingTable {
        /// Mapped table name
        table: String,
    },
    /// A mapped column does not exist on the table
    MissingColumn {
        /// Mapped table name
        table: String,
        /// Missing column
        column: String,
    },
}

impl std::fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaIssue::MissingTable { table } => write!(f, "table '{}' not found", table),
            SchemaIssue::MissingColumn { table, column } => {
                write!(f, "column '{}.{}' not found", table, column)
            }
        }
    }
}

/// Verify every enabled table's key and mapped columns exist.
pub async fn verify_schema(
    pool: &AnyPool,
    dialect: SqlDialect,
    tables: &[TableSpec],
) -> Result<Vec<SchemaIssue>> {
    let mut issues = Vec::new();

    for spec in tables.iter().filter(|t| t.enabled) {
        let live_columns = fetch_columns(pool, dialect, &spec.full_name).await?;

        if live_columns.is_empty() {
            issues.push(SchemaIssue::MissingTable {
                table: spec.full_name.clone(),
            });
            continue;
        }

        let expected = spec
            .primary_key
            .iter()
            .chain(spec.enabled_columns().map(|c| &c.name));
        for column in expected {
            if !live_columns.contains(&column.to_lowercase()) {
                issues.push(SchemaIssue::MissingColumn {
                    table: spec.full_name.clone(),
                    column: column.clone(),
                });
            }
        }
    }

    Ok(issues)
}

/// Column names of a table, lowercased for case-insensitive comparison.
async fn fetch_columns(
    pool: &AnyPool,
    dialect: SqlDialect,
    full_name: &str,
) -> Result<HashSet<String>> {
    let rows: Vec<String> = match dialect {
        SqlDialect::Postgres => {
            let (schema, table) = match full_name.split_once('.') {
                Some((schema, table)) => (schema.to_string(), table.to_string()),
                None => ("public".to_string(), full_name.to_string()),
            };
            sqlx::query_scalar(
                "SELECT column_name FROM information_schema.columns \
                 WHERE table_schema = $1 AND table_name = $2",
            )
            .bind(schema)
            .bind(table)
            .fetch_all(pool)
            .await?
        }
        SqlDialect::Sqlite => {
            sqlx::query_scalar("SELECT name FROM pragma_table_info(?)")
                .bind(full_name.to_string())
                .fetch_all(pool)
                .await?
        }
    };

    Ok(rows.into_iter().map(|c| c.to_lowercase()).collect())
}
