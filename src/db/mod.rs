//! # Database Layer
//!
//! Thin, pluggable access layer over sqlx's `Any` driver:
//! - Connection pool with an initial connectivity probe
//! - Paginated batch reader ordered by the primary-key tuple
//! - Sub-batched, transactional batch writer with dry-run support
//! - Schema verification against the live catalog
//!
//! Dialect differences (placeholders, catalog queries) are isolated in
//! [`SqlDialect`]; adding a backend means extending that enum, not the
//! reader/writer.

use thiserror::Error;

/// Database error types
#[derive(Error, Debug)]
pub enum DbError {
    /// The initial connection or probe failed
    #[error("Database connectivity error: {0}")]
    Connectivity(String),

    /// A batch read failed after retries
    #[error("Batch read failed after {attempts} attempts: {message}")]
    BatchRead {
        /// Attempts made
        attempts: u32,
        /// Last error
        message: String,
    },

    /// A sub-batch write failed
    #[error("Batch write failed: {0}")]
    BatchWrite(String),

    /// A statement exceeded the command timeout
    #[error("Command timed out after {seconds}s")]
    Timeout {
        /// Configured timeout
        seconds: u64,
    },

    /// Underlying driver error
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Result type for database operations
pub type Result<T> = std::result::Result<T, DbError>;

// Module declarations
pub mod pool;
pub mod reader;
pub mod schema;
pub mod writer;

// Re-exports for convenience
pub use pool::connect;
pub use reader::{BatchReader, TableRow};
pub use schema::{verify_schema, SchemaIssue};
pub use writer::{BatchWriter, RowUpdate, SubBatchResult};

/// SQL dialect behind the `Any` connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlDialect {
    /// PostgreSQL (`$n` placeholders, information_schema catalog)
    Postgres,
    /// SQLite (`?` placeholders, pragma catalog)
    Sqlite,
}

impl SqlDialect {
    /// Infer the dialect from a connection URL scheme.
    pub fn from_url(url: &str) -> Self {
        if url.starts_with("sqlite:") {
            SqlDialect::Sqlite
        } else {
            SqlDialect::Postgres
        }
    }

    /// Render the 1-based `n`th bind placeholder.
    pub fn placeholder(&self, n: usize) -> String {
        match self {
            SqlDialect::Postgres => format!("${}", n),
            SqlDialect::Sqlite => "?".to_string(),
        }
    }
}

/// Quote a possibly schema-qualified identifier.
///
/// `dbo.Customers` becomes `"dbo"."Customers"`; embedded quotes are
/// doubled. Both supported dialects use double-quote quoting.
pub fn quote_ident(ident: &str) -> String {
    ident
        .split('.')
        .map(|part| format!("\"{}\"", part.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(".")
}

/// A database cell value, type-erased across backends.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// SQL NULL
    Null,
    /// Integral value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// Boolean value
    Bool(bool),
    /// Text value
    Text(String),
    /// Binary value
    Bytes(Vec<u8>),
}

impl CellValue {
    /// Whether the cell is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Text rendering used for hashing and the failure log.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Null => None,
            CellValue::Int(v) => Some(v.to_string()),
            CellValue::Float(v) => Some(v.to_string()),
            CellValue::Bool(v) => Some(v.to_string()),
            CellValue::Text(v) => Some(v.clone()),
            CellValue::Bytes(v) => Some(hex::encode(v)),
        }
    }

    /// Bind this value onto a query.
    pub fn bind_to<'q>(
        &self,
        query: sqlx::query::Query<'q, sqlx::Any, sqlx::any::AnyArguments<'q>>,
    ) -> sqlx::query::Query<'q, sqlx::Any, sqlx::any::AnyArguments<'q>> {
        match self {
            CellValue::Null => query.bind(None::<String>),
            CellValue::Int(v) => query.bind(*v),
            CellValue::Float(v) => query.bind(*v),
            CellValue::Bool(v) => query.bind(*v),
            CellValue::Text(v) => query.bind(v.clone()),
            CellValue::Bytes(v) => query.bind(v.clone()),
        }
    }

    /// Decode a column from an `Any` row, trying the supported kinds.
    pub fn decode(row: &sqlx::any::AnyRow, index: usize) -> Result<Self> {
        use sqlx::Row;

        if let Ok(value) = row.try_get::<Option<String>, usize>(index) {
            return Ok(value.map_or(CellValue::Null, CellValue::Text));
        }
        if let Ok(value) = row.try_get::<Option<i64>, usize>(index) {
            return Ok(value.map_or(CellValue::Null, CellValue::Int));
        }
        if let Ok(value) = row.try_get::<Option<f64>, usize>(index) {
            return Ok(value.map_or(CellValue::Null, CellValue::Float));
        }
        if let Ok(value) = row.try_get::<Option<bool>, usize>(index) {
            return Ok(value.map_or(CellValue::Null, CellValue::Bool));
        }
        let value = row.try_get::<Option<Vec<u8>>, usize>(index)?;
        Ok(value.map_or(CellValue::Null, CellValue::Bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_from_url() {
        assert_eq!(SqlDialect::from_url("sqlite::memory:"), SqlDialect::Sqlite);
        assert_eq!(SqlDialect::from_url("sqlite://x.db"), SqlDialect::Sqlite);
        assert_eq!(
            SqlDialect::from_url("postgres://host/db"),
            SqlDialect::Postgres
        );
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(SqlDialect::Postgres.placeholder(3), "$3");
        assert_eq!(SqlDialect::Sqlite.placeholder(3), "?");
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("Customers"), "\"Customers\"");
        assert_eq!(quote_ident("dbo.Customers"), "\"dbo\".\"Customers\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_cell_text_rendering() {
        assert_eq!(CellValue::Null.as_text(), None);
        assert_eq!(CellValue::Int(7).as_text().unwrap(), "7");
        assert_eq!(CellValue::Text("x".into()).as_text().unwrap(), "x");
        assert_eq!(CellValue::Bytes(vec![0xAB]).as_text().unwrap(), "ab");
    }
}
