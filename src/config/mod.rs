//! # Configuration Layer
//!
//! Loads and validates the obfuscation mapping document:
//! - Serde model for the mapping JSON (tables, columns, custom data types)
//! - Loader with environment variable overrides
//! - Stable config hashing for checkpoint identity
//!
//! The mapping document is produced by external tooling (detection
//! generator, web portal) and is treated as a frozen artifact for the
//! duration of a run. The engine writes only the cells it names.

use thiserror::Error;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Mapping file could not be read
    #[error("Failed to read mapping file: {0}")]
    Io(#[from] std::io::Error),

    /// Mapping file is not valid JSON
    #[error("Failed to parse mapping file: {0}")]
    Parse(#[from] serde_json::Error),

    /// A column references a data type that is neither standard nor declared
    #[error("Unknown data type '{data_type}' on column {table}.{column}")]
    UnknownDataType {
        /// Declared data type name
        data_type: String,
        /// Table containing the column
        table: String,
        /// Column name
        column: String,
    },

    /// A custom data type's base type is not a standard type
    #[error("Custom data type '{name}' has unknown base type '{base_type}'")]
    UnknownBaseType {
        /// Custom type name
        name: String,
        /// Declared base type
        base_type: String,
    },

    /// A table with enabled columns has no primary key
    #[error("Table '{0}' has enabled columns but no primary key")]
    MissingPrimaryKey(String),

    /// A numeric setting is out of bounds
    #[error("Invalid setting {name}: {reason}")]
    InvalidSetting {
        /// Setting name
        name: &'static str,
        /// Why the value was rejected
        reason: String,
    },

    /// An environment override could not be parsed
    #[error("Invalid environment override {var}={value}")]
    InvalidEnvOverride {
        /// Environment variable name
        var: &'static str,
        /// Offending value
        value: String,
    },

    /// A referential integrity relationship references an unmapped column
    #[error("Relationship '{relationship}' references unmapped column {table}.{column}")]
    UnknownRelationshipColumn {
        /// Relationship name
        relationship: String,
        /// Referenced table
        table: String,
        /// Referenced column
        column: String,
    },
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

// Module declarations
pub mod hash;
pub mod loader;
pub mod mapping;

// Re-exports for convenience
pub use hash::config_hash;
pub use loader::{load_mapping, MappingLoader};
pub use mapping::{
    CaseTransform, ColumnConditions, ColumnSpec, DataTypeOverride, FallbackAction, FallbackSpec,
    FormattingSpec, GlobalSettings, Locale, MappingDocument, Metadata, PostProcessing,
    ReferentialIntegrity, RelatedMapping, Relationship, RelationshipKind, TableConditions,
    TableSpec, ValidationSpec,
};
