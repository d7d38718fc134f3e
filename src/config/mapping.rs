//! Serde model for the obfuscation mapping document.
//!
//! Top-level keys are PascalCase (`Metadata`, `Global`, `DataTypes`,
//! `ReferentialIntegrity`, `PostProcessing`, `Tables`); nested table and
//! column fields are camelCase. Unknown keys are ignored on load so the
//! engine tolerates documents written by newer portal versions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A frozen description of one obfuscation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingDocument {
    /// Document metadata (informational only)
    #[serde(rename = "Metadata", default)]
    pub metadata: Metadata,

    /// Global engine settings
    #[serde(rename = "Global")]
    pub global: GlobalSettings,

    /// Custom data type overrides keyed by type name
    #[serde(rename = "DataTypes", default)]
    pub data_types: BTreeMap<String, DataTypeOverride>,

    /// Cross-table referential integrity declarations
    #[serde(rename = "ReferentialIntegrity", default)]
    pub referential_integrity: ReferentialIntegrity,

    /// Post-run options
    #[serde(rename = "PostProcessing", default)]
    pub post_processing: PostProcessing,

    /// Tables to obfuscate, ordered by priority ascending
    #[serde(rename = "Tables", default)]
    pub tables: Vec<TableSpec>,
}

/// Informational metadata carried by the mapping document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Human-readable mapping name
    #[serde(default)]
    pub name: Option<String>,

    /// Description of the mapping's origin
    #[serde(default)]
    pub description: Option<String>,

    /// Tool that generated the document
    #[serde(default)]
    pub generated_by: Option<String>,

    /// Generation timestamp
    #[serde(default)]
    pub generated_at: Option<String>,
}

/// Target locale for format-sensitive generators (phone, postcode).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Locale {
    /// Australian formats (default)
    AU,
    /// United Kingdom formats
    UK,
}

impl Default for Locale {
    fn default() -> Self {
        Locale::AU
    }
}

/// Global engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GlobalSettings {
    /// Database connection string
    pub connection_string: String,

    /// Seed shared by every data type without a custom seed
    pub global_seed: String,

    /// Rows per read batch
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,

    /// Rows per UPDATE transaction within a batch
    #[serde(default = "default_sql_batch_size")]
    pub sql_batch_size: u64,

    /// Maximum number of tables processed concurrently
    #[serde(default = "default_parallel_threads")]
    pub parallel_threads: usize,

    /// Upper bound on total cached mapping entries across all types
    #[serde(default = "default_max_cache_size")]
    pub max_cache_size: usize,

    /// Per-statement execution timeout
    #[serde(default = "default_command_timeout")]
    pub command_timeout_seconds: u64,

    /// Directory for persisted mapping caches
    #[serde(default = "default_cache_directory")]
    pub mapping_cache_directory: String,

    /// When true, validate statements without committing
    #[serde(default)]
    pub dry_run: bool,

    /// Locale steering phone and postcode formats
    #[serde(default)]
    pub locale: Locale,
}

fn default_batch_size() -> u64 {
    1000
}

fn default_sql_batch_size() -> u64 {
    100
}

fn default_parallel_threads() -> usize {
    4
}

fn default_max_cache_size() -> usize {
    1_000_000
}

fn default_command_timeout() -> u64 {
    300
}

fn default_cache_directory() -> String {
    "cache/mappings".to_string()
}

/// A custom data type derived from a standard base type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataTypeOverride {
    /// Standard type this custom type resolves to (single level)
    pub base_type: String,

    /// Seed overriding the global seed for this type
    #[serde(default)]
    pub custom_seed: Option<String>,

    /// Force length preservation for this type
    #[serde(default)]
    pub preserve_length: Option<bool>,

    /// Post-generation validation applied to every value of this type
    #[serde(default)]
    pub validation: Option<ValidationSpec>,

    /// Post-generation formatting applied to every value of this type
    #[serde(default)]
    pub formatting: Option<FormattingSpec>,

    /// Explicit cache policy override for this type
    #[serde(default)]
    pub cached: Option<bool>,
}

/// Referential integrity declarations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferentialIntegrity {
    /// Declared relationships
    #[serde(default, alias = "Relationships")]
    pub relationships: Vec<Relationship>,

    /// When true, a normalization mismatch between related originals is fatal
    #[serde(default, alias = "StrictMode")]
    pub strict_mode: bool,
}

/// One declared relationship between a primary column and related columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    /// Relationship name (diagnostics only)
    #[serde(default)]
    pub name: Option<String>,

    /// Table owning the authoritative column
    pub primary_table: String,

    /// Authoritative column
    pub primary_column: String,

    /// Columns that must resolve to the same synthetic values
    #[serde(default)]
    pub related_mappings: Vec<RelatedMapping>,
}

/// A column bound to a relationship's primary column.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedMapping {
    /// Related table
    pub table: String,

    /// Related column
    pub column: String,

    /// How the related value follows the primary
    #[serde(default)]
    pub relationship: RelationshipKind,
}

/// How a related column's synthetic value follows the primary column's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipKind {
    /// Byte-identical synthetic values
    Exact,
    /// Deterministic function of the primary's synthetic value
    Derived,
}

impl Default for RelationshipKind {
    fn default() -> Self {
        RelationshipKind::Exact
    }
}

/// Post-run options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PostProcessing {
    /// Whether to write a run report
    #[serde(default = "default_true")]
    pub generate_report: bool,

    /// Explicit report path; defaults to `reports/<db>-obfuscation-<ts>.json`
    #[serde(default)]
    pub report_path: Option<String>,
}

impl Default for PostProcessing {
    fn default() -> Self {
        Self {
            generate_report: true,
            report_path: None,
        }
    }
}

fn default_true() -> bool {
    true
}

/// One table to obfuscate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSpec {
    /// Fully qualified table name (for example `dbo.Customers`)
    pub full_name: String,

    /// Primary key columns; non-empty whenever any column is enabled
    #[serde(default)]
    pub primary_key: Vec<String>,

    /// Columns holding PII
    #[serde(default)]
    pub columns: Vec<ColumnSpec>,

    /// Per-table batch size overriding the global setting
    #[serde(default)]
    pub custom_batch_size: Option<u64>,

    /// Row selection conditions
    #[serde(default)]
    pub conditions: Option<TableConditions>,

    /// Disabled tables are skipped entirely
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Processing priority, ascending; ties break by declaration order
    #[serde(default = "default_priority")]
    pub priority: i32,
}

fn default_priority() -> i32 {
    100
}

impl TableSpec {
    /// Columns that are enabled for obfuscation.
    pub fn enabled_columns(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.columns.iter().filter(|c| c.enabled)
    }

    /// Effective batch size for this table.
    pub fn effective_batch_size(&self, global: u64) -> u64 {
        self.custom_batch_size.unwrap_or(global).max(1)
    }
}

/// Row selection conditions for a table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableConditions {
    /// SQL WHERE clause fragment (without the `WHERE` keyword)
    #[serde(default)]
    pub where_clause: Option<String>,

    /// Cap on the number of rows processed
    #[serde(default)]
    pub max_rows: Option<u64>,
}

/// One PII column within a table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSpec {
    /// Column name
    pub name: String,

    /// Standard or custom data type name
    pub data_type: String,

    /// Disabled columns are left untouched
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Match the synthetic value's length to the original's
    #[serde(default)]
    pub preserve_length: bool,

    /// Whether the column admits NULL
    #[serde(default = "default_true")]
    pub is_nullable: bool,

    /// Policy applied when generation fails for a cell
    #[serde(default)]
    pub fallback: Option<FallbackSpec>,

    /// Per-cell conditions
    #[serde(default)]
    pub conditions: Option<ColumnConditions>,

    /// Post-generation validation for this column
    #[serde(default)]
    pub validation: Option<ValidationSpec>,
}

impl ColumnSpec {
    /// Whether NULL originals are skipped for this column.
    pub fn only_if_not_null(&self) -> bool {
        self.conditions
            .as_ref()
            .and_then(|c| c.only_if_not_null)
            .unwrap_or(true)
    }
}

/// Per-cell conditions for a column.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnConditions {
    /// Skip cells whose original is NULL (default true)
    #[serde(default)]
    pub only_if_not_null: Option<bool>,
}

/// Per-column policy when generation fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackSpec {
    /// Action to take
    pub on_error: FallbackAction,

    /// Replacement value for `useDefault`
    #[serde(default)]
    pub default_value: Option<String>,
}

/// Fallback action for failed generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FallbackAction {
    /// Leave the original value in place (skip the column)
    UseOriginal,
    /// Write the configured default value
    UseDefault,
    /// Skip the entire row
    Skip,
}

/// Post-generation validation rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSpec {
    /// Regex the value must match
    #[serde(default)]
    pub regex: Option<String>,

    /// Minimum length
    #[serde(default)]
    pub min_length: Option<usize>,

    /// Maximum length
    #[serde(default)]
    pub max_length: Option<usize>,

    /// Closed set of allowed values
    #[serde(default)]
    pub allowed_values: Option<Vec<String>>,
}

/// Post-generation formatting rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattingSpec {
    /// Prefix prepended to the value
    #[serde(default)]
    pub add_prefix: Option<String>,

    /// Suffix appended to the value
    #[serde(default)]
    pub add_suffix: Option<String>,

    /// Template applied to the value; `{value}` is the substitution point
    #[serde(default)]
    pub pattern: Option<String>,

    /// Case transform applied last
    #[serde(default, rename = "case")]
    pub case_transform: Option<CaseTransform>,
}

/// Case transform applied by formatting rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseTransform {
    /// UPPERCASE
    Upper,
    /// lowercase
    Lower,
    /// Title Case (first letter of each word)
    Title,
}
