//! Mapping loader with validation and environment overrides.
//!
//! Loading order: read file, compute the config hash over the raw document,
//! parse, apply environment overrides, validate. The hash deliberately
//! ignores environment overrides so a resumed run is matched to the same
//! mapping document regardless of ambient settings.

use super::mapping::{GlobalSettings, MappingDocument};
use super::{config_hash, ConfigError, Result};
use crate::generator::DataType;
use std::env;
use std::path::Path;

/// Loads and validates mapping documents.
pub struct MappingLoader;

impl MappingLoader {
    /// Load a mapping document from disk.
    ///
    /// Returns the validated document and its config hash.
    pub fn load(path: &Path) -> Result<(MappingDocument, String)> {
        let raw = std::fs::read_to_string(path)?;
        let hash = config_hash(&raw)?;

        let mut doc: MappingDocument = serde_json::from_str(&raw)?;
        apply_env_overrides(&mut doc.global)?;
        validate(&doc)?;

        Ok((doc, hash))
    }
}

/// Convenience wrapper around [`MappingLoader::load`].
pub fn load_mapping(path: &Path) -> Result<(MappingDocument, String)> {
    MappingLoader::load(path)
}

/// Apply environment variable overrides to global settings.
fn apply_env_overrides(global: &mut GlobalSettings) -> Result<()> {
    if let Ok(value) = env::var("CONNECTION_STRING") {
        global.connection_string = value;
    }
    if let Ok(value) = env::var("GLOBAL_SEED") {
        global.global_seed = value;
    }
    if let Ok(value) = env::var("DRY_RUN") {
        global.dry_run = parse_bool("DRY_RUN", &value)?;
    }
    if let Ok(value) = env::var("PARALLEL_THREADS") {
        global.parallel_threads = parse_num("PARALLEL_THREADS", &value)?;
    }
    if let Ok(value) = env::var("BATCH_SIZE") {
        global.batch_size = parse_num("BATCH_SIZE", &value)?;
    }
    if let Ok(value) = env::var("MAX_CACHE_SIZE") {
        global.max_cache_size = parse_num("MAX_CACHE_SIZE", &value)?;
    }
    if let Ok(value) = env::var("COMMAND_TIMEOUT") {
        global.command_timeout_seconds = parse_num("COMMAND_TIMEOUT", &value)?;
    }
    Ok(())
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidEnvOverride {
            var,
            value: value.to_string(),
        }),
    }
}

fn parse_num<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T> {
    value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
        var,
        value: value.to_string(),
    })
}

/// Validate a parsed mapping document.
pub fn validate(doc: &MappingDocument) -> Result<()> {
    validate_bounds(&doc.global)?;

    // Custom types must resolve to a standard base type in one step.
    for (name, custom) in &doc.data_types {
        if DataType::from_name(&custom.base_type).is_none() {
            return Err(ConfigError::UnknownBaseType {
                name: name.clone(),
                base_type: custom.base_type.clone(),
            });
        }
    }

    for table in doc.tables.iter().filter(|t| t.enabled) {
        let has_enabled = table.enabled_columns().next().is_some();
        if has_enabled && table.primary_key.is_empty() {
            return Err(ConfigError::MissingPrimaryKey(table.full_name.clone()));
        }

        for column in table.enabled_columns() {
            let known = DataType::from_name(&column.data_type).is_some()
                || doc.data_types.contains_key(&column.data_type);
            if !known {
                return Err(ConfigError::UnknownDataType {
                    data_type: column.data_type.clone(),
                    table: table.full_name.clone(),
                    column: column.name.clone(),
                });
            }
        }
    }

    validate_relationships(doc)?;

    Ok(())
}

fn validate_bounds(global: &GlobalSettings) -> Result<()> {
    if global.batch_size < 1 {
        return Err(ConfigError::InvalidSetting {
            name: "BatchSize",
            reason: "must be at least 1".to_string(),
        });
    }
    if global.sql_batch_size < 1 {
        return Err(ConfigError::InvalidSetting {
            name: "SqlBatchSize",
            reason: "must be at least 1".to_string(),
        });
    }
    if global.parallel_threads < 1 {
        return Err(ConfigError::InvalidSetting {
            name: "ParallelThreads",
            reason: "must be at least 1".to_string(),
        });
    }
    if global.command_timeout_seconds < 1 {
        return Err(ConfigError::InvalidSetting {
            name: "CommandTimeoutSeconds",
            reason: "must be at least 1".to_string(),
        });
    }
    Ok(())
}

/// Every relationship endpoint must name a mapped, enabled column.
fn validate_relationships(doc: &MappingDocument) -> Result<()> {
    let has_column = |table: &str, column: &str| {
        doc.tables
            .iter()
            .filter(|t| t.enabled && t.full_name == table)
            .any(|t| t.enabled_columns().any(|c| c.name == column))
    };

    for rel in &doc.referential_integrity.relationships {
        let rel_name = rel.name.clone().unwrap_or_else(|| {
            format!("{}.{}", rel.primary_table, rel.primary_column)
        });

        if !has_column(&rel.primary_table, &rel.primary_column) {
            return Err(ConfigError::UnknownRelationshipColumn {
                relationship: rel_name,
                table: rel.primary_table.clone(),
                column: rel.primary_column.clone(),
            });
        }

        for related in &rel.related_mappings {
            if !has_column(&related.table, &related.column) {
                return Err(ConfigError::UnknownRelationshipColumn {
                    relationship: rel_name,
                    table: related.table.clone(),
                    column: related.column.clone(),
                });
            }
        }
    }

    Ok(())
}

/// Extract a filesystem-safe database name from a connection string.
///
/// Used for cache directories, failure log names and report names.
pub fn database_name(connection_string: &str) -> String {
    let trimmed = connection_string
        .trim()
        .split('?')
        .next()
        .unwrap_or_default();

    let name = if let Some(rest) = trimmed.strip_prefix("sqlite:") {
        let path = rest.trim_start_matches("//");
        if path.is_empty() || path == ":memory:" || path.starts_with(':') {
            "memory".to_string()
        } else {
            Path::new(path)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "memory".to_string())
        }
    } else {
        trimmed.rsplit('/').next().unwrap_or("default").to_string()
    };

    let safe: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect();

    if safe.is_empty() {
        "default".to_string()
    } else {
        safe
    }
}
