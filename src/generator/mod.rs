//! # Deterministic Value Generator
//!
//! Pure, total generation of format-plausible synthetic PII:
//! - `(dataType, original, effectiveSeed, preserveLength)` always produces
//!   the same output, across runs, processes and machines
//! - Per-type format rules with valid check digits where the format has them
//! - Custom data types layered over standard base types with their own
//!   seeds, validation and formatting
//!
//! Nothing in this module performs I/O; referential consistency across
//! tables falls out of seeding alone.

use crate::config::{DataTypeOverride, FormattingSpec, GlobalSettings, Locale};
use std::collections::BTreeMap;
use std::collections::HashMap;
use thiserror::Error;

/// Generator error types
#[derive(Error, Debug)]
pub enum GeneratorError {
    /// The declared data type is neither standard nor a registered custom type
    #[error("Unknown data type '{0}'")]
    UnknownType(String),

    /// A validation regex failed to compile
    #[error("Invalid validation regex '{pattern}': {source}")]
    InvalidValidationRegex {
        /// Offending pattern
        pattern: String,
        /// Compile error
        source: regex::Error,
    },

    /// No candidate satisfied validation within the retry budget
    #[error("Generation exhausted after {attempts} attempts for data type '{data_type}'")]
    Exhausted {
        /// Data type being generated
        data_type: String,
        /// Attempts made
        attempts: u32,
    },
}

/// Result type for generator operations
pub type Result<T> = std::result::Result<T, GeneratorError>;

// Module declarations
pub mod data_type;
pub mod pools;
pub mod postprocess;
pub mod rules;
pub mod seed;

// Re-exports for convenience
pub use data_type::DataType;
pub use postprocess::CompiledValidation;

/// Validation retry budget per cell.
const MAX_ATTEMPTS: u32 = 16;

/// Retry budget when hunting a natural output of a preserved length.
const LENGTH_RETRY_ATTEMPTS: u32 = 8;

/// A declared type resolved against the custom type registry.
struct ResolvedType {
    base: DataType,
    custom_seed: Option<String>,
    preserve_length: bool,
    validation: Option<CompiledValidation>,
    formatting: Option<FormattingSpec>,
    cached: Option<bool>,
}

/// Deterministic synthetic value generator.
///
/// Holds the resolved custom type registry, the global seed and the locale.
/// Shared read-only across table workers.
pub struct Generator {
    global_seed: String,
    locale: Locale,
    custom: HashMap<String, ResolvedType>,
}

impl Generator {
    /// Build a generator from global settings and the custom type registry.
    pub fn new(
        global: &GlobalSettings,
        data_types: &BTreeMap<String, DataTypeOverride>,
    ) -> Result<Self> {
        let mut custom = HashMap::with_capacity(data_types.len());

        for (name, spec) in data_types {
            let base = DataType::from_name(&spec.base_type)
                .ok_or_else(|| GeneratorError::UnknownType(spec.base_type.clone()))?;

            let validation = spec
                .validation
                .as_ref()
                .map(CompiledValidation::compile)
                .transpose()?;

            custom.insert(
                name.clone(),
                ResolvedType {
                    base,
                    custom_seed: spec.custom_seed.clone(),
                    preserve_length: spec.preserve_length.unwrap_or(false),
                    validation,
                    formatting: spec.formatting.clone(),
                    cached: spec.cached,
                },
            );
        }

        Ok(Self {
            global_seed: global.global_seed.clone(),
            locale: global.locale,
            custom,
        })
    }

    /// Resolve the base type behind a declared type name.
    pub fn base_type(&self, data_type: &str) -> Result<DataType> {
        if let Some(resolved) = self.custom.get(data_type) {
            return Ok(resolved.base);
        }
        DataType::from_name(data_type)
            .ok_or_else(|| GeneratorError::UnknownType(data_type.to_string()))
    }

    /// Whether values of a declared type should be cached.
    ///
    /// Custom types inherit the base type's policy unless overridden.
    pub fn is_cached(&self, data_type: &str) -> bool {
        match self.custom.get(data_type) {
            Some(resolved) => resolved.cached.unwrap_or_else(|| resolved.base.is_cached()),
            None => DataType::from_name(data_type).map_or(false, |dt| dt.is_cached()),
        }
    }

    /// Generate the synthetic replacement for one cell.
    ///
    /// `extra_validation` carries the column-level rules; type-level rules
    /// from the custom type registry apply regardless.
    pub fn generate(
        &self,
        data_type: &str,
        original: &str,
        column_preserve_length: bool,
        extra_validation: Option<&CompiledValidation>,
    ) -> Result<String> {
        let resolved = self.custom.get(data_type);
        let base = match resolved {
            Some(r) => r.base,
            None => DataType::from_name(data_type)
                .ok_or_else(|| GeneratorError::UnknownType(data_type.to_string()))?,
        };

        let effective_seed = resolved
            .and_then(|r| r.custom_seed.as_deref())
            .unwrap_or(&self.global_seed);

        let preserve = column_preserve_length || resolved.map_or(false, |r| r.preserve_length);
        let target_len = if preserve {
            Some(original.chars().count())
        } else {
            None
        };

        let normalized = seed::normalize(original, base);
        let mut state = seed::stable_hash64(effective_seed, base.name(), &normalized);

        for _ in 0..MAX_ATTEMPTS {
            let mut stream = seed::SeedStream::new(state);
            let mut value = rules::generate_base(base, &mut stream, self.locale, target_len);

            if let Some(target) = target_len {
                if value.chars().count() != target {
                    value = if rules::resists_length_adjustment(base) {
                        // Padding or truncating would break the check digit
                        // or pattern; hunt for a natural fit at the target
                        // length, else keep the format-valid value.
                        self.regenerate_for_length(base, state, target)
                            .unwrap_or(value)
                    } else {
                        postprocess::preserve_length(&value, target)
                    };
                }
            }

            if let Some(formatting) = resolved.and_then(|r| r.formatting.as_ref()) {
                value = postprocess::apply_formatting(&value, formatting);
            }

            let type_ok = resolved
                .and_then(|r| r.validation.as_ref())
                .map_or(true, |v| v.is_valid(&value));
            let column_ok = extra_validation.map_or(true, |v| v.is_valid(&value));

            if type_ok && column_ok {
                return Ok(value);
            }

            state = seed::rehash(state);
        }

        Err(GeneratorError::Exhausted {
            data_type: data_type.to_string(),
            attempts: MAX_ATTEMPTS,
        })
    }

    /// Search length-target seed variants for a natural output of `target`
    /// characters. Returns `None` when the format cannot absorb the target,
    /// in which case the caller keeps the format-valid natural output.
    fn regenerate_for_length(&self, base: DataType, state: u64, target: usize) -> Option<String> {
        let mut variant = seed::rehash(state ^ target as u64);
        for _ in 0..LENGTH_RETRY_ATTEMPTS {
            let mut stream = seed::SeedStream::new(variant);
            let value = rules::generate_base(base, &mut stream, self.locale, Some(target));
            if value.chars().count() == target {
                return Some(value);
            }
            variant = seed::rehash(variant);
        }
        None
    }
}
