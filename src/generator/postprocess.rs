//! Post-generation processing: length preservation, formatting rules and
//! validation.

use super::GeneratorError;
use crate::config::{CaseTransform, FormattingSpec, ValidationSpec};
use regex::Regex;

/// Adjust a generated value to match the original's character length.
///
/// Digit-only values pad with trailing zeros, text pads with trailing
/// spaces; longer values are truncated. Check-digit and rigid-pattern
/// types never take this path; the generator retries those at the target
/// length instead (see `rules::resists_length_adjustment`).
pub fn preserve_length(value: &str, target_chars: usize) -> String {
    let current = value.chars().count();
    if current == target_chars {
        return value.to_string();
    }

    if current > target_chars {
        return value.chars().take(target_chars).collect();
    }

    let pad = if value.bytes().all(|b| b.is_ascii_digit()) && !value.is_empty() {
        '0'
    } else {
        ' '
    };
    let mut padded = value.to_string();
    padded.extend(std::iter::repeat(pad).take(target_chars - current));
    padded
}

/// Apply formatting rules: pattern template, prefix/suffix, case transform.
pub fn apply_formatting(value: &str, formatting: &FormattingSpec) -> String {
    let mut out = match &formatting.pattern {
        Some(pattern) => pattern.replace("{value}", value),
        None => value.to_string(),
    };

    if let Some(prefix) = &formatting.add_prefix {
        out.insert_str(0, prefix);
    }
    if let Some(suffix) = &formatting.add_suffix {
        out.push_str(suffix);
    }

    match formatting.case_transform {
        Some(CaseTransform::Upper) => out.to_uppercase(),
        Some(CaseTransform::Lower) => out.to_lowercase(),
        Some(CaseTransform::Title) => title_case(&out),
        None => out,
    }
}

fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut at_word_start = true;
    for c in value.chars() {
        if c.is_whitespace() {
            at_word_start = true;
            out.push(c);
        } else if at_word_start {
            out.extend(c.to_uppercase());
            at_word_start = false;
        } else {
            out.extend(c.to_lowercase());
        }
    }
    out
}

/// Validation rules with the regex compiled once.
#[derive(Debug, Clone, Default)]
pub struct CompiledValidation {
    regex: Option<Regex>,
    min_length: Option<usize>,
    max_length: Option<usize>,
    allowed_values: Option<Vec<String>>,
}

impl CompiledValidation {
    /// Compile a validation spec; an invalid regex is a configuration error
    /// surfaced at load time rather than per row.
    pub fn compile(spec: &ValidationSpec) -> Result<Self, GeneratorError> {
        let regex = match &spec.regex {
            Some(pattern) => Some(Regex::new(pattern).map_err(|source| {
                GeneratorError::InvalidValidationRegex {
                    pattern: pattern.clone(),
                    source,
                }
            })?),
            None => None,
        };

        Ok(Self {
            regex,
            min_length: spec.min_length,
            max_length: spec.max_length,
            allowed_values: spec.allowed_values.clone(),
        })
    }

    /// Whether a value satisfies every rule.
    pub fn is_valid(&self, value: &str) -> bool {
        let chars = value.chars().count();
        if let Some(min) = self.min_length {
            if chars < min {
                return false;
            }
        }
        if let Some(max) = self.max_length {
            if chars > max {
                return false;
            }
        }
        if let Some(regex) = &self.regex {
            if !regex.is_match(value) {
                return false;
            }
        }
        if let Some(allowed) = &self.allowed_values {
            if !allowed.iter().any(|a| a == value) {
                return false;
            }
        }
        true
    }

    /// Whether this validation has any rule at all.
    pub fn is_empty(&self) -> bool {
        self.regex.is_none()
            && self.min_length.is_none()
            && self.max_length.is_none()
            && self.allowed_values.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preserve_length_pads_digits_with_zeros() {
        assert_eq!(preserve_length("123", 6), "123000");
        assert_eq!(preserve_length("Sydney", 8), "Sydney  ");
    }

    #[test]
    fn test_preserve_length_truncates() {
        assert_eq!(preserve_length("Melbourne", 4), "Melb");
        assert_eq!(preserve_length("12345", 3), "123");
    }

    #[test]
    fn test_preserve_length_counts_chars_not_bytes() {
        assert_eq!(preserve_length("Zoë", 3), "Zoë");
        assert_eq!(preserve_length("Zoë", 5), "Zoë  ");
    }

    #[test]
    fn test_formatting_pipeline() {
        let formatting: FormattingSpec = serde_json::from_str(
            r#"{"pattern": "[{value}]", "addPrefix": "x-", "case": "upper"}"#,
        )
        .unwrap();
        assert_eq!(apply_formatting("abc", &formatting), "X-[ABC]");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("jane van roe"), "Jane Van Roe");
    }

    #[test]
    fn test_validation_rules() {
        let spec: ValidationSpec = serde_json::from_str(
            r#"{"regex": "^[a-z]+$", "minLength": 2, "maxLength": 5}"#,
        )
        .unwrap();
        let validation = CompiledValidation::compile(&spec).unwrap();
        assert!(validation.is_valid("abc"));
        assert!(!validation.is_valid("a"));
        assert!(!validation.is_valid("toolong"));
        assert!(!validation.is_valid("ABC"));
    }

    #[test]
    fn test_allowed_values() {
        let spec: ValidationSpec =
            serde_json::from_str(r#"{"allowedValues": ["NSW", "VIC"]}"#).unwrap();
        let validation = CompiledValidation::compile(&spec).unwrap();
        assert!(validation.is_valid("NSW"));
        assert!(!validation.is_valid("QLD"));
    }

    #[test]
    fn test_invalid_regex_is_an_error() {
        let spec: ValidationSpec = serde_json::from_str(r#"{"regex": "["}"#).unwrap();
        assert!(CompiledValidation::compile(&spec).is_err());
    }
}
