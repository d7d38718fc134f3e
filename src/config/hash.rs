//! Stable config hashing.
//!
//! The checkpoint identity is a hash over the canonical JSON rendering of
//! the mapping document: keys sorted, no insignificant whitespace. Parsing
//! into `serde_json::Value` gives sorted keys for free (object maps are
//! BTreeMaps when `preserve_order` is off), so canonicalization is a
//! parse/re-serialize round trip.

use super::Result;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};

/// Number of base64url characters kept from the digest.
const HASH_LEN: usize = 16;

/// Compute the stable hash identifying a mapping document.
///
/// The hash is SHA-256 over the canonical JSON, base64url encoded without
/// padding and truncated to 16 characters.
pub fn config_hash(raw_json: &str) -> Result<String> {
    let value: serde_json::Value = serde_json::from_str(raw_json)?;
    let canonical = serde_json::to_string(&value)?;

    let digest = Sha256::digest(canonical.as_bytes());
    let encoded = URL_SAFE_NO_PAD.encode(digest);

    Ok(encoded[..HASH_LEN].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_stable_across_formatting() {
        let a = r#"{"Global": {"GlobalSeed": "x", "ConnectionString": "c"}, "Tables": []}"#;
        let b = "{\n  \"Tables\": [],\n  \"Global\": {\"ConnectionString\": \"c\", \"GlobalSeed\": \"x\"}\n}";
        assert_eq!(config_hash(a).unwrap(), config_hash(b).unwrap());
    }

    #[test]
    fn test_hash_changes_with_content() {
        let a = r#"{"Global": {"GlobalSeed": "x"}}"#;
        let b = r#"{"Global": {"GlobalSeed": "y"}}"#;
        assert_ne!(config_hash(a).unwrap(), config_hash(b).unwrap());
    }

    #[test]
    fn test_hash_length_and_alphabet() {
        let hash = config_hash(r#"{"Global": {}}"#).unwrap();
        assert_eq!(hash.len(), 16);
        assert!(hash
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }
}
