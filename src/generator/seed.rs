//! Deterministic seeding.
//!
//! Every synthetic value is derived from a 64-bit state computed as a
//! byte-portable hash over `effectiveSeed | baseType | normalize(original)`.
//! The hash is SHA-256 truncated to 64 bits; host string hashing is never
//! used. Sub-values within one generated value are drawn from a splitmix64
//! stream over that state, which keeps the derivation chain identical
//! across runs, processes and machines.

use super::data_type::DataType;
use sha2::{Digest, Sha256};

/// Derive the 64-bit generator state for one (seed, type, original) triple.
pub fn stable_hash64(effective_seed: &str, base_type: &str, normalized: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(effective_seed.as_bytes());
    hasher.update(b"|");
    hasher.update(base_type.as_bytes());
    hasher.update(b"|");
    hasher.update(normalized.as_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// Re-hash a state for validation retries.
pub fn rehash(state: u64) -> u64 {
    let digest = Sha256::digest(state.to_le_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// Deterministic stream of sub-seeds drawn from one 64-bit state.
///
/// splitmix64 with the reference constants; each call advances the state,
/// so consecutive draws are disjoint sub-seeds of the original state.
#[derive(Debug, Clone)]
pub struct SeedStream {
    state: u64,
}

impl SeedStream {
    /// Create a stream over the given state.
    pub fn new(state: u64) -> Self {
        Self { state }
    }

    /// Next raw 64-bit value.
    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform value in `0..bound`. `bound` must be nonzero.
    pub fn next_below(&mut self, bound: u64) -> u64 {
        debug_assert!(bound > 0);
        self.next_u64() % bound
    }

    /// Uniform value in `low..=high`.
    pub fn next_in_range(&mut self, low: i64, high: i64) -> i64 {
        debug_assert!(low <= high);
        let span = (high - low) as u64 + 1;
        low + self.next_below(span) as i64
    }

    /// Pick one element from a nonempty slice.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[self.next_below(items.len() as u64) as usize]
    }

    /// One decimal digit.
    pub fn digit(&mut self) -> char {
        (b'0' + self.next_below(10) as u8) as char
    }

    /// A run of decimal digits.
    pub fn digits(&mut self, count: usize) -> String {
        (0..count).map(|_| self.digit()).collect()
    }

    /// One uppercase ASCII letter.
    pub fn letter(&mut self) -> char {
        (b'A' + self.next_below(26) as u8) as char
    }

    /// A run of uppercase ASCII letters.
    pub fn letters(&mut self, count: usize) -> String {
        (0..count).map(|_| self.letter()).collect()
    }

    /// A run of characters from a custom alphabet.
    pub fn from_alphabet(&mut self, alphabet: &[u8], count: usize) -> String {
        (0..count)
            .map(|_| alphabet[self.next_below(alphabet.len() as u64) as usize] as char)
            .collect()
    }
}

/// Normalize an original value before hashing.
///
/// Whitespace is trimmed. Email folds only its local-part to lowercase
/// (split on the last `@`; the domain's case is kept, so originals that
/// differ only in domain case map to distinct synthetics); UKPostcode
/// folds the whole string.
pub fn normalize(original: &str, base: DataType) -> String {
    let trimmed = original.trim();
    match base {
        DataType::Email => match trimmed.rsplit_once('@') {
            Some((local, domain)) => format!("{}@{}", local.to_lowercase(), domain),
            None => trimmed.to_lowercase(),
        },
        _ if base.is_case_insensitive() => trimmed.to_lowercase(),
        _ => trimmed.to_string(),
    }
}
