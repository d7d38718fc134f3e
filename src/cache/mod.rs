//! # Selective Mapping Cache
//!
//! In-memory `original → synthetic` maps, partitioned by data type:
//! - Only low-cardinality types are cached; high-cardinality types pass
//!   straight through to the generator
//! - Per-key single-flight: concurrent lookups of the same key compute once
//! - Bounded size with graceful degradation: a full cache never evicts
//!   (eviction would let a later row disagree with an earlier one), it
//!   stops inserting and computes on every new miss
//! - Persisted per type as `<dir>/<database>/<DataType>.json`

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use thiserror::Error;

/// Cache error types
#[derive(Error, Debug)]
pub enum CacheError {
    /// I/O error reading or writing cache files
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A cache file held invalid JSON
    #[error("Cache file {path} is not a valid mapping: {source}")]
    Corrupt {
        /// Offending file
        path: PathBuf,
        /// Parse error
        source: serde_json::Error,
    },
}

/// Result type for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

/// Point-in-time cache counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the cache
    pub hits: u64,

    /// Lookups that computed and stored a new entry
    pub misses: u64,

    /// Computations that bypassed storage (never-cached type or full cache)
    pub pass_throughs: u64,

    /// Entries currently stored across all types
    pub entries: usize,
}

/// Shared mapping cache.
///
/// One instance per run, shared by every table worker.
pub struct MappingCache {
    entries: DashMap<(String, String), String>,
    max_entries: usize,
    size: AtomicUsize,
    saturation_logged: AtomicBool,
    hits: AtomicU64,
    misses: AtomicU64,
    pass_throughs: AtomicU64,
}

impl MappingCache {
    /// Create a cache bounded to `max_entries` total stored values.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries,
            size: AtomicUsize::new(0),
            saturation_logged: AtomicBool::new(false),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            pass_throughs: AtomicU64::new(0),
        }
    }

    /// Look up or compute the synthetic value for `(data_type, original)`.
    ///
    /// With `should_cache` false the store is never touched. With it true,
    /// a hit returns the stored value; a miss computes, stores and returns.
    /// The dashmap entry guard makes the compute single-flight per key:
    /// a concurrent caller for the same key blocks until the value exists,
    /// then reads it, so `compute` never runs twice for one key.
    pub fn get_or_create<F>(&self, data_type: &str, original: &str, should_cache: bool, compute: F) -> crate::generator::Result<String>
    where
        F: FnOnce() -> crate::generator::Result<String>,
    {
        if !should_cache {
            self.pass_throughs.fetch_add(1, Ordering::Relaxed);
            return compute();
        }

        match self
            .entries
            .entry((data_type.to_string(), original.to_string()))
        {
            Entry::Occupied(occupied) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(occupied.get().clone())
            }
            Entry::Vacant(vacant) => {
                if self.size.load(Ordering::Relaxed) >= self.max_entries {
                    drop(vacant);
                    self.note_saturation();
                    self.pass_throughs.fetch_add(1, Ordering::Relaxed);
                    return compute();
                }

                let value = compute()?;
                vacant.insert(value.clone());
                self.size.fetch_add(1, Ordering::Relaxed);
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(value)
            }
        }
    }

    fn note_saturation(&self) {
        if !self.saturation_logged.swap(true, Ordering::Relaxed) {
            log::warn!(
                "Mapping cache reached its bound of {} entries; new keys will be \
                 computed without caching (existing entries remain authoritative)",
                self.max_entries
            );
        }
    }

    /// Number of entries stored for one data type.
    pub fn entries_for(&self, data_type: &str) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.key().0 == data_type)
            .count()
    }

    /// Counter snapshot.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            pass_throughs: self.pass_throughs.load(Ordering::Relaxed),
            entries: self.size.load(Ordering::Relaxed),
        }
    }

    /// Persist the cache as one JSON object per data type.
    ///
    /// Layout: `<directory>/<database>/<DataType>.json`, each a single
    /// `{original: synthetic}` object with sorted keys.
    pub fn flush_to_disk(&self, directory: &Path, database: &str) -> Result<()> {
        let dir = directory.join(database);
        std::fs::create_dir_all(&dir)?;

        let mut by_type: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
        for entry in self.entries.iter() {
            let (data_type, original) = entry.key();
            by_type
                .entry(data_type.clone())
                .or_default()
                .insert(original.clone(), entry.value().clone());
        }

        for (data_type, mappings) in by_type {
            let path = dir.join(format!("{}.json", data_type));
            let json = serde_json::to_string_pretty(&mappings)
                .expect("string map serialization cannot fail");
            std::fs::write(&path, json)?;
            log::debug!(
                "Flushed {} cached mappings for {} to {}",
                mappings.len(),
                data_type,
                path.display()
            );
        }

        Ok(())
    }

    /// Load previously persisted mappings.
    ///
    /// Files whose data type is no longer cached under `policy` are
    /// discarded for backward compatibility with older cache layouts.
    /// Loading stops inserting once the size bound is reached.
    pub fn load_from_disk<P>(&self, directory: &Path, database: &str, policy: P) -> Result<usize>
    where
        P: Fn(&str) -> bool,
    {
        let dir = directory.join(database);
        if !dir.is_dir() {
            return Ok(0);
        }

        let mut loaded = 0;
        for dir_entry in std::fs::read_dir(&dir)? {
            let path = dir_entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(data_type) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            if !policy(data_type) {
                log::debug!(
                    "Discarding persisted cache for never-cached type {} ({})",
                    data_type,
                    path.display()
                );
                continue;
            }

            let raw = std::fs::read_to_string(&path)?;
            let mappings: BTreeMap<String, String> =
                serde_json::from_str(&raw).map_err(|source| CacheError::Corrupt {
                    path: path.clone(),
                    source,
                })?;

            for (original, synthetic) in mappings {
                if self.size.load(Ordering::Relaxed) >= self.max_entries {
                    self.note_saturation();
                    return Ok(loaded);
                }
                if self
                    .entries
                    .insert((data_type.to_string(), original), synthetic)
                    .is_none()
                {
                    self.size.fetch_add(1, Ordering::Relaxed);
                    loaded += 1;
                }
            }
        }

        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::sync::Arc;

    #[test]
    fn test_hit_returns_stored_value_without_recompute() {
        let cache = MappingCache::new(100);
        let calls = AtomicU32::new(0);

        let first = cache
            .get_or_create("FirstName", "Jane", true, || {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok("Amelia".to_string())
            })
            .unwrap();
        let second = cache
            .get_or_create("FirstName", "Jane", true, || {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok("Wrong".to_string())
            })
            .unwrap();

        assert_eq!(first, "Amelia");
        assert_eq!(second, "Amelia");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_never_cached_type_stores_nothing() {
        let cache = MappingCache::new(100);
        for i in 0..10 {
            cache
                .get_or_create("Email", &format!("user{i}@x.com"), false, || {
                    Ok(format!("synth{i}@x.com"))
                })
                .unwrap();
        }
        assert_eq!(cache.stats().entries, 0);
        assert_eq!(cache.stats().pass_throughs, 10);
        assert_eq!(cache.entries_for("Email"), 0);
    }

    #[test]
    fn test_full_cache_degrades_to_pass_through() {
        let cache = MappingCache::new(2);
        for (original, value) in [("a", "1"), ("b", "2"), ("c", "3")] {
            cache
                .get_or_create("City", original, true, || Ok(value.to_string()))
                .unwrap();
        }

        // First two inserted, third passed through.
        assert_eq!(cache.stats().entries, 2);
        assert_eq!(cache.stats().pass_throughs, 1);

        // Existing entries stay authoritative.
        let hit = cache
            .get_or_create("City", "a", true, || Ok("other".to_string()))
            .unwrap();
        assert_eq!(hit, "1");
    }

    #[test]
    fn test_compute_error_does_not_poison_the_key() {
        let cache = MappingCache::new(10);
        let err = cache.get_or_create("City", "x", true, || {
            Err(crate::generator::GeneratorError::Exhausted {
                data_type: "City".to_string(),
                attempts: 16,
            })
        });
        assert!(err.is_err());

        let ok = cache
            .get_or_create("City", "x", true, || Ok("Sydney".to_string()))
            .unwrap();
        assert_eq!(ok, "Sydney");
    }

    #[test]
    fn test_single_flight_under_contention() {
        let cache = Arc::new(MappingCache::new(100));
        let calls = Arc::new(AtomicU32::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let calls = calls.clone();
                std::thread::spawn(move || {
                    cache
                        .get_or_create("LastName", "Roe", true, || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            std::thread::sleep(std::time::Duration::from_millis(10));
                            Ok("Nguyen".to_string())
                        })
                        .unwrap()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), "Nguyen");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_flush_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = MappingCache::new(100);
        cache
            .get_or_create("City", "Sydney", true, || Ok("Perth".to_string()))
            .unwrap();
        cache
            .get_or_create("Email", "a@x.com", false, || Ok("b@y.com".to_string()))
            .unwrap();
        cache.flush_to_disk(dir.path(), "crm").unwrap();

        assert!(dir.path().join("crm/City.json").is_file());
        // Pass-through types never produce a cache file.
        assert!(!dir.path().join("crm/Email.json").exists());

        let fresh = MappingCache::new(100);
        let loaded = fresh
            .load_from_disk(dir.path(), "crm", |dt| dt == "City")
            .unwrap();
        assert_eq!(loaded, 1);
        let value = fresh
            .get_or_create("City", "Sydney", true, || Ok("wrong".to_string()))
            .unwrap();
        assert_eq!(value, "Perth");
    }

    #[test]
    fn test_load_discards_never_cached_types() {
        let dir = tempfile::tempdir().unwrap();
        let db_dir = dir.path().join("crm");
        std::fs::create_dir_all(&db_dir).unwrap();
        std::fs::write(db_dir.join("Email.json"), r#"{"a@x.com": "b@y.com"}"#).unwrap();

        let cache = MappingCache::new(100);
        let loaded = cache.load_from_disk(dir.path(), "crm", |_| false).unwrap();
        assert_eq!(loaded, 0);
        assert_eq!(cache.stats().entries, 0);
    }
}
