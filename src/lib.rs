//! # Obfuscator - Deterministic PII Obfuscation Engine
//!
//! A deterministic, resumable, in-place PII obfuscation engine for
//! relational databases, built in Rust.
//!
//! ## Architecture
//!
//! - `config`: Mapping document model, loader, validation and config hashing
//! - `generator`: Deterministic synthetic value generation per PII data type
//! - `cache`: Selective per-type mapping cache with disk persistence
//! - `checkpoint`: Durable run progress with atomic saves and resume support
//! - `failures`: Append-only journal of rows that failed to update
//! - `db`: Connection pool, paginated batch reader, sub-batched writer
//! - `engine`: Table workers, coordinator and referential integrity resolver
//! - `report`: Run summary report generation

#![warn(missing_docs)]
#![warn(clippy::all)]

// Configuration loading and hashing
pub mod config;

// Deterministic value generation
pub mod generator;

// Selective mapping cache
pub mod cache;

// Checkpoint store
pub mod checkpoint;

// Failure journal
pub mod failures;

// Database access layer
pub mod db;

// Obfuscation engine
pub mod engine;

// Run reports
pub mod report;

// Re-export commonly used types
pub use config::{ConfigError, MappingDocument};
pub use engine::{Engine, EngineError, RunOutcome};
pub use generator::{DataType, Generator, GeneratorError};

/// Re-export version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
