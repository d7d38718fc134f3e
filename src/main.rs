//! Obfuscator - Deterministic PII Obfuscation Engine
//!
//! Main entry point for the obfuscator CLI.
//!
//! Exit codes:
//! - 0: success
//! - 2: configuration error
//! - 3: database connectivity error
//! - 4: partial failure (one or more tables failed)
//! - 5: cancelled by the operator

use clap::{Arg, ArgAction, Command};
use obfuscator::checkpoint::CheckpointStore;
use obfuscator::config::{loader, MappingLoader};
use obfuscator::db::{self, DbError, SqlDialect};
use obfuscator::engine::{Engine, EngineError, EngineOptions};
use std::io::Write;
use std::path::PathBuf;
use std::process;

#[tokio::main]
async fn main() {
    // Initialize logging with configurable level
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let code = run().await;
    process::exit(code);
}

async fn run() -> i32 {
    let matches = Command::new("obfuscator")
        .about("Deterministic, resumable, in-place PII obfuscation for relational databases")
        .version(obfuscator::VERSION)
        .arg(
            Arg::new("mapping")
                .required(true)
                .value_parser(clap::value_parser!(PathBuf))
                .help("Path to the obfuscation mapping JSON document"),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .action(ArgAction::SetTrue)
                .help("Validate every statement without committing any change"),
        )
        .arg(
            Arg::new("resume")
                .long("resume")
                .action(ArgAction::SetTrue)
                .conflicts_with("fresh")
                .help("Resume a matching checkpoint without prompting"),
        )
        .arg(
            Arg::new("fresh")
                .long("fresh")
                .action(ArgAction::SetTrue)
                .help("Discard any matching checkpoint and start over"),
        )
        .arg(
            Arg::new("validate-only")
                .long("validate-only")
                .action(ArgAction::SetTrue)
                .help("Load and validate the mapping, print its hash and exit"),
        )
        .arg(
            Arg::new("verify-mappings")
                .long("verify-mappings")
                .action(ArgAction::SetTrue)
                .help("Check every mapped table and column against the live schema"),
        )
        .get_matches();

    let mapping_path = matches.get_one::<PathBuf>("mapping").unwrap();

    let (mut doc, config_hash) = match MappingLoader::load(mapping_path) {
        Ok(loaded) => loaded,
        Err(e) => {
            log::error!("Configuration error: {}", e);
            return 2;
        }
    };

    if matches.get_flag("dry-run") {
        doc.global.dry_run = true;
    }

    log::info!("═══════════════════════════════════════════════════════════");
    log::info!("  Obfuscator - Deterministic PII Obfuscation Engine");
    log::info!("  Version: {}", obfuscator::VERSION);
    log::info!("═══════════════════════════════════════════════════════════");
    log::info!("Mapping: {} (hash {})", mapping_path.display(), config_hash);
    log::info!(
        "Database: {} | tables: {} | dry run: {}",
        loader::database_name(&doc.global.connection_string),
        doc.tables.len(),
        doc.global.dry_run
    );

    if matches.get_flag("validate-only") {
        println!("Mapping is valid");
        println!("Config hash: {}", config_hash);
        println!("Tables: {}", doc.tables.len());
        return 0;
    }

    if matches.get_flag("verify-mappings") {
        return verify_mappings(&doc).await;
    }

    let resume = match decide_resume(&matches, &config_hash) {
        Ok(resume) => resume,
        Err(e) => {
            log::error!("Checkpoint inspection failed: {}", e);
            return 4;
        }
    };

    let options = EngineOptions {
        resume,
        install_signal_handler: true,
        ..EngineOptions::default()
    };

    match Engine::new(doc, config_hash).with_options(options).run().await {
        Ok(outcome) => {
            println!();
            println!("Run {:?} in {:.1}s", outcome.status, outcome.duration.as_secs_f64());
            for table in &outcome.tables {
                println!(
                    "  {}: processed {}, failed {}",
                    table.table_name, table.processed_rows, table.failed_rows
                );
            }
            if let Some(report) = &outcome.report_path {
                println!("Report: {}", report.display());
            }
            if outcome.total_failed_rows > 0 {
                println!("Failure log: {}", outcome.failure_log_path.display());
            }
            outcome.exit_code()
        }
        Err(EngineError::Db(DbError::Connectivity(message))) => {
            log::error!("Database connectivity error: {}", message);
            3
        }
        Err(e @ (EngineError::Config(_)
        | EngineError::Generator(_)
        | EngineError::RelationshipMismatch { .. })) => {
            log::error!("Configuration error: {}", e);
            2
        }
        Err(e) => {
            log::error!("Run failed: {}", e);
            4
        }
    }
}

/// Determine whether to resume: flags first, then an interactive prompt
/// when a resumable checkpoint exists.
fn decide_resume(
    matches: &clap::ArgMatches,
    config_hash: &str,
) -> Result<bool, obfuscator::checkpoint::CheckpointError> {
    if matches.get_flag("resume") {
        return Ok(true);
    }
    if matches.get_flag("fresh") {
        return Ok(false);
    }

    let store = CheckpointStore::open(CheckpointStore::DEFAULT_ROOT)?;
    let Some(state) = store.load(config_hash)? else {
        return Ok(false);
    };
    if !state.is_resumable() {
        return Ok(false);
    }

    eprint!(
        "Found a {:?} checkpoint from {} with {} rows processed. Resume? [y/N] ",
        state.status, state.started_at, state.total_rows_processed
    );
    std::io::stderr().flush().ok();

    let mut answer = String::new();
    if std::io::stdin().read_line(&mut answer).is_err() {
        return Ok(false);
    }
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

/// Check every mapped table and column against the live schema.
async fn verify_mappings(doc: &obfuscator::config::MappingDocument) -> i32 {
    let pool = match db::connect(&doc.global).await {
        Ok(pool) => pool,
        Err(e) => {
            log::error!("Database connectivity error: {}", e);
            return 3;
        }
    };
    let dialect = SqlDialect::from_url(&doc.global.connection_string);

    match db::verify_schema(&pool, dialect, &doc.tables).await {
        Ok(issues) if issues.is_empty() => {
            println!("All mapped tables and columns exist");
            0
        }
        Ok(issues) => {
            for issue in &issues {
                println!("MISSING: {}", issue);
            }
            println!("{} issue(s) found", issues.len());
            2
        }
        Err(e) => {
            log::error!("Schema verification failed: {}", e);
            3
        }
    }
}
