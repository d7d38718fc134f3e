// Integration tests for the obfuscation engine against SQLite databases

use obfuscator::checkpoint::{CheckpointState, CheckpointStore, RunStatus, TableStatus};
use obfuscator::config::{GlobalSettings, MappingLoader};
use obfuscator::db;
use obfuscator::engine::{Engine, EngineOptions};
use regex::Regex;
use std::path::{Path, PathBuf};

fn connection_string(dir: &Path, name: &str) -> String {
    format!("sqlite://{}/{}.db?mode=rwc", dir.display(), name)
}

fn engine_options(dir: &Path) -> EngineOptions {
    EngineOptions {
        resume: false,
        checkpoint_root: dir.join("checkpoints"),
        failure_log_root: dir.join("failures"),
        report_root: dir.join("reports"),
        install_signal_handler: false,
    }
}

async fn open_pool(conn: &str) -> sqlx::AnyPool {
    let global: GlobalSettings = serde_json::from_str(&format!(
        r#"{{"ConnectionString": "{conn}", "GlobalSeed": "s", "ParallelThreads": 1}}"#
    ))
    .unwrap();
    db::connect(&global).await.unwrap()
}

async fn seed_customers(conn: &str, rows: u64) {
    let pool = open_pool(conn).await;
    sqlx::query("CREATE TABLE customers (id INTEGER PRIMARY KEY, email TEXT, city TEXT)")
        .execute(&pool)
        .await
        .unwrap();
    for i in 1..=rows {
        sqlx::query("INSERT INTO customers (id, email, city) VALUES (?, ?, ?)")
            .bind(i as i64)
            .bind(format!("user{i}@corp.com"))
            .bind(if i % 2 == 0 { "Springfield" } else { "Riverton" })
            .execute(&pool)
            .await
            .unwrap();
    }
    pool.close().await;
}

async fn fetch_emails(conn: &str) -> Vec<String> {
    let pool = open_pool(conn).await;
    let emails = sqlx::query_scalar("SELECT email FROM customers ORDER BY id")
        .fetch_all(&pool)
        .await
        .unwrap();
    pool.close().await;
    emails
}

fn write_mapping(dir: &Path, name: &str, json: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, json).unwrap();
    path
}

fn customers_mapping(dir: &Path, conn: &str) -> String {
    format!(
        r#"{{
        "Global": {{
            "ConnectionString": "{conn}",
            "GlobalSeed": "integration-seed",
            "BatchSize": 100,
            "SqlBatchSize": 50,
            "ParallelThreads": 1,
            "MappingCacheDirectory": "{cache}"
        }},
        "Tables": [{{
            "fullName": "customers",
            "primaryKey": ["id"],
            "columns": [
                {{"name": "email", "dataType": "Email"}},
                {{"name": "city", "dataType": "City"}}
            ]
        }}]
    }}"#,
        cache = dir.join("cache").display()
    )
}

#[tokio::test]
async fn test_happy_path_small() {
    let dir = tempfile::tempdir().unwrap();
    let conn = connection_string(dir.path(), "fleet");
    seed_customers(&conn, 250).await;

    let mapping = write_mapping(dir.path(), "mapping.json", &customers_mapping(dir.path(), &conn));
    let (doc, hash) = MappingLoader::load(&mapping).unwrap();

    let outcome = Engine::new(doc, hash.clone())
        .with_options(engine_options(dir.path()))
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.status, RunStatus::Completed);
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(outcome.tables.len(), 1);
    assert_eq!(outcome.tables[0].status, TableStatus::Completed);
    assert_eq!(outcome.tables[0].total_rows, 250);
    assert_eq!(outcome.tables[0].processed_rows, 250);
    assert_eq!(outcome.total_failed_rows, 0);

    // Every email was rewritten to a plausible address.
    let email_re = Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").unwrap();
    let emails = fetch_emails(&conn).await;
    assert_eq!(emails.len(), 250);
    for (i, email) in emails.iter().enumerate() {
        assert_ne!(email, &format!("user{}@corp.com", i + 1));
        assert!(email_re.is_match(email), "{email}");
    }

    // Checkpoint removed on completion, report written.
    let store = CheckpointStore::open(dir.path().join("checkpoints")).unwrap();
    assert!(store.load(&hash).unwrap().is_none());

    let report_path = outcome.report_path.expect("report written");
    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(report_path).unwrap()).unwrap();
    assert_eq!(report["totals"]["tables"], 1);
    assert_eq!(report["totals"]["rowsProcessed"], 250);
    assert_eq!(report["totals"]["rowsFailed"], 0);
}

#[tokio::test]
async fn test_resume_skips_committed_batches() {
    let dir = tempfile::tempdir().unwrap();
    let conn = connection_string(dir.path(), "fleet");
    seed_customers(&conn, 250).await;

    let mapping = write_mapping(dir.path(), "mapping.json", &customers_mapping(dir.path(), &conn));
    let (doc, hash) = MappingLoader::load(&mapping).unwrap();

    // Emulate a crash after batch 1 committed: rows 1..=100 carry sentinel
    // values the generator would never produce, and the checkpoint records
    // the first batch as processed.
    {
        let pool = open_pool(&conn).await;
        for i in 1..=100 {
            sqlx::query("UPDATE customers SET email = ? WHERE id = ?")
                .bind(format!("sentinel{i}@keep.me"))
                .bind(i as i64)
                .execute(&pool)
                .await
                .unwrap();
        }
        pool.close().await;

        let store = CheckpointStore::open(dir.path().join("checkpoints")).unwrap();
        let mut state = CheckpointState::new(&hash, "fleet");
        let table = state.table_mut("customers");
        table.status = TableStatus::InProgress;
        table.total_rows = 250;
        table.record_batch(0, 0, 100, 100);
        state.refresh_totals();
        store.save(&state).unwrap();
    }

    let mut options = engine_options(dir.path());
    options.resume = true;
    let outcome = Engine::new(doc, hash.clone())
        .with_options(options)
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.status, RunStatus::Completed);
    assert_eq!(outcome.tables[0].processed_rows, 250);

    let emails = fetch_emails(&conn).await;
    // Batch 1 was skipped verbatim: not re-read, not re-written.
    for (i, email) in emails.iter().take(100).enumerate() {
        assert_eq!(email, &format!("sentinel{}@keep.me", i + 1));
    }
    // Batches 2 and 3 were processed.
    for (i, email) in emails.iter().enumerate().skip(100) {
        assert_ne!(email, &format!("user{}@corp.com", i + 1));
        assert!(!email.starts_with("sentinel"));
    }

    // A resumed completion still clears the checkpoint.
    let store = CheckpointStore::open(dir.path().join("checkpoints")).unwrap();
    assert!(store.load(&hash).unwrap().is_none());
}

#[tokio::test]
async fn test_resumed_rows_match_uninterrupted_run() {
    let dir = tempfile::tempdir().unwrap();

    let conn_a = connection_string(dir.path(), "run_a");
    let conn_b = connection_string(dir.path(), "run_b");
    seed_customers(&conn_a, 120).await;
    seed_customers(&conn_b, 120).await;

    for (name, conn) in [("a.json", &conn_a), ("b.json", &conn_b)] {
        let mapping = write_mapping(dir.path(), name, &customers_mapping(dir.path(), conn));
        let (doc, hash) = MappingLoader::load(&mapping).unwrap();
        Engine::new(doc, hash)
            .with_options(engine_options(dir.path()))
            .run()
            .await
            .unwrap();
    }

    // Same seed, same originals: both databases hold identical synthetics.
    assert_eq!(fetch_emails(&conn_a).await, fetch_emails(&conn_b).await);
}

#[tokio::test]
async fn test_high_cardinality_types_are_not_cached() {
    let dir = tempfile::tempdir().unwrap();
    let conn = connection_string(dir.path(), "fleet");
    seed_customers(&conn, 300).await;

    let mapping = write_mapping(dir.path(), "mapping.json", &customers_mapping(dir.path(), &conn));
    let (doc, hash) = MappingLoader::load(&mapping).unwrap();
    let outcome = Engine::new(doc, hash)
        .with_options(engine_options(dir.path()))
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.tables[0].processed_rows, 300);
    // Emails passed through without touching storage; cities were cached.
    assert_eq!(outcome.cache_stats.pass_throughs, 300);
    assert_eq!(outcome.cache_stats.entries, 2);

    let cache_dir = dir.path().join("cache/fleet");
    assert!(!cache_dir.join("Email.json").exists());
    let cities: std::collections::BTreeMap<String, String> = serde_json::from_str(
        &std::fs::read_to_string(cache_dir.join("City.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(cities.len(), 2);
}

#[tokio::test]
async fn test_referential_integrity_exact() {
    let dir = tempfile::tempdir().unwrap();
    let conn = connection_string(dir.path(), "fleet");

    {
        let pool = open_pool(&conn).await;
        sqlx::query("CREATE TABLE drivers (id INTEGER PRIMARY KEY, driver_name TEXT)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("CREATE TABLE assignments (id INTEGER PRIMARY KEY, driver_name TEXT)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO drivers (id, driver_name) VALUES (1, 'Jane Roe')")
            .execute(&pool)
            .await
            .unwrap();
        for i in 1..=12 {
            sqlx::query("INSERT INTO assignments (id, driver_name) VALUES (?, 'Jane Roe')")
                .bind(i as i64)
                .execute(&pool)
                .await
                .unwrap();
        }
        pool.close().await;
    }

    let mapping = write_mapping(
        dir.path(),
        "mapping.json",
        &format!(
            r#"{{
            "Global": {{
                "ConnectionString": "{conn}",
                "GlobalSeed": "integration-seed",
                "ParallelThreads": 1,
                "MappingCacheDirectory": "{cache}"
            }},
            "ReferentialIntegrity": {{
                "relationships": [{{
                    "name": "DriverConsistency",
                    "primaryTable": "drivers",
                    "primaryColumn": "driver_name",
                    "relatedMappings": [
                        {{"table": "assignments", "column": "driver_name", "relationship": "exact"}}
                    ]
                }}]
            }},
            "Tables": [
                {{
                    "fullName": "drivers",
                    "primaryKey": ["id"],
                    "columns": [{{"name": "driver_name", "dataType": "FullName"}}]
                }},
                {{
                    "fullName": "assignments",
                    "primaryKey": ["id"],
                    "columns": [{{"name": "driver_name", "dataType": "FullName"}}]
                }}
            ]
        }}"#,
            cache = dir.path().join("cache").display()
        ),
    );

    let (doc, hash) = MappingLoader::load(&mapping).unwrap();
    let outcome = Engine::new(doc, hash)
        .with_options(engine_options(dir.path()))
        .run()
        .await
        .unwrap();
    assert_eq!(outcome.status, RunStatus::Completed);

    let pool = open_pool(&conn).await;
    let primary: String = sqlx::query_scalar("SELECT driver_name FROM drivers WHERE id = 1")
        .fetch_one(&pool)
        .await
        .unwrap();
    let related: Vec<String> = sqlx::query_scalar("SELECT driver_name FROM assignments")
        .fetch_all(&pool)
        .await
        .unwrap();
    pool.close().await;

    assert_ne!(primary, "Jane Roe");
    assert_eq!(related.len(), 12);
    for value in related {
        assert_eq!(value, primary);
    }
}

#[tokio::test]
async fn test_fallback_use_default_on_generation_failure() {
    let dir = tempfile::tempdir().unwrap();
    let conn = connection_string(dir.path(), "fleet");
    seed_customers(&conn, 20).await;

    // The validation regex is unsatisfiable, so every cell exhausts its
    // retries and falls back to the default value.
    let mapping = write_mapping(
        dir.path(),
        "mapping.json",
        &format!(
            r#"{{
            "Global": {{
                "ConnectionString": "{conn}",
                "GlobalSeed": "integration-seed",
                "ParallelThreads": 1,
                "MappingCacheDirectory": "{cache}"
            }},
            "Tables": [{{
                "fullName": "customers",
                "primaryKey": ["id"],
                "columns": [{{
                    "name": "email",
                    "dataType": "Email",
                    "validation": {{"regex": "^IMPOSSIBLE$"}},
                    "fallback": {{"onError": "useDefault", "defaultValue": "redacted@x"}}
                }}]
            }}]
        }}"#,
            cache = dir.path().join("cache").display()
        ),
    );

    let (doc, hash) = MappingLoader::load(&mapping).unwrap();
    let outcome = Engine::new(doc, hash)
        .with_options(engine_options(dir.path()))
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.status, RunStatus::Completed);
    assert_eq!(outcome.total_failed_rows, 20);

    let emails = fetch_emails(&conn).await;
    assert!(emails.iter().all(|e| e == "redacted@x"));

    let journal = std::fs::read_to_string(&outcome.failure_log_path).unwrap();
    let records = journal
        .lines()
        .filter(|l| l.contains("Generation exhausted"))
        .count();
    assert_eq!(records, 20);
}

#[tokio::test]
async fn test_dry_run_commits_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let conn = connection_string(dir.path(), "fleet");
    seed_customers(&conn, 50).await;

    let mapping_json = customers_mapping(dir.path(), &conn)
        .replace("\"SqlBatchSize\": 50,", "\"SqlBatchSize\": 50, \"DryRun\": true,");
    let mapping = write_mapping(dir.path(), "mapping.json", &mapping_json);

    let (doc, hash) = MappingLoader::load(&mapping).unwrap();
    assert!(doc.global.dry_run);

    let outcome = Engine::new(doc, hash)
        .with_options(engine_options(dir.path()))
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.status, RunStatus::Completed);
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(outcome.tables[0].processed_rows, 50);

    // No row changed.
    let emails = fetch_emails(&conn).await;
    for (i, email) in emails.iter().enumerate() {
        assert_eq!(email, &format!("user{}@corp.com", i + 1));
    }
}

#[tokio::test]
async fn test_tables_run_in_priority_order() {
    let dir = tempfile::tempdir().unwrap();
    let conn = connection_string(dir.path(), "fleet");

    {
        let pool = open_pool(&conn).await;
        for table in ["alpha", "beta"] {
            sqlx::query(&format!(
                "CREATE TABLE {table} (id INTEGER PRIMARY KEY, email TEXT)"
            ))
            .execute(&pool)
            .await
            .unwrap();
            sqlx::query(&format!("INSERT INTO {table} (id, email) VALUES (1, 'a@b.co')"))
                .execute(&pool)
                .await
                .unwrap();
        }
        pool.close().await;
    }

    // beta declares the lower priority number and must run first.
    let mapping = write_mapping(
        dir.path(),
        "mapping.json",
        &format!(
            r#"{{
            "Global": {{
                "ConnectionString": "{conn}",
                "GlobalSeed": "integration-seed",
                "ParallelThreads": 1,
                "MappingCacheDirectory": "{cache}"
            }},
            "Tables": [
                {{"fullName": "alpha", "primaryKey": ["id"], "priority": 20,
                  "columns": [{{"name": "email", "dataType": "Email"}}]}},
                {{"fullName": "beta", "primaryKey": ["id"], "priority": 10,
                  "columns": [{{"name": "email", "dataType": "Email"}}]}}
            ]
        }}"#,
            cache = dir.path().join("cache").display()
        ),
    );

    let (doc, hash) = MappingLoader::load(&mapping).unwrap();
    let outcome = Engine::new(doc, hash)
        .with_options(engine_options(dir.path()))
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.tables[0].table_name, "beta");
    assert_eq!(outcome.tables[1].table_name, "alpha");
    assert_eq!(outcome.status, RunStatus::Completed);
}
