// crates/cy-dictionary-cli/tests/cli_commands.rs
// ============================================================================
// Module: CLI Command Tests
// Description: Integration tests for config and store commands.
// Purpose: Ensure commands validate config and emit machine-readable JSON.
// Dependencies: cy-dictionary-cli binary, cy-dictionary-store-sqlite, serde_json
// ============================================================================

//! CLI command integration tests.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Output;

use cy_dictionary_core::EntryPersistence;
use cy_dictionary_core::EntryWrite;
use cy_dictionary_core::Timestamp;
use cy_dictionary_core::UploadMetadata;
use cy_dictionary_store_sqlite::SqliteDictionaryStore;
use cy_dictionary_store_sqlite::SqliteStoreConfig;
use serde_json::Value;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn cy_dictionary_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_cy-dictionary"))
}

fn run(args: &[&str]) -> Output {
    Command::new(cy_dictionary_bin())
        .args(args)
        .env_remove("CY_DICTIONARY_CONFIG")
        .output()
        .expect("run cy-dictionary")
}

fn write_sqlite_config(dir: &Path, extra: &str) -> (PathBuf, PathBuf) {
    let db_path = dir.join("dictionary.sqlite");
    let config_path = dir.join("cy-dictionary.toml");
    let config = format!(
        "[server]\nbind = \"127.0.0.1:4550\"\n\n[store]\ntype = \"sqlite\"\npath = '{}'\n{extra}",
        db_path.display()
    );
    fs::write(&config_path, config).expect("write config");
    (config_path, db_path)
}

fn seed(db_path: &Path, phrases: &[&str]) {
    let store = SqliteDictionaryStore::new(SqliteStoreConfig::at(db_path)).expect("open store");
    for phrase in phrases {
        let upload = UploadMetadata::new("seeder", Timestamp::from_unix_millis(1_000));
        store.save_and_flush(&EntryWrite::insert(*phrase, None, upload)).expect("seed entry");
    }
}

fn stdout_json(output: &Output) -> Value {
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    serde_json::from_slice(&output.stdout).expect("stdout json")
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

#[test]
fn config_example_is_a_valid_config() {
    let temp = TempDir::new().unwrap();
    let output = run(&["config", "example"]);
    assert!(output.status.success());
    let path = temp.path().join("example.toml");
    fs::write(&path, &output.stdout).unwrap();

    let output = run(&["config", "validate", "--config", path.to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "config ok");
}

#[test]
fn config_validate_rejects_invalid_config() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("bad.toml");
    fs::write(&path, "[server]\nbind = \"127.0.0.1:4550\"\n[auth]\nmanage_role = \"  \"\n").unwrap();

    let output = run(&["config", "validate", "--config", path.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("manage_role"));
}

// ============================================================================
// SECTION: Store Commands
// ============================================================================

#[test]
fn store_list_prints_page_with_upload_records() {
    let temp = TempDir::new().unwrap();
    let (config_path, db_path) = write_sqlite_config(temp.path(), "");
    seed(&db_path, &["charlie", "alpha", "bravo"]);

    let output = run(&[
        "store",
        "list",
        "--config",
        config_path.to_str().unwrap(),
        "--offset",
        "1",
        "--limit",
        "1",
    ]);
    let page = stdout_json(&output);
    assert_eq!(page["total"], 3);
    let items = page["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["english_phrase"], "bravo");
    assert_eq!(items[0]["upload"]["uploaded_by"], "seeder");
}

#[test]
fn store_list_rejects_out_of_range_limit() {
    let temp = TempDir::new().unwrap();
    let (config_path, _) = write_sqlite_config(temp.path(), "");
    let output =
        run(&["store", "list", "--config", config_path.to_str().unwrap(), "--limit", "0"]);
    assert!(!output.status.success());
}

#[test]
fn store_delete_test_phrases_uses_configured_prefix() {
    let temp = TempDir::new().unwrap();
    let (config_path, db_path) =
        write_sqlite_config(temp.path(), "\n[testing_support]\nenabled = true\n");
    seed(&db_path, &["TEST-ABC123", "Keep me"]);

    let output = run(&["store", "delete-test-phrases", "--config", config_path.to_str().unwrap()]);
    let report = stdout_json(&output);
    assert_eq!(report["prefix"], "TEST-");
    assert_eq!(report["deleted"], 1);

    let output = run(&["store", "delete-test-phrases", "--config", config_path.to_str().unwrap()]);
    assert_eq!(stdout_json(&output)["deleted"], 0);

    let store = SqliteDictionaryStore::new(SqliteStoreConfig::at(&db_path)).unwrap();
    let phrases: Vec<String> =
        store.find_all().unwrap().into_iter().map(|entry| entry.english_phrase).collect();
    assert_eq!(phrases, vec!["Keep me".to_string()]);
}

fn remaining_phrases(db_path: &Path) -> Vec<String> {
    let store = SqliteDictionaryStore::new(SqliteStoreConfig::at(db_path)).unwrap();
    store.find_all().unwrap().into_iter().map(|entry| entry.english_phrase).collect()
}

#[test]
fn store_delete_test_phrases_refuses_when_test_support_disabled() {
    let temp = TempDir::new().unwrap();
    let (config_path, db_path) = write_sqlite_config(temp.path(), "");
    seed(&db_path, &["TEST-ABC123", "Hello", "Help"]);

    let output = run(&["store", "delete-test-phrases", "--config", config_path.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("testing_support.enabled"));
    assert_eq!(remaining_phrases(&db_path).len(), 3);
}

#[test]
fn store_delete_test_phrases_rejects_arbitrary_prefix() {
    let temp = TempDir::new().unwrap();
    let (config_path, db_path) =
        write_sqlite_config(temp.path(), "\n[testing_support]\nenabled = true\n");
    seed(&db_path, &["Hello", "Help", "Keep me"]);

    let output = run(&[
        "store",
        "delete-test-phrases",
        "--config",
        config_path.to_str().unwrap(),
        "--prefix",
        "He",
    ]);
    assert!(!output.status.success());
    assert_eq!(remaining_phrases(&db_path).len(), 3);
}
