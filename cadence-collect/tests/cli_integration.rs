//! CLI integration tests for cadence-collect
//!
//! Every scenario here fails before any network traffic, so the tests run
//! offline.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Helper to escape path for TOML on Windows
fn escape_path_for_toml(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "\\\\")
}

/// Write a config pointing at `credentials` and return its path
fn write_config(dir: &TempDir, credentials: &Path, extra: &str) -> String {
    let config_path = dir.path().join("config.toml");
    let output_path = dir.path().join("corpus.csv");
    let content = format!(
        r#"
[account]
credentials_file = "{}"

[output]
path = "{}"
{}
"#,
        escape_path_for_toml(credentials),
        escape_path_for_toml(&output_path),
        extra
    );
    fs::write(&config_path, content).unwrap();
    config_path.to_string_lossy().to_string()
}

#[test]
fn test_help_flag_output() {
    Command::cargo_bin("cadence-collect")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Walk an account's followers"))
        .stdout(predicate::str::contains("--account"))
        .stdout(predicate::str::contains("--lookback-days"))
        .stdout(predicate::str::contains("--max-posts-per-day"))
        .stdout(predicate::str::contains("--table-format"))
        .stdout(predicate::str::contains("--verbose"));
}

#[test]
fn test_short_help_uses_about() {
    Command::cargo_bin("cadence-collect")
        .unwrap()
        .arg("-h")
        .assert()
        .success()
        .stdout(predicate::str::contains("Collect recent posts"))
        .stdout(predicate::str::contains("Walk an account's followers").not());
}

#[test]
fn test_version_flag_output() {
    Command::cargo_bin("cadence-collect")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("cadence-collect"));
}

#[test]
fn test_missing_credentials_file() {
    let temp = TempDir::new().unwrap();
    let config = write_config(&temp, &temp.path().join("access_info.txt"), "");

    Command::cargo_bin("cadence-collect")
        .unwrap()
        .env("CADENCE_CONFIG", config)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("account.credentials_file"))
        .stderr(predicate::str::contains("access_info.txt"));

    assert!(!temp.path().join("corpus.csv").exists());
}

#[test]
fn test_incomplete_credentials() {
    let temp = TempDir::new().unwrap();
    let credentials = temp.path().join("access_info.txt");
    fs::write(
        &credentials,
        "handle,consumer_key,consumer_secret,access_token,access_token_secret\nroot,ck,,at,ats\n",
    )
    .unwrap();
    let config = write_config(&temp, &credentials, "");

    Command::cargo_bin("cadence-collect")
        .unwrap()
        .args(["--config", &config])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Missing required field: consumer_secret"));
}

#[test]
fn test_invalid_config_value() {
    let temp = TempDir::new().unwrap();
    let config = write_config(&temp, &temp.path().join("access_info.txt"), "utc_offset_hours = 40");

    Command::cargo_bin("cadence-collect")
        .unwrap()
        .env("CADENCE_CONFIG", config)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("output.utc_offset_hours"));
}

#[test]
fn test_zero_lookback_override_rejected() {
    let temp = TempDir::new().unwrap();
    let config = write_config(&temp, &temp.path().join("access_info.txt"), "");

    Command::cargo_bin("cadence-collect")
        .unwrap()
        .env("CADENCE_CONFIG", config)
        .args(["--lookback-days", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("collection.lookback_days"));
}

#[test]
fn test_missing_explicit_config() {
    let temp = TempDir::new().unwrap();

    Command::cargo_bin("cadence-collect")
        .unwrap()
        .env("CADENCE_CONFIG", temp.path().join("nope.toml"))
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Failed to read config file"));
}

#[test]
fn test_unknown_table_format_rejected_by_parser() {
    Command::cargo_bin("cadence-collect")
        .unwrap()
        .args(["--table-format", "parquet"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("parquet"));
}
