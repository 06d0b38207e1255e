//! Integration tests for the `schoolsync` CLI binary.
//!
//! Every test runs against its own temporary HOME and cache directory, so
//! nothing touches the user's real configuration or cache.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use pretty_assertions::assert_eq;
use predicates::prelude::*;
use serde_json::{Value, json};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `schoolsync` binary with env isolation.
///
/// Points HOME and the XDG directories at `home` and clears every
/// `SCHOOLSYNC_*` variable the CLI reads.
fn schoolsync_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("schoolsync");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env("XDG_CACHE_HOME", home.join(".cache"))
        .env_remove("SCHOOLSYNC_OUTPUT")
        .env_remove("SCHOOLSYNC_CACHE_DIR")
        .env_remove("SCHOOLSYNC_SYNC__DEFAULT_TOTAL_FEE")
        .env_remove("SCHOOLSYNC_SYNC__CACHE_KEY_PREFIX")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// Write a cached snapshot the way `FileCache` names it on disk.
fn seed_cache(dir: &Path, encoded_key: &str, body: &Value) {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(
        dir.join(format!("{encoded_key}.json")),
        serde_json::to_string(body).unwrap(),
    )
    .unwrap();
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = tempfile::tempdir().unwrap();
    let output = schoolsync_cmd(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    let home = tempfile::tempdir().unwrap();
    schoolsync_cmd(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("cache")
                .and(predicate::str::contains("fees"))
                .and(predicate::str::contains("config")),
        );
}

#[test]
fn test_version_flag() {
    let home = tempfile::tempdir().unwrap();
    schoolsync_cmd(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("schoolsync"));
}

#[test]
fn test_invalid_subcommand() {
    let home = tempfile::tempdir().unwrap();
    schoolsync_cmd(home.path())
        .arg("enroll")
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_invalid_output_format() {
    let home = tempfile::tempdir().unwrap();
    schoolsync_cmd(home.path())
        .args(["--output", "yaml", "cache", "list"])
        .assert()
        .failure()
        .code(2);
}

// ── Cache ───────────────────────────────────────────────────────────

#[test]
fn test_cache_list_empty_dir() {
    let home = tempfile::tempdir().unwrap();
    let cache = home.path().join("cache");
    schoolsync_cmd(home.path())
        .args(["--output", "plain", "cache", "list", "--cache-dir"])
        .arg(&cache)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
    assert!(cache.is_dir());
}

#[test]
fn test_cache_list_counts_records() {
    let home = tempfile::tempdir().unwrap();
    let cache = home.path().join("cache");
    seed_cache(
        &cache,
        "cache%3Astudents",
        &json!([{ "id": "s1" }, { "id": "s2" }]),
    );
    seed_cache(&cache, "cache%3Anotices", &json!([]));
    seed_cache(&cache, "unrelated", &json!({ "x": 1 }));

    let output = schoolsync_cmd(home.path())
        .args(["--output", "json", "cache", "list"])
        .env("SCHOOLSYNC_CACHE_DIR", &cache)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let listed: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        listed,
        json!([
            { "collection": "notices", "key": "cache:notices", "records": 0 },
            { "collection": "students", "key": "cache:students", "records": 2 },
        ])
    );
}

#[test]
fn test_cache_show_prints_cached_ids() {
    let home = tempfile::tempdir().unwrap();
    let cache = home.path().join("cache");
    seed_cache(
        &cache,
        "cache%3Astudents",
        &json!([
            { "id": "s1", "name": "Asha" },
            { "id": "s2", "name": "Ravi" },
        ]),
    );

    schoolsync_cmd(home.path())
        .args(["-o", "plain", "cache", "show", "students", "--cache-dir"])
        .arg(&cache)
        .assert()
        .success()
        .stdout("s1\ns2\n");
}

#[test]
fn test_cache_show_table_includes_fields() {
    let home = tempfile::tempdir().unwrap();
    let cache = home.path().join("cache");
    seed_cache(&cache, "cache%3Anotices", &json!([{ "id": "n1", "title": "Holiday" }]));

    schoolsync_cmd(home.path())
        .args(["cache", "show", "notices", "--cache-dir"])
        .arg(&cache)
        .assert()
        .success()
        .stdout(predicate::str::contains("n1").and(predicate::str::contains("Holiday")));
}

#[test]
fn test_cache_show_missing_collection_is_not_found() {
    let home = tempfile::tempdir().unwrap();
    let cache = home.path().join("cache");
    let output = schoolsync_cmd(home.path())
        .args(["cache", "show", "teachers", "--cache-dir"])
        .arg(&cache)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
    let text = combined_output(&output);
    assert!(text.contains("teachers"), "Expected collection name in:\n{text}");
    assert!(text.contains("cache list"), "Expected help hint in:\n{text}");
}

#[test]
fn test_cache_clear_one_collection() {
    let home = tempfile::tempdir().unwrap();
    let cache = home.path().join("cache");
    seed_cache(&cache, "cache%3Astudents", &json!([]));
    seed_cache(&cache, "cache%3Anotices", &json!([]));

    schoolsync_cmd(home.path())
        .args(["cache", "clear", "students", "--cache-dir"])
        .arg(&cache)
        .assert()
        .success()
        .stderr(predicate::str::contains("Cleared 1"));

    assert!(!cache.join("cache%3Astudents.json").exists());
    assert!(cache.join("cache%3Anotices.json").exists());
}

#[test]
fn test_cache_clear_all_keeps_foreign_keys() {
    let home = tempfile::tempdir().unwrap();
    let cache = home.path().join("cache");
    seed_cache(&cache, "cache%3Astudents", &json!([]));
    seed_cache(&cache, "cache%3Anotices", &json!([]));
    seed_cache(&cache, "unrelated", &json!([]));

    schoolsync_cmd(home.path())
        .args(["-q", "cache", "clear", "--cache-dir"])
        .arg(&cache)
        .assert()
        .success();

    assert!(!cache.join("cache%3Astudents.json").exists());
    assert!(!cache.join("cache%3Anotices.json").exists());
    assert!(cache.join("unrelated.json").exists());
}

#[test]
fn test_cache_clear_missing_collection_fails() {
    let home = tempfile::tempdir().unwrap();
    let cache = home.path().join("cache");
    schoolsync_cmd(home.path())
        .args(["cache", "clear", "videos", "--cache-dir"])
        .arg(&cache)
        .assert()
        .failure()
        .code(4);
}

// ── Fees ────────────────────────────────────────────────────────────

fn write_fee_exports(dir: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
    let students = dir.join("students.json");
    let fees = dir.join("fees.json");
    std::fs::write(
        &students,
        json!([
            { "id": "s1", "name": "Asha", "class": "7", "rollNumber": "12" },
            { "id": "s2", "name": "Ravi", "class": "7", "rollNumber": "13" },
            { "id": "s3", "name": "Meera", "class": "8", "rollNumber": "4" },
        ])
        .to_string(),
    )
    .unwrap();
    std::fs::write(
        &fees,
        json!({
            "s1": { "totalFee": 50000, "paidAmount": 0 },
            "s2": { "totalFee": 50000, "paidAmount": 50000 },
        })
        .to_string(),
    )
    .unwrap();
    (students, fees)
}

#[test]
fn test_fees_json_report() {
    let home = tempfile::tempdir().unwrap();
    let (students, fees) = write_fee_exports(home.path());

    let output = schoolsync_cmd(home.path())
        .args(["-o", "json", "fees", "--students"])
        .arg(&students)
        .arg("--fees")
        .arg(&fees)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    let statuses: Vec<&str> = report["records"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["status"].as_str().unwrap())
        .collect();
    assert_eq!(statuses, ["pending", "paid", "pending"]);
    assert_eq!(report["records"][2]["total_fee"], json!(50000));
    assert_eq!(report["records"][2]["has_fee_document"], json!(false));
    assert_eq!(
        report["summary"],
        json!({
            "students": 3,
            "paid": 1,
            "partial": 0,
            "pending": 2,
            "total_fee": 150000,
            "collected": 50000,
            "outstanding": 100000,
        })
    );
}

#[test]
fn test_fees_default_fee_from_env_config() {
    let home = tempfile::tempdir().unwrap();
    let (students, fees) = write_fee_exports(home.path());

    let output = schoolsync_cmd(home.path())
        .env("SCHOOLSYNC_SYNC__DEFAULT_TOTAL_FEE", "40000")
        .args(["-o", "json", "fees", "--summary", "--students"])
        .arg(&students)
        .arg("--fees")
        .arg(&fees)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let summary: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["total_fee"], json!(140000));
}

#[test]
fn test_fees_table_shows_summary_line() {
    let home = tempfile::tempdir().unwrap();
    let (students, fees) = write_fee_exports(home.path());

    schoolsync_cmd(home.path())
        .args(["fees", "--default-fee", "30000", "--students"])
        .arg(&students)
        .arg("--fees")
        .arg(&fees)
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Meera")
                .and(predicate::str::contains("pending (default)"))
                .and(predicate::str::contains("3 students: 1 paid, 0 partial, 2 pending")),
        );
}

#[test]
fn test_fees_missing_file_fails() {
    let home = tempfile::tempdir().unwrap();
    schoolsync_cmd(home.path())
        .args(["fees", "--students", "/nonexistent/students.json", "--fees"])
        .arg(home.path().join("fees.json"))
        .assert()
        .failure()
        .code(1);
}

#[test]
fn test_fees_invalid_export_is_usage_error() {
    let home = tempfile::tempdir().unwrap();
    let students = home.path().join("students.json");
    let fees = home.path().join("fees.json");
    std::fs::write(&students, "[{\"name\": \"no id\"}]").unwrap();
    std::fs::write(&fees, "[]").unwrap();

    schoolsync_cmd(home.path())
        .args(["fees", "--students"])
        .arg(&students)
        .arg("--fees")
        .arg(&fees)
        .assert()
        .failure()
        .code(2);
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_under_config_home() {
    let home = tempfile::tempdir().unwrap();
    let output = schoolsync_cmd(home.path())
        .args(["config", "path"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.trim_end().ends_with("config.toml"),
        "unexpected path: {stdout}"
    );
}

#[test]
fn test_config_init_then_show() {
    let home = tempfile::tempdir().unwrap();

    schoolsync_cmd(home.path())
        .args(["config", "init"])
        .assert()
        .success();

    // A second init without --force refuses to overwrite.
    schoolsync_cmd(home.path())
        .args(["config", "init"])
        .assert()
        .failure()
        .code(6);

    schoolsync_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("default_total_fee = 50000"));
}

#[test]
fn test_config_show_rejects_invalid_env() {
    let home = tempfile::tempdir().unwrap();
    schoolsync_cmd(home.path())
        .env("SCHOOLSYNC_SYNC__DEFAULT_TOTAL_FEE", "-10")
        .args(["config", "show"])
        .assert()
        .failure()
        .code(2);
}
