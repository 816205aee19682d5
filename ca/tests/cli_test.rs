//! Tests for the `ca` binary

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn ca() -> Command {
    let mut cmd = Command::cargo_bin("ca").expect("ca binary should build");
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_key_without_segments_prints_root() {
    ca().args(["key"])
        .assert()
        .success()
        .stdout(predicate::str::diff("ctxAggCtxKey\n"));
}

#[test]
fn test_key_with_segments() {
    ca().args(["key", "req1", "field"])
        .assert()
        .success()
        .stdout(predicate::str::diff("ctxAggCtxKey_req1_field\n"));
}

#[test]
fn test_run_json_report() {
    let output = ca()
        .args(["run", "--json", "-p", "3", "-n", "2", "--mode", "threads", "job"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["key"], "ctxAggCtxKey_job");
    assert_eq!(report["mode"], "threads");
    assert_eq!(report["values"], serde_json::json!([0, 1, 2, 3, 4, 5]));
}

#[test]
fn test_run_uses_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("ctxagg.yml");
    std::fs::write(
        &config_path,
        "producers: 2\nvalues_per_producer: 1\nsegments: [fromconfig]\nmode: sequential\nlog_level: warn\n",
    )
    .unwrap();

    ca().arg("--config")
        .arg(&config_path)
        .args(["run", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ctxAggCtxKey_fromconfig"))
        .stdout(predicate::str::contains("sequential"));
}

#[test]
fn test_missing_config_file_fails() {
    ca().args(["--config", "/nonexistent/ctxagg.yml", "key"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}
