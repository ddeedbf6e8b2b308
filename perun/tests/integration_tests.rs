//! Integration tests for perun

use assert_cmd::Command;
use rstest::rstest;
use std::fs;
use tempfile::TempDir;

fn perun(store: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("perun").unwrap();
    cmd.arg("--store").arg(store.path().join("batches.json"));
    cmd
}

/// Test CLI argument parsing
#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("perun").unwrap();
    cmd.arg("--help");
    cmd.assert().success();
}

/// Test CLI version
#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("perun").unwrap();
    cmd.arg("--version");
    cmd.assert().success();
}

/// Test invalid arguments
#[rstest]
#[case(&["--invalid-flag"])]
#[case(&["export", "b1", "j1", "--format", "xml"])]
#[case(&["upload", "--name", "empty"])]
#[case(&["feedback", "list"])]
fn test_invalid_arguments(#[case] args: &[&str]) {
    let mut cmd = Command::cargo_bin("perun").unwrap();
    cmd.args(args);
    cmd.assert().failure();
}

/// Test the local batch list
#[test]
fn test_batches_round_trip() {
    let store = TempDir::new().unwrap();

    perun(&store).args(["batches", "add", "first"]).assert().success();
    perun(&store).args(["batches", "add", "second"]).assert().success();

    let output = perun(&store).args(["batches", "list"]).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let ids: Vec<&str> = stdout.lines().collect();
    assert_eq!(ids, vec!["second", "first"]);

    let saved = fs::read_to_string(store.path().join("batches.json")).unwrap();
    assert!(saved.contains("first"));

    perun(&store).args(["batches", "clear"]).assert().success();
    let output = perun(&store).args(["batches", "list"]).output().unwrap();
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(!stdout.contains("second"));
}

/// Test missing upload file error
#[test]
fn test_upload_missing_file() {
    let store = TempDir::new().unwrap();
    perun(&store)
        .args(["upload", "--name", "Rally", "does-not-exist.wav"])
        .assert()
        .failure();
}

/// Test unreachable backend
#[test]
fn test_health_without_backend() {
    let store = TempDir::new().unwrap();
    perun(&store)
        .args(["--api-url", "http://127.0.0.1:9", "--timeout", "2", "health"])
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .failure();
}
