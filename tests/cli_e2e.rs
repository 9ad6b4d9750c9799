//! End-to-end CLI tests for the tiktok-downloader binary.

// `Command::cargo_bin` is deprecated in assert_cmd >=2.0.17 in favor of
// `cargo::cargo_bin_cmd!` macro. Suppressed until migration to the new API.
#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn cmd() -> Command {
    Command::cargo_bin("tiktok-downloader").unwrap()
}

/// Test that --help displays usage information and exits with code 0.
#[test]
fn test_binary_help_displays_usage() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Archive the videos you liked"))
        .stdout(predicate::str::contains("--proxy-timeout"));
}

/// Test that --version displays version and exits with code 0.
#[test]
fn test_binary_version_displays_version() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("tiktok-downloader"));
}

/// Test that invalid flags cause non-zero exit.
#[test]
fn test_binary_invalid_flag_returns_error() {
    cmd()
        .arg("--invalid-flag")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_binary_missing_export_exits_non_zero() {
    let temp_dir = TempDir::new().unwrap();
    cmd()
        .current_dir(temp_dir.path())
        .args(["--file", "missing.json", "--no-progress"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("export"));
    assert!(!temp_dir.path().join("DownloadedFiles").exists());
}

#[test]
fn test_binary_malformed_export_exits_non_zero() {
    let temp_dir = TempDir::new().unwrap();
    let export = temp_dir.path().join("user_data_tiktok.json");
    std::fs::write(&export, r#"{"Activity": {}}"#).unwrap();
    cmd()
        .current_dir(temp_dir.path())
        .arg("--no-progress")
        .assert()
        .failure();
}

#[test]
fn test_binary_empty_lists_write_both_reports() {
    let temp_dir = TempDir::new().unwrap();
    let export = temp_dir.path().join("export.json");
    std::fs::write(
        &export,
        r#"{"Activity": {
            "Favorite Videos": {"FavoriteVideoList": []},
            "Like List": {"ItemFavoriteList": []}
        }}"#,
    )
    .unwrap();
    let out = temp_dir.path().join("out");
    let log = temp_dir.path().join("run.log");

    cmd()
        .arg("--file")
        .arg(&export)
        .arg("--dir")
        .arg(&out)
        .arg("--log")
        .arg(&log)
        .args(["--no-progress", "-t", "2"])
        .env_remove("RUST_LOG")
        .assert()
        .success();

    let favorites = std::fs::read_to_string(out.join("favoriteVideos.log")).unwrap();
    assert!(favorites.starts_with("Result Summary - Num Urls: 0 | "), "Got: {favorites}");
    assert!(out.join("likedVideos.log").exists());
    let log_text = std::fs::read_to_string(&log).unwrap();
    assert!(log_text.contains("loaded export"), "Expected export log in: {log_text}");
}
