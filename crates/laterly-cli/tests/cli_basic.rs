//! Basic CLI E2E tests.
//!
//! Tests run the built binary against a throwaway home directory and verify
//! outputs.

use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

/// Run a CLI command with `home` as the user's home directory and return
/// (exit code, stdout, stderr).
fn run_cli(home: &Path, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_laterly"))
        .args(args)
        .env("HOME", home)
        .env_remove("LATERLY_ENV")
        .env_remove("LATERLY_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

fn write_items(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("items.json");
    std::fs::write(
        &path,
        r#"[
            {"id": "a", "title": "Quarterly plan", "category": "work",
             "created_at": "2026-10-16T09:00:00Z", "estimated_duration": 10},
            {"id": "b", "title": "Done already", "category": "life",
             "created_at": "2026-10-18T09:00:00Z", "progress": 1.0, "state": "library"},
            {"id": "c", "title": "Half read", "category": "inspiration",
             "created_at": "2026-10-17T09:00:00Z", "progress": 0.5, "state": "library",
             "estimated_duration": 8}
        ]"#,
    )
    .unwrap();
    path
}

#[test]
fn test_context_json() {
    let home = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(home.path(), &["context", "--json"]);
    assert_eq!(code, 0, "context failed");
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert!(json.get("time_of_day").is_some());
    assert_eq!(json["is_first_visit"], true);

    // the marker was written, so the next call is a returning visit
    let (_, stdout, _) = run_cli(home.path(), &["context", "--json"]);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["is_first_visit"], false);
}

#[test]
fn test_recommend_excludes_completed_items() {
    let home = TempDir::new().unwrap();
    let items = write_items(&home);
    let (code, stdout, stderr) = run_cli(
        home.path(),
        &["recommend", "--items", items.to_str().unwrap(), "--json"],
    );
    assert_eq!(code, 0, "recommend failed: {stderr}");

    let bundle: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(bundle["meta"]["total_items"], 3);
    assert!(!stdout.contains("\"id\": \"b\""));
}

#[test]
fn test_recommend_human_output() {
    let home = TempDir::new().unwrap();
    let items = write_items(&home);
    let (code, stdout, _) = run_cli(home.path(), &["recommend", "--items", items.to_str().unwrap()]);
    assert_eq!(code, 0);
    assert!(stdout.contains("For this moment:"));
}

#[test]
fn test_track_then_patterns() {
    let home = TempDir::new().unwrap();
    let items = write_items(&home);
    let items = items.to_str().unwrap();

    let (code, stdout, _) = run_cli(home.path(), &["track", "read", "a", "--items", items]);
    assert_eq!(code, 0, "track failed");
    assert!(stdout.contains("tracked read on a"));

    let (code, _, _) = run_cli(
        home.path(),
        &["track", "dismiss", "c", "--items", items, "--suggestion", "might_need_attention"],
    );
    assert_eq!(code, 0, "suggestion track failed");

    let (code, stdout, _) = run_cli(home.path(), &["patterns", "--json"]);
    assert_eq!(code, 0);
    let patterns: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(patterns["events_analyzed"], 2);
}

#[test]
fn test_track_unknown_item_fails() {
    let home = TempDir::new().unwrap();
    let items = write_items(&home);
    let (code, _, stderr) = run_cli(
        home.path(),
        &["track", "read", "missing", "--items", items.to_str().unwrap()],
    );
    assert_ne!(code, 0);
    assert!(stderr.contains("Item not found"));
}

#[test]
fn test_moment_json() {
    let home = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(home.path(), &["moment", "--json"]);
    assert_eq!(code, 0);
    let moment: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert!(moment["confidence"].as_f64().unwrap() >= 0.5);
    assert!(moment.get("type").is_some());
}

#[test]
fn test_config_get_set() {
    let home = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(home.path(), &["config", "get", "moments.confidence_threshold"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "0.6");

    let (code, _, _) = run_cli(home.path(), &["config", "set", "recommendations.attention_limit", "5"]);
    assert_eq!(code, 0);
    let (_, stdout, _) = run_cli(home.path(), &["config", "get", "recommendations.attention_limit"]);
    assert_eq!(stdout.trim(), "5");

    let (code, _, stderr) = run_cli(home.path(), &["config", "set", "nope.key", "1"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("Unknown configuration key"));
}

#[test]
fn test_config_list() {
    let home = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(home.path(), &["config", "list"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("patterns.session_gap_minutes = 30"));
}
