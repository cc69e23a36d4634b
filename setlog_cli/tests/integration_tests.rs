//! Integration tests for the setlog binary.
//!
//! These tests verify end-to-end behavior including:
//! - Library setup and exercise management
//! - Logging workouts and remaining volume
//! - Suggestions, statistics and exports

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Helper to create a test data directory
fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Helper to get the path to the CLI binary, isolated from the user's config
fn cli(data_dir: &Path) -> Command {
    let config_path = data_dir.join("config.toml");
    if !config_path.exists() {
        fs::create_dir_all(data_dir).expect("Failed to create data dir");
        fs::write(&config_path, "").expect("Failed to write config");
    }

    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("setlog"));
    cmd.arg("--data-dir")
        .arg(data_dir)
        .arg("--config")
        .arg(config_path);
    cmd
}

fn data_dir(temp_dir: &TempDir) -> PathBuf {
    temp_dir.path().join("data")
}

fn add_strength(data_dir: &Path, name: &str, group: &str, priority: u8, sets: u32) {
    cli(data_dir)
        .args(["add", name, "--category", "strength", "--group", group])
        .args(["--priority", &priority.to_string(), "--sets", &sets.to_string()])
        .assert()
        .success();
}

#[test]
fn test_cli_help() {
    Command::new(assert_cmd::cargo::cargo_bin!("setlog"))
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Volume-based workout tracker"));
}

#[test]
fn test_init_creates_library() {
    let temp_dir = setup_test_dir();
    let data_dir = data_dir(&temp_dir);

    cli(&data_dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created library with 0 exercises"));

    assert!(data_dir.join("library.json").exists());
}

#[test]
fn test_init_starter_refuses_to_overwrite() {
    let temp_dir = setup_test_dir();
    let data_dir = data_dir(&temp_dir);

    cli(&data_dir)
        .args(["init", "--starter"])
        .assert()
        .success();

    cli(&data_dir)
        .args(["init", "--starter"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    cli(&data_dir)
        .args(["init", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0 exercises"));
}

#[test]
fn test_starter_library_lists_allocated_targets() {
    let temp_dir = setup_test_dir();
    let data_dir = data_dir(&temp_dir);

    cli(&data_dir).args(["init", "--starter"]).assert().success();

    cli(&data_dir)
        .args(["list", "--category", "strength"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Bench Press"))
        .stdout(predicate::str::contains("target 6 sets"))
        .stdout(predicate::str::contains("Running").not());
}

#[test]
fn test_log_reduces_remaining_volume() {
    let temp_dir = setup_test_dir();
    let data_dir = data_dir(&temp_dir);

    add_strength(&data_dir, "Bench", "chest", 1, 10);

    cli(&data_dir)
        .args(["log", "bench", "--sets", "4", "--reps", "8", "--weight", "60"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged 4 for 'Bench'"));

    cli(&data_dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("remaining 6"));

    cli(&data_dir)
        .args(["history", "Bench"])
        .assert()
        .success()
        .stdout(predicate::str::contains("4 sets × 8 reps @ 60"));
}

#[test]
fn test_old_entries_stop_counting() {
    let temp_dir = setup_test_dir();
    let data_dir = data_dir(&temp_dir);

    add_strength(&data_dir, "Row", "back", 1, 10);
    cli(&data_dir)
        .args(["log", "Row", "--sets", "4", "--days-ago", "10"])
        .assert()
        .success();

    cli(&data_dir)
        .args(["list", "--policy", "hard_window"])
        .assert()
        .success()
        .stdout(predicate::str::contains("remaining 10"));
}

#[test]
fn test_log_requires_category_fields() {
    let temp_dir = setup_test_dir();
    let data_dir = data_dir(&temp_dir);

    cli(&data_dir)
        .args(["add", "Run", "--category", "endurance", "--group", "legs", "--distance", "20"])
        .assert()
        .success()
        .stdout(predicate::str::contains("target 20 km"));

    cli(&data_dir)
        .args(["log", "Run", "--sets", "3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("needs --distance"));

    cli(&data_dir)
        .args(["log", "Run", "--distance", "5", "--time", "30", "--heart-rate", "150"])
        .assert()
        .success();
}

#[test]
fn test_add_rejects_bad_input() {
    let temp_dir = setup_test_dir();
    let data_dir = data_dir(&temp_dir);

    cli(&data_dir)
        .args(["add", "Run", "--category", "endurance", "--group", "legs"])
        .assert()
        .failure();

    cli(&data_dir)
        .args(["add", "Curl", "--category", "yoga", "--group", "arms"])
        .assert()
        .failure();

    add_strength(&data_dir, "Curl", "arms", 1, 6);
    cli(&data_dir)
        .args(["add", "curl", "--category", "strength", "--group", "arms"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_budget_and_priority_rebalance() {
    let temp_dir = setup_test_dir();
    let data_dir = data_dir(&temp_dir);

    add_strength(&data_dir, "Bench", "chest", 2, 0);
    add_strength(&data_dir, "Fly", "chest", 1, 0);

    cli(&data_dir)
        .args(["budget", "strength", "chest", "9"])
        .assert()
        .success()
        .stdout(predicate::str::contains("6 sets"))
        .stdout(predicate::str::contains("3 sets"));

    cli(&data_dir)
        .args(["priority", "Fly", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("target 0 sets"));

    cli(&data_dir)
        .args(["priority", "Bench", "5"])
        .assert()
        .failure();

    cli(&data_dir)
        .args(["budget", "endurance", "legs", "5"])
        .assert()
        .failure();
}

#[test]
fn test_remove_exercise() {
    let temp_dir = setup_test_dir();
    let data_dir = data_dir(&temp_dir);

    add_strength(&data_dir, "Dip", "chest", 1, 6);
    cli(&data_dir)
        .args(["log", "Dip", "--sets", "2"])
        .assert()
        .success();

    cli(&data_dir)
        .args(["remove", "dip"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 'Dip'"));

    let contents = fs::read_to_string(data_dir.join("library.json")).unwrap();
    let library: serde_json::Value = serde_json::from_str(&contents).unwrap();
    assert_eq!(library["exercises"].as_array().unwrap().len(), 0);
    assert!(library["history"].as_object().unwrap().is_empty());

    cli(&data_dir).args(["remove", "dip"]).assert().failure();
}

#[test]
fn test_suggest_and_replace() {
    let temp_dir = setup_test_dir();
    let data_dir = data_dir(&temp_dir);

    cli(&data_dir).args(["init", "--starter"]).assert().success();

    cli(&data_dir)
        .arg("suggest")
        .assert()
        .success()
        .stdout(predicate::str::contains("STRENGTH"))
        .stdout(predicate::str::contains("Pull-up"))
        .stdout(predicate::str::contains("Overhead Press").not());

    cli(&data_dir)
        .args(["suggest", "--replace", "Pull-up"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Overhead Press"))
        .stdout(predicate::str::contains("Pull-up").not());
}

#[test]
fn test_suggest_json() {
    let temp_dir = setup_test_dir();
    let data_dir = data_dir(&temp_dir);

    cli(&data_dir).args(["init", "--starter"]).assert().success();

    let output = cli(&data_dir)
        .args(["suggest", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let workout: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let sections = workout["sections"].as_array().unwrap();
    let categories: Vec<&str> = sections
        .iter()
        .map(|s| s["category"].as_str().unwrap())
        .collect();
    assert!(categories.contains(&"strength"));
    assert!(categories.contains(&"mobility"));

    let strength = sections
        .iter()
        .find(|s| s["category"] == "strength")
        .unwrap();
    assert_eq!(strength["picks"].as_array().unwrap().len(), 4);
    assert_eq!(strength["picks"][0]["name"], "Pull-up");
    assert_eq!(strength["picks"][0]["amount"], 4.0);
}

#[test]
fn test_suggest_empty_when_nothing_due() {
    let temp_dir = setup_test_dir();
    let data_dir = data_dir(&temp_dir);

    add_strength(&data_dir, "Squat", "legs", 1, 3);
    cli(&data_dir)
        .args(["log", "Squat", "--sets", "3"])
        .assert()
        .success();

    cli(&data_dir)
        .arg("suggest")
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing due"));
}

#[test]
fn test_stats_report() {
    let temp_dir = setup_test_dir();
    let data_dir = data_dir(&temp_dir);

    add_strength(&data_dir, "Bench", "chest", 1, 10);
    cli(&data_dir)
        .args(["log", "Bench", "--sets", "5"])
        .assert()
        .success();

    cli(&data_dir)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("Last 7 days"))
        .stdout(predicate::str::contains("50%"))
        .stdout(predicate::str::contains("n/a"))
        .stdout(predicate::str::contains("Combined score: 50%"));

    let output = cli(&data_dir)
        .args(["stats", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let report: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(report["interval_days"], 7);
    assert_eq!(report["categories"][0]["daily"].as_array().unwrap().len(), 7);
    assert!(report["steps"].is_null());
}

#[test]
fn test_stats_with_steps() {
    let temp_dir = setup_test_dir();
    let data_dir = data_dir(&temp_dir);

    cli(&data_dir).arg("init").assert().success();

    let today = chrono::Utc::now().date_naive();
    let steps = format!(
        r#"{{"daily_goal": 1000, "days": [{{"date": "{}", "steps": 7000}}]}}"#,
        today
    );
    fs::write(data_dir.join("steps.json"), steps).unwrap();

    cli(&data_dir)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("steps"))
        .stdout(predicate::str::contains("Combined score: 100%"));
}

#[test]
fn test_interval_command() {
    let temp_dir = setup_test_dir();
    let data_dir = data_dir(&temp_dir);

    cli(&data_dir)
        .arg("interval")
        .assert()
        .success()
        .stdout(predicate::str::contains("7 days"));

    cli(&data_dir)
        .args(["interval", "10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("10 days"));

    cli(&data_dir).args(["interval", "0"]).assert().failure();
    cli(&data_dir).args(["interval", "31"]).assert().failure();

    cli(&data_dir)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("Last 10 days"));
}

#[test]
fn test_export_import_roundtrip() {
    let temp_dir = setup_test_dir();
    let source = temp_dir.path().join("source");
    let target = temp_dir.path().join("target");
    let document = temp_dir.path().join("backup.json");

    add_strength(&source, "Bench", "chest", 1, 10);
    cli(&source)
        .args(["log", "Bench", "--sets", "3"])
        .assert()
        .success();

    cli(&source)
        .arg("export")
        .arg(&document)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 1 exercises"));

    cli(&target)
        .arg("import")
        .arg(&document)
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 1 exercises"));

    cli(&target)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Bench"))
        .stdout(predicate::str::contains("remaining 7"));
}

#[test]
fn test_export_csv() {
    let temp_dir = setup_test_dir();
    let data_dir = data_dir(&temp_dir);

    add_strength(&data_dir, "Bench", "chest", 1, 10);
    for sets in ["3", "4"] {
        cli(&data_dir)
            .args(["log", "Bench", "--sets", sets])
            .assert()
            .success();
    }

    cli(&data_dir)
        .arg("export-csv")
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 2 entries to CSV"));

    let csv_content = fs::read_to_string(data_dir.join("history.csv")).unwrap();
    assert!(csv_content.starts_with("entry_id,exercise_id,exercise"));
    assert_eq!(csv_content.lines().count(), 3);
}
