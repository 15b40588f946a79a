//! Integration tests for the heats binary.
//!
//! These tests verify end-to-end behavior including:
//! - Catalog listing and round planning
//! - Seeding a roster into a draw and start list
//! - Qualifying from captured results into the next roster
//! - Exit status for infeasible configurations

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Helper to create a test directory with an empty config file
fn setup_test_dir() -> (TempDir, PathBuf) {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config = temp_dir.path().join("config.toml");
    fs::write(&config, "").unwrap();
    (temp_dir, config)
}

/// Helper to get the CLI binary, isolated from the user's config
fn cli(config: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("heats"));
    cmd.arg("--config").arg(config);
    cmd
}

/// Write a roster of `count` sprinters, a00 fastest
fn write_roster(dir: &Path, count: usize) -> PathBuf {
    let mut contents = String::from("id,name,club,seed_mark,seed_rank,bye\n");
    for i in 0..count {
        let hundredths = 1000 + i * 5;
        contents.push_str(&format!(
            "a{:02},Runner {},Club {},{}.{:02},,\n",
            i,
            i,
            i % 4,
            hundredths / 100,
            hundredths % 100
        ));
    }
    let path = dir.join("roster.csv");
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_cli_help() {
    let (_temp_dir, config) = setup_test_dir();
    cli(&config)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Seed track events into heats and advance qualifiers",
        ));
}

#[test]
fn test_presets_lists_catalog() {
    let (_temp_dir, config) = setup_test_dir();
    cli(&config)
        .arg("presets")
        .assert()
        .success()
        .stdout(predicate::str::contains("championship"))
        .stdout(predicate::str::contains("club_meet"))
        .stdout(predicate::str::contains("(default)"));
}

#[test]
fn test_plan_eighteen_sprinters() {
    let (_temp_dir, config) = setup_test_dir();
    cli(&config)
        .args(["plan", "--event", "100m", "--entrants", "18"])
        .assert()
        .success()
        .stdout(predicate::str::contains("preset championship"))
        .stdout(predicate::str::contains("top 2 per heat + 2 fastest"))
        .stdout(predicate::str::contains(" 3 heats"));
}

#[test]
fn test_plan_json() {
    let (_temp_dir, config) = setup_test_dir();
    let output = cli(&config)
        .args(["plan", "--event", "4x400m", "--entrants", "12", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(plan["race_type"], "relay");
    assert_eq!(plan["rounds"].as_array().unwrap().len(), 2);
}

#[test]
fn test_infeasible_plan_fails() {
    let (_temp_dir, config) = setup_test_dir();
    cli(&config)
        .args(["plan", "--event", "100m", "--entrants", "80", "--preset", "championship"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Infeasible"));
}

#[test]
fn test_unknown_preset_fails() {
    let (_temp_dir, config) = setup_test_dir();
    cli(&config)
        .args(["plan", "--event", "100m", "--entrants", "8", "--preset", "olympics"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("olympics"));
}

#[test]
fn test_too_few_lanes_fails() {
    let (temp_dir, config) = setup_test_dir();
    let roster = write_roster(temp_dir.path(), 18);

    cli(&config)
        .arg("seed")
        .arg(&roster)
        .args(["--event", "100m", "--lanes", "3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Infeasible"));
}

#[test]
fn test_mark_command() {
    let (_temp_dir, config) = setup_test_dir();
    cli(&config)
        .args(["mark", "11.34", "1:02.550", "dns", "fast"])
        .assert()
        .success()
        .stdout(predicate::str::contains("11340 ms"))
        .stdout(predicate::str::contains("62550 ms\t1:02.55"))
        .stdout(predicate::str::contains("dns\t-\tDNS"))
        .stdout(predicate::str::contains("fast\tinvalid"));
}

#[test]
fn test_seed_then_qualify() {
    let (temp_dir, config) = setup_test_dir();
    let dir = temp_dir.path();
    let roster = write_roster(dir, 18);
    let draw_path = dir.join("draw.json");
    let start_list = dir.join("start.csv");

    cli(&config)
        .arg("seed")
        .arg(&roster)
        .args(["--event", "100m"])
        .arg("--out")
        .arg(&draw_path)
        .arg("--start-list")
        .arg(&start_list)
        .assert()
        .success()
        .stdout(predicate::str::contains("Heat 3"))
        .stdout(predicate::str::contains("Advance: top 2 per heat + 2 fastest"));

    let draw: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&draw_path).unwrap()).unwrap();
    assert_eq!(draw["heats"].as_array().unwrap().len(), 3);
    assert_eq!(draw["method"], "serpentine");

    // Everyone runs their seed mark except a00, who does not start
    let start = fs::read_to_string(&start_list).unwrap();
    let mut lines = start.lines();
    assert_eq!(
        lines.next(),
        Some("round,heat,lane,athlete_id,name,club,seed_mark")
    );
    let mut results = String::from("athlete_id,heat,lane,place,mark\n");
    let mut rows = 0;
    for line in lines {
        let fields: Vec<&str> = line.split(',').collect();
        let mark = if fields[3] == "a00" { "DNS" } else { fields[6] };
        results.push_str(&format!("{},{},{},,{}\n", fields[3], fields[1], fields[2], mark));
        rows += 1;
    }
    assert_eq!(rows, 18);
    let results_path = dir.join("results.csv");
    fs::write(&results_path, results).unwrap();

    let next = dir.join("next.csv");
    cli(&config)
        .arg("qualify")
        .arg("--draw")
        .arg(&draw_path)
        .arg("--results")
        .arg(&results_path)
        .arg("--out")
        .arg(&next)
        .assert()
        .success()
        .stdout(predicate::str::contains("8 qualifiers"));

    let next_roster = fs::read_to_string(&next).unwrap();
    assert_eq!(next_roster.lines().count(), 9);
    assert!(!next_roster.contains("a00,"));
    assert!(next_roster.contains("a01,"));
}

#[test]
fn test_qualify_override_rule_must_fill_next_round() {
    let (temp_dir, config) = setup_test_dir();
    let dir = temp_dir.path();
    let roster = write_roster(dir, 18);
    let draw_path = dir.join("draw.json");

    cli(&config)
        .arg("seed")
        .arg(&roster)
        .args(["--event", "100m", "--format", "json"])
        .arg("--out")
        .arg(&draw_path)
        .assert()
        .success();

    let results_path = dir.join("results.csv");
    fs::write(&results_path, "athlete_id,heat,lane,place,mark\n").unwrap();

    cli(&config)
        .arg("qualify")
        .arg("--draw")
        .arg(&draw_path)
        .arg("--results")
        .arg(&results_path)
        .args(["--places", "1", "--fastest-losers", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("next round needs 8"));
}
