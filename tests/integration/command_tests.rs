//! Integration tests driving the CLI commands end to end

use crate::common::assertions::*;
use crate::common::{sample_data, CliTestRunner};
use std::fs;
use tabvault::config::LoaderConfig;

fn s(path: &std::path::Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_run_command_once_without_loader() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();
    let config = fixture.write_config(&fixture.config()).unwrap();
    fixture.drop_incoming(sample_data::BASELINE).unwrap();

    runner.expect_success(&["run", "--config", s(&config)]);

    assert_file_content(&fixture.canonical(), sample_data::BASELINE);
    assert_not_exists(&fixture.incoming());
}

#[test]
fn test_run_command_input_override() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();
    let config = fixture.write_config(&fixture.config()).unwrap();
    let other = fixture
        .create_file("elsewhere/drop.csv", sample_data::BASELINE)
        .unwrap();

    runner.expect_success(&["run", "--config", s(&config), "--input", s(&other), "--json"]);

    assert_file_content(&fixture.canonical(), sample_data::BASELINE);
    assert_not_exists(&other);
}

#[cfg(unix)]
#[test]
fn test_run_command_fails_when_loader_fails() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();
    let mut engine = fixture.config();
    engine.loader = Some(LoaderConfig {
        program: "false".to_string(),
        args: Vec::new(),
        diff_path: None,
        deleted_path: None,
    });
    let config = fixture.write_config(&engine).unwrap();
    fixture.seed_canonical(sample_data::BASELINE).unwrap();
    fixture.drop_incoming(sample_data::UPDATED).unwrap();

    runner.expect_failure(&["run", "--config", s(&config)]);

    assert_file_content(&fixture.canonical(), sample_data::BASELINE);
    let stats = engine.working_dir().stats().unwrap();
    assert_eq!(stats.quarantined, 3);
    assert_eq!(stats.backups, 0);
}

#[cfg(unix)]
#[test]
fn test_run_command_with_succeeding_loader() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();
    let mut engine = fixture.config();
    engine.loader = Some(LoaderConfig {
        program: "true".to_string(),
        args: vec!["--table".to_string(), "sales".to_string()],
        diff_path: None,
        deleted_path: None,
    });
    let config = fixture.write_config(&engine).unwrap();
    fixture.seed_canonical(sample_data::BASELINE).unwrap();
    fixture.drop_incoming(sample_data::UPDATED).unwrap();

    runner.expect_success(&["run", "--config", s(&config)]);

    assert_file_content(&fixture.canonical(), sample_data::UPDATED);
    let stats = engine.working_dir().stats().unwrap();
    assert_eq!(stats.backups, 1);
    assert_eq!(stats.diff_artifacts, 1);
    assert_eq!(stats.deleted_artifacts, 1);
}

#[test]
fn test_run_command_rejects_bad_config() {
    let runner = CliTestRunner::new().unwrap();
    let path = runner
        .fixture()
        .create_file("bad.json", "{\"identity_column\": \"\"}")
        .unwrap();

    let error = runner.expect_failure(&["run", "--config", s(&path)]);
    assert!(error.to_string().contains("identity_column"));
}

#[test]
fn test_hash_command() {
    let runner = CliTestRunner::new().unwrap();
    let path = runner
        .fixture()
        .create_file("R.csv", sample_data::BASELINE)
        .unwrap();

    runner.expect_success(&["hash", s(&path), "--volatile", "Item"]);
    runner.expect_success(&["hash", s(&path), "--raw", "--json"]);
}

#[test]
fn test_hash_command_missing_file() {
    let runner = CliTestRunner::new().unwrap();
    let missing = runner.fixture().root().join("absent.csv");
    runner.expect_failure(&["hash", s(&missing)]);
}

#[test]
fn test_diff_command_writes_artifacts() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();
    let old = fixture.create_file("old.csv", sample_data::BASELINE).unwrap();
    let new = fixture.create_file("new.csv", sample_data::UPDATED).unwrap();
    let out = fixture.root().join("audit");

    runner.expect_success(&[
        "diff",
        s(&old),
        s(&new),
        "--identity",
        "RecordId",
        "--volatile",
        "Item",
        "--out-dir",
        s(&out),
        "--json",
    ]);

    assert_file_exists_and_not_empty(&out.join("new_Diff.csv"));
    assert_file_exists_and_not_empty(&out.join("new_Del.csv"));
}

#[test]
fn test_diff_command_unknown_identity() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();
    let old = fixture.create_file("old.csv", sample_data::BASELINE).unwrap();
    let new = fixture.create_file("new.csv", sample_data::UPDATED).unwrap();

    let error = runner.expect_failure(&["diff", s(&old), s(&new), "--identity", "Missing"]);
    assert!(error.to_string().contains("Missing"));
}

#[test]
fn test_accept_command_round() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();
    let target = fixture.work_dir();
    fs::create_dir_all(&target).unwrap();

    let first = fixture.create_file("first.csv", sample_data::BASELINE).unwrap();
    runner.expect_success(&[
        "accept",
        s(&first),
        "--target-dir",
        s(&target),
        "--target-name",
        "R.csv",
    ]);
    assert_file_content(&fixture.canonical(), sample_data::BASELINE);

    let same = fixture
        .create_file("same.csv", sample_data::BASELINE_REORDERED)
        .unwrap();
    runner.expect_success(&[
        "accept",
        s(&same),
        "--target-dir",
        s(&target),
        "--target-name",
        "R.csv",
        "--volatile",
        "Item",
    ]);
    assert_not_exists(&same);
    assert_eq!(fixture.work_files(), vec!["R.csv"]);
}

#[test]
fn test_quarantine_command_skips_missing() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();
    let present = fixture.create_file("R_Diff.csv", "x").unwrap();
    let missing = fixture.root().join("R_Del.csv");

    runner.expect_success(&["quarantine", s(&present), s(&missing)]);

    assert_not_exists(&present);
    let names: Vec<String> = fs::read_dir(fixture.root())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert!(names.iter().any(|n| n.starts_with("R_Diff_ERR_")));
}

#[test]
fn test_sweep_command() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();
    let dir = fixture.work_dir();
    fs::create_dir_all(&dir).unwrap();
    for i in 0..5 {
        fs::write(dir.join(format!("R_2026010{}_000000.csv", i)), "x").unwrap();
    }

    runner.expect_success(&["sweep", s(&dir), "--max-files", "2"]);
    assert_eq!(fs::read_dir(&dir).unwrap().count(), 2);
}

#[test]
fn test_status_command() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();
    fixture.seed_canonical(sample_data::BASELINE).unwrap();
    let config = fixture.write_config(&fixture.config()).unwrap();

    runner.expect_success(&["status", "--config", s(&config)]);
    runner.expect_success(&["status", "--config", s(&config), "--json"]);
}
