//! Integration tests for the electronav binary
//!
//! These run the real binary in a scratch directory and check the JSON envelope.

use std::path::Path;
use std::process::{Command, Output};

fn electronav(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_electronav"))
        .current_dir(dir)
        .env_remove("ELECTRONAV_QUALITY_LEVELS")
        .env_remove("ELECTRONAV_HEMISPHERE_OFFSET")
        .env_remove("ELECTRONAV_SMOOTHING_SIGMA")
        .env_remove("ELECTRONAV_DEFAULT_ELECTRODE")
        .env_remove("ELECTRONAV_HISTORY_PATH")
        .args(args)
        .output()
        .expect("Failed to execute command")
}

fn json_data(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let parsed: serde_json::Value =
        serde_json::from_str(&stdout).expect("Output should be valid JSON");
    assert_eq!(parsed["status"], "success");
    parsed["data"].clone()
}

#[test]
fn test_grid_json_lists_holes() {
    let dir = tempfile::tempdir().unwrap();
    let output = electronav(dir.path(), &["grid", "--json"]);
    assert!(output.status.success());

    let holes = json_data(&output);
    let holes = holes.as_array().expect("hole array");
    assert!(!holes.is_empty());
    assert_eq!(holes[0]["index"], 0);
}

#[test]
fn test_electrodes_json_includes_builtin_probes() {
    let dir = tempfile::tempdir().unwrap();
    let output = electronav(dir.path(), &["electrodes", "--json"]);
    assert!(output.status.success());

    let ids: Vec<String> = json_data(&output)
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["id"].as_str().unwrap().to_string())
        .collect();
    assert!(ids.contains(&"PLX24".to_string()));
    assert!(ids.contains(&"FHC".to_string()));
}

#[test]
fn test_transform_applies_translation() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("chamber.txt"),
        "# chamber to scanner\n1 0 0 5\n0 1 0 0\n0 0 1 -3\n0 0 0 1\n",
    )
    .unwrap();

    let output = electronav(dir.path(), &["transform", "chamber.txt", "1", "2", "-1", "--json"]);
    assert!(output.status.success());
    let data = json_data(&output);
    assert_eq!(data["output"], serde_json::json!([6.0, 2.0, -4.0]));

    let output = electronav(
        dir.path(),
        &["transform", "chamber.txt", "6", "2", "-4", "--inverse", "--json"],
    );
    let data = json_data(&output);
    assert_eq!(data["output"], serde_json::json!([1.0, 2.0, -1.0]));
}

#[test]
fn test_record_then_show_session() {
    let dir = tempfile::tempdir().unwrap();
    let history = dir.path().join("history.csv");
    let history = history.to_str().unwrap();

    let output = electronav(
        dir.path(),
        &[
            "session",
            "record",
            "--history",
            history,
            "--subject",
            "M7",
            "--date",
            "2024-05-14",
            "--electrode",
            "PLX24@1,-2,12.5",
            "--electrode",
            "FHC@0,0,3,25",
            "--rate",
            "1:5=3",
            "--yes",
            "--json",
        ],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let data = json_data(&output);
    assert_eq!(data["outcome"], "created");
    assert_eq!(data["electrodes"], 2);

    let output = electronav(
        dir.path(),
        &["history", "show", "2024-05-14", "--history", history, "--json"],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let record = json_data(&output);
    assert_eq!(record["subject_id"], "M7");
    assert_eq!(record["electrodes"][0]["depth"], 12.5);
    assert_eq!(record["electrodes"][1]["id"], "FHC");
    assert_eq!(record["electrodes"][1]["guide_length"], 25.0);
    assert_eq!(record["quality"][0][4], 3);
}

#[test]
fn test_unknown_electrode_fails_with_suggestions() {
    let dir = tempfile::tempdir().unwrap();
    let output = electronav(dir.path(), &["locate", "--electrode", "NOPE", "--target", "0", "0"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unknown electrode type"));
    assert!(stderr.contains("electronav electrodes"));
}

#[test]
fn test_missing_history_date_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let output = electronav(dir.path(), &["history", "show", "2020-01-01"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Session not found"));
}
