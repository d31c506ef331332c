//! Integration tests for the `meetsched` binary.

// `Command::cargo_bin` is deprecated in newer assert_cmd releases.
#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;

const MAX_AFTERNOON: &str = r#"{
    "title": "Afternoon review",
    "participants": [
        {"name": "Max", "email": "max@x.com", "rsvp": "Yes"},
        {"name": "Alex", "email": "alex@x.com", "rsvp": "No"}
    ],
    "start_time": "2020-09-19T13:00:00Z",
    "end_time": "2020-09-19T17:00:00Z"
}"#;

const MAX_LATE: &str = r#"{
    "title": "Late sync",
    "participants": [{"name": "Max", "email": "max@x.com", "rsvp": "Yes"}],
    "start_time": "2020-09-19T16:00:00Z",
    "end_time": "2020-09-19T18:00:00Z"
}"#;

const MAX_BACK_TO_BACK: &str = r#"{
    "title": "Right after",
    "participants": [{"name": "Max", "email": "max@x.com", "rsvp": "Yes"}],
    "start_time": "2020-09-19T17:00:00Z",
    "end_time": "2020-09-19T18:00:00Z"
}"#;

fn meetsched(db: &Path) -> Command {
    let mut cmd = Command::cargo_bin("meetsched").unwrap();
    cmd.env_remove("MEETSCHED_LOG_DIR")
        .env_remove("MEETSCHED_LOG_LEVEL")
        .arg("--db")
        .arg(db);
    cmd
}

fn propose(db: &Path, body: &str) -> serde_json::Value {
    let output = meetsched(db)
        .arg("propose")
        .write_stdin(body)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    serde_json::from_slice(&output).unwrap()
}

#[test]
fn version_prints_core_version_as_json() {
    let output = Command::cargo_bin("meetsched")
        .unwrap()
        .arg("version")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let body: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(body["version"], meetsched_core::core_version());
}

#[test]
fn propose_rejects_sub_microsecond_instants() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("cli.db");
    let body = r#"{
        "title": "Blip",
        "participants": [{"name": "Max", "email": "max@x.com", "rsvp": "Yes"}],
        "start_time": "2020-09-19T10:00:00.000000100Z",
        "end_time": "2020-09-19T10:00:00.000000900Z"
    }"#;

    meetsched(&db)
        .arg("propose")
        .write_stdin(body)
        .assert()
        .code(2)
        .stdout(predicate::str::contains("\"kind\": \"validation\""));
}

#[test]
fn propose_then_get_by_id() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("cli.db");

    let created = propose(&db, MAX_AFTERNOON);
    let id = created["id"].as_str().unwrap().to_string();

    meetsched(&db)
        .args(["get", id.as_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Afternoon review"))
        .stdout(predicate::str::contains("alex@x.com"));
}

#[test]
fn overlapping_proposal_exits_with_conflict() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("cli.db");
    propose(&db, MAX_AFTERNOON);

    meetsched(&db)
        .arg("propose")
        .write_stdin(MAX_LATE)
        .assert()
        .code(3)
        .stdout(predicate::str::contains("\"kind\": \"conflict\""));

    propose(&db, MAX_BACK_TO_BACK);
}

#[test]
fn list_by_participant_and_window() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("cli.db");
    propose(&db, MAX_AFTERNOON);

    meetsched(&db)
        .args(["list", "--participant", "alex@x.com"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"meetings\""))
        .stdout(predicate::str::contains("Afternoon review"));

    meetsched(&db)
        .args([
            "list",
            "--start",
            "2020-09-19T12:00:00Z",
            "--end",
            "2020-09-19T18:00:00Z",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Afternoon review"));

    meetsched(&db)
        .args([
            "list",
            "--start",
            "2020-09-19T14:00:00Z",
            "--end",
            "2020-09-19T18:00:00Z",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Afternoon review").not());
}

#[test]
fn malformed_requests_exit_with_validation() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("cli.db");

    let unknown_field = MAX_AFTERNOON.replacen("\"title\"", "\"room\": \"A\", \"title\"", 1);
    meetsched(&db)
        .arg("propose")
        .write_stdin(unknown_field)
        .assert()
        .code(2)
        .stdout(predicate::str::contains("\"kind\": \"validation\""));

    meetsched(&db)
        .args(["get", "5f6a1b2c3d4e5f6a7b8c9d0e"])
        .assert()
        .code(2);

    meetsched(&db)
        .args(["list", "--start", "yesterday", "--end", "2020-09-19T18:00:00Z"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("RFC 3339"));
}

#[test]
fn only_one_participant_can_be_queried() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("cli.db");

    meetsched(&db)
        .args([
            "list",
            "--participant",
            "max@x.com",
            "--participant",
            "alex@x.com",
        ])
        .assert()
        .failure();
}

#[test]
fn unknown_meeting_exits_with_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("cli.db");

    meetsched(&db)
        .args(["get", "0b9f6c1e-3f0c-4c39-9a51-2d9e2f3f7b10"])
        .assert()
        .code(4)
        .stdout(predicate::str::contains("not_found"));
}
