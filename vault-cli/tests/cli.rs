//! End-to-end tests for the notevault binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::{tempdir, TempDir};

/// Data directory with fast KDF settings.
fn data_dir() -> TempDir {
    let dir = tempdir().unwrap();
    std::fs::write(
        dir.path().join("notevault.toml"),
        "kdf = \"pbkdf2\"\nsafe_cost = \"low\"\n",
    )
    .unwrap();
    dir
}

fn notevault(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("notevault").unwrap();
    cmd.arg("--data-dir").arg(dir).env_remove("RUST_LOG");
    cmd
}

fn settings(dir: &Path) -> serde_json::Value {
    let text = std::fs::read_to_string(dir.join("settings.json")).unwrap();
    serde_json::from_str(&text).unwrap()
}

fn repository(dir: &Path) -> serde_json::Value {
    let text = std::fs::read_to_string(dir.join("repository.json")).unwrap();
    serde_json::from_str(&text).unwrap()
}

fn first_note_id(dir: &Path) -> String {
    repository(dir)["notes"][0]["id"]
        .as_str()
        .unwrap()
        .to_string()
}

// ===========================================
// Local commands
// ===========================================

#[test]
fn init_add_list() {
    let dir = data_dir();

    notevault(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Repository initialized"));

    notevault(dir.path())
        .args(["add", "Buy milk", "--tag", "home"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added note"));

    notevault(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Buy milk").and(predicate::str::contains("#home")));
}

#[test]
fn commands_require_init() {
    let dir = data_dir();

    notevault(dir.path())
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("notevault init"));
}

#[test]
fn delete_removes_note() {
    let dir = data_dir();
    notevault(dir.path()).arg("init").assert().success();
    notevault(dir.path()).args(["add", "temporary"]).assert().success();
    let id = first_note_id(dir.path());

    notevault(dir.path())
        .args(["delete", &id[..8]])
        .assert()
        .success();

    notevault(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No notes."));
}

#[test]
fn status_reports_state() {
    let dir = data_dir();
    notevault(dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not initialized"));

    notevault(dir.path()).arg("init").assert().success();
    notevault(dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Cloud: Not connected")
                .and(predicate::str::contains("never synchronized")),
        );
}

// ===========================================
// Synchronization
// ===========================================

#[test]
fn sync_without_cloud_asks_for_setup() {
    let dir = data_dir();
    notevault(dir.path()).arg("init").assert().success();

    notevault(dir.path())
        .arg("sync")
        .assert()
        .success()
        .stdout(predicate::str::contains("notevault connect"));

    notevault(dir.path())
        .args(["sync", "--auto"])
        .assert()
        .failure();
}

#[test]
fn two_devices_share_notes() {
    let cloud = tempdir().unwrap();
    let (a, b) = (data_dir(), data_dir());

    for dir in [&a, &b] {
        notevault(dir.path()).arg("init").assert().success();
        notevault(dir.path())
            .arg("connect")
            .arg(cloud.path())
            .assert()
            .success();
    }

    notevault(a.path())
        .args(["add", "shared note"])
        .assert()
        .success();
    notevault(a.path())
        .arg("sync")
        .assert()
        .success()
        .stdout(predicate::str::contains("transfer code"));
    let code = settings(a.path())["transfer_code"]
        .as_str()
        .unwrap()
        .to_string();

    // Unknown code on the second device.
    notevault(b.path())
        .arg("sync")
        .assert()
        .success()
        .stdout(predicate::str::contains("--code"));

    notevault(b.path())
        .args(["sync", "--code", &code, "--keep", "cloud"])
        .assert()
        .success();
    notevault(b.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("shared note"));

    // A change on the second device reaches the first.
    notevault(b.path())
        .args(["add", "reply"])
        .assert()
        .success();
    notevault(b.path()).args(["sync", "--auto"]).assert().success();
    notevault(a.path()).arg("sync").assert().success();
    notevault(a.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("reply"));

    notevault(a.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("up to date"));
}

#[test]
fn pull_requires_full_sync() {
    let cloud = tempdir().unwrap();
    let dir = data_dir();
    notevault(dir.path()).arg("init").assert().success();
    notevault(dir.path())
        .arg("connect")
        .arg(cloud.path())
        .assert()
        .success();
    notevault(dir.path()).args(["add", "note"]).assert().success();
    let id = first_note_id(dir.path());

    notevault(dir.path())
        .args(["pull", &id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to pull note"));
}

// ===========================================
// Safes
// ===========================================

#[test]
fn locked_note_needs_password() {
    let dir = data_dir();
    notevault(dir.path()).arg("init").assert().success();
    notevault(dir.path())
        .args(["add", "pin 1234"])
        .assert()
        .success();
    notevault(dir.path())
        .args(["safe", "create", "--password", "long password"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created safe"));

    let note = first_note_id(dir.path());
    let safe = repository(dir.path())["safes"][0]["id"]
        .as_str()
        .unwrap()
        .to_string();

    notevault(dir.path())
        .args(["lock", &note, &safe, "--password", "long password"])
        .assert()
        .success();
    notevault(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("[locked]").and(predicate::str::contains("1234").not()));

    notevault(dir.path())
        .args(["show", &note, "--password", "wrong password"])
        .assert()
        .failure();
    notevault(dir.path())
        .args(["show", &note, "--password", "long password"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pin 1234"));
}
