//! End-to-end checks of the CLI surface.

use assert_cmd::Command;
use predicates::prelude::*;

fn invex() -> Command {
    Command::cargo_bin("invex").unwrap()
}

#[test]
fn profiles_lists_every_vendor() {
    invex()
        .arg("profiles")
        .assert()
        .success()
        .stdout(predicate::str::contains("ACS"))
        .stdout(predicate::str::contains("SINMIX"))
        .stdout(predicate::str::contains("ISLAND"));
}

#[test]
fn config_show_prints_defaults() {
    invex()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("render_dpi"))
        .stdout(predicate::str::contains("output_dir"));
}

#[test]
fn config_init_writes_file_and_respects_force() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("invex.json");

    invex()
        .args(["config", "init", "-o"])
        .arg(&path)
        .assert()
        .success();
    assert!(path.exists());

    // A second init without --force must refuse to overwrite
    invex()
        .args(["config", "init", "-o"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    invex()
        .args(["config", "init", "--force", "-o"])
        .arg(&path)
        .assert()
        .success();
}

#[test]
fn process_requires_matching_files() {
    let dir = tempfile::tempdir().unwrap();
    invex()
        .args(["process", "ACS"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("No PDF files"));
}

#[test]
fn process_rejects_unknown_profile() {
    invex()
        .args(["process", "NOPE", "somewhere"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown profile"));
}
