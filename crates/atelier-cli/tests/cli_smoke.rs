//! Smoke tests for the atelier binary's argument surface.

#![cfg_attr(
    test,
    allow(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        reason = "Test allows"
    )
)]

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_lists_the_commands() {
    let mut command = Command::cargo_bin("atelier").unwrap();
    command
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("index"))
        .stdout(predicate::str::contains("search"))
        .stdout(predicate::str::contains("team"));
}

#[test]
fn version_prints_and_exits() {
    let mut command = Command::cargo_bin("atelier").unwrap();
    command.arg("--version").assert().success();
}

#[test]
fn unknown_subcommand_fails() {
    let mut command = Command::cargo_bin("atelier").unwrap();
    command
        .arg("transmogrify")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized"));
}

#[test]
fn search_requires_a_query() {
    let mut command = Command::cargo_bin("atelier").unwrap();
    command.arg("search").assert().failure();
}
