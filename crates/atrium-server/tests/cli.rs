//! CLI command integration tests.
//! Each test uses a temp directory via ATRIUM_DB for full isolation.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn atrium_cmd(dir: &TempDir) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("atrium").unwrap();
    cmd.env("ATRIUM_DB", dir.path().join("atrium.db"));
    cmd
}

#[test]
fn stats_fresh_db() {
    let dir = TempDir::new().unwrap();
    atrium_cmd(&dir)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("present now:     0"))
        .stdout(predicate::str::contains("visits today:    0"))
        .stdout(predicate::str::contains("combined groups: 0"));
}

#[test]
fn seed_then_stats() {
    let dir = TempDir::new().unwrap();

    atrium_cmd(&dir)
        .arg("seed")
        .assert()
        .success()
        .stdout(predicate::str::contains("seeded"));

    // seeding creates reference data only, nobody is present yet
    atrium_cmd(&dir)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("present now:     0"));
}

#[test]
fn explicit_db_flag_overrides_env() {
    let dir = TempDir::new().unwrap();
    let other = dir.path().join("other.db");

    atrium_cmd(&dir)
        .args(["--db", other.to_str().unwrap(), "seed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("other.db"));

    assert!(other.exists());
}

#[test]
fn missing_subcommand_fails_with_usage() {
    let dir = TempDir::new().unwrap();
    atrium_cmd(&dir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}
