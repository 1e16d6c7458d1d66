//! CLI integration tests using assert_cmd.
//!
//! Tests without database: always run (help, arg validation, password
//! hashing). The server itself is covered by the API integration suite.

use assert_cmd::Command;
use predicates::prelude::*;

#[allow(deprecated)]
fn welcomehome() -> Command {
    Command::cargo_bin("welcomehome").unwrap()
}

// --- Help and arg validation (no database needed) ---

#[test]
fn help_shows_all_subcommands() {
    welcomehome().arg("--help").assert().success().stdout(
        predicate::str::contains("serve").and(predicate::str::contains("hash-password")),
    );
}

#[test]
fn help_serve_shows_args() {
    welcomehome()
        .args(["serve", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--port"));
}

#[test]
fn serve_without_database_url_fails() {
    welcomehome()
        .env_remove("DATABASE_URL")
        .arg("serve")
        .assert()
        .failure()
        .stderr(predicate::str::contains("DATABASE_URL"));
}

#[test]
fn unknown_subcommand_fails() {
    welcomehome().arg("frobnicate").assert().failure();
}

// --- Password hashing ---

#[test]
fn hash_password_emits_phc_string() {
    welcomehome()
        .args(["hash-password", "hunter2!"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("$argon2"));
}

#[test]
fn hash_password_output_differs_per_invocation() {
    let first = welcomehome()
        .args(["hash-password", "same-input"])
        .output()
        .unwrap();
    let second = welcomehome()
        .args(["hash-password", "same-input"])
        .output()
        .unwrap();
    assert_ne!(first.stdout, second.stdout);
}
