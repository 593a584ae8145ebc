//! CLI integration tests for all implemented subcommands.
//!
//! Uses `assert_cmd` to spawn the `paraph` binary and verify exit
//! codes, stdout content, and stderr content. Fixtures live in
//! tempdirs so tests stay independent of the working directory.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn paraph() -> Command {
    cargo_bin_cmd!("paraph")
}

/// Write a draft lease fixture and return its path inside `dir`.
fn write_lease_fixture(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("lease.json");
    let fixture = serde_json::json!({
        "id": "agr-demo",
        "kind": "contract",
        "property_id": "prop-17",
        "owner_id": "own-3",
        "counterparty_id": "ten-8",
        "monthly_rent": "950.00",
        "deposit": "1900.00",
        "status": "draft"
    });
    fs::write(&path, serde_json::to_string_pretty(&fixture).unwrap()).unwrap();
    path
}

// ──────────────────────────────────────────────
// 1. Help and version
// ──────────────────────────────────────────────

#[test]
fn help_exits_0_with_description() {
    paraph()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Paraph signature orchestration",
        ));
}

#[test]
fn version_exits_0() {
    paraph()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("paraph"));
}

// ──────────────────────────────────────────────
// 2. Digest subcommand
// ──────────────────────────────────────────────

#[test]
fn digest_is_stable_for_identical_content() {
    let dir = TempDir::new().unwrap();
    let photo = dir.path().join("photo.jpg");
    fs::write(&photo, b"\xFF\xD8\xFF\xE0 fake jfif").unwrap();

    let first = digest_of(&photo);
    let second = digest_of(&photo);
    assert_eq!(first, second);
    assert_eq!(first.trim().len(), 64);
    assert!(first.trim().chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn digest_differs_for_different_content() {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a.jpg");
    let b = dir.path().join("b.jpg");
    fs::write(&a, b"photo a").unwrap();
    fs::write(&b, b"photo b").unwrap();
    assert_ne!(digest_of(&a), digest_of(&b));
}

#[test]
fn digest_json_output_names_the_file() {
    let dir = TempDir::new().unwrap();
    let photo = dir.path().join("photo.jpg");
    fs::write(&photo, b"bytes").unwrap();

    let output = paraph()
        .args(["digest", photo.to_str().unwrap(), "--output", "json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert!(value["digest"].as_str().unwrap().len() == 64);
    assert!(value["file"].as_str().unwrap().contains("photo.jpg"));
}

#[test]
fn digest_missing_file_exits_1() {
    paraph()
        .args(["digest", "/nonexistent/photo.jpg"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot read"));
}

fn digest_of(path: &Path) -> String {
    let output = paraph()
        .args(["digest", path.to_str().unwrap()])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    String::from_utf8(output).unwrap()
}

// ──────────────────────────────────────────────
// 3. Inspect subcommand
// ──────────────────────────────────────────────

#[test]
fn inspect_summarizes_the_agreement() {
    let dir = TempDir::new().unwrap();
    let fixture = write_lease_fixture(&dir);

    paraph()
        .args(["inspect", fixture.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Agreement: agr-demo"))
        .stdout(predicate::str::contains("kind:       contract"))
        .stdout(predicate::str::contains("status:     draft"))
        .stdout(predicate::str::contains("signed by owner: -"));
}

#[test]
fn inspect_json_round_trips_the_fixture() {
    let dir = TempDir::new().unwrap();
    let fixture = write_lease_fixture(&dir);

    let output = paraph()
        .args(["inspect", fixture.to_str().unwrap(), "--output", "json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(value["id"], "agr-demo");
    assert_eq!(value["kind"], "contract");
    assert_eq!(value["monthly_rent"], "950.00");
}

#[test]
fn inspect_invalid_json_exits_1() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.json");
    fs::write(&path, "{not json").unwrap();

    paraph()
        .args(["inspect", path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid agreement"));
}

// ──────────────────────────────────────────────
// 4. Run subcommand
// ──────────────────────────────────────────────

#[test]
fn run_completes_the_session_and_signs_the_agreement() {
    let dir = TempDir::new().unwrap();
    let fixture = write_lease_fixture(&dir);

    paraph()
        .args([
            "run",
            fixture.to_str().unwrap(),
            "--party",
            "owner",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("completed"))
        .stdout(predicate::str::contains("Agreement agr-demo: partially_signed"));
}

#[test]
fn run_json_reports_session_and_agreement() {
    let dir = TempDir::new().unwrap();
    let fixture = write_lease_fixture(&dir);

    let output = paraph()
        .args([
            "run",
            fixture.to_str().unwrap(),
            "--party",
            "tenant",
            "--output",
            "json",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(value["session"]["step"], "completed");
    assert_eq!(value["agreement"]["status"], "partially_signed");
    assert!(value["agreement"]["counterparty_signed_at"].is_string());
    assert!(value["agreement"]["owner_signed_at"].is_null());
}

#[test]
fn run_with_short_otp_fails_before_the_provider() {
    let dir = TempDir::new().unwrap();
    let fixture = write_lease_fixture(&dir);

    paraph()
        .args([
            "run",
            fixture.to_str().unwrap(),
            "--party",
            "owner",
            "--otp",
            "123",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be 6 digits"));
}

#[test]
fn run_with_wrong_otp_reports_rejection() {
    let dir = TempDir::new().unwrap();
    let fixture = write_lease_fixture(&dir);

    paraph()
        .args([
            "run",
            fixture.to_str().unwrap(),
            "--party",
            "owner",
            "--otp",
            "654321",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("rejected"));
}

#[test]
fn run_with_unknown_party_exits_1() {
    let dir = TempDir::new().unwrap();
    let fixture = write_lease_fixture(&dir);

    paraph()
        .args([
            "run",
            fixture.to_str().unwrap(),
            "--party",
            "landlord",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown party role"));
}

#[test]
fn run_with_agency_on_a_lease_exits_1() {
    let dir = TempDir::new().unwrap();
    let fixture = write_lease_fixture(&dir);

    paraph()
        .args([
            "run",
            fixture.to_str().unwrap(),
            "--party",
            "agency",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a signing party"));
}
