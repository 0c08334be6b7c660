//! CLI integration tests for datagate.
//!
//! These verify argument parsing, exit codes, and validation output
//! against real profile documents on disk.

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;

fn cmd() -> Command {
    Command::cargo_bin("datagate").unwrap()
}

fn profile_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

const GOOD_PROFILE: &str = "\
resource.db = jdbc
resource.db.host = db.example.com
process.copy = basic
process.sturdy = retry
process.sturdy.retryCount = 2
process.sturdy.component = basic
";

#[test]
fn test_help_shows_all_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("show"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("datagate"));
}

#[test]
fn test_validate_good_profile() {
    let file = profile_file(GOOD_PROFILE);
    cmd()
        .args(["validate", file.path().to_str().unwrap()])
        .args(["--resource-component", "jdbc"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 process(es)"));
}

#[test]
fn test_validate_fails_on_unresolvable_resource() {
    // jdbc was not declared resolvable
    let file = profile_file(GOOD_PROFILE);
    cmd()
        .args(["validate", file.path().to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("jdbc"));
}

#[test]
fn test_validate_fails_on_bad_retry_section() {
    let file = profile_file("process.sturdy = retry\nprocess.sturdy.component = exotic\n");
    cmd()
        .args(["validate", file.path().to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("process.sturdy.component"));
}

#[test]
fn test_validate_fails_on_malformed_line() {
    let file = profile_file("process.copy basic\n");
    cmd()
        .args(["validate", file.path().to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("line 1"));
}

#[test]
fn test_validate_missing_file_fails() {
    cmd()
        .args(["validate", "/no/such/profile"])
        .assert()
        .failure();
}

#[test]
fn test_show_lists_sections() {
    let file = profile_file(GOOD_PROFILE);
    cmd()
        .args(["show", file.path().to_str().unwrap()])
        .args(["--resource-component", "jdbc"])
        .assert()
        .success()
        .stdout(predicate::str::contains("resource db -> jdbc"))
        .stdout(predicate::str::contains("process sturdy -> retry"));
}

#[test]
fn test_show_json_output() {
    let file = profile_file(GOOD_PROFILE);
    let assert = cmd()
        .args(["show", file.path().to_str().unwrap()])
        .args(["--resource-component", "jdbc", "--json", "--id", "main"])
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["id"], "main");
    assert_eq!(parsed["processes"].as_array().unwrap().len(), 2);
}
