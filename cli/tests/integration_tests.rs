//! Integration tests for the depscope CLI
//!
//! These tests run the binary against real fixture trees on disk.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

/// A small polyglot fixture with packages, an API call, and an env lookup
fn create_fixture_repo() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let base = temp_dir.path();

    fs::create_dir_all(base.join("src")).unwrap();

    fs::write(
        base.join("requirements.txt"),
        "stripe>=7.0.0\nrequests==2.31.0\n",
    )
    .unwrap();

    fs::write(
        base.join("src/billing.py"),
        r#"import stripe
import requests

def charge():
    return requests.post("https://api.stripe.com/v1/charges")
"#,
    )
    .unwrap();

    fs::write(
        base.join("src/cache.js"),
        "const client = createClient(process.env.REDIS_URL);\n",
    )
    .unwrap();

    temp_dir
}

fn depscope() -> Command {
    Command::cargo_bin("depscope").unwrap()
}

#[test]
fn test_scan_emits_valid_json_manifest() {
    let repo = create_fixture_repo();

    let output = depscope()
        .arg("scan")
        .arg(repo.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let manifest: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(manifest["version"], "1.0");

    let packages = manifest["packages"].as_array().unwrap();
    assert!(packages
        .iter()
        .any(|p| p["name"] == "stripe" && p["current_version"] == "7.0.0"));

    let apis = manifest["apis"].as_array().unwrap();
    assert!(apis
        .iter()
        .any(|a| a["url"] == "https://api.stripe.com/v1/charges" && a["method"] == "POST"));

    let infra = manifest["infrastructure"].as_array().unwrap();
    assert!(infra
        .iter()
        .any(|i| i["type"] == "redis" && i["connection_ref"] == "REDIS_URL"));

    let languages = manifest["metadata"]["languages_detected"].as_array().unwrap();
    assert!(languages.iter().any(|l| l == "python"));
    assert!(languages.iter().any(|l| l == "javascript"));
}

#[test]
fn test_scan_language_filter() {
    let repo = create_fixture_repo();

    let output = depscope()
        .arg("scan")
        .arg(repo.path())
        .args(["--language", "javascript"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let manifest: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(manifest["packages"].as_array().unwrap().len(), 0);
    assert_eq!(
        manifest["metadata"]["languages_detected"],
        serde_json::json!(["javascript"])
    );
}

#[test]
fn test_scan_table_output() {
    let repo = create_fixture_repo();

    depscope()
        .arg("scan")
        .arg(repo.path())
        .args(["--format", "table"])
        .assert()
        .success()
        .stdout(predicate::str::contains("PACKAGES"))
        .stdout(predicate::str::contains("pypi:stripe"));
}

#[test]
fn test_invalid_config_is_fatal() {
    let repo = TempDir::new().unwrap();
    fs::write(repo.path().join("depscope.yml"), "max_file_size_mb: 0\n").unwrap();

    depscope()
        .arg("scan")
        .arg(repo.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_file_size_mb"));
}

#[test]
fn test_out_file_escape_is_fatal() {
    let repo = create_fixture_repo();

    depscope()
        .arg("scan")
        .arg(repo.path())
        .args(["--out", "../escape.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("outside the working directory"));
}

#[test]
fn test_validate_round_trip() {
    let repo = create_fixture_repo();
    let out_dir = TempDir::new().unwrap();
    let manifest_path = out_dir.path().join("manifest.json");

    let output = depscope()
        .arg("scan")
        .arg(repo.path())
        .current_dir(out_dir.path())
        .args(["--out", "manifest.json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    depscope()
        .arg("validate")
        .arg(&manifest_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("valid manifest"));
}

#[test]
fn test_validate_rejects_bad_document() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.json");
    fs::write(&path, r#"{"version": "not-a-version"}"#).unwrap();

    depscope()
        .arg("validate")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("validation issue"));
}
