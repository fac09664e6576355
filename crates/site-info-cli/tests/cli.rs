use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

/// Create a Command for the site-info binary.
/// Uses CARGO_BIN_EXE_site-info which is set by cargo test automatically.
fn site_info_cmd() -> Command {
    Command::new(env!("CARGO_BIN_EXE_site-info"))
}

fn snapshot_json(runtime_version: &str) -> Value {
    json!({
        "platform": {
            "platform": "WordPress",
            "version": "5.0",
            "database": {
                "host": "localhost",
                "prefix": "wp_",
                "charset": "utf8mb4",
                "collation": "utf8mb4_unicode_ci",
                "server": "MySQL 5.7.42"
            },
            "themes": [
                {"name": "A", "version": "1.0", "author": "Ann", "active": true}
            ],
            "plugins": [],
            "paths": {
                "site": "/var/www/html",
                "theme": "/var/www/html/wp-content/themes/a",
                "uploads": "/var/www/html/wp-content/uploads"
            },
            "urls": {
                "site": "https://example.com",
                "theme": "https://example.com/wp-content/themes/a",
                "uploads": "https://example.com/wp-content/uploads"
            },
            "update_url": "https://example.com/wp-admin/update-core.php"
        },
        "server": {
            "vars": {
                "SERVER_SOFTWARE": "Apache/2.4.41",
                "SERVER_PROTOCOL": "HTTP/1.1",
                "SERVER_PORT": "443",
                "HTTPS": "on"
            },
            "runtime": {
                "version": runtime_version,
                "os": "Linux web1 5.4.0",
                "tls_library": "OpenSSL 1.1.1",
                "http_client_version": "7.68.0",
                "transports": ["tcp", "ssl", "tls"]
            }
        }
    })
}

fn write_snapshot(dir: &Path, runtime_version: &str) -> std::path::PathBuf {
    let path = dir.join("snapshot.json");
    fs::write(&path, snapshot_json(runtime_version).to_string()).expect("write snapshot");
    path
}

// =============================================================================
// BASIC CLI FUNCTIONALITY
// =============================================================================

#[test]
fn help_works() {
    let mut cmd = site_info_cmd();
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("site-info"));
}

#[test]
fn version_works() {
    let mut cmd = site_info_cmd();
    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("site-info"));
}

#[test]
fn report_subcommand_help() {
    let mut cmd = site_info_cmd();
    cmd.arg("report").arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--snapshot"))
        .stdout(predicate::str::contains("--format"))
        .stdout(predicate::str::contains("--offline"));
}

// =============================================================================
// REPORT GENERATION
// =============================================================================

#[test]
fn offline_html_report_renders_to_stdout() {
    let tmp = tempdir().unwrap();
    let snapshot = write_snapshot(tmp.path(), "7.4.3");

    let mut cmd = site_info_cmd();
    cmd.arg("report")
        .arg("--snapshot")
        .arg(&snapshot)
        .arg("--offline");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("WordPress Information"))
        .stdout(predicate::str::contains("site-info-heading"))
        .stdout(predicate::str::contains("dashicons-yes"));
}

#[test]
fn text_format_lists_sections() {
    let tmp = tempdir().unwrap();
    let snapshot = write_snapshot(tmp.path(), "7.4.3");

    let mut cmd = site_info_cmd();
    cmd.arg("report")
        .arg("--snapshot")
        .arg(&snapshot)
        .arg("--format")
        .arg("text")
        .arg("--offline");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Operating System"))
        .stdout(predicate::str::contains("[ok]"))
        .stdout(predicate::str::is_match(r"ok: \d+").unwrap());
}

#[test]
fn json_format_is_parseable_and_carries_schema() {
    let tmp = tempdir().unwrap();
    let snapshot = write_snapshot(tmp.path(), "7.4.3");

    let mut cmd = site_info_cmd();
    let output = cmd
        .arg("report")
        .arg("--snapshot")
        .arg(&snapshot)
        .arg("--format")
        .arg("json")
        .arg("--offline")
        .output()
        .expect("run site-info");
    assert!(output.status.success());

    let report: Value = serde_json::from_slice(&output.stdout).expect("parse report JSON");
    assert_eq!(report["schema"], "site-info.report.v1");
    assert!(report["sections"].as_array().unwrap().len() >= 10);
}

#[test]
fn out_flag_writes_file_instead_of_stdout() {
    let tmp = tempdir().unwrap();
    let snapshot = write_snapshot(tmp.path(), "7.4.3");
    let out = tmp.path().join("artifacts").join("report.html");

    let mut cmd = site_info_cmd();
    cmd.arg("report")
        .arg("--snapshot")
        .arg(&snapshot)
        .arg("--out")
        .arg(&out)
        .arg("--offline");
    cmd.assert()
        .success()
        .stdout(predicate::str::is_empty());

    let html = fs::read_to_string(&out).expect("read rendered file");
    assert!(html.contains("WordPress Information"));
}

#[test]
fn summary_line_goes_to_stderr() {
    let tmp = tempdir().unwrap();
    let snapshot = write_snapshot(tmp.path(), "7.4.3");

    let mut cmd = site_info_cmd();
    cmd.arg("report")
        .arg("--snapshot")
        .arg(&snapshot)
        .arg("--offline");
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("site-info: ok"));
}

// =============================================================================
// EXIT CODES
// =============================================================================

#[test]
fn flagged_environment_exits_with_2() {
    let tmp = tempdir().unwrap();
    let snapshot = write_snapshot(tmp.path(), "5.5.9");

    let mut cmd = site_info_cmd();
    cmd.arg("report")
        .arg("--snapshot")
        .arg(&snapshot)
        .arg("--offline");
    cmd.assert()
        .code(2)
        .stdout(predicate::str::contains("dashicons-flag"));
}

#[test]
fn missing_snapshot_file_fails() {
    let mut cmd = site_info_cmd();
    cmd.arg("report").arg("--snapshot").arg("no/such/file.json");
    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("read"));
}

#[test]
fn malformed_snapshot_fails_with_parse_error() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("snapshot.json");
    fs::write(&path, "{not json").unwrap();

    let mut cmd = site_info_cmd();
    cmd.arg("report").arg("--snapshot").arg(&path);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("parse snapshot JSON"));
}

// =============================================================================
// CONFIG
// =============================================================================

#[test]
fn config_file_can_force_offline() {
    let tmp = tempdir().unwrap();
    let snapshot = write_snapshot(tmp.path(), "7.4.3");
    let config = tmp.path().join("site-info.toml");
    fs::write(&config, "offline = true\n").unwrap();

    // No --offline flag; the config alone keeps the run off the network.
    let mut cmd = site_info_cmd();
    cmd.arg("report")
        .arg("--snapshot")
        .arg(&snapshot)
        .arg("--config")
        .arg(&config)
        .arg("--format")
        .arg("text");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Unable to check the latest available version"));
}

#[test]
fn invalid_format_is_rejected() {
    let tmp = tempdir().unwrap();
    let snapshot = write_snapshot(tmp.path(), "7.4.3");

    let mut cmd = site_info_cmd();
    cmd.arg("report")
        .arg("--snapshot")
        .arg(&snapshot)
        .arg("--format")
        .arg("pdf");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("invalid format"));
}

// =============================================================================
// EXPLAIN
// =============================================================================

#[test]
fn explain_known_statuses() {
    for (status, phrase) in [
        ("ok", "No action is needed"),
        ("warning", "Attention recommended"),
        ("flag", "Action required"),
    ] {
        let mut cmd = site_info_cmd();
        cmd.arg("explain").arg(status);
        cmd.assert()
            .success()
            .stdout(predicate::str::contains(phrase));
    }
}

#[test]
fn explain_unknown_status() {
    let mut cmd = site_info_cmd();
    cmd.arg("explain").arg("bogus");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Unknown status"));
}
