// usagelogger/tests/cli_integration_tests.rs
//! Runs the `usagelogger` binary end to end: rule checking, applying rules to
//! a message on stdin or from a file, and submitting to a mock collector.

use anyhow::Result;
use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn usagelogger() -> Command {
    let mut cmd = Command::cargo_bin("usagelogger").unwrap();
    cmd.env_remove("USAGE_LOGGERS_URL");
    cmd.env_remove("USAGE_LOGGERS_DISABLE");
    cmd.env("RUST_LOG", "warn");
    cmd
}

#[test]
fn test_check_prints_summary() {
    usagelogger()
        .args(["check", "--rules", "include debug\nsample 10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Compiled 3 rules."))
        .stdout(predicate::str::contains("allow_http_url: true"))
        .stdout(predicate::str::contains("sample: 10%"));
}

#[test]
fn test_check_defaults_to_strict_rules() {
    usagelogger()
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("Compiled 2 rules."));
}

#[test]
fn test_check_reports_invalid_rules() {
    usagelogger()
        .args(["check", "--rules", "sample 123"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid sample percent: 123"));
}

#[test]
fn test_check_rules_file() -> Result<()> {
    let mut file = NamedTempFile::new()?;
    writeln!(file, "/request_header:cookie/ remove")?;
    writeln!(file, "skip_compression")?;
    let rules = format!("file://{}", file.path().display());
    usagelogger()
        .args(["check", "--rules", &rules])
        .assert()
        .success()
        .stdout(predicate::str::contains("Compiled 2 rules."))
        .stdout(predicate::str::contains("skip_compression: true"));
    Ok(())
}

#[test]
fn test_apply_from_stdin() {
    usagelogger()
        .args(["apply", "--rules", "include standard"])
        .write_stdin(r#"[["request_header:cookie","c"],["request_body","kurt@example.com"]]"#)
        .assert()
        .success()
        .stdout("[[\"request_body\",\"x@y.com\"]]\n");
}

#[test]
fn test_apply_dropped_message() -> Result<()> {
    let mut input = NamedTempFile::new()?;
    write!(input, r#"[["response_header:blah","1"]]"#)?;
    usagelogger()
        .args(["apply", "--rules", "!response_header:blah! stop", "--input"])
        .arg(input.path())
        .assert()
        .success()
        .stdout("dropped\n");
    Ok(())
}

#[test]
fn test_submit_to_collector() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/message")
        .match_header("content-encoding", "deflated")
        .with_status(204)
        .create();

    usagelogger()
        .args(["submit", "--rules", "allow_http_url", "--host", "web1"])
        .env("USAGE_LOGGERS_URL", format!("{}/message", server.url()))
        .write_stdin(r#"[["request_body","hello"]]"#)
        .assert()
        .success()
        .stdout("submitted: 1\nfailed: 0\n");
    mock.assert();
}

#[test]
fn test_submit_collector_failure_is_counted() {
    let mut server = mockito::Server::new();
    let mock = server.mock("POST", "/").with_status(503).create();

    usagelogger()
        .args(["submit", "--rules", "allow_http_url", "--url"])
        .arg(server.url())
        .write_stdin(r#"[["request_body","hello"]]"#)
        .assert()
        .success()
        .stdout("submitted: 0\nfailed: 1\n");
    mock.assert();
}

#[test]
fn test_submit_respects_disable_env() {
    usagelogger()
        .args(["submit", "--url", "https://collector.example.com/message"])
        .env("USAGE_LOGGERS_DISABLE", "true")
        .assert()
        .success()
        .stdout("disabled\n");
}

#[test]
fn test_submit_ignores_non_true_disable_values() {
    for value in ["1", ""] {
        let mut server = mockito::Server::new();
        let mock = server.mock("POST", "/").with_status(204).create();

        usagelogger()
            .args(["submit", "--rules", "allow_http_url", "--url"])
            .arg(server.url())
            .env("USAGE_LOGGERS_DISABLE", value)
            .write_stdin(r#"[["request_body","hello"]]"#)
            .assert()
            .success()
            .stdout("submitted: 1\nfailed: 0\n");
        mock.assert();
    }
}

#[test]
fn test_submit_disable_all_flag() {
    usagelogger()
        .args(["submit", "--disable-all", "--url", "https://collector.example.com/message"])
        .assert()
        .success()
        .stdout("disabled\n");
}

#[test]
fn test_submit_with_config_file() -> Result<()> {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/")
        .match_header("content-encoding", "identity")
        .with_status(204)
        .create();

    let mut config = NamedTempFile::new()?;
    write!(
        config,
        "url: {}\nrules: |\n  allow_http_url\n  skip_compression\nmax_in_flight: 2\n",
        server.url()
    )?;
    usagelogger()
        .args(["submit", "--config"])
        .arg(config.path())
        .write_stdin(r#"[["request_body","hello"]]"#)
        .assert()
        .success()
        .stdout("submitted: 1\nfailed: 0\n");
    mock.assert();
    Ok(())
}
