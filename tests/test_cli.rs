//! Binary-level checks for the commands that need no running server.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn goalgate() -> Command {
    let mut cmd = Command::cargo_bin("goalgate").unwrap();
    cmd.env_remove("GOALGATE_SOCKET")
        .env_remove("GOALGATE_LOG_DIR")
        .env_remove("APPROVAL_TIMEOUT_SECONDS");
    cmd
}

#[test]
fn test_help_lists_commands() {
    goalgate()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("approve"))
        .stdout(predicate::str::contains("check-config"));
}

#[test]
fn test_check_config_accepts_valid_file() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("goalgate.yaml");
    std::fs::write(&path, "approval_timeout: 2m\nsocket_path: /tmp/gg-cli-test.sock\n").unwrap();

    goalgate()
        .arg("check-config")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Config is valid"))
        .stdout(predicate::str::contains("120s"))
        .stdout(predicate::str::contains("/tmp/gg-cli-test.sock"));
}

#[test]
fn test_check_config_rejects_unknown_key() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("goalgate.yaml");
    std::fs::write(&path, "aproval_timeout: 10\n").unwrap();

    goalgate()
        .arg("check-config")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("aproval_timeout"));
}

#[test]
fn test_client_command_without_server_fails() {
    let tmp = TempDir::new().unwrap();
    let socket = tmp.path().join("nobody-home.sock");

    goalgate()
        .current_dir(tmp.path())
        .arg("--socket")
        .arg(&socket)
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Is `goalgate serve` running?"));
}

#[test]
fn test_log_with_empty_directory() {
    let tmp = TempDir::new().unwrap();

    goalgate()
        .arg("log")
        .arg("--log-dir")
        .arg(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No audit logs found"));
}
