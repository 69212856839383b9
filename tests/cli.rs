// ABOUTME: Integration tests for the berth CLI commands.
// ABOUTME: Validates --help output and init command behavior.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn berth_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("berth"))
}

#[test]
fn help_shows_commands() {
    berth_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("check"));
}

#[test]
fn init_creates_config_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("berth.yml");

    berth_cmd()
        .current_dir(temp_dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("berth.yml"));

    assert!(config_path.exists(), "berth.yml should be created");
    let content = fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("listen:"), "template should set listen");
    assert!(content.contains("timeout:"), "template should set timeout");
}

#[test]
fn init_refuses_to_overwrite_existing_config() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("berth.yml");

    fs::write(&config_path, "listen: 0.0.0.0:9000\n").unwrap();

    berth_cmd()
        .current_dir(temp_dir.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    let content = fs::read_to_string(&config_path).unwrap();
    assert_eq!(content, "listen: 0.0.0.0:9000\n");
}

#[test]
fn init_force_overwrites() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("berth.yml");
    fs::write(&config_path, "listen: 0.0.0.0:9000\n").unwrap();

    berth_cmd()
        .current_dir(temp_dir.path())
        .args(["init", "--force"])
        .assert()
        .success();

    let content = fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("127.0.0.1:5000"));
}

#[test]
fn unreachable_engine_is_fatal() {
    let temp_dir = tempfile::tempdir().unwrap();
    let socket = temp_dir.path().join("no-engine.sock");

    berth_cmd()
        .current_dir(temp_dir.path())
        .args(["check", "--endpoint"])
        .arg(format!("unix://{}", socket.display()))
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("engine unavailable"));
}

#[test]
fn invalid_endpoint_is_fatal() {
    let temp_dir = tempfile::tempdir().unwrap();

    berth_cmd()
        .current_dir(temp_dir.path())
        .args(["check", "--endpoint", "ftp://example"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid engine endpoint"));
}
