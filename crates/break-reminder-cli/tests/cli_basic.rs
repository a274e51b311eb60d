//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary with HOME pointed at a temp dir and verify
//! outputs.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(home: &Path, args: &[&str], stdin: &str) -> (String, String, i32) {
    let mut child = Command::new(env!("CARGO_BIN_EXE_break-reminder"))
        .args(args)
        .env("HOME", home)
        .env_remove("BREAK_REMINDER_ENV")
        .env("RUST_LOG", "warn")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to execute CLI command");

    child
        .stdin
        .take()
        .unwrap()
        .write_all(stdin.as_bytes())
        .unwrap();
    let output = child.wait_with_output().unwrap();

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn event_types(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(|line| {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            value["type"].as_str().unwrap().to_string()
        })
        .collect()
}

#[test]
fn test_config_path_is_under_home() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["config", "path"], "");
    assert_eq!(code, 0);
    assert!(stdout.trim().ends_with(".config/break-reminder/config.toml"));
}

#[test]
fn test_config_get_defaults() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["config", "get", "break_duration"], "");
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "1200");

    let (stdout, _, code) = run_cli(home.path(), &["config", "get", "media.pause_strategy"], "");
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "broadcast");
}

#[test]
fn test_config_set_persists() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["config", "set", "countdown_duration", "30"], "");
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "ok");

    let (stdout, _, _) = run_cli(home.path(), &["config", "get", "countdown_duration"], "");
    assert_eq!(stdout.trim(), "30");
}

#[test]
fn test_config_set_rejects_out_of_range() {
    let home = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(home.path(), &["config", "set", "countdown_duration", "0"], "");
    assert_eq!(code, 1);
    assert!(stderr.contains("countdown_duration"));

    let (stdout, _, _) = run_cli(home.path(), &["config", "get", "countdown_duration"], "");
    assert_eq!(stdout.trim(), "20");
}

#[test]
fn test_config_get_unknown_key() {
    let home = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(home.path(), &["config", "get", "nope"], "");
    assert_eq!(code, 1);
    assert!(stderr.contains("unknown key"));
}

#[test]
fn test_config_list_and_reset() {
    let home = tempfile::tempdir().unwrap();
    run_cli(home.path(), &["config", "set", "break_duration", "600"], "");

    let (stdout, _, code) = run_cli(home.path(), &["config", "list"], "");
    assert_eq!(code, 0);
    let listed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(listed["break_duration"], 600);

    let (_, _, code) = run_cli(home.path(), &["config", "reset"], "");
    assert_eq!(code, 0);
    let (stdout, _, _) = run_cli(home.path(), &["config", "get", "break_duration"], "");
    assert_eq!(stdout.trim(), "1200");
}

#[cfg(unix)]
#[test]
fn test_run_survives_closed_stdin_until_sigterm() {
    use std::time::Duration;

    let home = tempfile::tempdir().unwrap();
    let mut child = Command::new(env!("CARGO_BIN_EXE_break-reminder"))
        .args(["run", "--interval", "300", "--playerctl", "/nonexistent/playerctl"])
        .env("HOME", home.path())
        .env_remove("BREAK_REMINDER_ENV")
        .env("RUST_LOG", "warn")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to execute CLI command");

    std::thread::sleep(Duration::from_millis(2000));
    assert!(child.try_wait().unwrap().is_none(), "daemon exited on stdin EOF");

    let status = Command::new("kill")
        .args(["-TERM", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());

    let output = child.wait_with_output().unwrap();
    assert_eq!(output.status.code(), Some(0));
    let types = event_types(&String::from_utf8_lossy(&output.stdout));
    assert_eq!(types.first().map(String::as_str), Some("controller_started"));
    assert_eq!(types.last().map(String::as_str), Some("controller_stopped"));
}

#[test]
fn test_run_rejects_invalid_config_at_startup() {
    let home = tempfile::tempdir().unwrap();
    let (path, _, _) = run_cli(home.path(), &["config", "path"], "");
    run_cli(home.path(), &["config", "list"], "");
    let path = path.trim().to_string();
    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("break_duration = 1200"));
    std::fs::write(&path, content.replace("break_duration = 1200", "break_duration = 0")).unwrap();

    let (stdout, stderr, code) = run_cli(
        home.path(),
        &["run", "--playerctl", "/nonexistent/playerctl"],
        "",
    );
    assert_eq!(code, 1);
    assert!(stderr.contains("break_duration"));
    assert!(stdout.is_empty());
}

#[test]
fn test_run_manual_break_and_close() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, stderr, code) = run_cli(
        home.path(),
        &[
            "run",
            "--interval",
            "3600",
            "--countdown",
            "30",
            "--playerctl",
            "/nonexistent/playerctl",
        ],
        "break\nclose\nquit\n",
    );
    assert_eq!(code, 0);
    let types = event_types(&stdout);
    assert!(types.contains(&"break_started".to_string()));
    assert!(types.contains(&"break_ended".to_string()));
    assert!(stdout.contains("closed_by_user"));
    assert!(stderr.contains("End Break"));
    assert!(stderr.contains("Stop for 1 hour"));
}

#[test]
fn test_run_reports_bad_commands() {
    let home = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(
        home.path(),
        &["run", "--playerctl", "/nonexistent/playerctl"],
        "dance\nquit\n",
    );
    assert_eq!(code, 0);
    assert!(stderr.contains("unknown command: dance"));
}
