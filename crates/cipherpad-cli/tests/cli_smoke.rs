//! Invocations that never reach a server.

use std::path::Path;
use std::process::{Command, Output, Stdio};

fn cipherpad(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_cipherpad"))
        .args(args)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"))
        .env_remove("CIPHERPAD_CONFIG")
        .env_remove("CIPHERPAD_SERVER")
        .env_remove("CIPHERPAD_PASSWORD")
        .env("NO_COLOR", "1")
        .stdin(Stdio::null())
        .output()
        .expect("run cipherpad")
}

#[test]
fn test_completions_are_generated() {
    let home = tempfile::tempdir().unwrap();
    let output = cipherpad(home.path(), &["completions", "bash"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("cipherpad"));
}

#[test]
fn test_list_requires_login() {
    let home = tempfile::tempdir().unwrap();
    let output = cipherpad(home.path(), &["list"]);
    assert_eq!(output.status.code(), Some(5));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Not logged in"), "stderr: {}", stderr);
    assert!(stderr.contains("cipherpad login"), "stderr: {}", stderr);
}

#[test]
fn test_logout_without_login_is_a_no_op() {
    let home = tempfile::tempdir().unwrap();
    let output = cipherpad(home.path(), &["logout"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Not logged in"));
    assert!(!home.path().join("config").join("cipherpad").exists());
}

#[test]
fn test_login_without_credential_fails_non_interactively() {
    let home = tempfile::tempdir().unwrap();
    let output = cipherpad(home.path(), &["login", "--email", "me@example.com"]);
    assert_eq!(output.status.code(), Some(5));
    assert!(String::from_utf8_lossy(&output.stderr).contains("CIPHERPAD_PASSWORD"));
}

#[test]
fn test_new_requires_title() {
    let home = tempfile::tempdir().unwrap();
    let output = cipherpad(home.path(), &["new", "--folder", "work"]);
    assert_eq!(output.status.code(), Some(2));
}
