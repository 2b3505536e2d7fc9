//! Integration tests for the command line interface

mod common;

use assert_cmd::Command;
use common::{create_test_config, write_files};
use predicates::prelude::*;
use std::fs;

fn copytask() -> Command {
    Command::cargo_bin("copytask").unwrap()
}

#[test]
fn test_run_copies_files() {
    let (temp_dir, _) = create_test_config(
        r#"
tasks:
  images:
    from: "*.png"
    to: dist
"#,
    );
    write_files(temp_dir.path(), &[("a.png", "a"), ("b.png", "b")]);

    copytask()
        .current_dir(temp_dir.path())
        .arg("images")
        .assert()
        .success();

    assert_eq!(fs::read_to_string(temp_dir.path().join("dist/a.png")).unwrap(), "a");
    assert_eq!(fs::read_to_string(temp_dir.path().join("dist/b.png")).unwrap(), "b");
}

#[test]
fn test_verbose_reports_progress() {
    let (temp_dir, config_path) = create_test_config(
        r#"
tasks:
  images:
    from: "*.png"
    to: dist
"#,
    );
    write_files(temp_dir.path(), &[("a.png", "a")]);

    copytask()
        .arg("-v")
        .arg("-f")
        .arg(&config_path)
        .arg("images")
        .assert()
        .success()
        .stderr(predicate::str::contains("Found configuration by path"))
        .stderr(predicate::str::contains("Task 'images' was completed"));
}

#[test]
fn test_unknown_task_fails() {
    let (temp_dir, _) = create_test_config(
        r#"
tasks:
  images:
    from: "*.png"
    to: dist
"#,
    );

    copytask()
        .current_dir(temp_dir.path())
        .arg("fonts")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Cannot find 'fonts' in configuration"));
}

#[test]
fn test_no_tasks_fails() {
    let (temp_dir, _) = create_test_config("tasks: {}\n");

    copytask()
        .current_dir(temp_dir.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No task(s) specified"));
}

#[cfg(unix)]
#[test]
fn test_hook_exit_code_is_forwarded() {
    let (temp_dir, _) = create_test_config(
        r#"
tasks:
  images:
    from: "*.png"
    to: dist
    before: exit 3
"#,
    );
    write_files(temp_dir.path(), &[("a.png", "a")]);

    copytask()
        .current_dir(temp_dir.path())
        .arg("images")
        .assert()
        .code(3);

    assert!(!temp_dir.path().join("dist").exists());
}

#[test]
fn test_completions() {
    copytask()
        .arg("--completions")
        .arg("bash")
        .assert()
        .success()
        .stdout(predicate::str::contains("copytask"));
}
