//! End-to-end tests driving the `tally` binary against a temporary database.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

fn tally_binary() -> String {
    env!("CARGO_BIN_EXE_tally").to_string()
}

/// Writes a config file pointing the database into `temp`.
fn write_config(temp: &Path) -> PathBuf {
    let config = temp.join("config.toml");
    let database = temp.join("data").join("tally.db");
    std::fs::write(
        &config,
        format!("database_path = {:?}\n", database.display().to_string()),
    )
    .unwrap();
    config
}

fn tally(temp: &Path, user: Option<&str>, args: &[&str]) -> Output {
    let mut command = Command::new(tally_binary());
    command
        .env("HOME", temp)
        .env("XDG_CONFIG_HOME", temp.join(".config"))
        .env("XDG_DATA_HOME", temp.join(".local/share"))
        .env_remove("TALLY_USER")
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(temp.join("config.toml"))
        .args(args);
    if let Some(user) = user {
        command.env("TALLY_USER", user);
    }
    command.output().expect("failed to run tally")
}

fn tally_ok(temp: &Path, user: Option<&str>, args: &[&str]) -> String {
    let output = tally(temp, user, args);
    assert!(
        output.status.success(),
        "tally {args:?} should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).unwrap()
}

#[test]
fn test_record_and_report_flow() {
    let temp = TempDir::new().unwrap();
    write_config(temp.path());

    let registered = tally_ok(
        temp.path(),
        None,
        &["user", "add", "ana", "--role-code", "132867"],
    );
    assert_eq!(registered, "Registered user ana (senior) with id 1\n");

    tally_ok(temp.path(), Some("ana"), &["client", "add", "Acme"]);
    tally_ok(temp.path(), Some("ana"), &["task", "add", "Design", "--client", "1"]);
    tally_ok(temp.path(), Some("ana"), &["task", "add", "Review", "--client", "1"]);
    tally_ok(
        temp.path(),
        Some("ana"),
        &[
            "entry",
            "add",
            "--task",
            "1",
            "--start",
            "2025-03-10T09:00:00Z",
            "--end",
            "2025-03-10T11:30:00Z",
        ],
    );
    let recorded = tally_ok(
        temp.path(),
        Some("ana"),
        &[
            "entry",
            "add",
            "--task",
            "2",
            "--start",
            "2025-03-11T09:00:00Z",
            "--end",
            "2025-03-11T10:00:00Z",
        ],
    );
    assert_eq!(recorded, "Recorded 1.00 h on task 2 (entry 2)\n");

    let report = tally_ok(
        temp.path(),
        Some("ana"),
        &[
            "report",
            "--start",
            "2025-03-01",
            "--end",
            "2025-03-31",
            "--json",
        ],
    );
    let rows: serde_json::Value = serde_json::from_str(&report).unwrap();
    assert_eq!(rows[0]["Cliente"], "Acme");
    assert_eq!(rows[0]["Total Horas"], 3.5);
    assert_eq!(rows[0]["Tareas"][0]["Título"], "Design");
    assert_eq!(rows[0]["Tareas"][0]["Horas"], 2.5);
    assert_eq!(rows[0]["Tareas"][1]["Horas"], 1.0);

    let deleted = tally_ok(temp.path(), Some("ana"), &["client", "delete", "1"]);
    assert_eq!(deleted, "Deleted client 1 (2 tasks, 2 time entries)\n");

    let entries = tally_ok(temp.path(), Some("ana"), &["entry", "list"]);
    assert_eq!(entries, "No time entries.\n");
}

#[test]
fn test_report_requires_viewer_role() {
    let temp = TempDir::new().unwrap();
    write_config(temp.path());
    tally_ok(
        temp.path(),
        None,
        &["user", "add", "luis", "--role-code", "224566"],
    );

    let output = tally(
        temp.path(),
        Some("luis"),
        &["report", "--start", "2025-03-01", "--end", "2025-03-31"],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("user luis with role junior is not allowed"),
        "unexpected stderr: {stderr}"
    );
}

#[test]
fn test_commands_need_a_registered_user() {
    let temp = TempDir::new().unwrap();
    write_config(temp.path());

    let output = tally(temp.path(), None, &["client", "list"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no user configured"));

    let output = tally(temp.path(), Some("ghost"), &["client", "list"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("user ghost is not registered"));
}
