//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary with a throwaway data directory and verify
//! outputs.

use std::io::Write;
use std::process::{Command, Stdio};

use tempfile::TempDir;

fn cli(data: &TempDir) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_breathroom"));
    cmd.env("BREATHROOM_DATA_DIR", data.path())
        .env("BREATHROOM_LOG", "off");
    cmd
}

/// Run a CLI command and return (code, stdout, stderr).
fn run_cli(data: &TempDir, args: &[&str]) -> (i32, String, String) {
    let output = cli(data)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

fn run_ok(data: &TempDir, args: &[&str]) -> String {
    let (code, stdout, stderr) = run_cli(data, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    stdout
}

/// Everything after the "... created: <id>" line.
fn created_json(stdout: &str) -> serde_json::Value {
    let body = stdout.splitn(2, '\n').nth(1).unwrap_or_default();
    serde_json::from_str(body).expect("created entity is printed as JSON")
}

#[test]
fn test_routine_list_includes_builtins() {
    let data = tempfile::tempdir().unwrap();
    let stdout = run_ok(&data, &["routine", "list", "--json"]);
    let routines: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let ids: Vec<&str> = routines
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|r| r["id"].as_str())
        .collect();
    assert!(ids.contains(&"box"));
    assert!(ids.contains(&"relax-478"));

    let text = run_ok(&data, &["routine", "list"]);
    assert!(text.contains("4-4-4-4"));
}

#[test]
fn test_routine_create_show_delete() {
    let data = tempfile::tempdir().unwrap();
    let stdout = run_ok(
        &data,
        &[
            "routine", "create", "--name", "Evening", "--minutes", "4", "--inhale", "4",
            "--exhale", "6", "--hold-in", "2", "--hold-in-label", "FLOAT",
        ],
    );
    assert!(stdout.starts_with("Routine created: custom-"));
    let routine = created_json(&stdout);
    let id = routine["id"].as_str().unwrap().to_string();
    assert_eq!(routine["phase_labels"]["holdIn"], "FLOAT");

    let shown: serde_json::Value =
        serde_json::from_str(&run_ok(&data, &["routine", "show", &id])).unwrap();
    assert_eq!(shown["name"], "Evening");
    assert_eq!(shown["duration_minutes"], 4);

    run_ok(&data, &["routine", "delete", &id]);
    let (code, _, stderr) = run_cli(&data, &["routine", "show", &id]);
    assert_eq!(code, 1);
    assert!(stderr.contains("unknown routine"));
}

#[test]
fn test_routine_create_rejects_invalid_input() {
    let data = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(
        &data,
        &["routine", "create", "--name", "Long", "--minutes", "500", "--inhale", "4", "--exhale", "4"],
    );
    assert_eq!(code, 1);
    assert!(stderr.starts_with("error:"), "{stderr}");

    let (code, _, _) = run_cli(
        &data,
        &["routine", "create", "--name", "Nothing", "--minutes", "5", "--inhale", "0", "--exhale", "0"],
    );
    assert_eq!(code, 1);
}

#[test]
fn test_builtin_routine_cannot_be_deleted() {
    let data = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(&data, &["routine", "delete", "box"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("built in"), "{stderr}");
}

#[test]
fn test_combo_create_and_list() {
    let data = tempfile::tempdir().unwrap();
    let (code, _, _) = run_cli(
        &data,
        &["combo", "create", "--name", "Broken", "--routines", "box,ghost"],
    );
    assert_eq!(code, 1);

    let stdout = run_ok(
        &data,
        &["combo", "create", "--name", "Morning", "--routines", "energize,box", "--transition-sound", "gong"],
    );
    let combo = created_json(&stdout);
    assert_eq!(combo["routines"], serde_json::json!(["energize", "box"]));

    let list = run_ok(&data, &["combo", "list"]);
    assert!(list.contains("energize > box"));
    assert!(list.contains("wind-down"));
}

#[test]
fn test_config_get_set_reset() {
    let data = tempfile::tempdir().unwrap();
    assert_eq!(run_ok(&data, &["config", "get", "session.countdown_secs"]).trim(), "3");

    run_ok(&data, &["config", "set", "session.countdown_secs", "5"]);
    assert_eq!(run_ok(&data, &["config", "get", "session.countdown_secs"]).trim(), "5");
    assert!(data.path().join("config.toml").exists());

    let (code, _, stderr) = run_cli(&data, &["config", "set", "sound.volume", "loud"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("sound.volume"), "{stderr}");

    let (code, _, stderr) = run_cli(&data, &["config", "get", "nope"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("unknown config key"), "{stderr}");

    let list = run_ok(&data, &["config", "list"]);
    assert!(list.contains("session.countdown_secs = 5"));

    run_ok(&data, &["config", "reset"]);
    assert_eq!(run_ok(&data, &["config", "get", "session.countdown_secs"]).trim(), "3");
}

#[test]
fn test_history_starts_empty() {
    let data = tempfile::tempdir().unwrap();
    let stats: serde_json::Value =
        serde_json::from_str(&run_ok(&data, &["history", "stats"])).unwrap();
    assert_eq!(stats["total_sessions"], 0);
    let list: serde_json::Value =
        serde_json::from_str(&run_ok(&data, &["history", "list", "--json"])).unwrap();
    assert_eq!(list, serde_json::json!([]));
}

#[test]
fn test_session_run_unknown_routine_fails() {
    let data = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(&data, &["session", "run", "nope", "--json"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("Unknown routine"), "{stderr}");

    let (code, _, _) = run_cli(&data, &["session", "run", "--json"]);
    assert_eq!(code, 1, "nothing to repeat yet");
}

#[test]
fn test_session_quit_during_countdown() {
    let data = tempfile::tempdir().unwrap();
    let mut child = cli(&data)
        .args(["session", "run", "box", "--json"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn CLI");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"q\n")
        .unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let events: Vec<serde_json::Value> = String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|l| serde_json::from_str(l).expect("one JSON event per line"))
        .collect();
    assert_eq!(events[0]["type"], "countdown_started");
    let stopped = events.last().unwrap();
    assert_eq!(stopped["type"], "session_stopped");
    assert_eq!(stopped["completed"], false);
    assert_eq!(stopped["history_saved"], false);

    let stats: serde_json::Value =
        serde_json::from_str(&run_ok(&data, &["history", "stats"])).unwrap();
    assert_eq!(stats["total_sessions"], 0);

    let last: serde_json::Value =
        serde_json::from_str(&run_ok(&data, &["session", "last"])).unwrap();
    assert_eq!(last, serde_json::json!({"kind": "routine", "id": "box"}));
}
