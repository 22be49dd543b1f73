//! End-to-end tests running the `tally` binary on exported entries.
//!
//! Each test writes a JSONL export into a temp directory and points `HOME`
//! there so no user config leaks in.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

fn tally_binary() -> String {
    env!("CARGO_BIN_EXE_tally").to_string()
}

const EXPORT: &str = r#"{"id":"e1","description":"Gym 🔁 {p1:00}","project":"Health","tags":["body"],"start":"2025-03-03T07:00:00Z","duration":"PT50M"}
{"id":"e2","description":"Gym 🔁 {p1:00}","project":"Health","tags":["body"],"start":"2025-03-04T07:00:00Z","duration":"PT1H15M"}
{"id":"e3","description":"Write docs {p1:00}","project":"Work","tags":["docs"],"subProject":"Backend","start":"2025-03-03T10:00:00Z","duration":"PT1H"}
{"id":"e4","description":"Write docs {p1:00}","project":"Work","tags":["docs"],"subProject":"Backend","start":"2025-03-05T10:00:00Z","duration":"PT1H"}
{"id":"e5","description":"Inbox 🎲","project":"Work","start":"2025-03-05T15:00:00Z","duration":"PT30M"}
{"id":"e6","description":"Broken","project":"Work","start":"2025-03-05T16:00:00Z","duration":"soon"}
"#;

fn write_export(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("entries.jsonl");
    std::fs::write(&path, EXPORT).unwrap();
    path
}

fn tally(home: &Path, args: &[&str]) -> Output {
    Command::new(tally_binary())
        .env("HOME", home)
        .env_remove("XDG_CONFIG_HOME")
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("failed to run tally")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    assert!(
        output.status.success(),
        "tally should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

fn bucket<'a>(report: &'a serde_json::Value, dimension: &str, key: &str) -> &'a serde_json::Value {
    report["dimensions"]
        .as_array()
        .unwrap()
        .iter()
        .find(|d| d["dimension"] == dimension)
        .and_then(|d| d["buckets"].as_array().unwrap().iter().find(|b| b["key"] == key))
        .unwrap_or_else(|| panic!("no {dimension}/{key} bucket"))
}

/// Week report: recurring plans count per day, one-off plans once per range.
#[test]
fn test_week_report_json() {
    let temp = TempDir::new().unwrap();
    let input = write_export(temp.path());

    let output = tally(
        temp.path(),
        &[
            "report",
            "--input",
            input.to_str().unwrap(),
            "--mode",
            "week",
            "--start",
            "2025-03-05",
            "--json",
        ],
    );
    let report = stdout_json(&output);

    assert_eq!(report["start"], "2025-03-03");
    assert_eq!(report["end"], "2025-03-09");
    assert_eq!(report["skipped"], 1);
    assert_eq!(report["entry_count"], 5);

    let overall = bucket(&report, "overall", "all");
    // 50 + 75 + 60 + 60 + 30 minutes
    assert_eq!(overall["total_measured_secs"], 275 * 60);
    // gym twice, docs once
    assert_eq!(overall["total_planned_secs"], 180 * 60);
    assert_eq!(overall["over_plan_secs"], (15 + 60) * 60);
    assert_eq!(overall["under_plan_secs"], 10 * 60);

    let health = bucket(&report, "project", "Health");
    assert_eq!(health["over_plan_secs"], 15 * 60);
    assert_eq!(health["under_plan_secs"], 10 * 60);

    let backend = bucket(&report, "sub_project", "Backend");
    assert_eq!(backend["parent"], "Work");
    assert_eq!(backend["unit_count"], 1);

    let spontaneous = bucket(&report, "spontaneity", "spontaneous");
    assert_eq!(spontaneous["has_planned_data"], false);
    assert_eq!(spontaneous["meas_exceeds_plan_pct"], 0.0);
}

/// Breakdown of a week yields one sub-report per day.
#[test]
fn test_week_breakdown_json() {
    let temp = TempDir::new().unwrap();
    let input = write_export(temp.path());

    let output = tally(
        temp.path(),
        &[
            "report",
            "--input",
            input.to_str().unwrap(),
            "--mode",
            "week",
            "--start",
            "2025-03-05",
            "--breakdown",
            "--dimensions",
            "overall",
            "--json",
        ],
    );
    let report = stdout_json(&output);

    let periods = report["periods"].as_array().unwrap();
    assert_eq!(periods.len(), 7);
    let measured: i64 = periods
        .iter()
        .map(|p| bucket(p, "overall", "all")["total_measured_secs"].as_i64().unwrap())
        .sum();
    assert_eq!(measured, 275 * 60);
}

/// Config file sets the week start; the flag overrides it.
#[test]
fn test_week_start_from_config_and_flag() {
    let temp = TempDir::new().unwrap();
    let input = write_export(temp.path());
    let config = temp.path().join("tally.toml");
    std::fs::write(&config, "week_start = 6\n").unwrap();

    let base = [
        "--config",
        config.to_str().unwrap(),
        "report",
        "--input",
        input.to_str().unwrap(),
        "--mode",
        "week",
        "--start",
        "2025-03-05",
        "--json",
    ];

    let report = stdout_json(&tally(temp.path(), &base));
    assert_eq!(report["start"], "2025-03-02");

    let mut with_flag = base.to_vec();
    with_flag.extend(["--week-start", "2"]);
    let report = stdout_json(&tally(temp.path(), &with_flag));
    assert_eq!(report["start"], "2025-03-05");
}

/// A plan typed on the first entry of the day covers later bare entries.
#[test]
fn test_plan_typed_once_covers_the_day() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("entries.jsonl");
    std::fs::write(
        &input,
        concat!(
            r#"{"description":"Gym 🔁 {p2:00}","project":"Health","start":"2025-03-04T07:00:00Z","duration":"PT1H"}"#,
            "\n",
            r#"{"description":"Gym 🔁","project":"Health","start":"2025-03-04T18:00:00Z","duration":"PT40M"}"#,
            "\n",
        ),
    )
    .unwrap();

    let output = tally(
        temp.path(),
        &[
            "report",
            "--input",
            input.to_str().unwrap(),
            "--start",
            "2025-03-04",
            "--dimensions",
            "overall",
            "--json",
        ],
    );
    let report = stdout_json(&output);

    let overall = bucket(&report, "overall", "all");
    assert_eq!(overall["unit_count"], 1);
    assert_eq!(overall["total_planned_secs"], 120 * 60);
    assert_eq!(overall["under_plan_secs"], 20 * 60);
}

/// Text output goes to stdout and mentions excluded time.
#[test]
fn test_range_report_text() {
    let temp = TempDir::new().unwrap();
    let input = write_export(temp.path());

    let output = tally(
        temp.path(),
        &[
            "report",
            "--input",
            input.to_str().unwrap(),
            "--start",
            "2025-03-03",
            "--end",
            "2025-03-05",
        ],
    );
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("DEVIATION REPORT: 2025-03-03 to 2025-03-05\n"));
    assert!(stdout.contains("Skipped: 1 (unreadable duration)"));
    assert!(stdout.contains("0:30 excluded from deviation calculations"));
    assert!(stdout.contains("BY SUB-PROJECT"));
}

/// Entries can be piped in on stdin.
#[test]
fn test_entries_from_stdin() {
    let temp = TempDir::new().unwrap();

    let mut child = Command::new(tally_binary())
        .env("HOME", temp.path())
        .env_remove("XDG_CONFIG_HOME")
        .args(["entries", "--start", "2025-03-04", "--json"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(EXPORT.as_bytes())
        .unwrap();
    let output = child.wait_with_output().unwrap();

    let entries = stdout_json(&output);
    let ids: Vec<_> = entries
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["e2", "e4", "e5"]);
}

/// Invalid input fails with the offending line number.
#[test]
fn test_bad_input_reports_line() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("entries.jsonl");
    std::fs::write(
        &input,
        "{\"description\":\"A\",\"start\":\"2025-03-03T09:00:00Z\"}\nnot json\n",
    )
    .unwrap();

    let output = tally(temp.path(), &["report", "--input", input.to_str().unwrap()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid JSON on line 2"), "stderr: {stderr}");
}

/// Out-of-range week start is rejected.
#[test]
fn test_invalid_week_start() {
    let temp = TempDir::new().unwrap();
    let input = write_export(temp.path());

    let output = tally(
        temp.path(),
        &[
            "report",
            "--input",
            input.to_str().unwrap(),
            "--week-start",
            "9",
        ],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("week start must be between 0 (Monday) and 6 (Sunday)"));
}
