//! Entries command: normalized entries with their plans.
//!
//! Lists every entry in a date window with measured time, the planned time
//! from its `{pH:MM}` annotation, and the difference between the two.

use std::fmt::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, Utc};
use clap::Args;
use serde::Serialize;
use tally_core::{Normalizer, Spontaneity, TimeEntry, format_duration};

use crate::Config;
use crate::commands::input::read_entries;
use crate::commands::util::parse_date;

#[derive(Debug, Args)]
pub struct EntriesArgs {
    /// Entries file (JSON lines or a JSON array); reads stdin when omitted or `-`.
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Only entries starting on or after this day.
    #[arg(long)]
    pub start: Option<String>,

    /// Only entries starting on or before this day.
    #[arg(long)]
    pub end: Option<String>,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Keeps entries whose UTC start day lies within `[first, last]`.
pub fn filter_days(
    entries: Vec<TimeEntry>,
    first: Option<NaiveDate>,
    last: Option<NaiveDate>,
) -> Vec<TimeEntry> {
    entries
        .into_iter()
        .filter(|e| first.is_none_or(|first| e.day() >= first))
        .filter(|e| last.is_none_or(|last| e.day() <= last))
        .collect()
}

fn task_label(entry: &TimeEntry) -> String {
    match entry.sub_project.as_deref() {
        Some(sub) if !sub.is_empty() => {
            format!("[{} / {sub}] {}", entry.project, entry.description)
        }
        _ => format!("[{}] {}", entry.project, entry.description),
    }
}

/// Formats the entry listing.
pub fn format_entries(entries: &[TimeEntry]) -> String {
    let mut output = String::new();

    if entries.is_empty() {
        writeln!(output, "No entries in range.").unwrap();
        return output;
    }

    writeln!(
        output,
        "{:<16}  {:>8} {:>8} {:>8}  task",
        "start", "measured", "planned", "diff"
    )
    .unwrap();

    for entry in entries {
        let planned = entry.planned.map_or_else(|| "-".to_string(), format_duration);
        let diff = entry
            .plan_delta()
            .map_or_else(|| "-".to_string(), format_duration);
        writeln!(
            output,
            "{:<16}  {:>8} {planned:>8} {diff:>8}  {}",
            entry.start.format("%Y-%m-%d %H:%M"),
            format_duration(entry.measured),
            task_label(entry),
        )
        .unwrap();
    }

    let total = entries
        .iter()
        .fold(Duration::zero(), |total, e| total + e.measured);
    let with_plan = entries.iter().filter(|e| e.planned.is_some()).count();
    writeln!(output).unwrap();
    writeln!(
        output,
        "{} entries, {} measured, {with_plan} with a plan",
        entries.len(),
        format_duration(total)
    )
    .unwrap();

    output
}

// ========== JSON Output ==========

#[derive(Debug, Serialize)]
pub struct JsonEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub start: String,
    pub description: String,
    pub project: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_project: Option<String>,
    pub tags: Vec<String>,
    pub measured_secs: i64,
    pub planned_secs: Option<i64>,
    pub diff_secs: Option<i64>,
    pub recurring: bool,
    pub spontaneity: Spontaneity,
}

impl From<&TimeEntry> for JsonEntry {
    fn from(entry: &TimeEntry) -> Self {
        Self {
            id: entry.id.clone(),
            start: entry.start.to_rfc3339(),
            description: entry.description.clone(),
            project: entry.project.clone(),
            sub_project: entry.sub_project.clone(),
            tags: entry.tags.iter().cloned().collect(),
            measured_secs: entry.measured.num_seconds(),
            planned_secs: entry.planned.map(|p| p.num_seconds()),
            diff_secs: entry.plan_delta().map(|d| d.num_seconds()),
            recurring: entry.is_recurring,
            spontaneity: entry.spontaneity,
        }
    }
}

/// Formats entries as JSON.
pub fn format_entries_json(entries: &[TimeEntry]) -> Result<String> {
    let json: Vec<JsonEntry> = entries.iter().map(JsonEntry::from).collect();
    Ok(serde_json::to_string_pretty(&json)?)
}

/// Runs the entries command.
pub fn run(args: &EntriesArgs, config: &Config) -> Result<()> {
    let today = Utc::now().date_naive();
    let first = args
        .start
        .as_deref()
        .map(|s| parse_date(s, today))
        .transpose()
        .context("invalid --start")?;
    let last = args
        .end
        .as_deref()
        .map(|s| parse_date(s, today))
        .transpose()
        .context("invalid --end")?;

    let raw = read_entries(args.input.as_deref())?;
    let normalized = Normalizer::new(config.markers.clone()).normalize_all(&raw);
    if normalized.skipped > 0 {
        tracing::warn!(skipped = normalized.skipped, "some entries had unreadable durations");
    }
    let entries = filter_days(normalized.entries, first, last);

    if args.json {
        let output = format_entries_json(&entries)?;
        println!("{output}");
    } else {
        let output = format_entries(&entries);
        print!("{output}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use insta::assert_snapshot;
    use tally_core::RawEntry;

    fn make_entry(
        description: &str,
        project: &str,
        (day, hour): (u32, u32),
        duration: &str,
    ) -> RawEntry {
        RawEntry {
            id: None,
            description: Some(description.to_string()),
            project: Some(project.to_string()),
            tags: vec![],
            sub_project: None,
            start: Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0).unwrap(),
            duration: Some(duration.to_string()),
        }
    }

    fn sample_entries() -> Vec<TimeEntry> {
        let mut docs = make_entry("Write docs {p2:00}", "Work", (3, 10), "PT2H30M");
        docs.sub_project = Some("Backend".to_string());
        let raw = vec![
            make_entry("Inbox 🎲", "Admin", (5, 16), "PT35M"),
            make_entry("Standup 🔁 {p0:15}", "Work", (4, 9), "PT10M"),
            docs,
            make_entry("Standup 🔁 {p0:15}", "Work", (3, 9), "PT20M"),
        ];
        Normalizer::default().normalize_all(&raw).entries
    }

    #[test]
    fn test_entries_text_output() {
        let output = format_entries(&sample_entries());
        assert_snapshot!(output, @r"
        start             measured  planned     diff  task
        2025-03-03 09:00      0:20     0:15     0:05  [Work] Standup 🔁 {p0:15}
        2025-03-03 10:00      2:30     2:00     0:30  [Work / Backend] Write docs {p2:00}
        2025-03-04 09:00      0:10     0:15    -0:05  [Work] Standup 🔁 {p0:15}
        2025-03-05 16:00      0:35        -        -  [Admin] Inbox 🎲

        4 entries, 3:35 measured, 3 with a plan
        ");
    }

    #[test]
    fn test_entries_empty() {
        assert_eq!(format_entries(&[]), "No entries in range.\n");
    }

    #[test]
    fn test_filter_days_is_inclusive() {
        let day = |d| NaiveDate::from_ymd_opt(2025, 3, d).unwrap();
        let entries = filter_days(sample_entries(), Some(day(4)), Some(day(5)));
        assert_eq!(entries.len(), 2);

        let entries = filter_days(sample_entries(), None, Some(day(3)));
        assert_eq!(entries.len(), 2);

        assert_eq!(filter_days(sample_entries(), None, None).len(), 4);
    }

    #[test]
    fn test_entries_json_output() {
        let json = format_entries_json(&sample_entries()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        let first = &value[0];
        assert_eq!(first["measured_secs"], 1200);
        assert_eq!(first["planned_secs"], 900);
        assert_eq!(first["diff_secs"], 300);
        assert_eq!(first["recurring"], true);

        let inbox = &value[3];
        assert_eq!(inbox["planned_secs"], serde_json::Value::Null);
        assert_eq!(inbox["spontaneity"], "spontaneous");
    }
}
