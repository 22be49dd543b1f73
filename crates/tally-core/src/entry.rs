//! Raw time entries and their normalized form.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::duration::{
    FormatError, parse_iso_duration, parse_planned_annotation, strip_planned_annotation,
};
use crate::types::Spontaneity;

/// Description used when an entry has none.
pub const NO_DESCRIPTION: &str = "No description";

/// Project name used when an entry has none.
pub const NO_PROJECT: &str = "No project";

/// A time entry as delivered by the tracker export, names already resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEntry {
    /// Tracker-side identifier, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Free-text task name. May carry markers and a `{pH:MM}` annotation.
    #[serde(default)]
    pub description: Option<String>,

    /// Project name.
    #[serde(default)]
    pub project: Option<String>,

    /// Tag names. Duplicates are tolerated.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Sub-project (tracker task) name. Absent is distinct from empty.
    #[serde(default, alias = "subProject", alias = "task")]
    pub sub_project: Option<String>,

    /// When the entry started.
    pub start: DateTime<Utc>,

    /// Measured duration in ISO-8601 form (`PT1H30M`). Absent means zero.
    #[serde(default)]
    pub duration: Option<String>,
}

/// Glyphs recognised in task descriptions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Markers {
    /// Marks a task that repeats daily.
    pub recurring: String,
    /// Marks a task picked up on the spot.
    pub spontaneous: String,
    /// Marks a task that was scheduled ahead.
    pub scheduled: String,
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            recurring: "🔁".to_string(),
            spontaneous: "🎲".to_string(),
            // Without the variation selector so both "🗓" and "🗓️" match
            scheduled: "🗓".to_string(),
        }
    }
}

/// A normalized time entry. Never mutated after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeEntry {
    pub id: Option<String>,
    /// Task name as typed, markers and annotation included.
    pub description: String,
    /// Task name without its `{pH:MM}` annotation. Entries of one task share it.
    pub task: String,
    pub project: String,
    pub tags: BTreeSet<String>,
    pub sub_project: Option<String>,
    pub start: DateTime<Utc>,
    pub measured: Duration,
    /// Planned duration from a well-formed `{pH:MM}` annotation.
    pub planned: Option<Duration>,
    pub is_recurring: bool,
    pub spontaneity: Spontaneity,
}

impl TimeEntry {
    /// Calendar day (UTC) the entry started on.
    pub fn day(&self) -> NaiveDate {
        self.start.date_naive()
    }

    /// Measured minus planned, if the entry carries a plan.
    pub fn plan_delta(&self) -> Option<Duration> {
        self.planned.map(|planned| self.measured - planned)
    }
}

/// Result of normalizing a batch of raw entries.
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    /// Successfully normalized entries, sorted by start time.
    pub entries: Vec<TimeEntry>,
    /// Number of entries dropped because their duration could not be parsed.
    pub skipped: usize,
}

/// Converts raw entries into [`TimeEntry`] values.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    markers: Markers,
}

impl Normalizer {
    pub const fn new(markers: Markers) -> Self {
        Self { markers }
    }

    /// Normalizes one entry.
    ///
    /// Fails only when the measured duration is malformed; a malformed or
    /// ambiguous planned annotation just leaves `planned` empty.
    pub fn normalize(&self, raw: &RawEntry) -> Result<TimeEntry, FormatError> {
        let measured = parse_iso_duration(raw.duration.as_deref().unwrap_or_default())?;

        let description = non_blank(raw.description.as_deref())
            .unwrap_or(NO_DESCRIPTION)
            .to_string();
        let project = non_blank(raw.project.as_deref())
            .unwrap_or(NO_PROJECT)
            .to_string();

        let planned = parse_planned_annotation(&description);
        let task = strip_planned_annotation(&description);
        let is_recurring = contains_marker(&description, &self.markers.recurring);
        let spontaneity = if contains_marker(&description, &self.markers.spontaneous) {
            Spontaneity::Spontaneous
        } else if contains_marker(&description, &self.markers.scheduled) {
            Spontaneity::Scheduled
        } else {
            Spontaneity::Unmarked
        };

        Ok(TimeEntry {
            id: raw.id.clone(),
            description,
            task,
            project,
            tags: raw.tags.iter().cloned().collect(),
            sub_project: raw.sub_project.clone(),
            start: raw.start,
            measured,
            planned,
            is_recurring,
            spontaneity,
        })
    }

    /// Normalizes a batch, skipping (and counting) entries that fail.
    pub fn normalize_all(&self, raw: &[RawEntry]) -> Normalized {
        let mut normalized = Normalized::default();
        for entry in raw {
            match self.normalize(entry) {
                Ok(entry) => normalized.entries.push(entry),
                Err(e) => {
                    tracing::warn!(
                        id = ?entry.id,
                        start = %entry.start,
                        error = %e,
                        "skipping entry"
                    );
                    normalized.skipped += 1;
                }
            }
        }
        normalized.entries.sort_by_key(|e| e.start);
        normalized
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn contains_marker(description: &str, marker: &str) -> bool {
    !marker.is_empty() && description.contains(marker)
}
