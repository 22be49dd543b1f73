//! Duration parsing and formatting.
//!
//! Three textual forms are handled here:
//! - ISO-8601 durations as exported by time trackers (`PT1H30M`)
//! - the planned-time annotation users type into task names (`{p1:30}`)
//! - clock-style totals used in reports (`1:30`, `1:30:15`)

use std::sync::LazyLock;

use chrono::Duration;
use regex::Regex;
use thiserror::Error;

/// Pre-compiled regex for ISO-8601 durations (days and time components).
static ISO_DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^P(?:([0-9]+)D)?(?:T(?:([0-9]+)H)?(?:([0-9]+)M)?(?:([0-9]+)S)?)?$").unwrap()
});

/// Pre-compiled regex for planned annotations. Minutes are exactly two digits.
static PLANNED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{p([0-9]+):([0-9]{2})\}").unwrap());

/// Pre-compiled regex for `H:MM` / `H:MM:SS` totals.
static CLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(-)?([0-9]+):([0-5][0-9])(?::([0-5][0-9]))?$").unwrap());

const SECONDS_PER_MINUTE: i64 = 60;
const SECONDS_PER_HOUR: i64 = 3_600;
const SECONDS_PER_DAY: i64 = 86_400;

/// Errors from parsing duration text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// Text is not an ISO-8601 duration.
    #[error("invalid ISO-8601 duration: {text:?}")]
    IsoDuration { text: String },

    /// Text is not an `H:MM` or `H:MM:SS` duration.
    #[error("invalid clock duration: {text:?}")]
    ClockDuration { text: String },

    /// Components are well-formed but the total does not fit.
    #[error("duration out of range: {text:?}")]
    Overflow { text: String },
}

/// Sums `value * unit` for each present capture, failing on overflow.
fn sum_components(parts: &[(Option<&str>, i64)]) -> Option<i64> {
    parts.iter().try_fold(0_i64, |total, (digits, unit)| {
        let Some(digits) = digits else {
            return Some(total);
        };
        let value: i64 = digits.parse().ok()?;
        total.checked_add(value.checked_mul(*unit)?)
    })
}

/// Parses an ISO-8601 duration such as `PT1H30M` or `P1DT2H`.
///
/// Empty or whitespace-only text (a running timer, a missing field) is zero.
pub fn parse_iso_duration(text: &str) -> Result<Duration, FormatError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Duration::zero());
    }

    let malformed = || FormatError::IsoDuration {
        text: text.to_string(),
    };
    let caps = ISO_DURATION_RE.captures(trimmed).ok_or_else(malformed)?;

    let components = [
        (caps.get(1).map(|m| m.as_str()), SECONDS_PER_DAY),
        (caps.get(2).map(|m| m.as_str()), SECONDS_PER_HOUR),
        (caps.get(3).map(|m| m.as_str()), SECONDS_PER_MINUTE),
        (caps.get(4).map(|m| m.as_str()), 1),
    ];
    // "P", "PT" and "P1DT" match the pattern but carry no (or a dangling) component
    if components.iter().all(|(digits, _)| digits.is_none()) || trimmed.ends_with('T') {
        return Err(malformed());
    }

    let overflow = || FormatError::Overflow {
        text: text.to_string(),
    };
    let seconds = sum_components(&components).ok_or_else(overflow)?;
    Duration::try_seconds(seconds).ok_or_else(overflow)
}

/// Formats a duration in canonical ISO-8601 form (`PT1H30M`, `PT0S`).
///
/// Days are folded into hours and zero components are omitted, so
/// `format_iso_duration(parse_iso_duration(x)?) == x` for canonical `x`.
/// Measured durations are never negative; a negative input is rendered with
/// a leading `-` that [`parse_iso_duration`] does not accept.
pub fn format_iso_duration(duration: Duration) -> String {
    let total = duration.num_seconds();
    if total == 0 {
        return "PT0S".to_string();
    }

    let sign = if total < 0 { "-" } else { "" };
    let abs = total.unsigned_abs();
    let hours = abs / 3_600;
    let minutes = (abs % 3_600) / 60;
    let seconds = abs % 60;

    let body: String = [(hours, 'H'), (minutes, 'M'), (seconds, 'S')]
        .iter()
        .filter(|(value, _)| *value > 0)
        .map(|(value, unit)| format!("{value}{unit}"))
        .collect();
    format!("{sign}PT{body}")
}

/// Extracts the planned duration from a `{pH:MM}` annotation in a task name.
///
/// Returns `None` when there is no annotation, when any annotation has
/// minutes outside `00..=59` or hours too large to represent, and when
/// several annotations disagree. Repeating the same annotation is fine.
pub fn parse_planned_annotation(description: &str) -> Option<Duration> {
    let mut planned: Option<i64> = None;

    for caps in PLANNED_RE.captures_iter(description) {
        let hours: i64 = caps[1].parse().ok()?;
        let minutes: i64 = caps[2].parse().ok()?;
        if minutes > 59 {
            return None;
        }
        let seconds = hours
            .checked_mul(SECONDS_PER_HOUR)?
            .checked_add(minutes * SECONDS_PER_MINUTE)?;

        match planned {
            Some(existing) if existing != seconds => return None,
            _ => planned = Some(seconds),
        }
    }

    planned.and_then(Duration::try_seconds)
}

/// Removes every `{pH:MM}` token from a task name and collapses the
/// whitespace left behind.
///
/// `"Gym 🔁 {p2:00}"` and `"Gym 🔁"` name the same task.
pub fn strip_planned_annotation(description: &str) -> String {
    PLANNED_RE
        .replace_all(description, " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Formats a duration as `H:MM`, or `H:MM:SS` when there are leftover seconds.
///
/// Negative durations (plan deltas) get a leading `-`.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.num_seconds();
    let sign = if total < 0 { "-" } else { "" };
    let abs = total.unsigned_abs();
    let hours = abs / 3_600;
    let minutes = (abs % 3_600) / 60;
    let seconds = abs % 60;

    if seconds == 0 {
        format!("{sign}{hours}:{minutes:02}")
    } else {
        format!("{sign}{hours}:{minutes:02}:{seconds:02}")
    }
}

/// Parses the output of [`format_duration`] back into a duration.
pub fn parse_clock_duration(text: &str) -> Result<Duration, FormatError> {
    let caps = CLOCK_RE
        .captures(text.trim())
        .ok_or_else(|| FormatError::ClockDuration {
            text: text.to_string(),
        })?;

    let components = [
        (caps.get(2).map(|m| m.as_str()), SECONDS_PER_HOUR),
        (caps.get(3).map(|m| m.as_str()), SECONDS_PER_MINUTE),
        (caps.get(4).map(|m| m.as_str()), 1),
    ];
    let overflow = || FormatError::Overflow {
        text: text.to_string(),
    };
    let seconds = sum_components(&components).ok_or_else(overflow)?;
    let seconds = if caps.get(1).is_some() { -seconds } else { seconds };
    Duration::try_seconds(seconds).ok_or_else(overflow)
}
