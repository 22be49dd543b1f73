//! Report periods and their breakdown into sub-periods.
//!
//! Ranges are half-open sets of UTC calendar days: `[start, end)`. An entry
//! belongs to a range when the UTC day of its start does.

use std::fmt;

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, Utc};
use serde::Serialize;

use crate::types::{ValidationError, WeekStart};

/// A half-open range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Creates `[start, end)`. An empty range (`start == end`) is allowed.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ValidationError> {
        if end < start {
            return Err(ValidationError::InvertedRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// Creates the range covering `first..=last`.
    pub fn inclusive(first: NaiveDate, last: NaiveDate) -> Result<Self, ValidationError> {
        if last < first {
            return Err(ValidationError::InvertedRange {
                start: first.to_string(),
                end: last.to_string(),
            });
        }
        Ok(Self {
            start: first,
            end: add_days(last, 1),
        })
    }

    /// A single day.
    pub fn day(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: add_days(day, 1),
        }
    }

    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    /// First day after the range.
    pub const fn end(&self) -> NaiveDate {
        self.end
    }

    /// Last day inside the range, or `None` for an empty range.
    pub fn last_day(&self) -> Option<NaiveDate> {
        (self.end > self.start).then(|| self.end.pred_opt()).flatten()
    }

    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    pub fn contains_day(&self, day: NaiveDate) -> bool {
        self.start <= day && day < self.end
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.contains_day(instant.date_naive())
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.last_day() {
            Some(last) if last == self.start => write!(f, "{}", self.start),
            Some(last) => write!(f, "{} to {last}", self.start),
            None => write!(f, "{} (empty)", self.start),
        }
    }
}

/// The period a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    /// An explicit range, broken down per day.
    Range(DateRange),
    /// The week containing the reference date, broken down per day.
    Week(NaiveDate),
    /// The calendar month containing the reference date, broken down per week.
    Month(NaiveDate),
    /// The calendar year containing the reference date, broken down per month.
    Year(NaiveDate),
}

impl Period {
    /// The whole range covered by this period.
    pub fn range(&self, week_start: WeekStart) -> DateRange {
        match *self {
            Self::Range(range) => range,
            Self::Week(reference) => week_range(reference, week_start),
            Self::Month(reference) => month_range(reference),
            Self::Year(reference) => year_range(reference),
        }
    }

    /// Sub-ranges partitioning [`Period::range`], in order.
    pub fn breakdown(&self, week_start: WeekStart) -> Vec<DateRange> {
        let range = self.range(week_start);
        match self {
            Self::Range(_) | Self::Week(_) => split_days(range),
            Self::Month(_) => split_weeks(range, week_start),
            Self::Year(_) => split_months(range),
        }
    }
}

fn add_days(day: NaiveDate, days: u64) -> NaiveDate {
    day.checked_add_days(Days::new(days))
        .unwrap_or(NaiveDate::MAX)
}

/// Days since the most recent week start (0..=6).
fn days_into_week(day: NaiveDate, week_start: WeekStart) -> u64 {
    let weekday = day.weekday().num_days_from_monday();
    u64::from((weekday + 7 - week_start.days_from_monday()) % 7)
}

/// The 7-day range starting on `week_start` that contains `reference`.
pub fn week_range(reference: NaiveDate, week_start: WeekStart) -> DateRange {
    let offset = days_into_week(reference, week_start);
    let start = reference
        .checked_sub_days(Days::new(offset))
        .unwrap_or(NaiveDate::MIN);
    DateRange {
        start,
        end: add_days(start, 7),
    }
}

/// The calendar month containing `reference`.
pub fn month_range(reference: NaiveDate) -> DateRange {
    let start = reference.with_day(1).unwrap_or(reference);
    let end = start
        .checked_add_months(Months::new(1))
        .unwrap_or(NaiveDate::MAX);
    DateRange { start, end }
}

/// January 1 through December 31 of the year containing `reference`.
pub fn year_range(reference: NaiveDate) -> DateRange {
    let start = NaiveDate::from_ymd_opt(reference.year(), 1, 1).unwrap_or(reference);
    let end = NaiveDate::from_ymd_opt(reference.year() + 1, 1, 1).unwrap_or(NaiveDate::MAX);
    DateRange { start, end }
}

fn split_by(range: DateRange, next_boundary: impl Fn(NaiveDate) -> NaiveDate) -> Vec<DateRange> {
    let mut parts = Vec::new();
    let mut cursor = range.start;
    while cursor < range.end {
        let next = next_boundary(cursor).min(range.end);
        if next <= cursor {
            break;
        }
        parts.push(DateRange {
            start: cursor,
            end: next,
        });
        cursor = next;
    }
    parts
}

/// One range per day.
pub fn split_days(range: DateRange) -> Vec<DateRange> {
    split_by(range, |day| add_days(day, 1))
}

/// One range per week aligned to `week_start`, clipped to `range`.
pub fn split_weeks(range: DateRange, week_start: WeekStart) -> Vec<DateRange> {
    split_by(range, |day| add_days(day, 7 - days_into_week(day, week_start)))
}

/// One range per calendar month, clipped to `range`.
pub fn split_months(range: DateRange) -> Vec<DateRange> {
    split_by(range, |day| month_range(day).end)
}
