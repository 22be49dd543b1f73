//! Deviation engine for planned-vs-measured time reports.
//!
//! This crate turns raw time-tracker entries into per-dimension totals:
//! - Duration codec: ISO-8601 durations, `{pH:MM}` planned annotations, `H:MM` totals
//! - Grouping: recurring tasks per day, one-off tasks across the whole range
//! - Aggregation: over/under-plan sums per project, sub-project, tag and spontaneity
//! - Periods: week, month and year ranges and their breakdown into sub-periods

pub mod deviation;
pub mod duration;
pub mod entry;
pub mod grouping;
pub mod period;
pub mod report;
pub mod types;

pub use deviation::{DeviationPercentages, DimensionBucket, aggregate, apportion};
pub use duration::{
    FormatError, format_duration, format_iso_duration, parse_clock_duration, parse_iso_duration,
    parse_planned_annotation, strip_planned_annotation,
};
pub use entry::{Markers, NO_DESCRIPTION, NO_PROJECT, Normalized, Normalizer, RawEntry, TimeEntry};
pub use grouping::{
    ContributionUnit, GroupingStrategy, OVERALL_KEY, PerDayOccurrence, TaskIdentity, UnitKind,
    WholeRange, build_units,
};
pub use period::{DateRange, Period, month_range, week_range, year_range};
pub use report::{BreakdownReport, DimensionReport, Report, ReportRequest, build_report, run_report};
pub use types::{BucketKey, Dimension, Spontaneity, ValidationError, WeekStart};
