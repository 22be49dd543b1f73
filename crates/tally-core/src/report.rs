//! Report assembly: every requested dimension over a range, optionally
//! repeated for each sub-period of a breakdown.

use chrono::Duration;
use rayon::prelude::*;

use crate::deviation::{DimensionBucket, aggregate};
use crate::entry::{Normalizer, RawEntry, TimeEntry};
use crate::grouping::{OVERALL_KEY, select};
use crate::period::{DateRange, Period};
use crate::types::{Dimension, WeekStart};

/// Buckets of one dimension, sorted by key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionReport {
    pub dimension: Dimension,
    pub buckets: Vec<DimensionBucket>,
}

impl DimensionReport {
    /// Looks up a bucket by name (ignoring any parent).
    pub fn bucket(&self, name: &str) -> Option<&DimensionBucket> {
        self.buckets.iter().find(|b| b.key.name == name)
    }
}

/// All requested dimensions aggregated over one range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub range: DateRange,
    /// Entries whose start falls inside the range.
    pub entry_count: usize,
    /// Measured time of those entries.
    pub total_measured: Duration,
    pub dimensions: Vec<DimensionReport>,
}

impl Report {
    pub fn dimension(&self, dimension: Dimension) -> Option<&DimensionReport> {
        self.dimensions.iter().find(|d| d.dimension == dimension)
    }

    /// The single overall bucket, when the overall dimension was requested.
    pub fn overall(&self) -> Option<&DimensionBucket> {
        self.dimension(Dimension::Overall)?.bucket(OVERALL_KEY)
    }

    /// A bucket's measured time as a percentage of the whole range.
    #[allow(clippy::cast_precision_loss)]
    pub fn share_pct(&self, bucket: &DimensionBucket) -> f64 {
        if self.total_measured.is_zero() {
            return 0.0;
        }
        bucket.total_measured.num_seconds() as f64 / self.total_measured.num_seconds() as f64
            * 100.0
    }
}

/// Aggregates each dimension over `range`, one dimension per rayon task.
pub fn build_report(entries: &[TimeEntry], range: DateRange, dimensions: &[Dimension]) -> Report {
    let dimensions = dimensions
        .par_iter()
        .map(|&dimension| DimensionReport {
            dimension,
            buckets: aggregate(entries, &range, dimension),
        })
        .collect();

    let selected = select(entries, &range);
    Report {
        range,
        entry_count: selected.len(),
        total_measured: selected
            .iter()
            .fold(Duration::zero(), |total, e| total + e.measured),
        dimensions,
    }
}

/// What to report on.
#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub period: Period,
    pub dimensions: Vec<Dimension>,
    /// Also report each sub-period of [`Period::breakdown`].
    pub breakdown: bool,
    pub week_start: WeekStart,
}

/// The whole-period report plus an optional per-sub-period breakdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakdownReport {
    /// Raw entries dropped because their duration could not be parsed.
    pub skipped: usize,
    pub whole: Report,
    /// Empty unless a breakdown was requested.
    pub periods: Vec<Report>,
}

/// Normalizes raw entries and builds the requested report.
pub fn run_report(
    normalizer: &Normalizer,
    raw: &[RawEntry],
    request: &ReportRequest,
) -> BreakdownReport {
    let normalized = normalizer.normalize_all(raw);
    let range = request.period.range(request.week_start);
    tracing::debug!(
        %range,
        entries = normalized.entries.len(),
        skipped = normalized.skipped,
        breakdown = request.breakdown,
        "building report"
    );

    let whole = build_report(&normalized.entries, range, &request.dimensions);
    let periods = if request.breakdown {
        request
            .period
            .breakdown(request.week_start)
            .into_iter()
            .map(|sub| build_report(&normalized.entries, sub, &request.dimensions))
            .collect()
    } else {
        Vec::new()
    };

    BreakdownReport {
        skipped: normalized.skipped,
        whole,
        periods,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use std::collections::BTreeMap;

    fn raw(description: &str, tags: &[&str], (day, hour): (u32, u32), duration: &str) -> RawEntry {
        RawEntry {
            id: None,
            description: Some(description.to_string()),
            project: Some("Work".to_string()),
            tags: tags.iter().map(ToString::to_string).collect(),
            sub_project: None,
            start: Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0).unwrap(),
            duration: Some(duration.to_string()),
        }
    }

    fn sample() -> Vec<RawEntry> {
        let mut entries = vec![
            raw("Standup 🔁 {p0:15}", &["team"], (3, 9), "PT20M"),
            raw("Standup 🔁 {p0:15}", &["team"], (4, 9), "PT10M"),
            raw("Design review {p3:00}", &["docs", "team"], (3, 10), "PT2H10M"),
            raw("Design review {p3:00}", &["docs"], (12, 10), "PT1H25M"),
            raw("Inbox 🎲", &[], (5, 16), "PT35M"),
            raw("Roadmap 🗓️ {p1:00}", &["planning"], (18, 14), "PT50M"),
            raw("Broken", &[], (6, 8), "ninety minutes"),
        ];
        entries[2].sub_project = Some("Backend".to_string());
        entries[3].sub_project = Some("Backend".to_string());
        entries
    }

    fn month_request(breakdown: bool) -> ReportRequest {
        ReportRequest {
            period: Period::Month(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()),
            dimensions: Dimension::ALL.to_vec(),
            breakdown,
            week_start: WeekStart::MONDAY,
        }
    }

    #[test]
    fn run_report_counts_skipped_entries() {
        let report = run_report(&Normalizer::default(), &sample(), &month_request(false));

        assert_eq!(report.skipped, 1);
        assert_eq!(report.whole.entry_count, 6);
        assert!(report.periods.is_empty());
        assert_eq!(report.whole.dimensions.len(), Dimension::ALL.len());
    }

    #[test]
    fn overall_totals() {
        let report = run_report(&Normalizer::default(), &sample(), &month_request(false));
        let overall = report.whole.overall().unwrap();

        // 20 + 10 + 130 + 85 + 35 + 50
        assert_eq!(overall.total_measured, Duration::minutes(330));
        // standup twice (two days), review once, roadmap once
        assert_eq!(overall.total_planned, Duration::minutes(15 + 15 + 180 + 60));
        assert_eq!(overall.unplanned_measured(), Duration::minutes(35));
        assert_eq!(overall.over_plan, Duration::minutes(5 + 35));
        assert_eq!(overall.under_plan, Duration::minutes(5 + 10));
        assert_eq!(report.whole.total_measured, overall.total_measured);
    }

    #[test]
    fn share_of_range_per_project_bucket() {
        let report = run_report(&Normalizer::default(), &sample(), &month_request(false));
        let projects = report.whole.dimension(Dimension::Project).unwrap();
        let work = projects.bucket("Work").unwrap();

        assert!((report.whole.share_pct(work) - 100.0).abs() < f64::EPSILON);
        let empty = run_report(
            &Normalizer::default(),
            &[],
            &ReportRequest {
                period: Period::Year(NaiveDate::from_ymd_opt(2019, 1, 1).unwrap()),
                ..month_request(false)
            },
        );
        assert!(empty.whole.share_pct(work).abs() < f64::EPSILON);
    }

    #[test]
    fn spontaneity_dimension_uses_markers() {
        let report = run_report(&Normalizer::default(), &sample(), &month_request(false));
        let spontaneity = report.whole.dimension(Dimension::Spontaneity).unwrap();

        let names: Vec<_> = spontaneity
            .buckets
            .iter()
            .map(|b| b.key.name.as_str())
            .collect();
        assert_eq!(names, ["scheduled", "spontaneous"]);
        assert!(!spontaneity.bucket("spontaneous").unwrap().has_planned_data());
        assert_eq!(
            spontaneity.bucket("scheduled").unwrap().under_plan,
            Duration::minutes(10)
        );
    }

    #[test]
    fn breakdown_measured_sums_to_whole() {
        let report = run_report(&Normalizer::default(), &sample(), &month_request(true));
        assert_eq!(report.periods.len(), 6);

        for whole in &report.whole.dimensions {
            let mut summed: BTreeMap<String, Duration> = BTreeMap::new();
            for period in &report.periods {
                let part = period.dimension(whole.dimension).unwrap();
                for bucket in &part.buckets {
                    *summed
                        .entry(bucket.key.to_string())
                        .or_insert_with(Duration::zero) += bucket.total_measured;
                }
            }
            for bucket in &whole.buckets {
                assert_eq!(
                    summed.get(&bucket.key.to_string()).copied().unwrap_or_else(Duration::zero),
                    bucket.total_measured,
                    "{} / {}",
                    whole.dimension,
                    bucket.key
                );
            }
        }
    }

    #[test]
    fn breakdown_counts_non_recurring_plan_per_sub_period() {
        let report = run_report(&Normalizer::default(), &sample(), &month_request(true));

        let review_weeks: Vec<_> = report
            .periods
            .iter()
            .filter_map(|p| p.dimension(Dimension::SubProject)?.bucket("Backend"))
            .map(|b| b.total_planned)
            .collect();
        assert_eq!(review_weeks, [Duration::hours(3), Duration::hours(3)]);
    }

    #[test]
    fn empty_range_has_zeroed_overall() {
        let request = ReportRequest {
            period: Period::Year(NaiveDate::from_ymd_opt(2019, 1, 1).unwrap()),
            ..month_request(false)
        };
        let report = run_report(&Normalizer::default(), &sample(), &request);
        let overall = report.whole.overall().unwrap();

        assert_eq!(report.whole.entry_count, 0);
        assert_eq!(overall.total_measured, Duration::zero());
        assert!(!overall.has_planned_data());
        assert!(report.whole.dimension(Dimension::Tag).unwrap().buckets.is_empty());
    }

    #[test]
    fn requested_dimensions_keep_their_order() {
        let request = ReportRequest {
            dimensions: vec![Dimension::Tag, Dimension::Overall],
            ..month_request(false)
        };
        let report = run_report(&Normalizer::default(), &sample(), &request);
        let order: Vec<_> = report.whole.dimensions.iter().map(|d| d.dimension).collect();
        assert_eq!(order, [Dimension::Tag, Dimension::Overall]);
    }
}
