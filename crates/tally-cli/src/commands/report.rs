//! Report command: planned vs. measured time for a period.
//!
//! Implements `tally report` for explicit ranges and for the week, month or
//! year around a reference date, with an optional per-sub-period breakdown.
//! Output is human-readable text or JSON (durations in seconds).

use std::fmt::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Args, ValueEnum};
use serde::Serialize;
use tally_core::{
    BreakdownReport, DateRange, Dimension, DimensionBucket, Normalizer, Period, Report,
    ReportRequest, WeekStart, format_duration, run_report,
};

use crate::Config;
use crate::commands::input::read_entries;
use crate::commands::util::parse_date;

/// Width of the bucket name column.
const NAME_WIDTH: usize = 24;

/// Report period type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// `--start` to `--end`, inclusive.
    Range,
    /// The week containing `--start`.
    Week,
    /// The calendar month containing `--start`.
    Month,
    /// The calendar year containing `--start`.
    Year,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    /// Entries file (JSON lines or a JSON array); reads stdin when omitted or `-`.
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Period to report on.
    #[arg(long, value_enum, default_value_t = Mode::Range)]
    pub mode: Mode,

    /// First day of the range, or the reference date for week/month/year (default: today).
    #[arg(long)]
    pub start: Option<String>,

    /// Last day of the range, inclusive (default: the start date).
    #[arg(long)]
    pub end: Option<String>,

    /// First day of the week, 0 = Monday through 6 = Sunday (overrides config).
    #[arg(long)]
    pub week_start: Option<i64>,

    /// Also report each sub-period (days of a week or range, weeks of a month, months of a year).
    #[arg(long)]
    pub breakdown: bool,

    /// Dimensions to include, comma separated (default: all).
    #[arg(long, value_delimiter = ',')]
    pub dimensions: Vec<Dimension>,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

// ========== Period Resolution ==========

/// Turns the mode and date flags into a period, relative to `today`.
pub fn resolve_period(
    mode: Mode,
    start: Option<&str>,
    end: Option<&str>,
    today: NaiveDate,
) -> Result<Period> {
    let start = start
        .map(|s| parse_date(s, today))
        .transpose()
        .context("invalid --start")?
        .unwrap_or(today);

    if mode != Mode::Range && end.is_some() {
        tracing::warn!(?mode, "--end only applies to range mode, ignoring it");
    }

    let period = match mode {
        Mode::Range => {
            let end = end
                .map(|s| parse_date(s, today))
                .transpose()
                .context("invalid --end")?
                .unwrap_or(start);
            Period::Range(DateRange::inclusive(start, end)?)
        }
        Mode::Week => Period::Week(start),
        Mode::Month => Period::Month(start),
        Mode::Year => Period::Year(start),
    };
    Ok(period)
}

// ========== Text Output ==========

const fn section_title(dimension: Dimension) -> &'static str {
    match dimension {
        Dimension::Overall => "OVERALL",
        Dimension::Project => "BY PROJECT",
        Dimension::SubProject => "BY SUB-PROJECT",
        Dimension::Tag => "BY TAG",
        Dimension::Spontaneity => "BY SPONTANEITY",
    }
}

#[allow(clippy::cast_possible_truncation)]
fn format_pct(pct: f64) -> String {
    format!("{}%", pct.round() as i64)
}

/// Shortens long names so the columns stay aligned.
fn fit_name(name: &str) -> String {
    if name.chars().count() <= NAME_WIDTH {
        return name.to_string();
    }
    let mut short: String = name.chars().take(NAME_WIDTH - 1).collect();
    short.push('…');
    short
}

fn write_bucket(output: &mut String, report: &Report, bucket: &DimensionBucket) {
    let name = fit_name(&bucket.key.to_string());
    let measured = format_duration(bucket.total_measured);
    let share = format_pct(report.share_pct(bucket));

    if !bucket.has_planned_data() {
        writeln!(
            output,
            "{name:<NAME_WIDTH$} {measured:>8} {share:>6}  (no planned data)"
        )
        .unwrap();
        return;
    }

    let pct = bucket.percentages();
    writeln!(
        output,
        "{name:<NAME_WIDTH$} {measured:>8} {share:>6} {:>8} {:>8} {:>8} {:>8} {:>6} {:>6}",
        format_duration(bucket.total_planned),
        format_duration(bucket.over_plan),
        format_duration(bucket.under_plan),
        format_duration(bucket.abs_deviation),
        format_pct(pct.meas_exceeds_plan_pct),
        format_pct(pct.meas_below_plan_pct),
    )
    .unwrap();

    let unplanned = bucket.unplanned_measured();
    if !unplanned.is_zero() {
        writeln!(
            output,
            "  {} excluded from deviation calculations",
            format_duration(unplanned)
        )
        .unwrap();
    }
}

fn write_dimensions(output: &mut String, report: &Report) {
    for dimension in &report.dimensions {
        let title = section_title(dimension.dimension);
        writeln!(output).unwrap();
        writeln!(output, "{title}").unwrap();
        writeln!(output, "{}", "─".repeat(title.chars().count())).unwrap();

        if dimension.buckets.is_empty() {
            writeln!(output, "(no entries)").unwrap();
            continue;
        }

        writeln!(
            output,
            "{:<NAME_WIDTH$} {:>8} {:>6} {:>8} {:>8} {:>8} {:>8} {:>6} {:>6}",
            "", "measured", "share", "planned", "over", "under", "abs", "over%", "under%"
        )
        .unwrap();
        for bucket in &dimension.buckets {
            write_bucket(output, report, bucket);
        }
    }
}

/// Formats the human-readable report output.
pub fn format_report(report: &BreakdownReport) -> String {
    let mut output = String::new();

    writeln!(output, "DEVIATION REPORT: {}", report.whole.range).unwrap();
    writeln!(output, "Entries: {}", report.whole.entry_count).unwrap();
    if report.skipped > 0 {
        writeln!(output, "Skipped: {} (unreadable duration)", report.skipped).unwrap();
    }
    write_dimensions(&mut output, &report.whole);

    for period in &report.periods {
        let title = format!("PERIOD {}", period.range);
        writeln!(output).unwrap();
        writeln!(output, "{title}").unwrap();
        writeln!(output, "{}", "═".repeat(title.chars().count())).unwrap();
        writeln!(output, "Entries: {}", period.entry_count).unwrap();
        write_dimensions(&mut output, period);
    }

    output
}

// ========== JSON Output ==========

/// JSON report structure.
#[derive(Debug, Serialize)]
pub struct JsonReport {
    pub skipped: usize,
    #[serde(flatten)]
    pub whole: JsonPeriod,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub periods: Vec<JsonPeriod>,
}

#[derive(Debug, Serialize)]
pub struct JsonPeriod {
    pub start: String,
    /// Last day of the period, inclusive.
    pub end: String,
    pub entry_count: usize,
    pub total_measured_secs: i64,
    pub dimensions: Vec<JsonDimension>,
}

#[derive(Debug, Serialize)]
pub struct JsonDimension {
    pub dimension: Dimension,
    pub buckets: Vec<JsonBucket>,
}

#[derive(Debug, Serialize)]
pub struct JsonBucket {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    pub total_measured_secs: i64,
    pub total_planned_secs: i64,
    pub measured_with_plan_secs: i64,
    pub over_plan_secs: i64,
    pub under_plan_secs: i64,
    pub abs_deviation_secs: i64,
    /// Share of the period's measured time.
    pub share_pct: f64,
    pub meas_exceeds_plan_pct: f64,
    pub meas_below_plan_pct: f64,
    pub has_planned_data: bool,
    pub entry_count: usize,
    pub unit_count: usize,
    pub planned_unit_count: usize,
    pub conflicting_units: usize,
}

impl JsonBucket {
    fn new(report: &Report, bucket: &DimensionBucket) -> Self {
        let pct = bucket.percentages();
        Self {
            key: bucket.key.name.clone(),
            parent: bucket.key.parent.clone(),
            total_measured_secs: bucket.total_measured.num_seconds(),
            total_planned_secs: bucket.total_planned.num_seconds(),
            measured_with_plan_secs: bucket.measured_with_plan.num_seconds(),
            over_plan_secs: bucket.over_plan.num_seconds(),
            under_plan_secs: bucket.under_plan.num_seconds(),
            abs_deviation_secs: bucket.abs_deviation.num_seconds(),
            share_pct: report.share_pct(bucket),
            meas_exceeds_plan_pct: pct.meas_exceeds_plan_pct,
            meas_below_plan_pct: pct.meas_below_plan_pct,
            has_planned_data: bucket.has_planned_data(),
            entry_count: bucket.entry_count,
            unit_count: bucket.unit_count,
            planned_unit_count: bucket.planned_unit_count,
            conflicting_units: bucket.conflicting_units,
        }
    }
}

impl From<&Report> for JsonPeriod {
    fn from(report: &Report) -> Self {
        let last = report.range.last_day().unwrap_or(report.range.start());
        Self {
            start: report.range.start().format("%Y-%m-%d").to_string(),
            end: last.format("%Y-%m-%d").to_string(),
            entry_count: report.entry_count,
            total_measured_secs: report.total_measured.num_seconds(),
            dimensions: report
                .dimensions
                .iter()
                .map(|d| JsonDimension {
                    dimension: d.dimension,
                    buckets: d
                        .buckets
                        .iter()
                        .map(|b| JsonBucket::new(report, b))
                        .collect(),
                })
                .collect(),
        }
    }
}

/// Formats report data as JSON.
pub fn format_report_json(report: &BreakdownReport) -> Result<String> {
    let json = JsonReport {
        skipped: report.skipped,
        whole: JsonPeriod::from(&report.whole),
        periods: report.periods.iter().map(JsonPeriod::from).collect(),
    };
    Ok(serde_json::to_string_pretty(&json)?)
}

/// Runs the report command.
pub fn run(args: &ReportArgs, config: &Config) -> Result<()> {
    let today = Utc::now().date_naive();
    let period = resolve_period(args.mode, args.start.as_deref(), args.end.as_deref(), today)?;
    let week_start = match args.week_start {
        Some(value) => WeekStart::new(value).context("invalid --week-start")?,
        None => config.week_start,
    };
    let dimensions = if args.dimensions.is_empty() {
        Dimension::ALL.to_vec()
    } else {
        args.dimensions.clone()
    };

    let raw = read_entries(args.input.as_deref())?;
    let normalizer = Normalizer::new(config.markers.clone());
    let request = ReportRequest {
        period,
        dimensions,
        breakdown: args.breakdown,
        week_start,
    };
    let report = run_report(&normalizer, &raw, &request);

    if args.json {
        let output = format_report_json(&report)?;
        println!("{output}");
    } else {
        let output = format_report(&report);
        print!("{output}");
    }

    Ok(())
}
