//! Planned-vs-measured aggregation per report dimension.
//!
//! Each contribution unit adds its measured time to a bucket. Units with a
//! plan also add to the deviation sums; units without one only count toward
//! `total_measured`. For tags, a unit is split across the tags its members
//! carry in proportion to the measured time behind each tag.

use std::collections::BTreeMap;

use chrono::Duration;
use serde::Serialize;

use crate::entry::TimeEntry;
use crate::grouping::{ContributionUnit, OVERALL_KEY, build_units, partition, select};
use crate::period::DateRange;
use crate::types::{BucketKey, Dimension};

/// Finalized totals for one value of a dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionBucket {
    pub key: BucketKey,
    pub total_measured: Duration,
    /// Sum of planned durations, once per unit.
    pub total_planned: Duration,
    /// Measured time of units that carry a plan.
    pub measured_with_plan: Duration,
    pub over_plan: Duration,
    pub under_plan: Duration,
    pub abs_deviation: Duration,
    /// Entries contributing to this bucket.
    pub entry_count: usize,
    /// Contribution units touching this bucket.
    pub unit_count: usize,
    /// Units touching this bucket that carry a plan.
    pub planned_unit_count: usize,
    /// Units whose members disagreed on the annotation.
    pub conflicting_units: usize,
}

/// Over- and under-plan time as a share of planned time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DeviationPercentages {
    pub meas_exceeds_plan_pct: f64,
    pub meas_below_plan_pct: f64,
}

impl DimensionBucket {
    fn empty(key: BucketKey) -> Self {
        Self {
            key,
            total_measured: Duration::zero(),
            total_planned: Duration::zero(),
            measured_with_plan: Duration::zero(),
            over_plan: Duration::zero(),
            under_plan: Duration::zero(),
            abs_deviation: Duration::zero(),
            entry_count: 0,
            unit_count: 0,
            planned_unit_count: 0,
            conflicting_units: 0,
        }
    }

    /// Adds one (possibly apportioned) unit contribution.
    fn absorb(
        &mut self,
        measured: Duration,
        planned: Option<Duration>,
        entries: usize,
        conflicting: bool,
    ) {
        self.total_measured += measured;
        self.entry_count += entries;
        self.unit_count += 1;
        if conflicting {
            self.conflicting_units += 1;
        }

        let Some(planned) = planned else {
            return;
        };
        self.planned_unit_count += 1;
        self.total_planned += planned;
        self.measured_with_plan += measured;

        let delta = measured - planned;
        if delta > Duration::zero() {
            self.over_plan += delta;
        } else if delta < Duration::zero() {
            self.under_plan -= delta;
        }
        self.abs_deviation += delta.abs();
    }

    /// Whether any contributing unit carried a plan, `{p0:00}` included.
    pub fn has_planned_data(&self) -> bool {
        self.planned_unit_count > 0
    }

    /// Measured time excluded from deviation calculations.
    pub fn unplanned_measured(&self) -> Duration {
        self.total_measured - self.measured_with_plan
    }

    /// Over-plan minus under-plan.
    pub fn net_deviation(&self) -> Duration {
        self.over_plan - self.under_plan
    }

    /// Percentages relative to `total_planned`; both 0 when nothing was planned.
    #[allow(clippy::cast_precision_loss)]
    pub fn percentages(&self) -> DeviationPercentages {
        if self.total_planned.is_zero() {
            return DeviationPercentages {
                meas_exceeds_plan_pct: 0.0,
                meas_below_plan_pct: 0.0,
            };
        }
        let planned = self.total_planned.num_seconds() as f64;
        DeviationPercentages {
            meas_exceeds_plan_pct: self.over_plan.num_seconds() as f64 / planned * 100.0,
            meas_below_plan_pct: self.under_plan.num_seconds() as f64 / planned * 100.0,
        }
    }
}

/// Splits `total` in proportion to `weights` so the parts sum to `total`.
///
/// Largest remainder method: every part gets its floor share, then the
/// leftover units go to the largest fractional remainders (lower index first
/// on ties). All zeros when the weights sum to zero.
pub fn apportion(total: i64, weights: &[i64]) -> Vec<i64> {
    let weight_sum: i128 = weights.iter().map(|&w| i128::from(w.max(0))).sum();
    if weight_sum == 0 {
        return vec![0; weights.len()];
    }

    let total = i128::from(total);
    let mut parts = Vec::with_capacity(weights.len());
    let mut remainders = Vec::with_capacity(weights.len());
    for (idx, &weight) in weights.iter().enumerate() {
        let scaled = total * i128::from(weight.max(0));
        parts.push(scaled.div_euclid(weight_sum));
        remainders.push((scaled.rem_euclid(weight_sum), idx));
    }

    let leftover = total - parts.iter().sum::<i128>();
    remainders.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    for &(_, idx) in remainders.iter().take(usize::try_from(leftover).unwrap_or(0)) {
        parts[idx] += 1;
    }

    parts
        .into_iter()
        .map(|part| i64::try_from(part).unwrap_or(i64::MAX))
        .collect()
}

/// Aggregates one dimension over a range.
///
/// The overall dimension always yields its single bucket, even for an empty
/// range. Other dimensions yield one bucket per key seen, sorted by key.
pub fn aggregate(
    entries: &[TimeEntry],
    range: &DateRange,
    dimension: Dimension,
) -> Vec<DimensionBucket> {
    let selected = select(entries, range);

    let buckets: Vec<DimensionBucket> = match dimension {
        Dimension::Overall => {
            let mut bucket = DimensionBucket::empty(BucketKey::new(OVERALL_KEY));
            for unit in build_units(&selected) {
                absorb_unit(&mut bucket, &unit);
            }
            vec![bucket]
        }
        Dimension::Tag => aggregate_tags(&build_units(&selected)),
        Dimension::Project | Dimension::SubProject | Dimension::Spontaneity => {
            partition(&selected, dimension)
                .into_iter()
                .map(|(key, members)| {
                    let mut bucket = DimensionBucket::empty(key);
                    for unit in build_units(&members) {
                        absorb_unit(&mut bucket, &unit);
                    }
                    bucket
                })
                .collect()
        }
    };

    tracing::debug!(
        %dimension,
        %range,
        entries = selected.len(),
        buckets = buckets.len(),
        "aggregated dimension"
    );
    buckets
}

fn absorb_unit(bucket: &mut DimensionBucket, unit: &ContributionUnit<'_>) {
    bucket.absorb(
        unit.measured,
        unit.planned,
        unit.members.len(),
        unit.conflicting_plans,
    );
}

/// Per-tag share of one unit.
#[derive(Debug, Default)]
struct TagShare {
    measured: i64,
    entries: usize,
}

fn aggregate_tags(units: &[ContributionUnit<'_>]) -> Vec<DimensionBucket> {
    let mut buckets: BTreeMap<String, DimensionBucket> = BTreeMap::new();

    for unit in units {
        let shares = tag_shares(unit);
        if shares.is_empty() {
            continue;
        }

        let allocated = unit
            .planned
            .map(|planned| allocate_planned(unit, planned, &shares));
        for (idx, (tag, share)) in shares.iter().enumerate() {
            let bucket = buckets
                .entry(tag.to_string())
                .or_insert_with(|| DimensionBucket::empty(BucketKey::new(*tag)));
            bucket.absorb(
                Duration::seconds(share.measured),
                allocated.as_ref().map(|parts| Duration::seconds(parts[idx])),
                share.entries,
                unit.conflicting_plans,
            );
        }
    }

    buckets.into_values().collect()
}

/// Measured seconds behind each tag of a unit, tags in sorted order.
///
/// A member's measured time is split evenly across its own tags.
fn tag_shares<'a>(unit: &ContributionUnit<'a>) -> BTreeMap<&'a str, TagShare> {
    let mut shares: BTreeMap<&'a str, TagShare> = BTreeMap::new();
    for &member in &unit.members {
        let tags: Vec<&'a str> = member.tags.iter().map(String::as_str).collect();
        let split = apportion(member.measured.num_seconds(), &vec![1; tags.len()]);
        for (tag, seconds) in tags.into_iter().zip(split) {
            let share = shares.entry(tag).or_default();
            share.measured += seconds;
            share.entries += 1;
        }
    }
    shares
}

/// Splits a unit's planned seconds across its tags by measured share.
///
/// Untagged members keep their share of the plan out of every tag bucket.
/// A unit with no measured time splits its plan evenly.
fn allocate_planned(
    unit: &ContributionUnit<'_>,
    planned: Duration,
    shares: &BTreeMap<&str, TagShare>,
) -> Vec<i64> {
    let planned = planned.num_seconds();
    let unit_total = unit.measured.num_seconds();
    if unit_total <= 0 {
        return apportion(planned, &vec![1; shares.len()]);
    }

    let mut weights: Vec<i64> = shares.values().map(|share| share.measured).collect();
    let tagged: i64 = weights.iter().sum();
    weights.push((unit_total - tagged).max(0));

    let mut parts = apportion(planned, &weights);
    parts.pop();
    parts
}
