//! Grouping of normalized entries into contribution units.
//!
//! A contribution unit is the thing a plan is compared against:
//! - recurring tasks form one unit per (calendar day, task), since the
//!   annotation describes the intended length of that day's occurrence;
//! - non-recurring tasks form one unit per task over the whole range,
//!   since the plan is typed once per task even when logged across days.
//!
//! A task is its name without the `{pH:MM}` token, within one project and
//! sub-project. Either way the planned duration is counted once per unit,
//! taken from the earliest member (by start time) that carries an annotation.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::entry::TimeEntry;
use crate::period::DateRange;
use crate::types::{BucketKey, Dimension, Spontaneity};

/// Key of the single bucket in the overall dimension.
pub const OVERALL_KEY: &str = "all";

/// What kind of grouping produced a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum UnitKind {
    /// One day's occurrence of a recurring task.
    Occurrence { day: NaiveDate },
    /// All entries of a non-recurring task in the range.
    Task,
}

/// Identity of a task across entries.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskIdentity {
    /// Name with the planned annotation removed.
    pub task: String,
    pub project: String,
    pub sub_project: Option<String>,
}

impl TaskIdentity {
    pub fn of(entry: &TimeEntry) -> Self {
        Self {
            task: entry.task.clone(),
            project: entry.project.clone(),
            sub_project: entry.sub_project.clone(),
        }
    }
}

/// One aggregation unit fed to the deviation aggregator.
#[derive(Debug, Clone)]
pub struct ContributionUnit<'a> {
    pub kind: UnitKind,
    /// Task name shared by the members, annotation removed.
    pub task: &'a str,
    /// Members in start-time order.
    pub members: Vec<&'a TimeEntry>,
    /// Sum of members' measured durations.
    pub measured: Duration,
    /// Planned duration, counted once for the unit.
    pub planned: Option<Duration>,
    /// Members carried different annotations; the earliest one won.
    pub conflicting_plans: bool,
}

impl ContributionUnit<'_> {
    /// Start of the earliest member.
    pub fn first_start(&self) -> Option<DateTime<Utc>> {
        self.members.first().map(|e| e.start)
    }
}

/// Decides which entries share a contribution unit.
pub trait GroupingStrategy {
    /// Entries with equal keys end up in the same unit.
    type Key: Ord;

    /// Returns the unit key for an entry.
    fn key(&self, entry: &TimeEntry) -> Self::Key;

    /// Returns the unit kind for a key.
    fn kind(&self, key: &Self::Key) -> UnitKind;
}

/// Recurring tasks: one unit per calendar day and task.
#[derive(Debug, Clone, Copy, Default)]
pub struct PerDayOccurrence;

impl GroupingStrategy for PerDayOccurrence {
    type Key = (NaiveDate, TaskIdentity);

    fn key(&self, entry: &TimeEntry) -> Self::Key {
        (entry.day(), TaskIdentity::of(entry))
    }

    fn kind(&self, key: &Self::Key) -> UnitKind {
        UnitKind::Occurrence { day: key.0 }
    }
}

/// Non-recurring tasks: one unit per task across the whole range.
#[derive(Debug, Clone, Copy, Default)]
pub struct WholeRange;

impl GroupingStrategy for WholeRange {
    type Key = TaskIdentity;

    fn key(&self, entry: &TimeEntry) -> Self::Key {
        TaskIdentity::of(entry)
    }

    fn kind(&self, _key: &Self::Key) -> UnitKind {
        UnitKind::Task
    }
}

/// Groups entries with a strategy.
///
/// Entries must already be in start-time order; members keep that order,
/// which is what makes "first annotation wins" deterministic.
pub fn group_with<'a, S: GroupingStrategy>(
    strategy: &S,
    entries: impl IntoIterator<Item = &'a TimeEntry>,
) -> Vec<ContributionUnit<'a>> {
    let mut groups: BTreeMap<S::Key, Vec<&'a TimeEntry>> = BTreeMap::new();
    for entry in entries {
        groups.entry(strategy.key(entry)).or_default().push(entry);
    }

    groups
        .into_iter()
        .filter_map(|(key, members)| {
            let kind = strategy.kind(&key);
            make_unit(kind, members)
        })
        .collect()
}

fn make_unit<'a>(kind: UnitKind, members: Vec<&'a TimeEntry>) -> Option<ContributionUnit<'a>> {
    let first: &'a TimeEntry = members.first().copied()?;
    let task = first.task.as_str();
    let measured = members
        .iter()
        .fold(Duration::zero(), |total, e| total + e.measured);

    let mut annotations = members.iter().filter_map(|e| e.planned);
    let planned = annotations.next();
    let conflicting_plans = planned.is_some_and(|chosen| annotations.any(|p| p != chosen));
    if conflicting_plans {
        tracing::debug!(
            task,
            project = %first.project,
            ?kind,
            "members disagree on planned annotation, keeping the earliest"
        );
    }

    Some(ContributionUnit {
        kind,
        task,
        members,
        measured,
        planned,
        conflicting_plans,
    })
}

/// Builds all contribution units for a set of entries.
///
/// Entries are stably sorted by start, then each entry's own recurring flag
/// decides its stream. A task that appears with and without the
/// recurring marker produces separate units.
pub fn build_units<'a>(entries: &[&'a TimeEntry]) -> Vec<ContributionUnit<'a>> {
    let mut sorted = entries.to_vec();
    sorted.sort_by_key(|e| e.start);

    let (recurring, one_off): (Vec<&TimeEntry>, Vec<&TimeEntry>) =
        sorted.into_iter().partition(|e| e.is_recurring);

    let mut units = group_with(&PerDayOccurrence, recurring);
    units.extend(group_with(&WholeRange, one_off));
    units
}

/// Entries whose start falls inside the range.
pub fn select<'a>(entries: &'a [TimeEntry], range: &DateRange) -> Vec<&'a TimeEntry> {
    entries.iter().filter(|e| range.contains(e.start)).collect()
}

/// The bucket an entry belongs to for a single-valued dimension.
///
/// Returns `None` when the entry is left out of that dimension (no
/// sub-project, no spontaneity marker). Tags are multi-valued and are
/// apportioned by the aggregator instead.
pub fn dimension_key(entry: &TimeEntry, dimension: Dimension) -> Option<BucketKey> {
    match dimension {
        Dimension::Overall => Some(BucketKey::new(OVERALL_KEY)),
        Dimension::Project => Some(BucketKey::new(entry.project.clone())),
        Dimension::SubProject => entry
            .sub_project
            .as_ref()
            .map(|sub| BucketKey::nested(sub.clone(), entry.project.clone())),
        Dimension::Spontaneity => match entry.spontaneity {
            Spontaneity::Unmarked => None,
            marked => Some(BucketKey::new(marked.as_str())),
        },
        Dimension::Tag => None,
    }
}

/// Partitions entries by their single-valued dimension key.
pub fn partition<'a>(
    entries: &[&'a TimeEntry],
    dimension: Dimension,
) -> BTreeMap<BucketKey, Vec<&'a TimeEntry>> {
    let mut partitions: BTreeMap<BucketKey, Vec<&'a TimeEntry>> = BTreeMap::new();
    for &entry in entries {
        if let Some(key) = dimension_key(entry, dimension) {
            partitions.entry(key).or_default().push(entry);
        }
    }
    partitions
}
