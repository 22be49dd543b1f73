//! Core type definitions with validation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// The week start day was outside 0 (Monday) ..= 6 (Sunday).
    #[error("week start must be between 0 (Monday) and 6 (Sunday), got {value}")]
    WeekStartOutOfRange { value: i64 },

    /// A date range ended before it started.
    #[error("range end {end} is before range start {start}")]
    InvertedRange { start: String, end: String },

    /// Unknown report dimension name.
    #[error("unknown dimension: {value}")]
    UnknownDimension { value: String },

    /// Unknown spontaneity name.
    #[error("invalid spontaneity: {value}")]
    InvalidSpontaneity { value: String },
}

/// First day of the week, 0 = Monday through 6 = Sunday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WeekStart(u8);

impl WeekStart {
    /// Monday-based weeks.
    pub const MONDAY: Self = Self(0);

    /// Sunday-based weeks.
    pub const SUNDAY: Self = Self(6);

    /// Creates a week start after validation.
    pub fn new(value: i64) -> Result<Self, ValidationError> {
        match u8::try_from(value) {
            Ok(day) if day <= 6 => Ok(Self(day)),
            _ => Err(ValidationError::WeekStartOutOfRange { value }),
        }
    }

    /// Days since Monday.
    #[must_use]
    pub const fn days_from_monday(self) -> u32 {
        self.0 as u32
    }

    /// The weekday this week start represents.
    #[must_use]
    pub fn weekday(self) -> chrono::Weekday {
        (0..self.0).fold(chrono::Weekday::Mon, |day, _| day.succ())
    }
}

impl fmt::Display for WeekStart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for WeekStart {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl Serialize for WeekStart {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for WeekStart {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = i64::deserialize(deserializer)?;
        Self::new(value).map_err(serde::de::Error::custom)
    }
}

/// Whether a task was marked as spontaneous or scheduled in its description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Spontaneity {
    /// Planned ahead (calendar marker).
    Scheduled,
    /// Picked up on the spot (dice marker).
    Spontaneous,
    /// Neither marker present.
    Unmarked,
}

impl Spontaneity {
    /// String representation used as a bucket key.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Spontaneous => "spontaneous",
            Self::Unmarked => "unmarked",
        }
    }
}

impl fmt::Display for Spontaneity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Spontaneity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(Self::Scheduled),
            "spontaneous" => Ok(Self::Spontaneous),
            "unmarked" => Ok(Self::Unmarked),
            _ => Err(ValidationError::InvalidSpontaneity {
                value: s.to_string(),
            }),
        }
    }
}

/// A report grouping axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Dimension {
    Overall,
    Project,
    SubProject,
    Tag,
    Spontaneity,
}

impl Dimension {
    /// Every dimension, in report order.
    pub const ALL: [Self; 5] = [
        Self::Overall,
        Self::Project,
        Self::SubProject,
        Self::Tag,
        Self::Spontaneity,
    ];
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Overall => "overall",
            Self::Project => "project",
            Self::SubProject => "sub_project",
            Self::Tag => "tag",
            Self::Spontaneity => "spontaneity",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Dimension {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "overall" | "total" => Ok(Self::Overall),
            "project" => Ok(Self::Project),
            "sub_project" | "subproject" => Ok(Self::SubProject),
            "tag" => Ok(Self::Tag),
            "spontaneity" => Ok(Self::Spontaneity),
            _ => Err(ValidationError::UnknownDimension {
                value: s.to_string(),
            }),
        }
    }
}

impl Serialize for Dimension {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Dimension {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Identifies one bucket within a dimension.
///
/// Sub-project names are only unique within their project, so sub-project
/// buckets carry the project as `parent`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct BucketKey {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

impl BucketKey {
    /// A key without a parent.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
        }
    }

    /// A key nested under a parent (sub-project within project).
    pub fn nested(name: impl Into<String>, parent: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: Some(parent.into()),
        }
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.parent {
            Some(parent) => write!(f, "{} ({parent})", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}
