//! Core domain types for setlog.
//!
//! This module defines the fundamental types used throughout the system:
//! - Exercise categories and category-specific exercise data
//! - History entries and their category-specific records
//! - The training interval that all volume targets are scaled to

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Highest priority an exercise can carry within its muscle group
pub const MAX_PRIORITY: u8 = 3;

/// History entries keyed by the owning exercise id.
///
/// Entries are kept in insertion order; readers that need chronology sort by date.
pub type HistoryMap = HashMap<Uuid, Vec<HistoryEntry>>;

// ============================================================================
// Categories
// ============================================================================

/// Exercise category; decides the history record shape and volume unit
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Strength,
    Endurance,
    Mobility,
    Nsuns,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Nsuns,
        Category::Strength,
        Category::Endurance,
        Category::Mobility,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Strength => "strength",
            Category::Endurance => "endurance",
            Category::Mobility => "mobility",
            Category::Nsuns => "nsuns",
        }
    }

    /// Category under which history records for this category are stored.
    ///
    /// nsuns sessions are logged as plain strength records.
    pub fn record_category(&self) -> Category {
        match self {
            Category::Nsuns => Category::Strength,
            other => *other,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "strength" => Ok(Category::Strength),
            "endurance" | "cardio" => Ok(Category::Endurance),
            "mobility" => Ok(Category::Mobility),
            "nsuns" => Ok(Category::Nsuns),
            other => Err(Error::Validation(format!("unknown category '{}'", other))),
        }
    }
}

// ============================================================================
// Training interval
// ============================================================================

/// Rolling window, in days, over which volume targets are evaluated
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct TrainingInterval(u32);

impl TrainingInterval {
    pub const MIN_DAYS: u32 = 1;
    pub const MAX_DAYS: u32 = 30;

    pub fn new(days: u32) -> Result<Self> {
        if !(Self::MIN_DAYS..=Self::MAX_DAYS).contains(&days) {
            return Err(Error::Validation(format!(
                "training interval must be between {} and {} days, got {}",
                Self::MIN_DAYS,
                Self::MAX_DAYS,
                days
            )));
        }
        Ok(Self(days))
    }

    pub fn days(&self) -> u32 {
        self.0
    }

    pub fn as_f64(&self) -> f64 {
        f64::from(self.0)
    }
}

impl Default for TrainingInterval {
    fn default() -> Self {
        Self(7)
    }
}

impl TryFrom<u32> for TrainingInterval {
    type Error = Error;

    fn try_from(days: u32) -> Result<Self> {
        Self::new(days)
    }
}

impl From<TrainingInterval> for u32 {
    fn from(interval: TrainingInterval) -> Self {
        interval.0
    }
}

// ============================================================================
// Exercises
// ============================================================================

/// One set of a percentage-of-1RM program day
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NsunsSet {
    /// Fraction of the one-rep max, e.g. 0.75
    pub percent: f64,
    pub reps: u32,
    /// Last set of the day is taken to failure
    #[serde(default)]
    pub amrap: bool,
}

/// Category-specific exercise data
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum ExerciseKind {
    Strength,
    Endurance {
        /// Target distance (km) for one training interval
        distance: f64,
    },
    Mobility,
    Nsuns {
        one_rep_max: f64,
        #[serde(default)]
        workout: Vec<NsunsSet>,
    },
}

/// A user-defined exercise with a volume target
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Exercise {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub muscle_group: String,
    /// Target sets per training interval (not necessarily per week)
    #[serde(default)]
    pub weekly_sets: u32,
    /// Weight within the muscle group budget, 0 excludes the exercise
    #[serde(default)]
    pub priority: u8,
    pub kind: ExerciseKind,
}

impl Exercise {
    /// Create an exercise with a fresh id, no target and no priority
    pub fn new(name: impl Into<String>, muscle_group: impl Into<String>, kind: ExerciseKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: String::new(),
            muscle_group: muscle_group.into(),
            weekly_sets: 0,
            priority: 0,
            kind,
        }
    }

    pub fn with_weekly_sets(mut self, weekly_sets: u32) -> Self {
        self.weekly_sets = weekly_sets;
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn category(&self) -> Category {
        match self.kind {
            ExerciseKind::Strength => Category::Strength,
            ExerciseKind::Endurance { .. } => Category::Endurance,
            ExerciseKind::Mobility => Category::Mobility,
            ExerciseKind::Nsuns { .. } => Category::Nsuns,
        }
    }

    /// Whether a history record has the shape this exercise logs
    pub fn accepts(&self, record: &EntryRecord) -> bool {
        self.category().record_category() == record.category()
    }

    /// Target volume for one training interval.
    ///
    /// Endurance exercises target their `distance`; every other category
    /// targets `weekly_sets`.
    pub fn target_volume(&self) -> f64 {
        match self.kind {
            ExerciseKind::Endurance { distance } => finite_non_negative(distance),
            _ => f64::from(self.weekly_sets),
        }
    }

    /// Working weights for an nsuns program day, rounded to 2.5 units.
    ///
    /// Empty for every other category.
    pub fn program_loads(&self) -> Vec<f64> {
        match &self.kind {
            ExerciseKind::Nsuns {
                one_rep_max,
                workout,
            } => workout
                .iter()
                .map(|set| (one_rep_max * set.percent / 2.5).round() * 2.5)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Check user-supplied fields
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation("exercise name is empty".into()));
        }
        if self.muscle_group.trim().is_empty() {
            return Err(Error::Validation(format!(
                "exercise '{}' has no muscle group",
                self.name
            )));
        }
        if self.priority > MAX_PRIORITY {
            return Err(Error::Validation(format!(
                "priority must be between 0 and {}, got {}",
                MAX_PRIORITY, self.priority
            )));
        }
        match &self.kind {
            ExerciseKind::Endurance { distance } if !distance.is_finite() || *distance < 0.0 => {
                Err(Error::Validation(format!(
                    "exercise '{}' has invalid distance {}",
                    self.name, distance
                )))
            }
            ExerciseKind::Nsuns {
                one_rep_max,
                workout,
            } => {
                if !one_rep_max.is_finite() || *one_rep_max < 0.0 {
                    return Err(Error::Validation(format!(
                        "exercise '{}' has invalid one-rep max {}",
                        self.name, one_rep_max
                    )));
                }
                if workout
                    .iter()
                    .any(|set| !set.percent.is_finite() || set.percent <= 0.0)
                {
                    return Err(Error::Validation(format!(
                        "exercise '{}' has a non-positive program percentage",
                        self.name
                    )));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

// ============================================================================
// History entries
// ============================================================================

/// Category-specific payload of a history entry.
///
/// Numeric fields are read leniently: missing, `null` or non-numeric values
/// become zero so a damaged import never poisons volume sums.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum EntryRecord {
    Strength {
        #[serde(default, deserialize_with = "lenient_number")]
        sets: f64,
        #[serde(default, deserialize_with = "lenient_number")]
        reps: f64,
        #[serde(default, deserialize_with = "lenient_number")]
        weight: f64,
    },
    Endurance {
        /// Kilometres; older documents stored this under `sets`
        #[serde(default, alias = "sets", deserialize_with = "lenient_number")]
        distance: f64,
        /// Minutes
        #[serde(default, deserialize_with = "lenient_number")]
        time: f64,
        #[serde(default, deserialize_with = "lenient_optional_number")]
        avg_heart_rate: Option<f64>,
    },
    Mobility {
        #[serde(default, deserialize_with = "lenient_number")]
        sets: f64,
    },
}

impl EntryRecord {
    pub fn strength(sets: f64, reps: f64, weight: f64) -> Self {
        EntryRecord::Strength { sets, reps, weight }
    }

    pub fn endurance(distance: f64, time: f64) -> Self {
        EntryRecord::Endurance {
            distance,
            time,
            avg_heart_rate: None,
        }
    }

    pub fn mobility(sets: f64) -> Self {
        EntryRecord::Mobility { sets }
    }

    pub fn category(&self) -> Category {
        match self {
            EntryRecord::Strength { .. } => Category::Strength,
            EntryRecord::Endurance { .. } => Category::Endurance,
            EntryRecord::Mobility { .. } => Category::Mobility,
        }
    }

    /// Volume contributed by this record: sets, or distance for endurance
    pub fn volume(&self) -> f64 {
        let raw = match self {
            EntryRecord::Strength { sets, .. } | EntryRecord::Mobility { sets } => *sets,
            EntryRecord::Endurance { distance, .. } => *distance,
        };
        finite_non_negative(raw)
    }
}

/// A single logged workout against one exercise
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub notes: String,
    pub record: EntryRecord,
}

impl HistoryEntry {
    pub fn new(date: DateTime<Utc>, record: EntryRecord) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            notes: String::new(),
            record,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn category(&self) -> Category {
        self.record.category()
    }

    pub fn volume(&self) -> f64 {
        self.record.volume()
    }
}

// ============================================================================
// Numeric helpers
// ============================================================================

/// Clamp NaN, infinities and negatives to zero
pub(crate) fn finite_non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

fn number_from_value(value: &serde_json::Value) -> Option<f64> {
    let parsed = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn lenient_number<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(number_from_value(&value).unwrap_or(0.0))
}

fn lenient_optional_number<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(number_from_value(&value))
}
