//! Volume ledger: outstanding volume per exercise over the training interval.
//!
//! Two policies are available:
//! - `HardWindow`: every entry logged within the last `interval` days counts fully
//! - `Decayed`: full weight up to `0.75 × interval` days ago, then a linear fade
//!   that reaches zero at `1.25 × interval` days ago
//!
//! Remaining volume is `target − logged`; zero or negative means the exercise
//! needs no work right now.

use crate::{Error, Exercise, HistoryEntry, HistoryMap, Result, TrainingInterval};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// How logged volume is credited against the target
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum VolumePolicy {
    /// Full credit inside the interval, none outside
    HardWindow,
    /// Time-weighted credit fading out past the interval boundary
    #[default]
    Decayed,
}

impl FromStr for VolumePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "hard_window" | "hard" | "window" => Ok(VolumePolicy::HardWindow),
            "decayed" | "decay" => Ok(VolumePolicy::Decayed),
            other => Err(Error::Validation(format!("unknown volume policy '{}'", other))),
        }
    }
}

/// Shape of the linear fade used by [`VolumePolicy::Decayed`]
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct DecayModel {
    /// Fraction of the interval after which the fade begins
    pub start_fraction: f64,
    /// Fraction of the interval the fade lasts
    pub length_fraction: f64,
}

impl Default for DecayModel {
    fn default() -> Self {
        Self {
            start_fraction: 0.75,
            length_fraction: 0.5,
        }
    }
}

impl DecayModel {
    /// Days ago at which entries start losing weight
    pub fn start(&self, interval: TrainingInterval) -> f64 {
        self.start_fraction * interval.as_f64()
    }

    /// Days ago at which entries stop counting
    pub fn end(&self, interval: TrainingInterval) -> f64 {
        self.start(interval) + self.length(interval)
    }

    fn length(&self, interval: TrainingInterval) -> f64 {
        self.length_fraction.max(0.0) * interval.as_f64()
    }

    /// Weight of an entry logged `days_ago` days ago, in `[0, 1]`
    pub fn weight(&self, days_ago: f64, interval: TrainingInterval) -> f64 {
        let start = self.start(interval);
        let end = self.end(interval);

        if days_ago <= start {
            1.0
        } else if days_ago >= end {
            0.0
        } else {
            1.0 - (days_ago - start) / self.length(interval)
        }
    }
}

/// Fractional days elapsed between `date` and `now`.
///
/// Negative for entries dated in the future.
pub fn days_ago(now: DateTime<Utc>, date: DateTime<Utc>) -> f64 {
    (now - date).num_seconds() as f64 / SECONDS_PER_DAY
}

/// Computes remaining volume for exercises as of a fixed instant
#[derive(Clone, Copy, Debug)]
pub struct VolumeLedger {
    interval: TrainingInterval,
    policy: VolumePolicy,
    decay: DecayModel,
    now: DateTime<Utc>,
}

impl VolumeLedger {
    pub fn new(interval: TrainingInterval, policy: VolumePolicy, now: DateTime<Utc>) -> Self {
        Self {
            interval,
            policy,
            decay: DecayModel::default(),
            now,
        }
    }

    pub fn with_decay(mut self, decay: DecayModel) -> Self {
        self.decay = decay;
        self
    }

    pub fn interval(&self) -> TrainingInterval {
        self.interval
    }

    pub fn policy(&self) -> VolumePolicy {
        self.policy
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Credit given to one entry under the active policy
    pub fn entry_weight(&self, entry: &HistoryEntry) -> f64 {
        let age = days_ago(self.now, entry.date);
        match self.policy {
            VolumePolicy::HardWindow => {
                if age < self.interval.as_f64() {
                    1.0
                } else {
                    0.0
                }
            }
            VolumePolicy::Decayed => {
                if age >= self.decay.end(self.interval) {
                    0.0
                } else {
                    self.decay.weight(age, self.interval)
                }
            }
        }
    }

    /// Volume credited to an exercise from its history.
    ///
    /// Entries whose record shape does not belong to the exercise are skipped.
    pub fn completed_volume(&self, exercise: &Exercise, history: &[HistoryEntry]) -> f64 {
        history
            .iter()
            .filter(|entry| {
                let fits = exercise.accepts(&entry.record);
                if !fits {
                    tracing::debug!(
                        "Skipping {} entry {} logged under {} exercise '{}'",
                        entry.category(),
                        entry.id,
                        exercise.category(),
                        exercise.name
                    );
                }
                fits
            })
            .map(|entry| entry.volume() * self.entry_weight(entry))
            .sum()
    }

    /// Outstanding volume for one exercise; `<= 0` means satisfied
    pub fn remaining_volume(&self, exercise: &Exercise, history: &[HistoryEntry]) -> f64 {
        let completed = self.completed_volume(exercise, history);
        let remaining = exercise.target_volume() - completed;

        match self.policy {
            VolumePolicy::HardWindow => remaining,
            VolumePolicy::Decayed => remaining.round(),
        }
    }

    /// Remaining volume for every exercise in the collection.
    ///
    /// History keyed by ids that are not in `exercises` is ignored.
    pub fn remaining_for_all(
        &self,
        exercises: &[Exercise],
        history: &HistoryMap,
    ) -> HashMap<Uuid, f64> {
        let orphaned = history
            .keys()
            .filter(|id| !exercises.iter().any(|e| &e.id == *id))
            .count();
        if orphaned > 0 {
            tracing::warn!("Ignoring history for {} unknown exercise(s)", orphaned);
        }

        exercises
            .iter()
            .map(|exercise| {
                let entries = history
                    .get(&exercise.id)
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                (exercise.id, self.remaining_volume(exercise, entries))
            })
            .collect()
    }
}
