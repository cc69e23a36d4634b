//! Aggregate statistics: target vs. actual load per category.
//!
//! Produces one point per day of the training interval for charting, a
//! smoothed moving-average series, and scalar completion percentages for
//! progress widgets. Actual load always uses hard-window semantics; decay
//! only applies to per-exercise remaining volume.

use crate::types::finite_non_negative;
use crate::{Category, Exercise, HistoryMap, TrainingInterval};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Category buckets shown in statistics; nsuns rolls up into strength
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LoadCategory {
    Strength,
    Endurance,
    Mobility,
}

impl LoadCategory {
    pub const ALL: [LoadCategory; 3] = [
        LoadCategory::Strength,
        LoadCategory::Endurance,
        LoadCategory::Mobility,
    ];

    pub fn of(category: Category) -> Self {
        match category {
            Category::Strength | Category::Nsuns => LoadCategory::Strength,
            Category::Endurance => LoadCategory::Endurance,
            Category::Mobility => LoadCategory::Mobility,
        }
    }
}

impl fmt::Display for LoadCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoadCategory::Strength => "strength",
            LoadCategory::Endurance => "endurance",
            LoadCategory::Mobility => "mobility",
        };
        f.write_str(name)
    }
}

/// Target vs. actual load for one category
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CategoryLoad {
    pub category: LoadCategory,
    pub target_load: f64,
    pub actual_load: f64,
    /// Volume per day, oldest first; the last point is today
    pub daily: Vec<f64>,
    /// Trailing moving average over the interval, aligned with `daily`
    pub moving_average: Vec<f64>,
    /// `actual / target × 100`, `None` when the target is zero
    pub completion: Option<f64>,
}

/// Daily step counts handed over by an external health integration
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct StepSeries {
    pub daily_goal: u32,
    pub days: Vec<(NaiveDate, u32)>,
}

/// Step totals rolled up like a category
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StepLoad {
    pub target_steps: f64,
    pub actual_steps: f64,
    pub daily: Vec<f64>,
    pub completion: Option<f64>,
}

/// Everything the statistics view needs for one interval
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LoadReport {
    pub interval_days: u32,
    pub categories: Vec<CategoryLoad>,
    pub steps: Option<StepLoad>,
    /// Mean of the applicable completion percentages, capped at 100
    pub combined_score: u32,
}

impl LoadReport {
    pub fn category(&self, category: LoadCategory) -> Option<&CategoryLoad> {
        self.categories.iter().find(|c| c.category == category)
    }
}

/// Build the load report for all exercises as of `now`
pub fn load_report(
    exercises: &[Exercise],
    history: &HistoryMap,
    interval: TrainingInterval,
    now: DateTime<Utc>,
    steps: Option<&StepSeries>,
) -> LoadReport {
    let days = interval.days() as usize;

    let categories: Vec<CategoryLoad> = LoadCategory::ALL
        .iter()
        .map(|&category| {
            let members: Vec<&Exercise> = exercises
                .iter()
                .filter(|e| LoadCategory::of(e.category()) == category)
                .collect();

            let target_load: f64 = members.iter().map(|e| e.target_volume()).sum();

            let daily = bucket_by_day(&members, history, now, days);
            let actual_load: f64 = daily.iter().sum();

            let extended = bucket_by_day(&members, history, now, days * 2);
            let smoothed = moving_average(&extended, days);
            let moving_average = smoothed[smoothed.len() - days..].to_vec();

            let completion = completion_percent(actual_load, target_load);

            tracing::debug!(
                "{} load: {:.1} of {:.1} over {} days",
                category,
                actual_load,
                target_load,
                days
            );

            CategoryLoad {
                category,
                target_load,
                actual_load,
                daily,
                moving_average,
                completion,
            }
        })
        .collect();

    let steps = steps.map(|series| step_load(series, now, days));

    let mut percentages: Vec<f64> = categories.iter().filter_map(|c| c.completion).collect();
    if let Some(step) = steps.as_ref().and_then(|s| s.completion) {
        percentages.push(step);
    }

    LoadReport {
        interval_days: interval.days(),
        categories,
        steps,
        combined_score: combined_score(&percentages),
    }
}

/// Calendar days between the entry and today, in UTC.
///
/// Charts bucket by whole days, so an entry from late on the seventh day back
/// falls outside a 7-day report even though the ledger, which measures
/// elapsed time, still credits it.
fn calendar_days_ago(now: DateTime<Utc>, date: NaiveDate) -> i64 {
    (now.date_naive() - date).num_days()
}

/// Index into a `days`-long series for an entry `days_ago` days old
fn day_index(days_ago: i64, days: usize) -> Option<usize> {
    // Entries dated later today or in the future land on today
    let days_ago = days_ago.max(0) as usize;
    (days_ago < days).then(|| days - days_ago - 1)
}

fn bucket_by_day(
    members: &[&Exercise],
    history: &HistoryMap,
    now: DateTime<Utc>,
    days: usize,
) -> Vec<f64> {
    let mut series = vec![0.0; days];

    for exercise in members {
        let Some(entries) = history.get(&exercise.id) else {
            continue;
        };
        for entry in entries.iter().filter(|e| exercise.accepts(&e.record)) {
            let age = calendar_days_ago(now, entry.date.date_naive());
            if let Some(index) = day_index(age, days) {
                series[index] += entry.volume();
            }
        }
    }

    series
}

fn step_load(series: &StepSeries, now: DateTime<Utc>, days: usize) -> StepLoad {
    let mut daily = vec![0.0; days];
    for (date, count) in &series.days {
        if let Some(index) = day_index(calendar_days_ago(now, *date), days) {
            daily[index] += f64::from(*count);
        }
    }

    let target_steps = f64::from(series.daily_goal) * days as f64;
    let actual_steps: f64 = daily.iter().sum();

    StepLoad {
        target_steps,
        actual_steps,
        completion: completion_percent(actual_steps, target_steps),
        daily,
    }
}

/// Trailing moving average: `MA[i] = mean(series[max(0, i − window + 1) ..= i])`
pub fn moving_average(series: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    (0..series.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            let slice = &series[start..=i];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}

/// Completion percentage, `None` when there is no target to complete
pub fn completion_percent(actual: f64, target: f64) -> Option<f64> {
    let target = finite_non_negative(target);
    if target == 0.0 {
        return None;
    }
    Some(finite_non_negative(actual) / target * 100.0)
}

/// Average of the given percentages, capped to `[0, 100]` and rounded
pub fn combined_score(percentages: &[f64]) -> u32 {
    let valid: Vec<f64> = percentages
        .iter()
        .copied()
        .filter(|p| p.is_finite())
        .collect();
    if valid.is_empty() {
        return 0;
    }
    let mean = valid.iter().sum::<f64>() / valid.len() as f64;
    mean.clamp(0.0, 100.0).round() as u32
}
