//! External step-count loader.
//!
//! Step counts come from a health platform export and are handed to the
//! statistics engine as one more category-like series.

use crate::stats::StepSeries;
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::Path;

/// Step export file format (matches the health integration output)
#[derive(Debug, Deserialize)]
struct StepFile {
    #[serde(default)]
    daily_goal: Option<u32>,
    days: Vec<StepDay>,
}

#[derive(Debug, Deserialize)]
struct StepDay {
    date: NaiveDate,
    steps: u32,
}

/// Load a step series from a JSON file
///
/// Returns None when the file is missing or unusable;
/// a broken export never blocks the statistics view. `default_goal` applies
/// when the file carries no goal of its own.
pub fn load_step_series(path: &Path, default_goal: u32) -> Option<StepSeries> {
    if !path.exists() {
        tracing::debug!("No step export found at {:?}", path);
        return None;
    }

    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            tracing::warn!(
                "Failed to read step export at {:?}: {}. Ignoring steps.",
                path,
                e
            );
            return None;
        }
    };

    let file: StepFile = match serde_json::from_str(&contents) {
        Ok(file) => file,
        Err(e) => {
            tracing::warn!(
                "Failed to parse step export at {:?}: {}. Ignoring steps.",
                path,
                e
            );
            return None;
        }
    };

    let series = StepSeries {
        daily_goal: file.daily_goal.unwrap_or(default_goal),
        days: file.days.into_iter().map(|d| (d.date, d.steps)).collect(),
    };

    tracing::info!(
        "Loaded {} day(s) of steps, goal {}",
        series.days.len(),
        series.daily_goal
    );

    Some(series)
}
