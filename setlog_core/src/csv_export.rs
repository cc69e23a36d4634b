//! Flat CSV export of the workout history.
//!
//! One row per history entry, oldest first, with the exercise name and
//! category resolved so the file can be opened in a spreadsheet directly.

use crate::store::Library;
use crate::{EntryRecord, Result};
use std::path::Path;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow<'a> {
    entry_id: String,
    exercise_id: String,
    exercise: &'a str,
    category: &'static str,
    muscle_group: &'a str,
    date: String,
    volume: f64,
    sets: Option<f64>,
    reps: Option<f64>,
    weight: Option<f64>,
    distance: Option<f64>,
    time: Option<f64>,
    avg_heart_rate: Option<f64>,
    notes: &'a str,
}

/// Write every history entry of `library` to `csv_path`, replacing the file
///
/// Returns the number of rows written. Entries without a matching exercise
/// are skipped.
pub fn export_history_csv(library: &Library, csv_path: &Path) -> Result<usize> {
    let mut rows = Vec::new();

    for (exercise_id, entries) in &library.history {
        let Some(exercise) = library.exercise(*exercise_id) else {
            tracing::warn!(
                "Skipping {} entries for unknown exercise {}",
                entries.len(),
                exercise_id
            );
            continue;
        };

        for entry in entries {
            let (mut sets, mut reps, mut weight) = (None, None, None);
            let (mut distance, mut time, mut avg_heart_rate) = (None, None, None);
            match &entry.record {
                EntryRecord::Strength {
                    sets: s,
                    reps: r,
                    weight: w,
                } => {
                    sets = Some(*s);
                    reps = Some(*r);
                    weight = Some(*w);
                }
                EntryRecord::Endurance {
                    distance: d,
                    time: t,
                    avg_heart_rate: hr,
                } => {
                    distance = Some(*d);
                    time = Some(*t);
                    avg_heart_rate = *hr;
                }
                EntryRecord::Mobility { sets: s } => sets = Some(*s),
            }

            rows.push((
                entry.date,
                CsvRow {
                    entry_id: entry.id.to_string(),
                    exercise_id: exercise_id.to_string(),
                    exercise: &exercise.name,
                    category: exercise.category().as_str(),
                    muscle_group: &exercise.muscle_group,
                    date: entry.date.to_rfc3339(),
                    volume: entry.volume(),
                    sets,
                    reps,
                    weight,
                    distance,
                    time,
                    avg_heart_rate,
                    notes: &entry.notes,
                },
            ));
        }
    }

    rows.sort_by(|(a, row_a), (b, row_b)| a.cmp(b).then_with(|| row_a.entry_id.cmp(&row_b.entry_id)));

    if let Some(parent) = csv_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = std::fs::File::create(csv_path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(file);

    for (_, row) in &rows {
        writer.serialize(row)?;
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    file.sync_all()?;

    tracing::info!("Wrote {} history rows to {:?}", rows.len(), csv_path);

    Ok(rows.len())
}
