//! The user's library: exercises, history, plan and settings.
//!
//! This module owns every mutation the front end can make and keeps the
//! library consistent: history always matches its exercise's category,
//! deleting an exercise deletes its history, and priority or budget changes
//! reallocate the affected muscle group.
//!
//! Persistence uses a single JSON document with file locking; import/export
//! reuse the same document format.

use crate::plan::{group_key, VolumePlan};
use crate::{
    Category, Error, Exercise, HistoryEntry, HistoryMap, Result, TrainingInterval, MAX_PRIORITY,
};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use uuid::Uuid;

/// Document format version written by this build
pub const LIBRARY_VERSION: u32 = 1;

fn current_version() -> u32 {
    LIBRARY_VERSION
}

/// User-adjustable settings stored with the library
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct Settings {
    #[serde(default)]
    pub training_interval: TrainingInterval,
}

/// Everything the app persists
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Library {
    #[serde(default = "current_version")]
    pub version: u32,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub exercises: Vec<Exercise>,
    #[serde(default)]
    pub history: HistoryMap,
    #[serde(default)]
    pub plan: VolumePlan,
}

impl Default for Library {
    fn default() -> Self {
        Self {
            version: LIBRARY_VERSION,
            settings: Settings::default(),
            exercises: Vec::new(),
            history: HistoryMap::new(),
            plan: VolumePlan::new(),
        }
    }
}

impl Library {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn training_interval(&self) -> TrainingInterval {
        self.settings.training_interval
    }

    pub fn set_training_interval(&mut self, interval: TrainingInterval) {
        tracing::info!("Training interval set to {} days", interval.days());
        self.settings.training_interval = interval;
    }

    // ------------------------------------------------------------------
    // Exercises
    // ------------------------------------------------------------------

    pub fn exercise(&self, id: Uuid) -> Option<&Exercise> {
        self.exercises.iter().find(|e| e.id == id)
    }

    /// Look up an exercise by id, unique id prefix, or case-insensitive name
    pub fn find_exercise(&self, query: &str) -> Result<&Exercise> {
        let query = query.trim();

        if let Ok(id) = Uuid::parse_str(query) {
            if let Some(exercise) = self.exercise(id) {
                return Ok(exercise);
            }
        }

        if let Some(exercise) = self
            .exercises
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(query))
        {
            return Ok(exercise);
        }

        if query.len() >= 4 {
            let prefix = query.to_lowercase();
            let matches: Vec<&Exercise> = self
                .exercises
                .iter()
                .filter(|e| e.id.to_string().starts_with(&prefix))
                .collect();
            match matches.as_slice() {
                [only] => return Ok(only),
                [] => {}
                _ => {
                    return Err(Error::Validation(format!(
                        "id prefix '{}' matches {} exercises",
                        query,
                        matches.len()
                    )))
                }
            }
        }

        Err(Error::NotFound(format!("no exercise matches '{}'", query)))
    }

    /// Add an exercise and reallocate its muscle group if it has a budget
    pub fn add_exercise(&mut self, exercise: Exercise) -> Result<Uuid> {
        exercise.validate()?;
        if self
            .exercises
            .iter()
            .any(|e| e.id == exercise.id || e.name.eq_ignore_ascii_case(&exercise.name))
        {
            return Err(Error::Validation(format!(
                "an exercise named '{}' already exists",
                exercise.name
            )));
        }

        let id = exercise.id;
        let (category, group) = (exercise.category(), exercise.muscle_group.clone());
        tracing::info!("Added {} exercise '{}'", category, exercise.name);
        self.exercises.push(exercise);
        self.plan.rebalance_group(&mut self.exercises, category, &group);
        Ok(id)
    }

    /// Replace an exercise's definition; the category cannot change
    pub fn update_exercise(&mut self, updated: Exercise) -> Result<()> {
        updated.validate()?;
        let index = self.index_of(updated.id)?;

        let previous = &self.exercises[index];
        if previous.category() != updated.category() {
            return Err(Error::Validation(format!(
                "'{}' is a {} exercise and cannot become {}",
                previous.name,
                previous.category(),
                updated.category()
            )));
        }
        if self
            .exercises
            .iter()
            .any(|e| e.id != updated.id && e.name.eq_ignore_ascii_case(&updated.name))
        {
            return Err(Error::Validation(format!(
                "an exercise named '{}' already exists",
                updated.name
            )));
        }

        let category = updated.category();
        let old_group = previous.muscle_group.clone();
        let new_group = updated.muscle_group.clone();
        self.exercises[index] = updated;

        self.plan.rebalance_group(&mut self.exercises, category, &new_group);
        if group_key(&old_group) != group_key(&new_group) {
            self.plan.rebalance_group(&mut self.exercises, category, &old_group);
        }
        Ok(())
    }

    /// Remove an exercise together with its history
    pub fn remove_exercise(&mut self, id: Uuid) -> Result<Exercise> {
        let index = self.index_of(id)?;
        let removed = self.exercises.remove(index);
        let entries = self.history.remove(&id).map(|h| h.len()).unwrap_or(0);

        tracing::info!(
            "Removed exercise '{}' and {} history entries",
            removed.name,
            entries
        );
        self.plan
            .rebalance_group(&mut self.exercises, removed.category(), &removed.muscle_group);
        Ok(removed)
    }

    /// Change an exercise's priority and reallocate its muscle group
    pub fn set_priority(&mut self, id: Uuid, priority: u8) -> Result<()> {
        if priority > MAX_PRIORITY {
            return Err(Error::Validation(format!(
                "priority must be between 0 and {}, got {}",
                MAX_PRIORITY, priority
            )));
        }
        let index = self.index_of(id)?;
        let exercise = &mut self.exercises[index];
        exercise.priority = priority;
        let (category, group) = (exercise.category(), exercise.muscle_group.clone());

        self.plan.rebalance_group(&mut self.exercises, category, &group);
        Ok(())
    }

    /// Set a muscle group's budget and reallocate it
    pub fn set_budget(&mut self, category: Category, muscle_group: &str, budget: u32) -> Result<()> {
        self.plan.set_budget(category, muscle_group, budget)?;
        self.plan
            .rebalance_group(&mut self.exercises, category, muscle_group);
        Ok(())
    }

    fn index_of(&self, id: Uuid) -> Result<usize> {
        self.exercises
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| Error::NotFound(format!("exercise {}", id)))
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    /// Entries for one exercise in insertion order
    pub fn history_for(&self, id: Uuid) -> &[HistoryEntry] {
        self.history.get(&id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Entries for one exercise, newest first
    pub fn recent_history(&self, id: Uuid) -> Vec<&HistoryEntry> {
        let mut entries: Vec<&HistoryEntry> = self.history_for(id).iter().collect();
        entries.sort_by(|a, b| b.date.cmp(&a.date));
        entries
    }

    fn checked_exercise(&self, exercise_id: Uuid, entry: &HistoryEntry) -> Result<&Exercise> {
        let exercise = self
            .exercise(exercise_id)
            .ok_or_else(|| Error::NotFound(format!("exercise {}", exercise_id)))?;
        if !exercise.accepts(&entry.record) {
            return Err(Error::CategoryMismatch {
                exercise: exercise.name.clone(),
                expected: exercise.category().record_category().to_string(),
                found: entry.category().to_string(),
            });
        }
        Ok(exercise)
    }

    /// Append a history entry to an exercise
    pub fn log_entry(&mut self, exercise_id: Uuid, entry: HistoryEntry) -> Result<Uuid> {
        let name = self.checked_exercise(exercise_id, &entry)?.name.clone();
        let id = entry.id;
        tracing::info!("Logged {:.1} volume for '{}'", entry.volume(), name);
        self.history.entry(exercise_id).or_default().push(entry);
        Ok(id)
    }

    /// Replace a history entry, matched by its id
    pub fn update_entry(&mut self, exercise_id: Uuid, entry: HistoryEntry) -> Result<()> {
        self.checked_exercise(exercise_id, &entry)?;
        let slot = self
            .history
            .get_mut(&exercise_id)
            .and_then(|entries| entries.iter_mut().find(|e| e.id == entry.id))
            .ok_or_else(|| Error::NotFound(format!("history entry {}", entry.id)))?;
        *slot = entry;
        Ok(())
    }

    pub fn delete_entry(&mut self, exercise_id: Uuid, entry_id: Uuid) -> Result<HistoryEntry> {
        let entries = self
            .history
            .get_mut(&exercise_id)
            .ok_or_else(|| Error::NotFound(format!("history for exercise {}", exercise_id)))?;
        let index = entries
            .iter()
            .position(|e| e.id == entry_id)
            .ok_or_else(|| Error::NotFound(format!("history entry {}", entry_id)))?;
        let removed = entries.remove(index);
        if entries.is_empty() {
            self.history.remove(&exercise_id);
        }
        Ok(removed)
    }

    /// Drop history for exercises that no longer exist and entries whose
    /// shape doesn't match their exercise. Returns the number of entries dropped.
    pub fn prune_orphans(&mut self) -> usize {
        let exercises = &self.exercises;
        let mut dropped = 0;

        self.history.retain(|id, entries| {
            match exercises.iter().find(|e| &e.id == id) {
                Some(exercise) => {
                    let before = entries.len();
                    entries.retain(|entry| exercise.accepts(&entry.record));
                    dropped += before - entries.len();
                    !entries.is_empty()
                }
                None => {
                    dropped += entries.len();
                    false
                }
            }
        });

        if dropped > 0 {
            tracing::warn!("Pruned {} orphaned history entries", dropped);
        }
        dropped
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Load the library from a file with shared locking
    ///
    /// Returns an empty library if the file doesn't exist. A file that exists
    /// but cannot be opened or read is an error, so the caller never saves
    /// over it. A file that reads but does not parse is renamed to
    /// `<name>.corrupt-<timestamp>` and an empty library is returned.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("No library file found, starting empty");
            return Ok(Self::default());
        }

        let file = File::open(path)?;
        file.lock_shared()?;

        let mut contents = Vec::new();
        let read = std::io::BufReader::new(&file).read_to_end(&mut contents);
        file.unlock()?;
        read?;

        match serde_json::from_slice::<Library>(&contents) {
            Ok(library) => {
                tracing::debug!(
                    "Loaded {} exercises from {:?}",
                    library.exercises.len(),
                    path
                );
                Ok(library)
            }
            Err(e) => {
                let backup = quarantine(path)?;
                tracing::warn!(
                    "Failed to parse library {:?}: {}. Moved it to {:?}, starting empty.",
                    path,
                    e,
                    backup
                );
                Ok(Self::default())
            }
        }
    }

    /// Save the library with exclusive locking
    ///
    /// Atomically writes by:
    /// 1. Writing to a temp file
    /// 2. Syncing to disk
    /// 3. Renaming over the original
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string(self)?;
        write_atomic(path, contents.as_bytes())?;
        tracing::debug!("Saved library to {:?}", path);
        Ok(())
    }

    /// Load, modify and save the library
    pub fn update<F>(path: &Path, f: F) -> Result<Self>
    where
        F: FnOnce(&mut Library) -> Result<()>,
    {
        let mut library = Self::load(path)?;
        f(&mut library)?;
        library.save(path)?;
        Ok(library)
    }

    /// Write a pretty-printed export document
    pub fn export_document(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        write_atomic(path, contents.as_bytes())?;
        tracing::info!("Exported {} exercises to {:?}", self.exercises.len(), path);
        Ok(())
    }

    /// Read an export document.
    ///
    /// Unlike [`Library::load`] a malformed document is an error. Invalid
    /// exercises are dropped with a warning and orphaned history is pruned.
    pub fn import_document(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut library: Library = serde_json::from_str(&contents)?;

        if library.version > LIBRARY_VERSION {
            return Err(Error::Validation(format!(
                "document version {} is newer than supported version {}",
                library.version, LIBRARY_VERSION
            )));
        }
        library.version = LIBRARY_VERSION;

        library.exercises.retain(|exercise| match exercise.validate() {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Dropping imported exercise '{}': {}", exercise.name, e);
                false
            }
        });
        library.prune_orphans();

        tracing::info!(
            "Imported {} exercises from {:?}",
            library.exercises.len(),
            path
        );
        Ok(library)
    }
}

/// Move an unreadable library out of the way, keeping its bytes
fn quarantine(path: &Path) -> Result<PathBuf> {
    let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%.3f");
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "library.json".into());
    name.push(format!(".corrupt-{}", stamp));

    let backup = path.with_file_name(name);
    std::fs::rename(path, &backup)?;
    Ok(backup)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    // Unique temp file in the same directory for an atomic rename
    let temp = NamedTempFile::new_in(parent)?;
    temp.as_file().lock_exclusive()?;

    {
        let mut writer = std::io::BufWriter::new(temp.as_file());
        writer.write_all(bytes)?;
        writer.flush()?;
    }

    temp.as_file().sync_all()?;
    temp.as_file().unlock()?;

    temp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}
