//! Suggested workout generation.
//!
//! Exercises are ranked by outstanding volume (largest debt first), a bounded
//! number is picked per category, and each pick gets a per-session amount.
//! Ranked exercises that did not make the cut are kept as a reserve so a
//! removed pick can be replaced without re-ranking.

use crate::ledger::VolumeLedger;
use crate::plan::group_key;
use crate::{Category, Error, Exercise, ExerciseKind, HistoryMap, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Caps and per-session amounts for the suggestion engine
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SuggestionLimits {
    #[serde(default = "default_strength_cap")]
    pub strength: usize,
    #[serde(default = "default_nsuns_cap")]
    pub nsuns: usize,
    #[serde(default = "default_endurance_cap")]
    pub endurance: usize,
    #[serde(default = "default_mobility_cap")]
    pub mobility: usize,

    /// Sets suggested per strength or nsuns pick
    #[serde(default = "default_strength_sets")]
    pub strength_sets: f64,
    /// Sets suggested per mobility pick
    #[serde(default = "default_mobility_sets")]
    pub mobility_sets: f64,
    /// Shortest distance suggested for an endurance pick
    #[serde(default = "default_endurance_min_distance")]
    pub endurance_min_distance: f64,

    /// Restrict strength picks to the muscle group of the nsuns pick, or
    /// keep them off nsuns muscle groups when no nsuns work is due
    #[serde(default = "default_pair_program_with_strength")]
    pub pair_program_with_strength: bool,
}

impl Default for SuggestionLimits {
    fn default() -> Self {
        Self {
            strength: default_strength_cap(),
            nsuns: default_nsuns_cap(),
            endurance: default_endurance_cap(),
            mobility: default_mobility_cap(),
            strength_sets: default_strength_sets(),
            mobility_sets: default_mobility_sets(),
            endurance_min_distance: default_endurance_min_distance(),
            pair_program_with_strength: default_pair_program_with_strength(),
        }
    }
}

fn default_strength_cap() -> usize {
    4
}

fn default_nsuns_cap() -> usize {
    1
}

fn default_endurance_cap() -> usize {
    1
}

fn default_mobility_cap() -> usize {
    4
}

fn default_strength_sets() -> f64 {
    4.0
}

fn default_mobility_sets() -> f64 {
    3.0
}

fn default_endurance_min_distance() -> f64 {
    4.0
}

fn default_pair_program_with_strength() -> bool {
    true
}

impl SuggestionLimits {
    /// Maximum number of picks for a category
    pub fn cap(&self, category: Category) -> usize {
        match category {
            Category::Strength => self.strength,
            Category::Nsuns => self.nsuns,
            Category::Endurance => self.endurance,
            Category::Mobility => self.mobility,
        }
    }
}

/// One exercise in a suggested workout
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SuggestedExercise {
    pub exercise_id: Uuid,
    pub name: String,
    pub category: Category,
    pub muscle_group: String,
    /// Outstanding volume at ranking time
    pub remaining: f64,
    /// Sets (or distance for endurance) to do in this session
    pub amount: f64,
}

/// Picks for one category plus the ranked reserve behind them
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WorkoutSection {
    pub category: Category,
    pub picks: Vec<SuggestedExercise>,
    pub reserve: Vec<SuggestedExercise>,
}

/// A grouped workout recommendation; may be empty
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct SuggestedWorkout {
    pub sections: Vec<WorkoutSection>,
    /// Inputs needed to re-pair strength with nsuns after a replacement
    #[serde(skip)]
    pairing: Option<StrengthPairing>,
}

/// Unfiltered strength ranking kept alongside a workout
#[derive(Clone, Debug, PartialEq, Default)]
struct StrengthPairing {
    strength_cap: usize,
    /// Muscle groups of every nsuns exercise, keyed by [`group_key`]
    program_groups: HashSet<String>,
    ranked_strength: Vec<SuggestedExercise>,
    /// Strength exercises the user removed; never suggested again
    dismissed: HashSet<Uuid>,
}

/// Filter ranked strength candidates against the nsuns picks.
///
/// With nsuns picks, strength stays on their muscle groups. Without any,
/// strength stays off every nsuns muscle group.
fn pair_with_programs(
    candidates: &mut Vec<SuggestedExercise>,
    nsuns_picks: &[SuggestedExercise],
    program_groups: &HashSet<String>,
) {
    if nsuns_picks.is_empty() {
        candidates.retain(|c| !program_groups.contains(&group_key(&c.muscle_group)));
    } else {
        let picked: HashSet<String> = nsuns_picks
            .iter()
            .map(|p| group_key(&p.muscle_group))
            .collect();
        candidates.retain(|c| picked.contains(&group_key(&c.muscle_group)));
    }
}

fn split_section(category: Category, mut candidates: Vec<SuggestedExercise>, cap: usize) -> WorkoutSection {
    let cap = cap.min(candidates.len());
    let reserve = candidates.split_off(cap);
    WorkoutSection {
        category,
        picks: candidates,
        reserve,
    }
}

impl SuggestedWorkout {
    /// True when nothing is recommended
    pub fn is_empty(&self) -> bool {
        self.sections.iter().all(|s| s.picks.is_empty())
    }

    pub fn section(&self, category: Category) -> Option<&WorkoutSection> {
        self.sections.iter().find(|s| s.category == category)
    }

    /// All picks across sections, in section order
    pub fn picks(&self) -> impl Iterator<Item = &SuggestedExercise> {
        self.sections.iter().flat_map(|s| s.picks.iter())
    }

    /// Drop a pick and pull the next-ranked unused exercise of the same
    /// category into its slot.
    ///
    /// Returns the replacement, or `None` when the reserve is exhausted. A
    /// section left without picks is removed.
    pub fn remove_and_replace(&mut self, exercise_id: Uuid) -> Result<Option<SuggestedExercise>> {
        let (section_idx, pick_idx) = self
            .sections
            .iter()
            .enumerate()
            .find_map(|(si, section)| {
                section
                    .picks
                    .iter()
                    .position(|p| p.exercise_id == exercise_id)
                    .map(|pi| (si, pi))
            })
            .ok_or_else(|| {
                Error::NotFound(format!("exercise {} is not in the suggestion", exercise_id))
            })?;

        let section = &mut self.sections[section_idx];
        let removed = section.picks.remove(pick_idx);

        let replacement = if section.reserve.is_empty() {
            None
        } else {
            let next = section.reserve.remove(0);
            section.picks.insert(pick_idx, next.clone());
            Some(next)
        };

        tracing::debug!(
            "Removed '{}' from {} section, replacement: {:?}",
            removed.name,
            section.category,
            replacement.as_ref().map(|r| r.name.as_str())
        );

        let category = section.category;
        if section.picks.is_empty() {
            self.sections.remove(section_idx);
        }

        match category {
            Category::Strength => {
                if let Some(pairing) = self.pairing.as_mut() {
                    pairing.dismissed.insert(removed.exercise_id);
                }
            }
            Category::Nsuns => self.repair_strength(),
            _ => {}
        }

        Ok(replacement)
    }

    /// Rebuild the strength section after the nsuns picks changed
    fn repair_strength(&mut self) {
        let Some(pairing) = self.pairing.as_ref() else {
            return;
        };

        let nsuns_picks = self
            .section(Category::Nsuns)
            .map(|s| s.picks.as_slice())
            .unwrap_or_default();

        let mut candidates: Vec<SuggestedExercise> = pairing
            .ranked_strength
            .iter()
            .filter(|c| !pairing.dismissed.contains(&c.exercise_id))
            .cloned()
            .collect();
        pair_with_programs(&mut candidates, nsuns_picks, &pairing.program_groups);
        let strength = split_section(Category::Strength, candidates, pairing.strength_cap);

        tracing::debug!(
            "Re-paired strength section: {} pick(s)",
            strength.picks.len()
        );

        self.sections.retain(|s| s.category != Category::Strength);
        if !strength.picks.is_empty() {
            let at = usize::from(
                self.sections
                    .first()
                    .is_some_and(|s| s.category == Category::Nsuns),
            );
            self.sections.insert(at, strength);
        }
    }
}

/// Amount to suggest for one session of an exercise.
///
/// - endurance: `clamp(max(min_distance, floor(distance / interval × 3)), 0, remaining)`
/// - strength and nsuns: `min(strength_sets, remaining)`
/// - mobility: `min(mobility_sets, remaining)`
pub fn suggested_amount(
    exercise: &Exercise,
    remaining: f64,
    interval_days: u32,
    limits: &SuggestionLimits,
) -> f64 {
    let remaining = remaining.max(0.0);
    match exercise.kind {
        ExerciseKind::Endurance { distance } => {
            let per_session = (distance / f64::from(interval_days.max(1)) * 3.0).floor();
            per_session
                .max(limits.endurance_min_distance)
                .clamp(0.0, remaining)
        }
        ExerciseKind::Strength | ExerciseKind::Nsuns { .. } => limits.strength_sets.min(remaining),
        ExerciseKind::Mobility => limits.mobility_sets.min(remaining),
    }
}

/// Build a suggested workout from outstanding volume
pub fn suggest_workout(
    exercises: &[Exercise],
    history: &HistoryMap,
    ledger: &VolumeLedger,
    limits: &SuggestionLimits,
) -> SuggestedWorkout {
    let interval_days = ledger.interval().days();

    let ranked = |category: Category| -> Vec<SuggestedExercise> {
        let mut candidates: Vec<SuggestedExercise> = exercises
            .iter()
            .filter(|e| e.category() == category)
            .filter_map(|exercise| {
                let entries = history
                    .get(&exercise.id)
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                let remaining = ledger.remaining_volume(exercise, entries);
                (remaining > 0.0).then(|| SuggestedExercise {
                    exercise_id: exercise.id,
                    name: exercise.name.clone(),
                    category,
                    muscle_group: exercise.muscle_group.clone(),
                    remaining,
                    amount: suggested_amount(exercise, remaining, interval_days, limits),
                })
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.remaining
                .total_cmp(&a.remaining)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.exercise_id.cmp(&b.exercise_id))
        });
        candidates
    };

    let section =
        |category: Category, candidates| split_section(category, candidates, limits.cap(category));

    let nsuns = section(Category::Nsuns, ranked(Category::Nsuns));

    let ranked_strength = ranked(Category::Strength);
    let mut strength_candidates = ranked_strength.clone();
    let pairing = if limits.pair_program_with_strength {
        let program_groups: HashSet<String> = exercises
            .iter()
            .filter(|e| e.category() == Category::Nsuns)
            .map(|e| group_key(&e.muscle_group))
            .collect();
        pair_with_programs(&mut strength_candidates, &nsuns.picks, &program_groups);
        Some(StrengthPairing {
            strength_cap: limits.cap(Category::Strength),
            program_groups,
            ranked_strength,
            dismissed: HashSet::new(),
        })
    } else {
        None
    };

    let sections: Vec<WorkoutSection> = vec![
        nsuns,
        section(Category::Strength, strength_candidates),
        section(Category::Endurance, ranked(Category::Endurance)),
        section(Category::Mobility, ranked(Category::Mobility)),
    ]
    .into_iter()
    .filter(|s| !s.picks.is_empty())
    .collect();

    let workout = SuggestedWorkout { sections, pairing };
    tracing::info!(
        "Suggested {} exercise(s) across {} section(s)",
        workout.picks().count(),
        workout.sections.len()
    );
    workout
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::VolumePolicy;
    use crate::{EntryRecord, HistoryEntry, TrainingInterval};
    use chrono::{Duration, Utc};

    fn ledger() -> VolumeLedger {
        VolumeLedger::new(
            TrainingInterval::new(7).unwrap(),
            VolumePolicy::HardWindow,
            Utc::now(),
        )
    }

    fn strength(name: &str, group: &str, sets: u32) -> Exercise {
        Exercise::new(name, group, ExerciseKind::Strength).with_weekly_sets(sets)
    }

    fn program(name: &str, group: &str, sets: u32) -> Exercise {
        Exercise::new(
            name,
            group,
            ExerciseKind::Nsuns {
                one_rep_max: 100.0,
                workout: vec![],
            },
        )
        .with_weekly_sets(sets)
    }

    fn names(section: &WorkoutSection) -> Vec<&str> {
        section.picks.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn test_ranks_by_outstanding_volume() {
        let exercises = vec![
            strength("Curl", "arms", 6),
            strength("Bench", "chest", 12),
            strength("Row", "back", 9),
            strength("Done", "back", 3),
        ];
        let mut history = HistoryMap::new();
        history.insert(
            exercises[3].id,
            vec![HistoryEntry::new(Utc::now(), EntryRecord::strength(3.0, 8.0, 40.0))],
        );

        let workout = suggest_workout(&exercises, &history, &ledger(), &SuggestionLimits::default());
        let section = workout.section(Category::Strength).unwrap();

        assert_eq!(names(section), vec!["Bench", "Row", "Curl"]);
        assert!(section.reserve.is_empty());
        assert!(section.picks.iter().all(|p| p.amount == 4.0));
    }

    #[test]
    fn test_caps_and_reserve() {
        let exercises: Vec<Exercise> = (1..=6)
            .map(|i| strength(&format!("Lift {}", i), "back", i))
            .collect();
        let limits = SuggestionLimits::default();

        let workout = suggest_workout(&exercises, &HistoryMap::new(), &ledger(), &limits);
        let section = workout.section(Category::Strength).unwrap();

        assert_eq!(names(section), vec!["Lift 6", "Lift 5", "Lift 4", "Lift 3"]);
        let reserve: Vec<&str> = section.reserve.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(reserve, vec!["Lift 2", "Lift 1"]);
        // remaining 3 caps the suggested sets
        assert_eq!(section.picks[3].amount, 3.0);
    }

    #[test]
    fn test_remove_and_replace_keeps_section_size() {
        let exercises: Vec<Exercise> = (1..=6)
            .map(|i| strength(&format!("Lift {}", i), "back", i))
            .collect();
        let mut workout = suggest_workout(
            &exercises,
            &HistoryMap::new(),
            &ledger(),
            &SuggestionLimits::default(),
        );

        let removed = exercises[4].id; // Lift 5
        let replacement = workout.remove_and_replace(removed).unwrap().unwrap();
        assert_eq!(replacement.name, "Lift 2");

        let section = workout.section(Category::Strength).unwrap();
        assert_eq!(names(section), vec!["Lift 6", "Lift 2", "Lift 4", "Lift 3"]);

        workout.remove_and_replace(exercises[5].id).unwrap();
        let section = workout.section(Category::Strength).unwrap();
        assert_eq!(names(section), vec!["Lift 1", "Lift 2", "Lift 4", "Lift 3"]);

        // Reserve exhausted: the section shrinks
        assert!(workout.remove_and_replace(exercises[0].id).unwrap().is_none());
        assert_eq!(workout.section(Category::Strength).unwrap().picks.len(), 3);

        assert!(workout.remove_and_replace(Uuid::new_v4()).is_err());
    }

    #[test]
    fn test_empty_section_removed_after_last_pick() {
        let exercises = vec![Exercise::new("Hips", "hips", ExerciseKind::Mobility).with_weekly_sets(2)];
        let mut workout = suggest_workout(
            &exercises,
            &HistoryMap::new(),
            &ledger(),
            &SuggestionLimits::default(),
        );

        assert_eq!(workout.section(Category::Mobility).unwrap().picks[0].amount, 2.0);
        workout.remove_and_replace(exercises[0].id).unwrap();
        assert!(workout.is_empty());
        assert!(workout.sections.is_empty());
    }

    #[test]
    fn test_nsuns_pick_restricts_strength_to_its_group() {
        let exercises = vec![
            program("Bench program", "chest", 8),
            strength("Fly", "chest", 6),
            strength("Squat", "legs", 12),
        ];

        let workout = suggest_workout(
            &exercises,
            &HistoryMap::new(),
            &ledger(),
            &SuggestionLimits::default(),
        );

        assert_eq!(names(workout.section(Category::Nsuns).unwrap()), vec!["Bench program"]);
        assert_eq!(names(workout.section(Category::Strength).unwrap()), vec!["Fly"]);
    }

    #[test]
    fn test_satisfied_nsuns_excludes_its_group_from_strength() {
        let exercises = vec![
            program("Bench program", "Chest", 4),
            strength("Fly", "chest", 6),
            strength("Squat", "legs", 12),
        ];
        let mut history = HistoryMap::new();
        history.insert(
            exercises[0].id,
            vec![HistoryEntry::new(
                Utc::now() - Duration::days(1),
                EntryRecord::strength(4.0, 5.0, 80.0),
            )],
        );

        let workout = suggest_workout(&exercises, &history, &ledger(), &SuggestionLimits::default());

        assert!(workout.section(Category::Nsuns).is_none());
        assert_eq!(names(workout.section(Category::Strength).unwrap()), vec!["Squat"]);
    }

    #[test]
    fn test_pairing_rule_can_be_disabled() {
        let exercises = vec![
            program("Bench program", "chest", 8),
            strength("Fly", "chest", 6),
            strength("Squat", "legs", 12),
        ];
        let limits = SuggestionLimits {
            pair_program_with_strength: false,
            ..SuggestionLimits::default()
        };

        let workout = suggest_workout(&exercises, &HistoryMap::new(), &ledger(), &limits);
        assert_eq!(
            names(workout.section(Category::Strength).unwrap()),
            vec!["Squat", "Fly"]
        );
    }

    #[test]
    fn test_replacing_nsuns_pick_moves_strength_to_new_group() {
        let exercises = vec![
            program("Bench program", "chest", 8),
            program("Squat program", "legs", 6),
            strength("Fly", "chest", 6),
            strength("Leg Press", "legs", 9),
        ];
        let mut workout = suggest_workout(
            &exercises,
            &HistoryMap::new(),
            &ledger(),
            &SuggestionLimits::default(),
        );
        assert_eq!(names(workout.section(Category::Strength).unwrap()), vec!["Fly"]);

        let replacement = workout.remove_and_replace(exercises[0].id).unwrap().unwrap();
        assert_eq!(replacement.name, "Squat program");
        assert_eq!(names(workout.section(Category::Nsuns).unwrap()), vec!["Squat program"]);
        assert_eq!(
            names(workout.section(Category::Strength).unwrap()),
            vec!["Leg Press"]
        );
    }

    #[test]
    fn test_removing_last_nsuns_pick_excludes_program_groups() {
        let exercises = vec![
            program("Bench program", "chest", 8),
            strength("Fly", "chest", 6),
            strength("Squat", "legs", 12),
        ];
        let mut workout = suggest_workout(
            &exercises,
            &HistoryMap::new(),
            &ledger(),
            &SuggestionLimits::default(),
        );
        assert_eq!(names(workout.section(Category::Strength).unwrap()), vec!["Fly"]);

        assert!(workout.remove_and_replace(exercises[0].id).unwrap().is_none());
        assert!(workout.section(Category::Nsuns).is_none());
        assert_eq!(workout.sections[0].category, Category::Strength);
        assert_eq!(names(workout.section(Category::Strength).unwrap()), vec!["Squat"]);
    }

    #[test]
    fn test_removed_strength_stays_out_after_nsuns_change() {
        let exercises = vec![
            program("Bench program", "chest", 8),
            program("Incline program", "chest", 6),
            strength("Fly", "chest", 6),
            strength("Dip", "chest", 5),
        ];
        let mut workout = suggest_workout(
            &exercises,
            &HistoryMap::new(),
            &ledger(),
            &SuggestionLimits::default(),
        );

        workout.remove_and_replace(exercises[2].id).unwrap();
        assert_eq!(names(workout.section(Category::Strength).unwrap()), vec!["Dip"]);

        workout.remove_and_replace(exercises[0].id).unwrap();
        assert_eq!(names(workout.section(Category::Nsuns).unwrap()), vec!["Incline program"]);
        assert_eq!(names(workout.section(Category::Strength).unwrap()), vec!["Dip"]);
    }

    #[test]
    fn test_endurance_amount() {
        let limits = SuggestionLimits::default();
        let long = Exercise::new("Run", "legs", ExerciseKind::Endurance { distance: 35.0 });
        let short = Exercise::new("Row", "back", ExerciseKind::Endurance { distance: 7.0 });

        // floor(35 / 7 × 3) = 15
        assert_eq!(suggested_amount(&long, 35.0, 7, &limits), 15.0);
        assert_eq!(suggested_amount(&long, 9.5, 7, &limits), 9.5);
        // floor(7 / 7 × 3) = 3, raised to the 4 km minimum
        assert_eq!(suggested_amount(&short, 7.0, 7, &limits), 4.0);
        assert_eq!(suggested_amount(&short, -2.0, 7, &limits), 0.0);
    }

    #[test]
    fn test_nothing_due_gives_empty_workout() {
        let exercises = vec![strength("Idle", "arms", 0)];
        let workout = suggest_workout(
            &exercises,
            &HistoryMap::new(),
            &ledger(),
            &SuggestionLimits::default(),
        );
        assert!(workout.is_empty());
        assert_eq!(workout.picks().count(), 0);
    }
}
