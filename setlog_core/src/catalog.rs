//! Starter exercises offered during onboarding.
//!
//! Templates carry a suggested priority; weekly targets come from the
//! default plan budgets once the chosen templates are instantiated.

use crate::plan::{group_key, VolumePlan};
use crate::types::*;
use once_cell::sync::Lazy;
use std::collections::HashSet;

/// An exercise definition without an id
#[derive(Clone, Debug)]
pub struct ExerciseTemplate {
    pub name: &'static str,
    pub description: &'static str,
    pub muscle_group: &'static str,
    pub priority: u8,
    pub kind: ExerciseKind,
}

impl ExerciseTemplate {
    fn new(name: &'static str, muscle_group: &'static str, priority: u8, kind: ExerciseKind) -> Self {
        Self {
            name,
            description: "",
            muscle_group,
            priority,
            kind,
        }
    }

    fn described(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Create a concrete exercise with a fresh id
    pub fn instantiate(&self) -> Exercise {
        Exercise::new(self.name, self.muscle_group, self.kind.clone())
            .with_description(self.description)
            .with_priority(self.priority)
    }
}

/// Cached starter templates - built once and reused
static STARTER_TEMPLATES: Lazy<Vec<ExerciseTemplate>> = Lazy::new(build_starter_templates);

/// Get the cached starter templates
pub fn starter_templates() -> &'static [ExerciseTemplate] {
    &STARTER_TEMPLATES
}

fn build_starter_templates() -> Vec<ExerciseTemplate> {
    use ExerciseKind::{Endurance, Mobility, Strength};

    vec![
        // Chest
        ExerciseTemplate::new("Bench Press", "chest", 3, Strength)
            .described("Barbell flat bench press"),
        ExerciseTemplate::new("Incline Dumbbell Press", "chest", 2, Strength),
        ExerciseTemplate::new("Cable Fly", "chest", 1, Strength),
        // Back
        ExerciseTemplate::new("Pull-up", "back", 3, Strength),
        ExerciseTemplate::new("Barbell Row", "back", 2, Strength),
        ExerciseTemplate::new("Face Pull", "back", 1, Strength),
        // Legs
        ExerciseTemplate::new("Back Squat", "legs", 3, Strength),
        ExerciseTemplate::new("Romanian Deadlift", "legs", 2, Strength),
        ExerciseTemplate::new("Leg Curl", "legs", 1, Strength),
        // Shoulders
        ExerciseTemplate::new("Overhead Press", "shoulders", 3, Strength),
        ExerciseTemplate::new("Lateral Raise", "shoulders", 2, Strength),
        // Arms
        ExerciseTemplate::new("Biceps Curl", "arms", 2, Strength),
        ExerciseTemplate::new("Triceps Pushdown", "arms", 2, Strength),
        // Endurance, distance in km per interval
        ExerciseTemplate::new("Running", "cardio", 0, Endurance { distance: 15.0 })
            .described("Easy-pace runs"),
        ExerciseTemplate::new("Cycling", "cardio", 0, Endurance { distance: 40.0 }),
        // Mobility
        ExerciseTemplate::new("Hip CARs", "hips", 1, Mobility)
            .described("Controlled articular rotations, 3 each side"),
        ExerciseTemplate::new("Couch Stretch", "hips", 1, Mobility),
        ExerciseTemplate::new("Shoulder CARs", "shoulders", 1, Mobility),
        ExerciseTemplate::new("Thoracic Rotation", "spine", 1, Mobility),
    ]
}

/// Budgets matching the starter templates
pub fn default_plan() -> VolumePlan {
    let mut plan = VolumePlan::new();
    let budgets = [
        (Category::Strength, "chest", 12),
        (Category::Strength, "back", 14),
        (Category::Strength, "legs", 12),
        (Category::Strength, "shoulders", 8),
        (Category::Strength, "arms", 8),
        (Category::Mobility, "hips", 4),
        (Category::Mobility, "shoulders", 3),
        (Category::Mobility, "spine", 3),
    ];
    for (category, group, sets) in budgets {
        if let Err(e) = plan.set_budget(category, group, sets) {
            tracing::warn!("Skipping default budget for {}: {}", group, e);
        }
    }
    plan
}

/// Instantiate the chosen templates and allocate their targets from `plan`
pub fn onboard<'a, I>(templates: I, plan: &VolumePlan) -> Vec<Exercise>
where
    I: IntoIterator<Item = &'a ExerciseTemplate>,
{
    let mut exercises: Vec<Exercise> = templates
        .into_iter()
        .map(ExerciseTemplate::instantiate)
        .collect();
    plan.rebalance_all(&mut exercises);
    tracing::info!("Onboarded {} exercises", exercises.len());
    exercises
}

/// Validate templates for consistency
///
/// Returns a list of validation errors, or empty Vec if valid.
pub fn validate_templates(templates: &[ExerciseTemplate], plan: &VolumePlan) -> Vec<String> {
    let mut errors = Vec::new();
    let mut names = HashSet::new();

    for template in templates {
        if template.name.trim().is_empty() {
            errors.push("Template has empty name".to_string());
        }
        if !names.insert(template.name.to_lowercase()) {
            errors.push(format!("Duplicate template name '{}'", template.name));
        }
        if let Err(e) = template.instantiate().validate() {
            errors.push(format!("Template '{}': {}", template.name, e));
        }
    }

    for (category, group, _) in plan.budgets() {
        let covered = templates.iter().any(|t| {
            t.priority > 0
                && t.instantiate().category() == category
                && group_key(t.muscle_group) == group
        });
        if !covered {
            errors.push(format!(
                "Budget for {} '{}' has no prioritized template",
                category, group
            ));
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starter_templates_cover_categories() {
        let templates = starter_templates();
        for category in [Category::Strength, Category::Endurance, Category::Mobility] {
            assert!(
                templates
                    .iter()
                    .any(|t| t.instantiate().category() == category),
                "no {} template",
                category
            );
        }
    }

    #[test]
    fn test_default_catalog_validates() {
        let errors = validate_templates(starter_templates(), &default_plan());
        assert!(
            errors.is_empty(),
            "Starter templates have validation errors: {:?}",
            errors
        );
    }

    #[test]
    fn test_validate_reports_uncovered_budget() {
        let mut plan = VolumePlan::new();
        plan.set_budget(Category::Strength, "calves", 6).unwrap();
        let errors = validate_templates(starter_templates(), &plan);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("calves"));
    }

    #[test]
    fn test_onboard_allocates_budgets() {
        let plan = default_plan();
        let exercises = onboard(starter_templates(), &plan);

        assert_eq!(exercises.len(), starter_templates().len());

        let chest: Vec<u32> = exercises
            .iter()
            .filter(|e| e.category() == Category::Strength && e.muscle_group == "chest")
            .map(|e| e.weekly_sets)
            .collect();
        assert_eq!(chest, vec![6, 4, 2]);

        for (category, group, budget) in plan.budgets() {
            let total: u32 = exercises
                .iter()
                .filter(|e| e.category() == category && e.muscle_group == group)
                .map(|e| e.weekly_sets)
                .sum();
            assert_eq!(total, budget, "{} {}", category, group);
        }

        let running = exercises.iter().find(|e| e.name == "Running").unwrap();
        assert_eq!(running.target_volume(), 15.0);
    }

    #[test]
    fn test_instantiate_gives_fresh_ids() {
        let template = &starter_templates()[0];
        assert_ne!(template.instantiate().id, template.instantiate().id);
    }
}
