//! Per-muscle-group volume budgets.
//!
//! The plan is owned by the caller (normally the [`Library`](crate::store::Library))
//! and every change triggers a full reallocation for the affected group.

use crate::allocator::allocate;
use crate::{Category, Error, Exercise, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Volume budget per category and muscle group
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct VolumePlan {
    #[serde(default)]
    budgets: BTreeMap<Category, BTreeMap<String, u32>>,
}

/// Muscle groups are free text; budgets match them case-insensitively
pub fn group_key(muscle_group: &str) -> String {
    muscle_group.trim().to_lowercase()
}

fn in_group(exercise: &Exercise, category: Category, key: &str) -> bool {
    exercise.category() == category && group_key(&exercise.muscle_group) == key
}

impl VolumePlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the budget for one muscle group.
    ///
    /// Endurance targets are per-exercise distances, so they take no budget.
    pub fn set_budget(&mut self, category: Category, muscle_group: &str, budget: u32) -> Result<()> {
        if category == Category::Endurance {
            return Err(Error::Validation(
                "endurance targets are distances set per exercise, not set budgets".into(),
            ));
        }
        let key = group_key(muscle_group);
        if key.is_empty() {
            return Err(Error::Validation("muscle group is empty".into()));
        }
        self.budgets.entry(category).or_default().insert(key, budget);
        Ok(())
    }

    pub fn remove_budget(&mut self, category: Category, muscle_group: &str) -> Option<u32> {
        let groups = self.budgets.get_mut(&category)?;
        let removed = groups.remove(&group_key(muscle_group));
        if groups.is_empty() {
            self.budgets.remove(&category);
        }
        removed
    }

    pub fn budget(&self, category: Category, muscle_group: &str) -> Option<u32> {
        self.budgets
            .get(&category)
            .and_then(|groups| groups.get(&group_key(muscle_group)))
            .copied()
    }

    /// All budgets as `(category, muscle group, sets)`
    pub fn budgets(&self) -> impl Iterator<Item = (Category, &str, u32)> + '_ {
        self.budgets.iter().flat_map(|(category, groups)| {
            groups
                .iter()
                .map(move |(group, budget)| (*category, group.as_str(), *budget))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.budgets.is_empty()
    }

    /// Reallocate `weekly_sets` for one muscle group.
    ///
    /// Returns false when the group has no budget; its exercises keep their
    /// manually set targets.
    pub fn rebalance_group(
        &self,
        exercises: &mut [Exercise],
        category: Category,
        muscle_group: &str,
    ) -> bool {
        let Some(budget) = self.budget(category, muscle_group) else {
            tracing::debug!(
                "No {} budget for '{}', leaving targets untouched",
                category,
                muscle_group
            );
            return false;
        };

        let key = group_key(muscle_group);
        allocate(
            exercises.iter_mut().filter(|e| in_group(e, category, &key)),
            budget,
        );
        tracing::info!(
            "Rebalanced {} '{}' with a budget of {} sets",
            category,
            key,
            budget
        );
        true
    }

    /// Reallocate every budgeted muscle group
    pub fn rebalance_all(&self, exercises: &mut [Exercise]) {
        for (category, group, _) in self.budgets() {
            self.rebalance_group(exercises, category, group);
        }
    }
}
