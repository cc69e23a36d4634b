//! Priority-weighted distribution of a muscle group's volume budget.
//!
//! Each selected exercise (priority > 0) receives `floor(priority / total × budget)`
//! sets, but never fewer than one while the budget allows it. Leftover units go
//! to the largest fractional remainders, ties broken by original order, so the
//! distributed total always equals the budget.
//!
//! Shares are computed with integer arithmetic: the fractional part of
//! `w × budget / total` is compared through its numerator, which keeps ties exact.

use crate::Exercise;
use std::cmp::Reverse;

/// Split `budget` across `weights`.
///
/// Positive weights share the budget proportionally; zero weights receive
/// nothing. When every weight is zero the budget is split evenly, with the
/// first `budget mod n` slots getting one extra unit. The result sums to
/// `budget` for any non-empty input.
pub fn distribute(weights: &[u32], budget: u32) -> Vec<u32> {
    let n = weights.len();
    if n == 0 {
        return Vec::new();
    }

    let total: u64 = weights.iter().map(|&w| u64::from(w)).sum();
    if total == 0 {
        return distribute_evenly(n, budget);
    }

    let budget_wide = u64::from(budget);
    let scaled: Vec<u64> = weights.iter().map(|&w| u64::from(w) * budget_wide).collect();

    let positive = weights.iter().filter(|&&w| w > 0).count();
    // Below one unit per selected slot the floor cannot hold for everyone
    let min_share: u64 = if budget_wide >= positive as u64 { 1 } else { 0 };

    let mut shares: Vec<u64> = weights
        .iter()
        .zip(&scaled)
        .map(|(&w, &s)| {
            if w == 0 {
                0
            } else {
                (s / total).max(1)
            }
        })
        .collect();

    // exact − share, scaled by `total`
    let surplus = |shares: &[u64], i: usize| -> i128 {
        i128::from(scaled[i]) - i128::from(shares[i]) * i128::from(total)
    };

    let assigned: u64 = shares.iter().sum();

    if assigned < budget_wide {
        let mut order: Vec<usize> = (0..n).filter(|&i| weights[i] > 0).collect();
        order.sort_by_key(|&i| (Reverse(surplus(&shares, i)), i));

        let mut remainder = budget_wide - assigned;
        for &i in order.iter().cycle() {
            if remainder == 0 {
                break;
            }
            shares[i] += 1;
            remainder -= 1;
        }
    } else {
        let mut excess = assigned - budget_wide;
        while excess > 0 {
            // Take back from the share furthest above its exact value, latest first
            let Some(i) = (0..n)
                .filter(|&i| shares[i] > min_share)
                .max_by_key(|&i| (Reverse(surplus(&shares, i)), i))
            else {
                break;
            };
            shares[i] -= 1;
            excess -= 1;
        }
    }

    shares.into_iter().map(|s| s as u32).collect()
}

fn distribute_evenly(n: usize, budget: u32) -> Vec<u32> {
    let count = n as u32;
    let base = budget / count;
    let extra = (budget % count) as usize;
    (0..n)
        .map(|i| if i < extra { base + 1 } else { base })
        .collect()
}

/// Rewrite `weekly_sets` for the exercises of one muscle group.
///
/// Priority 0 exercises drop to zero sets; the others share `budget` by
/// priority. With nothing selected the budget goes unallocated.
pub fn allocate<'a, I>(exercises: I, budget: u32)
where
    I: IntoIterator<Item = &'a mut Exercise>,
{
    let mut selected: Vec<&mut Exercise> = Vec::new();
    for exercise in exercises {
        if exercise.priority == 0 {
            exercise.weekly_sets = 0;
        } else {
            selected.push(exercise);
        }
    }

    if selected.is_empty() {
        tracing::debug!("No prioritized exercises, {} sets left unallocated", budget);
        return;
    }

    let weights: Vec<u32> = selected.iter().map(|e| u32::from(e.priority)).collect();
    let shares = distribute(&weights, budget);

    for (exercise, share) in selected.into_iter().zip(shares) {
        tracing::debug!(
            "Allocated {} sets to '{}' (priority {})",
            share,
            exercise.name,
            exercise.priority
        );
        exercise.weekly_sets = share;
    }
}
