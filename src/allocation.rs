//! Proportional pattern allocation via the largest-remainder method.
//!
//! Converts per-pattern prevalence weights into integer instance-count
//! targets summing to exactly the requested total:
//!
//! 1. Normalize weights to sum to 1 and scale by the total
//! 2. Floor each quota
//! 3. Hand the remaining seats to the largest fractional remainders
//! 4. Raise starved nonzero-weight patterns to one slot when the budget
//!    allows, taking seats from the largest allocations
//!
//! When the total is smaller than the pattern count, the lowest-weight
//! patterns legitimately end up with zero slots; those are surfaced through
//! [`Allocation::starved`] and reported in plan metadata, never hidden.

use std::collections::BTreeMap;
use std::sync::Arc;

/// Integer instance-count targets per pattern.
///
/// Invariant: the slot values sum to the total passed to
/// [`PatternAllocator::allocate`].
#[derive(Debug, Clone, Default)]
pub struct Allocation {
    slots: BTreeMap<Arc<str>, usize>,
    starved: Vec<Arc<str>>,
}

impl Allocation {
    /// Target count for a pattern; unknown patterns get 0.
    pub fn get(&self, name: &str) -> usize {
        self.slots.get(name).copied().unwrap_or(0)
    }

    /// Slots in pattern-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&Arc<str>, usize)> {
        self.slots.iter().map(|(name, &count)| (name, count))
    }

    pub fn total(&self) -> usize {
        self.slots.values().sum()
    }

    /// Patterns with nonzero prevalence that still received zero slots
    /// (possible only when the total budget is below the pattern count).
    pub fn starved(&self) -> &[Arc<str>] {
        &self.starved
    }
}

/// Largest-remainder allocator.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternAllocator;

impl PatternAllocator {
    pub fn new() -> Self {
        Self
    }

    /// Apportion `total` instance slots across patterns by prevalence
    /// weight. Negative or non-finite weights are treated as zero.
    pub fn allocate(&self, total: usize, weights: &[(Arc<str>, f64)]) -> Allocation {
        let sanitized: Vec<(Arc<str>, f64)> = weights
            .iter()
            .map(|(name, w)| {
                let w = if w.is_finite() && *w > 0.0 { *w } else { 0.0 };
                (Arc::clone(name), w)
            })
            .collect();

        let weight_sum: f64 = sanitized.iter().map(|(_, w)| w).sum();
        let mut slots: BTreeMap<Arc<str>, usize> =
            sanitized.iter().map(|(name, _)| (Arc::clone(name), 0)).collect();

        if weight_sum <= 0.0 || total == 0 {
            let starved = if total == 0 {
                Vec::new()
            } else {
                sanitized.iter().map(|(name, _)| Arc::clone(name)).collect()
            };
            return Allocation { slots, starved };
        }

        // Floor the quotas, remember fractional remainders
        let mut remainders: Vec<(Arc<str>, f64)> = Vec::new();
        let mut assigned = 0usize;
        for (name, weight) in &sanitized {
            let quota = weight / weight_sum * total as f64;
            let floor = quota.floor() as usize;
            slots.insert(Arc::clone(name), floor);
            assigned += floor;
            if *weight > 0.0 {
                remainders.push((Arc::clone(name), quota - floor as f64));
            }
        }

        // Largest remainder first; remainder ties broken by name for
        // determinism
        remainders.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        let mut seats_left = total.saturating_sub(assigned);
        for (name, _) in remainders.iter().cycle() {
            if seats_left == 0 {
                break;
            }
            if let Some(count) = slots.get_mut(name) {
                *count += 1;
                seats_left -= 1;
            }
        }

        // Min-one-slot repair: every nonzero-weight pattern gets a slot when
        // the budget allows, funded by the largest allocations
        let nonzero: Vec<Arc<str>> = sanitized
            .iter()
            .filter(|(_, w)| *w > 0.0)
            .map(|(name, _)| Arc::clone(name))
            .collect();
        let mut starved: Vec<Arc<str>> = nonzero
            .iter()
            .filter(|name| slots.get(name.as_ref()).copied() == Some(0))
            .cloned()
            .collect();

        if total >= nonzero.len() {
            let mut still_starved = Vec::new();
            for name in starved.drain(..) {
                let donor = slots
                    .iter()
                    .filter(|(_, &count)| count >= 2)
                    .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
                    .map(|(donor_name, _)| Arc::clone(donor_name));
                match donor {
                    Some(donor_name) => {
                        if let Some(count) = slots.get_mut(&donor_name) {
                            *count -= 1;
                        }
                        if let Some(count) = slots.get_mut(&name) {
                            *count += 1;
                        }
                    }
                    None => still_starved.push(name),
                }
            }
            starved = still_starved;
        }

        Allocation { slots, starved }
    }
}
