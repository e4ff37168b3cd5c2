//! Greedy instance selection within one pattern.
//!
//! Repeatedly picks the highest-scoring unselected instance from the
//! pattern's pool, commits it into the shared [`SelectionState`], and stops
//! at the target count or pool exhaustion. Commits are immediately visible
//! to every later iteration and to every pattern processed afterwards.
//!
//! The scoring sweep over the pool runs on rayon; only the commit is
//! sequential, which preserves the cross-pattern coordination property.
//! The sweep is a pure max-reduce under a total order (score descending,
//! then instance id ascending), so parallel scheduling cannot change the
//! outcome.

use std::cmp::Ordering;

use rayon::prelude::*;

use crate::catalog::TypeCatalog;
use crate::selection::scorer::{CoverageScorer, InstanceScore};
use crate::selection::similarity::CompositionProfile;
use crate::selection::state::SelectionState;
use crate::types::{Pattern, ResourceInstance, SelectorConfig};

/// One committed pick: the instance, its score breakdown, and the
/// 1-indexed iteration within the pattern.
#[derive(Debug, Clone)]
pub struct SelectionRound {
    pub instance: ResourceInstance,
    pub score: InstanceScore,
    pub iteration: usize,
}

/// Greedy selector over a single pattern's pool.
pub struct PatternSelector<'a> {
    scorer: CoverageScorer<'a>,
}

impl<'a> PatternSelector<'a> {
    pub fn new(config: &'a SelectorConfig, catalog: &'a TypeCatalog) -> Self {
        Self {
            scorer: CoverageScorer::new(config, catalog),
        }
    }

    /// Select up to `target_count` instances from the pattern's pool.
    ///
    /// Returns fewer rounds than requested when the pool runs dry; the
    /// caller records that shortfall in plan metadata.
    pub fn select(
        &self,
        pattern: &Pattern,
        target_count: usize,
        state: &mut SelectionState,
    ) -> Vec<SelectionRound> {
        let profile = CompositionProfile::from_pool(&pattern.pool);
        let mut rounds = Vec::with_capacity(target_count.min(pattern.pool.len()));

        while rounds.len() < target_count {
            let best = pattern
                .pool
                .par_iter()
                .filter(|candidate| !state.is_selected(&candidate.id))
                .map(|candidate| {
                    let score = self.scorer.score(candidate, state, Some(&profile));
                    (score, candidate)
                })
                .max_by(|a, b| prefer(a, b));

            let Some((score, instance)) = best else {
                break; // pool exhausted
            };

            state.commit(instance);
            rounds.push(SelectionRound {
                instance: instance.clone(),
                score,
                iteration: rounds.len() + 1,
            });
        }

        rounds
    }
}

/// Total order over candidates: higher score wins, ties go to the
/// lexicographically smaller instance id.
fn prefer(
    a: &(InstanceScore, &ResourceInstance),
    b: &(InstanceScore, &ResourceInstance),
) -> Ordering {
    match a.0.total.partial_cmp(&b.0.total) {
        Some(Ordering::Equal) | None => b.1.id.cmp(&a.1.id),
        Some(ordering) => ordering,
    }
}
