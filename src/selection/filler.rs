//! Supplemental coverage pass: greedy set cover over still-missing types.
//!
//! After per-pattern selection, some catalog types may have no coverage at
//! all - typically rare types concentrated in low-allocation patterns, plus
//! everything in the orphan pool. This pass spends a bounded extra budget
//! picking, from *any* pattern's or the orphan pool's unselected instances,
//! the one covering the most still-missing types, until the budget runs out
//! or nothing is missing.
//!
//! Greedy set cover is within a logarithmic factor of the optimal cover;
//! exact cover is NP-hard and not worth the latency here. The accepted gap
//! is what `remaining_missing` reports.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use rayon::prelude::*;

use crate::catalog::TypeCatalog;
use crate::selection::state::SelectionState;
use crate::types::{CanonicalType, ResourceInstance};

/// One supplemental pick and how many missing types it closed.
#[derive(Debug, Clone)]
pub struct FillRound {
    pub instance: ResourceInstance,
    pub newly_covered: usize,
    pub iteration: usize,
}

/// Result of the supplemental pass.
#[derive(Debug, Clone)]
pub struct FillOutcome {
    pub rounds: Vec<FillRound>,
    /// Catalog types still uncovered when the pass stopped
    pub remaining_missing: BTreeSet<CanonicalType>,
}

impl FillOutcome {
    pub fn instances_used(&self) -> usize {
        self.rounds.len()
    }
}

/// Greedy set-cover filler.
pub struct CoverageFiller<'a> {
    catalog: &'a TypeCatalog,
}

impl<'a> CoverageFiller<'a> {
    pub fn new(catalog: &'a TypeCatalog) -> Self {
        Self { catalog }
    }

    /// Spend up to `budget` instances from `candidates` closing coverage
    /// gaps. Candidates already committed to the plan are skipped; picks are
    /// committed into the shared state as they happen.
    pub fn fill(
        &self,
        budget: usize,
        candidates: &[&ResourceInstance],
        state: &mut SelectionState,
    ) -> FillOutcome {
        let mut missing: BTreeSet<CanonicalType> = self
            .catalog
            .all_types()
            .into_iter()
            .filter(|rtype| state.is_missing(rtype))
            .collect();

        let mut rounds = Vec::new();
        while rounds.len() < budget && !missing.is_empty() {
            let best = candidates
                .par_iter()
                .filter(|candidate| !state.is_selected(&candidate.id))
                .map(|candidate| {
                    let gain = candidate
                        .distinct_types()
                        .into_iter()
                        .filter(|rtype| missing.contains(*rtype))
                        .count();
                    (gain, *candidate)
                })
                .max_by(|a, b| prefer(a, b));

            let Some((gain, instance)) = best else {
                break; // no unselected candidates left
            };
            if gain == 0 {
                break; // nobody covers anything still missing
            }

            state.commit(instance);
            for rtype in instance.distinct_types() {
                missing.remove(rtype);
            }
            rounds.push(FillRound {
                instance: instance.clone(),
                newly_covered: gain,
                iteration: rounds.len() + 1,
            });
        }

        FillOutcome {
            rounds,
            remaining_missing: missing,
        }
    }
}

/// Total order over candidates: most missing types covered, then fewer
/// records (cheaper instance), then id ascending.
fn prefer(a: &(usize, &ResourceInstance), b: &(usize, &ResourceInstance)) -> Ordering {
    a.0.cmp(&b.0)
        .then_with(|| b.1.record_count().cmp(&a.1.record_count()))
        .then_with(|| b.1.id.cmp(&a.1.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResourceRecord;

    fn make_instance(id: &str, type_names: &[&str]) -> ResourceInstance {
        ResourceInstance {
            id: id.into(),
            pattern: None,
            records: type_names
                .iter()
                .enumerate()
                .map(|(i, name)| ResourceRecord {
                    id: format!("{}-r{}", id, i),
                    rtype: CanonicalType::parse(name).unwrap(),
                    properties: serde_json::Value::Null,
                })
                .collect(),
        }
    }

    fn catalog_of(instances: &[&ResourceInstance]) -> TypeCatalog {
        let mut catalog = TypeCatalog::new();
        for instance in instances {
            for record in &instance.records {
                catalog.record(record.rtype.clone(), 1);
            }
        }
        catalog
    }

    #[test]
    fn test_never_exceeds_budget() {
        let a = make_instance("i-a", &["ms.a/one"]);
        let b = make_instance("i-b", &["ms.b/two"]);
        let c = make_instance("i-c", &["ms.c/three"]);
        let catalog = catalog_of(&[&a, &b, &c]);
        let filler = CoverageFiller::new(&catalog);

        let mut state = SelectionState::new();
        let outcome = filler.fill(2, &[&a, &b, &c], &mut state);
        assert_eq!(outcome.instances_used(), 2);
        assert_eq!(outcome.remaining_missing.len(), 1);
    }

    #[test]
    fn test_greedy_picks_widest_cover_first() {
        let wide = make_instance("i-wide", &["ms.a/one", "ms.b/two", "ms.c/three"]);
        let narrow = make_instance("i-narrow", &["ms.a/one"]);
        let catalog = catalog_of(&[&wide, &narrow]);
        let filler = CoverageFiller::new(&catalog);

        let mut state = SelectionState::new();
        let outcome = filler.fill(2, &[&narrow, &wide], &mut state);
        assert_eq!(outcome.rounds[0].instance.id.as_ref(), "i-wide");
        assert_eq!(outcome.rounds[0].newly_covered, 3);
        // Nothing left for the narrow one to add
        assert_eq!(outcome.instances_used(), 1);
        assert!(outcome.remaining_missing.is_empty());
    }

    #[test]
    fn test_stops_when_no_candidate_gains() {
        let a = make_instance("i-a", &["ms.a/one"]);
        let dup = make_instance("i-dup", &["ms.a/one"]);
        let catalog = {
            let mut c = catalog_of(&[&a, &dup]);
            // A type nobody in the candidate set carries
            c.record(CanonicalType::parse("ms.ghost/spectre").unwrap(), 1);
            c
        };
        let filler = CoverageFiller::new(&catalog);

        let mut state = SelectionState::new();
        let outcome = filler.fill(5, &[&a, &dup], &mut state);
        assert_eq!(outcome.instances_used(), 1);
        assert_eq!(outcome.remaining_missing.len(), 1);
        assert!(outcome
            .remaining_missing
            .contains(&CanonicalType::parse("ms.ghost/spectre").unwrap()));
    }

    #[test]
    fn test_skips_already_selected() {
        let a = make_instance("i-a", &["ms.a/one"]);
        let b = make_instance("i-b", &["ms.b/two"]);
        let catalog = catalog_of(&[&a, &b]);
        let filler = CoverageFiller::new(&catalog);

        let mut state = SelectionState::new();
        state.commit(&a);
        let outcome = filler.fill(5, &[&a, &b], &mut state);
        let ids: Vec<&str> = outcome.rounds.iter().map(|r| r.instance.id.as_ref()).collect();
        assert_eq!(ids, vec!["i-b"]);
    }

    #[test]
    fn test_equal_gain_prefers_cheaper_then_id() {
        // Same gain (1 missing type each); i-lean is cheaper than i-bulky
        let bulky = make_instance("i-bulky", &["ms.a/one", "ms.a/one", "ms.a/one"]);
        let lean = make_instance("i-lean", &["ms.b/two"]);
        let catalog = catalog_of(&[&bulky, &lean]);
        let filler = CoverageFiller::new(&catalog);

        let mut state = SelectionState::new();
        let outcome = filler.fill(1, &[&bulky, &lean], &mut state);
        assert_eq!(outcome.rounds[0].instance.id.as_ref(), "i-lean");
    }

    #[test]
    fn test_zero_budget_selects_nothing() {
        let a = make_instance("i-a", &["ms.a/one"]);
        let catalog = catalog_of(&[&a]);
        let filler = CoverageFiller::new(&catalog);

        let mut state = SelectionState::new();
        let outcome = filler.fill(0, &[&a], &mut state);
        assert!(outcome.rounds.is_empty());
        assert_eq!(outcome.remaining_missing.len(), 1);
    }
}
