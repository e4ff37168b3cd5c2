//! Run coordination: one SelectionState, every pattern, one Plan.
//!
//! The coordinator owns the piece that makes cross-pattern coverage work:
//! a single [`SelectionState`] created at the start of the run and threaded
//! through every per-pattern selection and the supplemental filler, in a
//! deterministic processing order (allocation descending, then pattern name
//! ascending). Patterns processed later see everything earlier patterns
//! committed, so two patterns never spend slots on the same rare type.
//!
//! Pipeline:
//!
//! ```text
//! validate config -> allocate -> per-pattern selection (shared state)
//!                 -> orphan resolution -> supplemental set cover -> Plan
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::allocation::PatternAllocator;
use crate::catalog::TypeCatalog;
use crate::error::Result;
use crate::orphans::OrphanResolver;
use crate::plan::{Plan, PlanMetadata, PatternSelection, PoolShortfall, SelectionPhase, TraceEntry};
use crate::selection::per_pattern::PatternSelector;
use crate::selection::state::SelectionState;
use crate::selection::filler::CoverageFiller;
use crate::store::InstanceStore;
use crate::types::{Pattern, SelectorConfig};

/// Section name for supplemental picks that belong to no pattern.
const ORPHAN_SECTION: &str = "(orphan)";

/// Orchestrates a full selection run.
pub struct SelectionCoordinator {
    config: SelectorConfig,
}

impl SelectionCoordinator {
    pub fn new(config: SelectorConfig) -> Self {
        Self { config }
    }

    /// Run selection over the given patterns and produce the plan.
    ///
    /// Fails only on configuration errors; every data-level problem
    /// (starved patterns, pool shortfalls, unmatched types, residual
    /// missing types) is recorded in the plan metadata instead.
    pub fn build_plan(
        &self,
        catalog: &TypeCatalog,
        patterns: &[Pattern],
        store: &dyn InstanceStore,
    ) -> Result<Plan> {
        self.config.validate()?;

        let total = self.config.target_instance_count;
        let weights: Vec<(Arc<str>, f64)> = patterns
            .iter()
            .map(|p| (Arc::clone(&p.name), p.prevalence))
            .collect();
        let allocation = PatternAllocator::new().allocate(total, &weights);
        info!(
            patterns = patterns.len(),
            target = total,
            starved = allocation.starved().len(),
            "allocated instance targets"
        );

        // Deterministic processing order: biggest allocation first, names
        // break ties. Later patterns see earlier patterns' coverage.
        let mut order: Vec<&Pattern> = patterns.iter().collect();
        order.sort_by(|a, b| {
            allocation
                .get(&b.name)
                .cmp(&allocation.get(&a.name))
                .then_with(|| a.name.cmp(&b.name))
        });

        let mut state = SelectionState::new();
        let mut trace = Vec::new();
        let mut selections = Vec::new();
        let mut section_index: BTreeMap<Arc<str>, usize> = BTreeMap::new();
        let mut shortfalls = Vec::new();
        let mut unmatched_pattern_types: BTreeMap<String, Vec<String>> = BTreeMap::new();

        let selector = PatternSelector::new(&self.config, catalog);
        for pattern in &order {
            let target = allocation.get(&pattern.name);
            let rounds = selector.select(pattern, target, &mut state);
            debug!(
                pattern = pattern.name.as_ref(),
                target,
                selected = rounds.len(),
                "pattern selection finished"
            );

            if rounds.len() < target {
                shortfalls.push(PoolShortfall {
                    pattern: pattern.name.to_string(),
                    allocated: target,
                    selected: rounds.len(),
                });
            }

            let mut unmatched: Vec<String> = pattern
                .matched_types
                .iter()
                .filter(|t| !catalog.contains(t))
                .map(|t| t.to_string())
                .collect();
            if !unmatched.is_empty() {
                unmatched.sort();
                unmatched_pattern_types.insert(pattern.name.to_string(), unmatched);
            }

            let mut instances = Vec::with_capacity(rounds.len());
            for round in rounds {
                trace.push(TraceEntry {
                    phase: SelectionPhase::Pattern,
                    pattern: pattern.name.to_string(),
                    iteration: round.iteration,
                    instance_id: round.instance.id.to_string(),
                    score: round.score.total,
                    structural_distance: round.score.structural_distance,
                });
                instances.push(round.instance);
            }
            section_index.insert(Arc::clone(&pattern.name), selections.len());
            selections.push(PatternSelection {
                pattern: pattern.name.to_string(),
                instances,
            });
        }

        // Orphans feed the supplemental pass only; they hold no allocation
        let resolver = OrphanResolver::new();
        let orphan_types = resolver.find_orphans(catalog, patterns);
        let orphan_pool = resolver.fetch_instances(store, &orphan_types, catalog);

        let budget = self.config.supplemental_budget();
        let candidates: Vec<&crate::types::ResourceInstance> = order
            .iter()
            .flat_map(|pattern| pattern.pool.iter())
            .chain(orphan_pool.instances.iter())
            .collect();
        let outcome = CoverageFiller::new(catalog).fill(budget, &candidates, &mut state);
        info!(
            budget,
            used = outcome.instances_used(),
            still_missing = outcome.remaining_missing.len(),
            "supplemental pass finished"
        );

        let supplemental_used = outcome.instances_used();
        for round in outcome.rounds {
            let section = round
                .instance
                .pattern
                .as_deref()
                .unwrap_or(ORPHAN_SECTION)
                .to_string();
            trace.push(TraceEntry {
                phase: SelectionPhase::Supplemental,
                pattern: section,
                iteration: round.iteration,
                instance_id: round.instance.id.to_string(),
                score: round.newly_covered as f64,
                structural_distance: 1.0,
            });

            let section_name: Arc<str> = round
                .instance
                .pattern
                .clone()
                .unwrap_or_else(|| Arc::from(ORPHAN_SECTION));
            let index = match section_index.get(&section_name).copied() {
                Some(index) => index,
                None => {
                    selections.push(PatternSelection {
                        pattern: section_name.to_string(),
                        instances: Vec::new(),
                    });
                    let index = selections.len() - 1;
                    section_index.insert(section_name, index);
                    index
                }
            };
            selections[index].instances.push(round.instance);
        }

        let mode = if self.config.rare_boost_factor > 1.0 {
            "coverage-boosted"
        } else {
            "blended"
        };
        let metadata = PlanMetadata {
            mode: mode.to_string(),
            rare_boost_factor: self.config.rare_boost_factor,
            target_instance_count: total,
            allocation: allocation
                .iter()
                .map(|(name, count)| (name.to_string(), count))
                .collect(),
            zero_allocation_patterns: allocation
                .starved()
                .iter()
                .map(|name| name.to_string())
                .collect(),
            shortfalls,
            unmatched_pattern_types,
            orphan_type_count: orphan_types.len(),
            store_inconsistencies: orphan_pool
                .inconsistencies
                .iter()
                .map(|t| t.to_string())
                .collect(),
            supplemental_budget: budget,
            supplemental_used,
            missing_after_fill: outcome
                .remaining_missing
                .iter()
                .map(|t| t.to_string())
                .collect(),
            selected_instance_count: state.instances_committed(),
            distinct_types_covered: state.distinct_covered(),
            catalog_type_count: catalog.len(),
        };
        info!(
            selected = metadata.selected_instance_count,
            covered = metadata.distinct_types_covered,
            catalog = metadata.catalog_type_count,
            mode,
            "plan assembled"
        );

        Ok(Plan {
            selections,
            trace,
            metadata,
        })
    }
}
