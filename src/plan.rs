//! Plan output: the selection result handed to downstream IaC generation.
//!
//! A `Plan` is immutable once returned. Everything a run could not do
//! perfectly - starved patterns, pool shortfalls, unmatched pattern types,
//! types left uncovered after the supplemental pass - is in the metadata;
//! a partial result never masquerades as a clean one.
//!
//! Serialization order is fully deterministic (ordered selections and
//! traces, `BTreeMap` metadata), so two runs over identical inputs produce
//! byte-identical JSON.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::ResourceInstance;

/// Which phase of the run committed an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPhase {
    /// Per-pattern greedy selection
    Pattern,
    /// Supplemental set-cover pass
    Supplemental,
}

/// One committed pick, for the quality-distance trace.
#[derive(Debug, Clone, Serialize)]
pub struct TraceEntry {
    pub phase: SelectionPhase,
    /// Owning pattern, or `(orphan)` for pattern-less supplemental picks
    pub pattern: String,
    /// 1-indexed iteration within the phase section
    pub iteration: usize,
    pub instance_id: String,
    /// Score the pick was ranked on
    pub score: f64,
    /// Structural distance to the pattern composition at pick time
    /// (1.0 where no pattern composition applies)
    pub structural_distance: f64,
}

/// A pattern's pool ran smaller than its allocation.
#[derive(Debug, Clone, Serialize)]
pub struct PoolShortfall {
    pub pattern: String,
    pub allocated: usize,
    pub selected: usize,
}

/// Everything the run wants the caller to know besides the selection itself.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PlanMetadata {
    /// `blended` (boost <= 1.0) or `coverage-boosted`
    pub mode: String,
    pub rare_boost_factor: f64,
    pub target_instance_count: usize,

    /// Final integer allocation per pattern
    pub allocation: BTreeMap<String, usize>,
    /// Nonzero-prevalence patterns allocated zero slots
    /// (total budget below pattern count)
    pub zero_allocation_patterns: Vec<String>,
    /// Pools smaller than their allocation
    pub shortfalls: Vec<PoolShortfall>,

    /// Matched-type names per pattern that resolve to nothing in the
    /// catalog; scored as maximally rare rather than failing
    pub unmatched_pattern_types: BTreeMap<String, Vec<String>>,

    /// Catalog types claimed by no pattern
    pub orphan_type_count: usize,
    /// Orphan types whose store lookup returned nothing despite a nonzero
    /// catalog count - the canonical-name mismatch signature
    pub store_inconsistencies: Vec<String>,

    pub supplemental_budget: usize,
    pub supplemental_used: usize,
    /// Types still uncovered after the supplemental pass
    pub missing_after_fill: Vec<String>,

    pub selected_instance_count: usize,
    pub distinct_types_covered: usize,
    pub catalog_type_count: usize,
}

/// Selected instances for one pattern (or the orphan section).
#[derive(Debug, Clone, Serialize)]
pub struct PatternSelection {
    pub pattern: String,
    pub instances: Vec<ResourceInstance>,
}

/// The selection result.
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    /// Selections in pattern processing order; supplemental picks are
    /// appended to their owning pattern's entry, orphan picks to a
    /// trailing `(orphan)` entry
    pub selections: Vec<PatternSelection>,
    /// Per-iteration quality-distance trace
    pub trace: Vec<TraceEntry>,
    pub metadata: PlanMetadata,
}

impl Plan {
    /// Total instances across all selections.
    pub fn instance_count(&self) -> usize {
        self.selections.iter().map(|s| s.instances.len()).sum()
    }

    /// Distinct types covered vs. catalog size, as reported in metadata.
    pub fn coverage(&self) -> (usize, usize) {
        (
            self.metadata.distinct_types_covered,
            self.metadata.catalog_type_count,
        )
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
