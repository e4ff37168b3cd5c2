//! Global selection state threaded through the whole run.
//!
//! One `SelectionState` exists per selection run. It is created empty by the
//! coordinator, passed `&mut` through every per-pattern selection and the
//! supplemental filler, and dropped with the run. Keeping it an explicit
//! object (never a module global) means concurrent selection runs cannot
//! share coverage by accident.
//!
//! The state is the fix for the isolation defect this design exists to
//! avoid: scoring against a per-pattern-local empty state makes independent
//! patterns redundantly chase the same rare types, and total coverage can
//! drop as the boost factor rises.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::catalog::TypeCatalog;
use crate::types::{CanonicalType, ResourceInstance};

/// Monotonically-growing record of which types the run has covered so far.
#[derive(Debug, Clone, Default)]
pub struct SelectionState {
    /// Record occurrences committed per type (an instance can carry several
    /// records of the same type)
    covered: HashMap<CanonicalType, usize>,
    /// Ids of every committed instance
    selected_ids: HashSet<Arc<str>>,
    instances_committed: usize,
    records_committed: usize,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit an instance: its types become visible to every later scoring
    /// decision, in this pattern and in all patterns processed afterwards.
    pub fn commit(&mut self, instance: &ResourceInstance) {
        for record in &instance.records {
            *self.covered.entry(record.rtype.clone()).or_insert(0) += 1;
            self.records_committed += 1;
        }
        self.selected_ids.insert(Arc::clone(&instance.id));
        self.instances_committed += 1;
    }

    /// Committed record occurrences of a type across the whole run.
    pub fn covered_count(&self, rtype: &CanonicalType) -> usize {
        self.covered.get(rtype).copied().unwrap_or(0)
    }

    /// True if no instance chosen anywhere so far carries this type.
    pub fn is_missing(&self, rtype: &CanonicalType) -> bool {
        self.covered_count(rtype) == 0
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected_ids.contains(id)
    }

    /// Number of distinct types covered so far.
    pub fn distinct_covered(&self) -> usize {
        self.covered.len()
    }

    pub fn instances_committed(&self) -> usize {
        self.instances_committed
    }

    pub fn records_committed(&self) -> usize {
        self.records_committed
    }

    /// Fraction of the source record population committed so far. The
    /// underrepresentation test compares per-type coverage ratios against
    /// this, so "underrepresented" stays meaningful at any target size.
    pub fn sampling_ratio(&self, catalog: &TypeCatalog) -> f64 {
        let total = catalog.total_records();
        if total == 0 {
            0.0
        } else {
            self.records_committed as f64 / total as f64
        }
    }
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

    #[test]
    fn test_commit_accumulates_coverage() {
        let mut state = SelectionState::new();
        let vm = CanonicalType::parse("ms.compute/vm").unwrap();

        assert!(state.is_missing(&vm));

        state.commit(&make_instance("i-1", &["ms.compute/vm", "ms.network/nic"]));
        state.commit(&make_instance("i-2", &["ms.compute/vm"]));

        assert_eq!(state.covered_count(&vm), 2);
        assert!(!state.is_missing(&vm));
        assert_eq!(state.distinct_covered(), 2);
        assert_eq!(state.instances_committed(), 2);
        assert_eq!(state.records_committed(), 3);
        assert!(state.is_selected("i-1"));
        assert!(!state.is_selected("i-9"));
    }

    #[test]
    fn test_sampling_ratio() {
        let catalog = TypeCatalog::from_counts([
            (CanonicalType::parse("ms.compute/vm").unwrap(), 8),
            (CanonicalType::parse("ms.network/nic").unwrap(), 2),
        ]);

        let mut state = SelectionState::new();
        assert_eq!(state.sampling_ratio(&catalog), 0.0);

        state.commit(&make_instance("i-1", &["ms.compute/vm"]));
        assert!((state.sampling_ratio(&catalog) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_empty_catalog_ratio_is_zero() {
        let mut state = SelectionState::new();
        state.commit(&make_instance("i-1", &["ms.compute/vm"]));
        assert_eq!(state.sampling_ratio(&TypeCatalog::new()), 0.0);
    }
}
