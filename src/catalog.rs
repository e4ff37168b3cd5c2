//! Canonical type catalog: occurrence counts from the source graph.
//!
//! Built once by the snapshot boundary (or directly by a caller that already
//! aggregated counts) and read-only afterward. Every component that compares
//! types - the allocator, the scorer, the orphan resolver - goes through the
//! catalog's canonical identifiers; pattern-local simplified names never get
//! this far.

use std::collections::{BTreeSet, HashMap};

use crate::types::CanonicalType;

/// Registry mapping canonical resource types to their occurrence counts in
/// the source graph.
#[derive(Debug, Clone, Default)]
pub struct TypeCatalog {
    counts: HashMap<CanonicalType, usize>,
    total_records: usize,
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from pre-aggregated counts.
    pub fn from_counts(counts: impl IntoIterator<Item = (CanonicalType, usize)>) -> Self {
        let mut catalog = Self::new();
        for (rtype, count) in counts {
            catalog.record(rtype, count);
        }
        catalog
    }

    /// Add `count` occurrences of a type. Counts for the same type
    /// accumulate, so the catalog can also be built record by record.
    pub fn record(&mut self, rtype: CanonicalType, count: usize) {
        *self.counts.entry(rtype).or_insert(0) += count;
        self.total_records += count;
    }

    /// Occurrence count in the source graph. A type the catalog has never
    /// seen returns 0: matched-type sets referencing unknown types are
    /// tolerated and score as maximally rare (`1 / max(count, 1)`).
    pub fn count_of(&self, rtype: &CanonicalType) -> usize {
        self.counts.get(rtype).copied().unwrap_or(0)
    }

    pub fn contains(&self, rtype: &CanonicalType) -> bool {
        self.counts.contains_key(rtype)
    }

    /// All catalog types in lexicographic order.
    pub fn all_types(&self) -> BTreeSet<CanonicalType> {
        self.counts.keys().cloned().collect()
    }

    /// Number of distinct types.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all occurrence counts - the source graph's record population.
    pub fn total_records(&self) -> usize {
        self.total_records
    }

    /// Resolve a possibly-simplified type name against the catalog.
    ///
    /// A fully-qualified name resolves to itself when present. A simplified
    /// alias (no namespace segment, any casing) resolves only when exactly
    /// one catalog type has that final segment; ambiguous or unknown aliases
    /// return `None` and must be reported by the boundary, not guessed at.
    pub fn resolve_alias(&self, raw: &str) -> Option<CanonicalType> {
        if let Ok(rtype) = CanonicalType::parse(raw) {
            if self.contains(&rtype) {
                return Some(rtype);
            }
        }

        let leaf = raw
            .trim()
            .rsplit('/')
            .next()
            .unwrap_or(raw)
            .to_ascii_lowercase();
        let mut matches = self.counts.keys().filter(|t| t.leaf() == leaf);
        match (matches.next(), matches.next()) {
            (Some(only), None) => Some(only.clone()),
            _ => None,
        }
    }
}
