//! Store query seam: instance lookup by canonical type set.
//!
//! The graph/store query service is an external collaborator; the selector
//! only needs one operation from it, expressed as the [`InstanceStore`]
//! trait. [`MemoryStore`] is the in-process implementation backed by the
//! materialized snapshot, used by the binary and by tests.

use std::collections::BTreeSet;

use crate::types::{CanonicalType, ResourceInstance};

/// Query seam over the underlying resource store.
///
/// Contract: queries take canonical identifiers only. Querying with a
/// pattern-local simplified name is not an error at this layer - it just
/// matches nothing - which is exactly why callers must normalize at the
/// boundary and why the orphan resolver spot-checks result counts against
/// the catalog.
pub trait InstanceStore {
    /// All instances carrying at least one record of any of the given
    /// types, in ascending instance-id order.
    fn instances_with_types(&self, types: &BTreeSet<CanonicalType>) -> Vec<ResourceInstance>;
}

/// In-memory store over a fully materialized instance population.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    instances: Vec<ResourceInstance>,
}

impl MemoryStore {
    pub fn new(mut instances: Vec<ResourceInstance>) -> Self {
        // Ascending id order keeps every query deterministic
        instances.sort_by(|a, b| a.id.cmp(&b.id));
        Self { instances }
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

impl InstanceStore for MemoryStore {
    fn instances_with_types(&self, types: &BTreeSet<CanonicalType>) -> Vec<ResourceInstance> {
        self.instances
            .iter()
            .filter(|instance| instance.records.iter().any(|r| types.contains(&r.rtype)))
            .cloned()
            .collect()
    }
}
