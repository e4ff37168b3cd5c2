//! Structural similarity between an instance and its pattern's composition.
//!
//! A pattern's pool has a historical type composition (relative frequency of
//! each type across all member records). Instances whose own type multiset
//! sits close to that composition are "typical" of the pattern; outliers are
//! structurally distant. The distance feeds two places:
//!
//! - blended into the score when `rare_boost_factor <= 1.0`
//! - recorded per iteration in the plan trace regardless of the boost, so
//!   quality drift stays observable even when ranking ignores it

use std::collections::BTreeMap;

use crate::types::{CanonicalType, ResourceInstance};

/// Normalized type composition of a pattern's pool.
#[derive(Debug, Clone, Default)]
pub struct CompositionProfile {
    /// Relative record frequency per type; shares sum to 1 for a
    /// non-empty pool. BTreeMap keeps float accumulation order-stable.
    shares: BTreeMap<CanonicalType, f64>,
}

impl CompositionProfile {
    /// Aggregate the record-type frequencies of a pool.
    pub fn from_pool(pool: &[ResourceInstance]) -> Self {
        let mut counts: BTreeMap<CanonicalType, usize> = BTreeMap::new();
        let mut total = 0usize;
        for instance in pool {
            for record in &instance.records {
                *counts.entry(record.rtype.clone()).or_insert(0) += 1;
                total += 1;
            }
        }

        let shares = if total == 0 {
            BTreeMap::new()
        } else {
            counts
                .into_iter()
                .map(|(rtype, count)| (rtype, count as f64 / total as f64))
                .collect()
        };
        Self { shares }
    }

    pub fn is_empty(&self) -> bool {
        self.shares.is_empty()
    }

    /// Structural distance between this profile and one instance's own type
    /// distribution: half the L1 distance between the two share vectors
    /// (total variation), in `[0, 1]`. 0 = the instance mirrors the
    /// pattern's composition exactly, 1 = completely disjoint.
    ///
    /// Degenerate inputs (empty profile or empty instance) are maximally
    /// distant.
    pub fn distance(&self, instance: &ResourceInstance) -> f64 {
        let record_total = instance.record_count();
        if self.shares.is_empty() || record_total == 0 {
            return 1.0;
        }

        let instance_shares: BTreeMap<&CanonicalType, f64> = instance
            .type_counts()
            .into_iter()
            .map(|(rtype, count)| (rtype, count as f64 / record_total as f64))
            .collect();

        let mut l1 = 0.0;
        for (rtype, share) in &self.shares {
            let other = instance_shares.get(rtype).copied().unwrap_or(0.0);
            l1 += (share - other).abs();
        }
        for (rtype, share) in &instance_shares {
            if !self.shares.contains_key(*rtype) {
                l1 += share;
            }
        }

        (l1 / 2.0).clamp(0.0, 1.0)
    }

    /// Convenience: `1 - distance`.
    pub fn similarity(&self, instance: &ResourceInstance) -> f64 {
        1.0 - self.distance(instance)
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
    fn test_identical_composition_distance_zero() {
        let pool = vec![
            make_instance("i-1", &["ms.compute/vm", "ms.network/nic"]),
            make_instance("i-2", &["ms.compute/vm", "ms.network/nic"]),
        ];
        let profile = CompositionProfile::from_pool(&pool);
        let distance = profile.distance(&pool[0]);
        assert!(distance.abs() < 1e-12, "expected 0, got {}", distance);
    }

    #[test]
    fn test_disjoint_composition_distance_one() {
        let pool = vec![make_instance("i-1", &["ms.compute/vm"])];
        let profile = CompositionProfile::from_pool(&pool);
        let outlier = make_instance("i-x", &["ms.web/sites"]);
        assert!((profile.distance(&outlier) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_partial_overlap_is_between() {
        let pool = vec![
            make_instance("i-1", &["ms.compute/vm", "ms.network/nic"]),
            make_instance("i-2", &["ms.compute/vm", "ms.storage/disks"]),
        ];
        let profile = CompositionProfile::from_pool(&pool);
        let candidate = make_instance("i-3", &["ms.compute/vm", "ms.network/nic"]);
        let distance = profile.distance(&candidate);
        assert!(distance > 0.0 && distance < 1.0, "got {}", distance);
    }

    #[test]
    fn test_degenerate_inputs_maximally_distant() {
        let empty_profile = CompositionProfile::from_pool(&[]);
        let instance = make_instance("i-1", &["ms.compute/vm"]);
        assert_eq!(empty_profile.distance(&instance), 1.0);

        let profile = CompositionProfile::from_pool(&[instance]);
        let hollow = ResourceInstance {
            id: "i-0".into(),
            pattern: None,
            records: Vec::new(),
        };
        assert_eq!(profile.distance(&hollow), 1.0);
    }

    #[test]
    fn test_similarity_complements_distance() {
        let pool = vec![make_instance("i-1", &["ms.compute/vm", "ms.network/nic"])];
        let profile = CompositionProfile::from_pool(&pool);
        let candidate = make_instance("i-2", &["ms.compute/vm"]);
        let d = profile.distance(&candidate);
        assert!((profile.similarity(&candidate) - (1.0 - d)).abs() < 1e-12);
    }
}
