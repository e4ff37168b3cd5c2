//! Orphan resolution: catalog types claimed by no pattern.
//!
//! Orphan discovery is a set difference over canonical identifiers - the
//! catalog on one side, the union of every pattern's matched-type set on the
//! other. The fetch then queries the store with those same canonical
//! identifiers.
//!
//! The failure mode this module is designed against: querying the store
//! with pattern-local simplified names returns a silent empty result, no
//! exception, and the run reports "0 orphans found" while orphans exist.
//! Canonical-only construction of `CanonicalType` prevents the query half;
//! the count-consistency spot check below catches the rest (e.g. a catalog
//! built from a different store snapshot).

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::catalog::TypeCatalog;
use crate::store::InstanceStore;
use crate::types::{CanonicalType, Pattern, ResourceInstance};

/// Orphan pool plus the consistency findings from the fetch.
#[derive(Debug, Clone, Default)]
pub struct OrphanPool {
    pub instances: Vec<ResourceInstance>,
    /// Orphan types with a nonzero catalog count that the store query did
    /// not produce a single instance for
    pub inconsistencies: Vec<CanonicalType>,
}

/// Finds and fetches instances whose types belong to no detected pattern.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrphanResolver;

impl OrphanResolver {
    pub fn new() -> Self {
        Self
    }

    /// Every canonical catalog type not matched by any pattern.
    pub fn find_orphans(
        &self,
        catalog: &TypeCatalog,
        patterns: &[Pattern],
    ) -> BTreeSet<CanonicalType> {
        let mut orphans = catalog.all_types();
        for pattern in patterns {
            for matched in &pattern.matched_types {
                orphans.remove(matched);
            }
        }
        orphans
    }

    /// Fetch the instance pool for a set of orphan types.
    ///
    /// Spot check: each orphan type with a nonzero catalog count must be
    /// carried by at least one returned instance. A violation means the
    /// store and the catalog disagree about canonical identifiers, which is
    /// exactly the silent-empty-result defect; it is logged and reported in
    /// plan metadata rather than raised.
    pub fn fetch_instances(
        &self,
        store: &dyn InstanceStore,
        orphan_types: &BTreeSet<CanonicalType>,
        catalog: &TypeCatalog,
    ) -> OrphanPool {
        let instances = store.instances_with_types(orphan_types);
        debug!(
            orphan_types = orphan_types.len(),
            instances = instances.len(),
            "fetched orphan pool"
        );

        let mut inconsistencies = Vec::new();
        for rtype in orphan_types {
            if catalog.count_of(rtype) == 0 {
                continue;
            }
            let carried = instances
                .iter()
                .any(|instance| instance.records.iter().any(|r| &r.rtype == rtype));
            if !carried {
                warn!(
                    %rtype,
                    catalog_count = catalog.count_of(rtype),
                    "orphan type has catalog occurrences but no store instances"
                );
                inconsistencies.push(rtype.clone());
            }
        }

        OrphanPool {
            instances,
            inconsistencies,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
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

    fn make_catalog() -> TypeCatalog {
        TypeCatalog::from_counts([
            (CanonicalType::parse("ms.compute/virtualmachines").unwrap(), 12),
            (CanonicalType::parse("ms.network/networkinterfaces").unwrap(), 15),
            (CanonicalType::parse("ms.keyvault/vaults").unwrap(), 3),
            (CanonicalType::parse("ms.cdn/profiles").unwrap(), 2),
        ])
    }

    #[test]
    fn test_find_orphans_is_set_difference() {
        let catalog = make_catalog();
        let mut pattern = Pattern::new("VM Workload", 1.0);
        pattern
            .matched_types
            .insert(CanonicalType::parse("ms.compute/virtualmachines").unwrap());
        pattern
            .matched_types
            .insert(CanonicalType::parse("ms.network/networkinterfaces").unwrap());

        let orphans = OrphanResolver::new().find_orphans(&catalog, &[pattern]);
        let names: Vec<&str> = orphans.iter().map(|t| t.as_str()).collect();
        assert_eq!(names, vec!["ms.cdn/profiles", "ms.keyvault/vaults"]);
    }

    #[test]
    fn test_matched_type_absent_from_catalog_is_tolerated() {
        let catalog = make_catalog();
        let mut pattern = Pattern::new("web", 1.0);
        // Detector matched a type the catalog never saw
        pattern
            .matched_types
            .insert(CanonicalType::parse("ms.web/sites").unwrap());

        let orphans = OrphanResolver::new().find_orphans(&catalog, &[pattern]);
        // All four catalog types are orphans; the unknown match changes
        // nothing and raises nothing
        assert_eq!(orphans.len(), 4);
    }

    #[test]
    fn test_fetch_uses_canonical_identifiers() {
        // Regression for the "0 orphans found" defect: the pattern's
        // matched set was normalized from a shortened alias at the
        // boundary, so the difference and the store query both operate on
        // canonical names and the fetch is non-empty.
        let catalog = make_catalog();
        let alias_resolved = catalog.resolve_alias("virtualMachines").unwrap();
        let mut pattern = Pattern::new("VM Workload", 1.0);
        pattern.matched_types.insert(alias_resolved);
        pattern
            .matched_types
            .insert(catalog.resolve_alias("networkInterfaces").unwrap());

        let store = MemoryStore::new(vec![
            make_instance("i-vault", &["ms.keyvault/vaults"]),
            make_instance("i-cdn", &["ms.cdn/profiles"]),
            make_instance("i-vm", &["ms.compute/virtualmachines"]),
        ]);

        let resolver = OrphanResolver::new();
        let orphans = resolver.find_orphans(&catalog, std::slice::from_ref(&pattern));
        assert_eq!(orphans.len(), 2);

        let pool = resolver.fetch_instances(&store, &orphans, &catalog);
        let ids: Vec<&str> = pool.instances.iter().map(|i| i.id.as_ref()).collect();
        assert_eq!(ids, vec!["i-cdn", "i-vault"]);
        assert!(pool.inconsistencies.is_empty());
    }

    #[test]
    fn test_spot_check_reports_count_mismatch() {
        let catalog = make_catalog();
        let mut orphans = BTreeSet::new();
        orphans.insert(CanonicalType::parse("ms.keyvault/vaults").unwrap());

        // Store snapshot disagrees with the catalog: no vault instances
        let store = MemoryStore::new(vec![make_instance(
            "i-vm",
            &["ms.compute/virtualmachines"],
        )]);

        let pool = OrphanResolver::new().fetch_instances(&store, &orphans, &catalog);
        assert!(pool.instances.is_empty());
        assert_eq!(pool.inconsistencies.len(), 1);
        assert_eq!(pool.inconsistencies[0].as_str(), "ms.keyvault/vaults");
    }
}
