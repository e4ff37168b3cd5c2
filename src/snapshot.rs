//! Snapshot loading - the pattern-detection boundary.
//!
//! Detector output arrives as JSON:
//!
//! ```json
//! {
//!   "type_counts": { "microsoft.compute/virtualmachines": 120 },
//!   "patterns": {
//!     "VM Workload": {
//!       "prevalence": 0.4,
//!       "matched_types": ["virtualMachines", "microsoft.network/networkinterfaces"],
//!       "instances": [ { "id": "...", "records": [ ... ] } ]
//!     }
//!   },
//!   "unpatterned_instances": [ ... ]
//! }
//! ```
//!
//! This is the one place simplified type aliases are allowed to appear, and
//! the one place they are dealt with: every incoming matched-type string is
//! normalized to a `CanonicalType` against the catalog before anything
//! reaches the core. Aliases that resolve to nothing (or ambiguously) are
//! reported, not guessed at. Record-level types have no such latitude -
//! they come from the store and must already be fully qualified.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::catalog::TypeCatalog;
use crate::error::Result;
use crate::store::MemoryStore;
use crate::types::{CanonicalType, Pattern, ResourceInstance, ResourceRecord};

/// Raw snapshot as deserialized from JSON.
#[derive(Debug, Deserialize)]
struct RawSnapshot {
    /// Pre-aggregated type counts; derived from instance records when absent
    #[serde(default)]
    type_counts: BTreeMap<String, usize>,
    patterns: BTreeMap<String, RawPattern>,
    #[serde(default)]
    unpatterned_instances: Vec<RawInstance>,
}

#[derive(Debug, Deserialize)]
struct RawPattern {
    prevalence: f64,
    #[serde(default)]
    matched_types: Vec<String>,
    #[serde(default)]
    instances: Vec<RawInstance>,
}

#[derive(Debug, Deserialize)]
struct RawInstance {
    id: String,
    records: Vec<RawRecord>,
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    id: String,
    #[serde(rename = "type")]
    rtype: String,
    #[serde(default)]
    properties: serde_json::Value,
}

/// What boundary normalization had to do.
#[derive(Debug, Clone, Default)]
pub struct NormalizationReport {
    /// Matched-type strings per pattern that resolved to no unique
    /// canonical type
    pub unresolved_aliases: BTreeMap<String, Vec<String>>,
    /// Aliases that needed leaf-segment resolution (were not already
    /// fully qualified)
    pub resolved_aliases: usize,
}

/// A fully normalized snapshot, ready for the coordinator.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub catalog: TypeCatalog,
    pub patterns: Vec<Pattern>,
    pub store: MemoryStore,
    pub report: NormalizationReport,
}

impl Snapshot {
    /// Load and normalize a snapshot file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Parse and normalize snapshot JSON.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let raw: RawSnapshot = serde_json::from_str(content)?;

        // Materialize instances first; record types are store-level and
        // must parse as-is
        let mut all_instances: Vec<ResourceInstance> = Vec::new();
        let mut pattern_pools: BTreeMap<String, Vec<ResourceInstance>> = BTreeMap::new();
        for (name, raw_pattern) in &raw.patterns {
            let mut pool = Vec::with_capacity(raw_pattern.instances.len());
            for raw_instance in &raw_pattern.instances {
                let instance = materialize(raw_instance, Some(name.as_str()))?;
                all_instances.push(instance.clone());
                pool.push(instance);
            }
            pattern_pools.insert(name.clone(), pool);
        }
        for raw_instance in &raw.unpatterned_instances {
            let instance = materialize(raw_instance, None)?;
            all_instances.push(instance);
        }

        // Catalog: pre-aggregated counts when supplied, record tally
        // otherwise
        let mut catalog = TypeCatalog::new();
        if raw.type_counts.is_empty() {
            for instance in &all_instances {
                for record in &instance.records {
                    catalog.record(record.rtype.clone(), 1);
                }
            }
        } else {
            for (name, count) in &raw.type_counts {
                catalog.record(CanonicalType::parse(name)?, *count);
            }
        }

        // Normalize matched-type sets against the catalog
        let mut report = NormalizationReport::default();
        let mut patterns = Vec::with_capacity(raw.patterns.len());
        for (name, raw_pattern) in &raw.patterns {
            let mut pattern = Pattern::new(name.as_str(), raw_pattern.prevalence);
            for raw_type in &raw_pattern.matched_types {
                match catalog.resolve_alias(raw_type) {
                    Some(rtype) => {
                        if rtype.as_str() != raw_type.to_ascii_lowercase() {
                            report.resolved_aliases += 1;
                        }
                        pattern.matched_types.insert(rtype);
                    }
                    // Keep an unresolvable fully-qualified name as-is: it
                    // scores as maximally rare downstream. Anything short
                    // of fully qualified is reported and dropped.
                    None => match CanonicalType::parse(raw_type) {
                        Ok(rtype) => {
                            pattern.matched_types.insert(rtype);
                        }
                        Err(_) => {
                            warn!(
                                pattern = name.as_str(),
                                alias = raw_type.as_str(),
                                "matched type resolved to no canonical identifier"
                            );
                            report
                                .unresolved_aliases
                                .entry(name.clone())
                                .or_default()
                                .push(raw_type.clone());
                        }
                    },
                }
            }
            if let Some(pool) = pattern_pools.remove(name) {
                pattern.pool = pool;
            }
            patterns.push(pattern);
        }

        debug!(
            patterns = patterns.len(),
            instances = all_instances.len(),
            types = catalog.len(),
            resolved_aliases = report.resolved_aliases,
            "snapshot normalized"
        );

        Ok(Snapshot {
            catalog,
            patterns,
            store: MemoryStore::new(all_instances),
            report,
        })
    }
}

fn materialize(raw: &RawInstance, pattern: Option<&str>) -> Result<ResourceInstance> {
    let mut records = Vec::with_capacity(raw.records.len());
    for raw_record in &raw.records {
        records.push(ResourceRecord {
            id: raw_record.id.clone(),
            rtype: CanonicalType::parse(&raw_record.rtype)?,
            properties: raw_record.properties.clone(),
        });
    }
    Ok(ResourceInstance {
        id: raw.id.as_str().into(),
        pattern: pattern.map(Into::into),
        records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"{
        "type_counts": {
            "ms.compute/virtualmachines": 120,
            "ms.network/networkinterfaces": 150,
            "ms.keyvault/vaults": 3
        },
        "patterns": {
            "VM Workload": {
                "prevalence": 0.6,
                "matched_types": ["virtualMachines", "MS.Network/networkInterfaces"],
                "instances": [
                    {
                        "id": "vmw-001",
                        "records": [
                            {"id": "vm-1", "type": "ms.compute/virtualmachines"},
                            {"id": "nic-1", "type": "ms.network/networkinterfaces",
                             "properties": {"subnet": "default"}}
                        ]
                    }
                ]
            }
        },
        "unpatterned_instances": [
            {"id": "kv-001", "records": [{"id": "kv-1", "type": "ms.keyvault/vaults"}]}
        ]
    }"#;

    #[test]
    fn test_aliases_normalized_against_catalog() {
        let snapshot = Snapshot::from_json_str(SNAPSHOT).unwrap();
        assert_eq!(snapshot.patterns.len(), 1);

        let pattern = &snapshot.patterns[0];
        let matched: Vec<&str> = {
            let mut names: Vec<&str> =
                pattern.matched_types.iter().map(|t| t.as_str()).collect();
            names.sort();
            names
        };
        // "virtualMachines" resolved by unique leaf segment, the qualified
        // name just lowercased
        assert_eq!(
            matched,
            vec!["ms.compute/virtualmachines", "ms.network/networkinterfaces"]
        );
        assert_eq!(snapshot.report.resolved_aliases, 1);
        assert!(snapshot.report.unresolved_aliases.is_empty());
    }

    #[test]
    fn test_store_holds_all_instances() {
        let snapshot = Snapshot::from_json_str(SNAPSHOT).unwrap();
        assert_eq!(snapshot.store.len(), 2);
        assert_eq!(snapshot.patterns[0].pool.len(), 1);
        assert_eq!(snapshot.patterns[0].pool[0].pattern.as_deref(), Some("VM Workload"));
    }

    #[test]
    fn test_catalog_prefers_supplied_counts() {
        let snapshot = Snapshot::from_json_str(SNAPSHOT).unwrap();
        let vm = CanonicalType::parse("ms.compute/virtualmachines").unwrap();
        assert_eq!(snapshot.catalog.count_of(&vm), 120);
    }

    #[test]
    fn test_catalog_derived_from_records_when_counts_absent() {
        let json = r#"{
            "patterns": {
                "web": {
                    "prevalence": 1.0,
                    "instances": [
                        {"id": "w-1", "records": [
                            {"id": "s-1", "type": "ms.web/sites"},
                            {"id": "s-2", "type": "ms.web/sites"}
                        ]}
                    ]
                }
            }
        }"#;
        let snapshot = Snapshot::from_json_str(json).unwrap();
        let sites = CanonicalType::parse("ms.web/sites").unwrap();
        assert_eq!(snapshot.catalog.count_of(&sites), 2);
        assert_eq!(snapshot.catalog.total_records(), 2);
    }

    #[test]
    fn test_unresolvable_alias_reported() {
        let json = r#"{
            "type_counts": {"ms.web/sites": 5},
            "patterns": {
                "web": {"prevalence": 1.0, "matched_types": ["loadBalancers"]}
            }
        }"#;
        let snapshot = Snapshot::from_json_str(json).unwrap();
        assert_eq!(
            snapshot.report.unresolved_aliases["web"],
            vec!["loadBalancers".to_string()]
        );
        assert!(snapshot.patterns[0].matched_types.is_empty());
    }

    #[test]
    fn test_unknown_qualified_type_kept_for_rarity_scoring() {
        let json = r#"{
            "type_counts": {"ms.web/sites": 5},
            "patterns": {
                "web": {"prevalence": 1.0, "matched_types": ["ms.ghost/spectres"]}
            }
        }"#;
        let snapshot = Snapshot::from_json_str(json).unwrap();
        assert!(snapshot.report.unresolved_aliases.is_empty());
        assert_eq!(snapshot.patterns[0].matched_types.len(), 1);
    }

    #[test]
    fn test_malformed_record_type_is_fatal() {
        let json = r#"{
            "patterns": {
                "web": {
                    "prevalence": 1.0,
                    "instances": [
                        {"id": "w-1", "records": [{"id": "s-1", "type": "sites"}]}
                    ]
                }
            }
        }"#;
        assert!(Snapshot::from_json_str(json).is_err());
    }
}
