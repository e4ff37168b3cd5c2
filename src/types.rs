//! Core types for mirrormap - representative subgraph selection.
//!
//! Key design decisions:
//! - `CanonicalType` is the only resource-type value in the crate. It can be
//!   built solely through [`CanonicalType::parse`], which enforces the
//!   fully-qualified `namespace/category[/kind]` shape. Pattern-local
//!   simplified aliases must be resolved at the snapshot boundary and can
//!   never leak into scoring, allocation, or orphan resolution.
//! - `Arc<str>` for shared identifiers (instances are cloned into plans)
//! - Frozen/immutable by default; the only mutable run state lives in
//!   `selection::SelectionState`

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, SelectorError};

/// Serde serialization helpers for Arc<str> fields
mod arc_str_serde {
    use super::*;

    pub fn serialize<S>(arc: &Arc<str>, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(arc.as_ref())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<Arc<str>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(s.into())
    }

    pub fn serialize_opt<S>(
        arc: &Option<Arc<str>>,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match arc {
            Some(s) => serializer.serialize_some(s.as_ref()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize_opt<'de, D>(
        deserializer: D,
    ) -> std::result::Result<Option<Arc<str>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt: Option<String> = Option::deserialize(deserializer)?;
        Ok(opt.map(|s| s.into()))
    }
}

/// Syntax for a fully-qualified resource type: lowercase segments joined by
/// `/`, at least two segments (`namespace/category`, optionally deeper).
static TYPE_SYNTAX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9][a-z0-9._-]*(/[a-z0-9][a-z0-9._-]*)+$")
        .expect("static type syntax pattern")
});

/// A canonical, fully-qualified resource type identifier.
///
/// Examples: `microsoft.compute/virtualmachines`,
/// `microsoft.sql/servers/databases`.
///
/// Comparison is exact. A pattern-graph simplified name such as
/// `virtualMachines` does not parse and therefore cannot be compared against
/// store-level identifiers by accident - the mismatch has to be handled at
/// the boundary (`snapshot`), where it is either resolved against the
/// catalog or reported.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalType(Arc<str>);

impl CanonicalType {
    /// Parse a raw identifier into canonical form.
    ///
    /// Lowercases the input and requires the fully-qualified shape. Returns
    /// `SelectorError::InvalidTypeIdentifier` for anything else, including
    /// the single-segment simplified aliases emitted by pattern detection.
    pub fn parse(raw: &str) -> Result<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        if TYPE_SYNTAX.is_match(&normalized) {
            Ok(CanonicalType(normalized.into()))
        } else {
            Err(SelectorError::InvalidTypeIdentifier {
                raw: raw.to_string(),
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Final path segment, e.g. `virtualmachines` for
    /// `microsoft.compute/virtualmachines`. Used only for alias resolution
    /// at the snapshot boundary.
    pub fn leaf(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for CanonicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for CanonicalType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for CanonicalType {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        CanonicalType::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// A single resource record: one node of the source graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    /// Store-level resource identifier
    pub id: String,
    /// Canonical resource type
    #[serde(rename = "type")]
    pub rtype: CanonicalType,
    /// Free-form properties passed through to the IaC layer
    #[serde(default)]
    pub properties: serde_json::Value,
}

/// A correlated group of resource records selected or skipped as one unit
/// (e.g. a VM plus its NIC and disk).
///
/// The record order is preserved end to end: downstream emitters rely on it
/// for dependency ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceInstance {
    /// Instance identifier, unique across the whole source graph
    #[serde(with = "arc_str_serde")]
    pub id: Arc<str>,
    /// Owning pattern name; `None` for orphan instances
    #[serde(
        default,
        serialize_with = "arc_str_serde::serialize_opt",
        deserialize_with = "arc_str_serde::deserialize_opt"
    )]
    pub pattern: Option<Arc<str>>,
    /// Ordered member records
    pub records: Vec<ResourceRecord>,
}

impl ResourceInstance {
    /// Distinct resource types this instance contributes.
    pub fn distinct_types(&self) -> BTreeSet<&CanonicalType> {
        self.records.iter().map(|r| &r.rtype).collect()
    }

    /// Type multiset: occurrence count per type across member records.
    /// BTreeMap so downstream float accumulation is order-stable.
    pub fn type_counts(&self) -> BTreeMap<&CanonicalType, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.records {
            *counts.entry(&record.rtype).or_insert(0) += 1;
        }
        counts
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }
}

/// A detected architectural pattern: a named cluster of co-occurring
/// resource types with the instances that belong to it.
#[derive(Debug, Clone)]
pub struct Pattern {
    /// Pattern name as reported by detection (e.g. "VM Workload")
    pub name: Arc<str>,
    /// Prevalence weight in the source population; non-negative,
    /// not necessarily normalized
    pub prevalence: f64,
    /// Canonical types considered matched to this pattern.
    /// May reference types absent from the catalog; those score as
    /// maximally rare rather than erroring.
    pub matched_types: HashSet<CanonicalType>,
    /// Instances available for selection
    pub pool: Vec<ResourceInstance>,
}

impl Pattern {
    pub fn new(name: impl Into<Arc<str>>, prevalence: f64) -> Self {
        Self {
            name: name.into(),
            prevalence,
            matched_types: HashSet::new(),
            pool: Vec::new(),
        }
    }
}

/// Configuration for a selection run.
/// All values are tunable at runtime for experimentation.
#[derive(Debug, Clone)]
pub struct SelectorConfig {
    /// Total number of instances to select across all patterns
    pub target_instance_count: usize,

    /// Rare-type boost factor (>= 1.0). At 1.0 the coverage score is blended
    /// with structural similarity; above 1.0 ranking is coverage-only and
    /// the structural distance is recorded for the trace but not ranked on.
    pub rare_boost_factor: f64,

    /// A covered type counts as underrepresented while its coverage ratio
    /// stays below this fraction of the run's overall sampling ratio
    pub missing_type_threshold: f64,

    /// Fraction of the target count reserved for the supplemental
    /// set-cover pass
    pub supplemental_budget_fraction: f64,

    // Coverage-class base multipliers
    pub boost_missing: f64,
    pub boost_underrepresented: f64,
    pub boost_covered: f64,

    /// Structural-similarity blend weight, applied only when
    /// `rare_boost_factor <= 1.0`
    pub structural_blend: f64,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            target_instance_count: 50,
            rare_boost_factor: 1.0,
            missing_type_threshold: 0.5,
            supplemental_budget_fraction: 0.10,

            // Class multipliers: a type nobody selected yet outranks an
            // underrepresented one, which outranks an adequately covered one
            boost_missing: 6.0,
            boost_underrepresented: 3.0,
            boost_covered: 1.0,

            structural_blend: 0.35,
        }
    }
}

impl SelectorConfig {
    /// Validate ranges. Called by the coordinator before any selection work;
    /// a failure here is fatal, everything later is metadata.
    pub fn validate(&self) -> Result<()> {
        if self.target_instance_count == 0 {
            return Err(SelectorError::InvalidTargetCount(self.target_instance_count));
        }
        if !self.rare_boost_factor.is_finite() || self.rare_boost_factor < 1.0 {
            return Err(SelectorError::InvalidBoostFactor(self.rare_boost_factor));
        }
        if !self.missing_type_threshold.is_finite()
            || self.missing_type_threshold <= 0.0
            || self.missing_type_threshold >= 1.0
        {
            return Err(SelectorError::InvalidThreshold(self.missing_type_threshold));
        }
        if !self.supplemental_budget_fraction.is_finite()
            || self.supplemental_budget_fraction < 0.0
            || self.supplemental_budget_fraction >= 1.0
        {
            return Err(SelectorError::InvalidBudgetFraction(
                self.supplemental_budget_fraction,
            ));
        }
        if !self.structural_blend.is_finite()
            || self.structural_blend < 0.0
            || self.structural_blend > 1.0
        {
            return Err(SelectorError::InvalidBlendWeight(self.structural_blend));
        }
        Ok(())
    }

    /// Extra instances the supplemental filler may spend:
    /// `floor(fraction x target)`.
    pub fn supplemental_budget(&self) -> usize {
        (self.supplemental_budget_fraction * self.target_instance_count as f64).floor() as usize
    }
}
