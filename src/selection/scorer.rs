//! Coverage scoring for candidate instances.
//!
//! Each type a candidate contributes is classified against the **global**
//! selection state - everything committed so far across all patterns in this
//! run, never a per-pattern-local view:
//!
//! - `Missing`: zero coverage anywhere so far (base multiplier 6)
//! - `Underrepresented`: covered, but below the threshold fraction of the
//!   run's sampling ratio (base multiplier 3)
//! - `Covered`: adequately represented (base multiplier 1)
//!
//! Contribution per type = `rarity x base x rare_boost_factor`, with
//! `rarity = 1 / max(catalog count, 1)`. The final score:
//!
//! ```text
//! boost <= 1.0:  (1 - blend) x coverage + blend x structural_similarity
//! boost  > 1.0:  coverage only
//! ```
//!
//! Above 1.0 the structural term would dominate and neutralize the boost, so
//! it is excluded from ranking; its distance is still computed so the trace
//! can record quality drift.
//!
//! Scoring is a pure function of (instance, state, config): re-scoring the
//! same instance against an unchanged state yields the same score.

use crate::catalog::TypeCatalog;
use crate::selection::similarity::CompositionProfile;
use crate::selection::state::SelectionState;
use crate::types::{CanonicalType, ResourceInstance, SelectorConfig};

/// How well a type is represented in the selection so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverageClass {
    /// No committed instance carries this type
    Missing,
    /// Carried, but coverage ratio below the configured fraction of the
    /// run's sampling ratio
    Underrepresented,
    /// Adequately represented
    Covered,
}

/// Score breakdown for one candidate at one iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstanceScore {
    /// Value the selector ranks on
    pub total: f64,
    /// Coverage component before any structural blending
    pub coverage: f64,
    /// Structural distance to the pattern composition, `[0, 1]`;
    /// 1.0 when no profile applies (supplemental phase)
    pub structural_distance: f64,
}

/// Rarity/coverage scorer for a single selection run.
pub struct CoverageScorer<'a> {
    config: &'a SelectorConfig,
    catalog: &'a TypeCatalog,
}

impl<'a> CoverageScorer<'a> {
    pub fn new(config: &'a SelectorConfig, catalog: &'a TypeCatalog) -> Self {
        Self { config, catalog }
    }

    /// Classify a type against the global state.
    pub fn classify(&self, rtype: &CanonicalType, state: &SelectionState) -> CoverageClass {
        let covered = state.covered_count(rtype);
        if covered == 0 {
            return CoverageClass::Missing;
        }

        let source_count = self.catalog.count_of(rtype).max(1);
        let coverage_ratio = covered as f64 / source_count as f64;
        let adequate = self.config.missing_type_threshold * state.sampling_ratio(self.catalog);
        if coverage_ratio < adequate {
            CoverageClass::Underrepresented
        } else {
            CoverageClass::Covered
        }
    }

    fn class_multiplier(&self, class: CoverageClass) -> f64 {
        match class {
            CoverageClass::Missing => self.config.boost_missing,
            CoverageClass::Underrepresented => self.config.boost_underrepresented,
            CoverageClass::Covered => self.config.boost_covered,
        }
    }

    /// Coverage component: summed rarity contributions of the candidate's
    /// distinct types.
    pub fn coverage_score(&self, instance: &ResourceInstance, state: &SelectionState) -> f64 {
        let mut score = 0.0;
        for rtype in instance.distinct_types() {
            let rarity = 1.0 / self.catalog.count_of(rtype).max(1) as f64;
            let base = self.class_multiplier(self.classify(rtype, state));
            score += rarity * base * self.config.rare_boost_factor;
        }
        score
    }

    /// Full score for ranking plus the structural distance for the trace.
    ///
    /// `profile` is the owning pattern's composition; pass `None` in the
    /// supplemental phase, where no single pattern applies.
    pub fn score(
        &self,
        instance: &ResourceInstance,
        state: &SelectionState,
        profile: Option<&CompositionProfile>,
    ) -> InstanceScore {
        let coverage = self.coverage_score(instance, state);
        let structural_distance = profile.map(|p| p.distance(instance)).unwrap_or(1.0);

        let total = match profile {
            Some(_) if self.config.rare_boost_factor <= 1.0 => {
                let blend = self.config.structural_blend;
                (1.0 - blend) * coverage + blend * (1.0 - structural_distance)
            }
            _ => coverage,
        };

        InstanceScore {
            total,
            coverage,
            structural_distance,
        }
    }
}
