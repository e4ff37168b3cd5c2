//! Selection pipeline - from allocation targets to a committed plan.
//!
//! The pipeline combines:
//! - Global selection state threaded across all patterns in processing order
//! - Rarity/coverage scoring with missing/underrepresented classification
//! - Structural-similarity blending (boost <= 1.0 only)
//! - Greedy per-pattern selection under the allocation targets
//! - Supplemental greedy set cover for still-missing types

mod state;
mod similarity;
mod scorer;
mod per_pattern;
mod filler;
mod coordinator;

pub use state::SelectionState;
pub use similarity::CompositionProfile;
pub use scorer::{CoverageClass, CoverageScorer, InstanceScore};
pub use per_pattern::{PatternSelector, SelectionRound};
pub use filler::{CoverageFiller, FillOutcome, FillRound};
pub use coordinator::SelectionCoordinator;
