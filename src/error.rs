//! Error types for the selection pipeline.
//!
//! Only configuration problems are fatal: they are rejected by
//! [`crate::types::SelectorConfig::validate`] before any selection work
//! begins. Everything else the pipeline can encounter (pool shortfalls,
//! unmatched pattern types, exhausted supplemental budgets) is recoverable
//! and lands in `Plan.metadata` instead of an error path.

use thiserror::Error;

/// Result type alias for selection operations.
pub type Result<T> = std::result::Result<T, SelectorError>;

/// Selection pipeline error types.
#[derive(Debug, Error)]
pub enum SelectorError {
    /// Requested total instance count is not positive.
    #[error("target instance count must be positive, got {0}")]
    InvalidTargetCount(usize),

    /// Rare-type boost factor below the identity value.
    #[error("rare boost factor must be >= 1.0, got {0}")]
    InvalidBoostFactor(f64),

    /// Underrepresentation threshold outside the open unit interval.
    #[error("missing type threshold must be in (0, 1), got {0}")]
    InvalidThreshold(f64),

    /// Supplemental budget fraction outside [0, 1).
    #[error("supplemental budget fraction must be in [0, 1), got {0}")]
    InvalidBudgetFraction(f64),

    /// Structural blend weight outside [0, 1].
    #[error("structural blend weight must be in [0, 1], got {0}")]
    InvalidBlendWeight(f64),

    /// A string that does not have the fully-qualified
    /// `namespace/category[/kind]` shape was used as a resource type.
    #[error("invalid resource type identifier '{raw}': expected namespace/category[/kind]")]
    InvalidTypeIdentifier { raw: String },

    /// Malformed configuration file.
    #[error("config error: {0}")]
    Config(String),

    /// Snapshot input could not be parsed.
    #[error("snapshot parse error: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// I/O error reading configuration or snapshot files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
