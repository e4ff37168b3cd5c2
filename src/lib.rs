//! mirrormap - representative subgraph selection
//!
//! Given a large source resource graph partitioned into architectural
//! patterns, select a much smaller set of resource instances that keeps the
//! pattern mix proportional while maximizing distinct-type coverage,
//! optionally biased toward rare types.
//!
//! # Architecture
//!
//! ```text
//! Snapshot → TypeCatalog → Allocation → Per-Pattern Selection → Orphans → Set Cover → Plan
//!     ↓           ↓            ↓               ↓                    ↓          ↓         ↓
//!  boundary    canonical    largest      coverage scoring      canonical   greedy    trace +
//!  normalize    counts     remainder    + global state         store       filler   metadata
//! ```
//!
//! # Coordination
//!
//! One `SelectionState` is threaded through every pattern in deterministic
//! order. Scoring always consults that global state, so patterns processed
//! later never spend slots on rare types an earlier pattern already
//! covered - the property that keeps distinct-type coverage from *falling*
//! as the rare-type boost rises.
//!
//! # Determinism
//!
//! No randomness anywhere: ties break on instance ids, parallel scoring
//! sweeps are pure max-reduces under a total order, and plan serialization
//! is fully ordered. Identical inputs produce byte-identical plans.

pub mod allocation;
pub mod catalog;
pub mod config;
pub mod error;
pub mod orphans;
pub mod plan;
pub mod selection;
pub mod snapshot;
pub mod store;
pub mod types;

// Re-export core types
pub use catalog::TypeCatalog;
pub use error::{Result, SelectorError};
pub use plan::{Plan, PlanMetadata, PatternSelection, SelectionPhase, TraceEntry};
pub use selection::{SelectionCoordinator, SelectionState};
pub use snapshot::Snapshot;
pub use store::{InstanceStore, MemoryStore};
pub use types::{CanonicalType, Pattern, ResourceInstance, ResourceRecord, SelectorConfig};
