//! # Tally Scoring Engine (tally-engine)
//!
//! Scoring-set algebra and lifecycle engine for courseware runtimes.
//!
//! **Purpose:** Maintain named sets over a content-model tree, intersect
//! them by overlapping hierarchies, evaluate selection queries, roll up
//! score/correctness/completion into a course total, and drive per-set
//! lifecycle callbacks in phase-ordered, frame-batched passes.
//!
//! **Architecture:** A single cooperative dispatch loop over phase queues,
//! fed by the content-model change stream and a typed trigger channel.

pub mod context;
pub mod lifecycle;
pub mod query;
pub mod registry;
pub mod root;
pub mod sets;
pub mod state;

pub use context::{ScoringContext, SetTrigger, TriggerKind};
pub use registry::SetRegistry;
pub use root::{EngineOptions, Scoring};
pub use sets::{
    scale, ContentSet, LifecycleSet, ModelSet, ScoredSet, ScoringCore, ScoringOptions,
    SetConfig, SetCore, SetHandle, TotalSet,
};
pub use tally_common::{Error, Result};
