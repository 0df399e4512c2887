//! Persistence adapters and the host wait port
//!
//! Typed wrappers over the offline-storage port: per-set restoration
//! blobs, SCORM-style objectives, and the wait token the renderer holds
//! while work is queued.

mod gate;
mod objective;
mod set_state;

pub use gate::{CountingGate, NoopGate, RuntimeGate};
pub use objective::Objective;
pub use set_state::SetState;
