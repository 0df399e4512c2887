//! Lifecycle engine
//!
//! The controller decides which sets enter which phases from content
//! changes, navigation, and triggers; the renderer drains the phase
//! queues once per frame tick in phase order, then set order.

mod controller;
mod phase;
mod renderer;
mod status;

pub use controller::Controller;
pub use phase::Phase;
pub use renderer::{PhaseHandler, Renderer, DEFAULT_FPS};
pub use status::{SetStatus, StatusPhase};
