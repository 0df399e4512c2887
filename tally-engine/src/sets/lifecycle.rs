//! Lifecycle surface of a set
//!
//! Six cooperative callbacks driven by the phase renderer, plus the two
//! triggers a set may raise itself. Every callback may suspend; the
//! renderer awaits them strictly sequentially inside a phase.

use super::ContentSet;
use crate::state::SetState;
use async_trait::async_trait;

/// Sets that participate in the lifecycle
///
/// The defaults are the no-op semantics of a plain set: only `on_restore`
/// has observable behavior (it announces that restore ran and reports
/// that nothing was restored). Subtypes override what they need.
#[async_trait]
pub trait LifecycleSet: ContentSet {
    /// First lifecycle phase, before any storage access
    async fn on_init(&self) {}

    /// Restore persisted state; returns whether state was found
    async fn on_restore(&self) -> bool {
        self.core().emit_restored(false);
        false
    }

    /// Runs after restore for sets that had nothing to restore, and again
    /// on restart
    async fn on_start(&self) {}

    /// The navigation location now covers this set
    async fn on_visit(&self) {}

    /// The navigation location no longer covers this set
    async fn on_leave(&self) {}

    /// A content model intersecting this set changed
    async fn on_update(&self) {}

    /// Whether this set supports being reset
    fn can_reset(&self) -> bool {
        false
    }

    /// Notify intersecting sets that this set's data changed
    ///
    /// Emits the update event and raises an update trigger toward the
    /// controller. No-op on intersected clones.
    fn update(&self) {
        self.core().trigger_update();
    }

    /// Reset this set, notifying sets on the same model
    ///
    /// Emits the reset event and raises a reset trigger toward the
    /// controller. No-op on intersected clones.
    fn reset(&self) {
        self.core().trigger_reset();
    }

    /// The persistence adapter for this set's restoration blob
    fn state(&self) -> SetState {
        SetState::new(
            self.core().ctx().storage(),
            self.set_type().to_string(),
            self.id().to_string(),
        )
    }
}
