//! Host wait port
//!
//! The renderer takes a single wait token while any phase queue is
//! non-empty, so the host runtime does not advance past initialization
//! until queued lifecycle work has settled.

use std::sync::atomic::{AtomicUsize, Ordering};

/// The wait port a host runtime exposes
pub trait RuntimeGate: Send + Sync {
    /// Take the wait token
    fn hold(&self);

    /// Return the wait token
    fn release(&self);
}

/// Gate for hosts with nothing to pause
pub struct NoopGate;

impl RuntimeGate for NoopGate {
    fn hold(&self) {}
    fn release(&self) {}
}

/// Gate that counts holds and releases, for tests and diagnostics
#[derive(Default)]
pub struct CountingGate {
    holds: AtomicUsize,
    releases: AtomicUsize,
}

impl CountingGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn holds(&self) -> usize {
        self.holds.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    /// Whether the token is currently held
    pub fn is_held(&self) -> bool {
        self.holds() > self.releases()
    }
}

impl RuntimeGate for CountingGate {
    fn hold(&self) {
        self.holds.fetch_add(1, Ordering::SeqCst);
    }

    fn release(&self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}
