//! Phase renderer
//!
//! Per-phase ordered unique queues drained once per frame tick. Within a
//! batch: phases in fixed order, sets ascending by `order`, callbacks
//! strictly sequential. The renderer keeps a single wait token on the
//! host gate from first enqueue until every queue is empty after a drain,
//! and releases it even when callbacks error.

use super::Phase;
use crate::sets::{ContentSet, SetHandle};
use crate::state::RuntimeGate;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tally_common::Result;
use tokio::sync::Notify;
use tracing::{debug, error};

/// Default frame cadence
pub const DEFAULT_FPS: u32 = 30;

/// Dispatches one set's callback for one phase
#[async_trait]
pub trait PhaseHandler: Send + Sync {
    async fn handle(&self, phase: Phase, set: SetHandle) -> Result<()>;
}

#[derive(Default)]
struct Queues {
    by_phase: [Vec<SetHandle>; Phase::ALL.len()],
}

impl Queues {
    fn is_empty(&self) -> bool {
        self.by_phase.iter().all(|queue| queue.is_empty())
    }
}

/// The batched phase dispatcher
pub struct Renderer {
    queues: Mutex<Queues>,
    gate: Arc<dyn RuntimeGate>,
    holding: AtomicBool,
    rendered: Notify,
    min_interval: Duration,
    last_drain: Mutex<Option<Instant>>,
}

impl Renderer {
    pub fn new(gate: Arc<dyn RuntimeGate>, fps: u32) -> Self {
        let fps = fps.max(1);
        Self {
            queues: Mutex::new(Queues::default()),
            gate,
            holding: AtomicBool::new(false),
            rendered: Notify::new(),
            min_interval: Duration::from_secs(1) / fps,
            last_drain: Mutex::new(None),
        }
    }

    fn queues_lock(&self) -> std::sync::MutexGuard<'_, Queues> {
        match self.queues.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Append sets to a phase queue, skipping duplicates and clones
    ///
    /// De-duplication is by set id within the phase: a set enqueued twice
    /// before its batch drains runs once.
    pub fn enqueue(&self, phase: Phase, sets: impl IntoIterator<Item = SetHandle>) {
        let mut queues = self.queues_lock();
        let queue = &mut queues.by_phase[phase.index()];
        for set in sets {
            if set.is_intersected() {
                continue;
            }
            if queue.iter().any(|queued| queued.id() == set.id()) {
                continue;
            }
            queue.push(set);
        }
        let empty = queues.is_empty();
        drop(queues);
        if !empty && !self.holding.swap(true, Ordering::SeqCst) {
            self.gate.hold();
        }
    }

    /// Whether any phase queue holds work
    pub fn has_pending(&self) -> bool {
        !self.queues_lock().is_empty()
    }

    /// Drain one batch unconditionally
    ///
    /// Each phase queue is snapshotted and cleared when its turn comes, so
    /// work enqueued mid-drain into a later phase still runs this batch,
    /// while work for an earlier phase waits for the next one.
    pub async fn drain_now(&self, handler: &dyn PhaseHandler) {
        for phase in Phase::ALL {
            let mut batch = {
                let mut queues = self.queues_lock();
                std::mem::take(&mut queues.by_phase[phase.index()])
            };
            if batch.is_empty() {
                continue;
            }
            batch.sort_by_key(|set| set.order());
            debug!(phase = phase.as_str(), sets = batch.len(), "draining phase");
            for set in batch {
                let id = set.id().to_string();
                if let Err(err) = handler.handle(phase, set).await {
                    // Fail open: one bad callback must not stall the batch
                    error!(phase = phase.as_str(), set = %id, error = %err, "callback failed");
                }
            }
        }
        let empty = self.queues_lock().is_empty();
        if empty && self.holding.swap(false, Ordering::SeqCst) {
            self.gate.release();
        }
        {
            let mut last = match self.last_drain.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            *last = Some(Instant::now());
        }
        self.rendered.notify_waiters();
    }

    /// Drain one batch if work is pending and the frame throttle allows
    ///
    /// Returns whether a batch ran. At most one batch runs per `1/fps`.
    pub async fn drain_due(&self, handler: &dyn PhaseHandler) -> bool {
        if !self.has_pending() {
            return false;
        }
        let due = {
            let last = match self.last_drain.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            last.map(|at| at.elapsed() >= self.min_interval).unwrap_or(true)
        };
        if !due {
            return false;
        }
        self.drain_now(handler).await;
        true
    }

    /// Resolve when the next batch completes
    pub async fn rendered(&self) {
        self.rendered.notified().await;
    }

    /// Enqueue into a phase and resolve when the next batch completes
    ///
    /// Something else must be driving drains; this is the awaitable form
    /// hosts use from outside the dispatch loop.
    pub async fn render(&self, phase: Phase, sets: Vec<SetHandle>) {
        let notified = self.rendered.notified();
        self.enqueue(phase, sets);
        notified.await;
    }
}
