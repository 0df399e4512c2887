//! SCORM-style objective writer
//!
//! One objective record per scoring set, written through the
//! offline-storage port. Status writes are debounced so a burst of
//! completion edges inside one batch coalesces into a single write.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tally_common::storage::{namespaces, ObjectiveScore, ObjectiveStatus, OfflineStorage};
use tracing::warn;

/// Milliseconds the status writer waits for further edges
const STATUS_DEBOUNCE_MS: u64 = 100;

/// Writes `objectiveDescription`, `objectiveScore`, and `objectiveStatus`
/// for one set id
#[derive(Clone)]
pub struct Objective {
    set_id: String,
    storage: Arc<dyn OfflineStorage>,
    pending_status: Arc<Mutex<Option<ObjectiveStatus>>>,
    flush_scheduled: Arc<AtomicBool>,
    debounce_ms: u64,
}

impl Objective {
    pub fn new(storage: Arc<dyn OfflineStorage>, set_id: impl Into<String>) -> Self {
        Self {
            set_id: set_id.into(),
            storage,
            pending_status: Arc::new(Mutex::new(None)),
            flush_scheduled: Arc::new(AtomicBool::new(false)),
            debounce_ms: STATUS_DEBOUNCE_MS,
        }
    }

    /// Build a writer that flushes immediately (tests)
    pub fn undebounced(storage: Arc<dyn OfflineStorage>, set_id: impl Into<String>) -> Self {
        let mut objective = Self::new(storage, set_id);
        objective.debounce_ms = 0;
        objective
    }

    /// Write the objective title
    pub fn set_description(&self, title: &str) {
        self.storage.set(
            namespaces::OBJECTIVE_DESCRIPTION,
            &self.set_id,
            title.to_string(),
        );
    }

    /// Write the score triple
    pub fn set_score(&self, score: ObjectiveScore) {
        match serde_json::to_string(&score) {
            Ok(raw) => self.storage.set(namespaces::OBJECTIVE_SCORE, &self.set_id, raw),
            Err(error) => warn!(set = %self.set_id, %error, "objective score not serializable"),
        }
    }

    /// Write the completion/success pair, debounced
    ///
    /// The latest status wins; earlier statuses set within the debounce
    /// window are coalesced away.
    pub fn set_status(&self, status: ObjectiveStatus) {
        if let Ok(mut pending) = self.pending_status.lock() {
            *pending = Some(status);
        }
        let debounce = self.debounce_ms;
        let in_runtime = tokio::runtime::Handle::try_current().is_ok();
        if debounce == 0 || !in_runtime {
            self.write_pending();
            return;
        }
        if self.flush_scheduled.swap(true, Ordering::SeqCst) {
            return;
        }
        let writer = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(debounce)).await;
            writer.write_pending();
        });
    }

    /// Flush any pending status immediately
    pub fn flush(&self) {
        self.write_pending();
    }

    fn write_pending(&self) {
        self.flush_scheduled.store(false, Ordering::SeqCst);
        let status = match self.pending_status.lock() {
            Ok(mut pending) => pending.take(),
            Err(_) => None,
        };
        let Some(status) = status else {
            return;
        };
        match serde_json::to_string(&status) {
            Ok(raw) => self.storage.set(namespaces::OBJECTIVE_STATUS, &self.set_id, raw),
            Err(error) => warn!(set = %self.set_id, %error, "objective status not serializable"),
        }
    }
}
