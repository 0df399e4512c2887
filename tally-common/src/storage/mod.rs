//! Offline-storage port
//!
//! The engine persists per-set restoration blobs and SCORM-style objective
//! records through this namespaced key/value surface. A real host binds it
//! to its LMS adapter; [`MemoryStorage`] serves tests and LMS-less hosts.

mod status;
mod value;

pub use status::{CompletionStatus, ObjectiveScore, ObjectiveStatus, SuccessStatus};
pub use value::StateValue;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use tracing::warn;

/// Well-known namespaces
pub mod namespaces {
    /// Objective titles, keyed by set id
    pub const OBJECTIVE_DESCRIPTION: &str = "objectiveDescription";
    /// Objective score triples, keyed by set id
    pub const OBJECTIVE_SCORE: &str = "objectiveScore";
    /// Objective completion/success, keyed by set id
    pub const OBJECTIVE_STATUS: &str = "objectiveStatus";
    /// Shared-children tracking positions, keyed by model id
    pub const SHARED_CHILDREN: &str = "ch";
}

/// Namespaced key/value storage with a readiness gate
///
/// Before the host signals readiness, reads return `None` and writes are
/// dropped; persistence-dependent callbacks degrade to silent no-ops.
pub trait OfflineStorage: Send + Sync {
    /// Whether the backing store has finished initializing
    fn is_ready(&self) -> bool;

    /// Read a serialized value
    fn get(&self, namespace: &str, key: &str) -> Option<String>;

    /// Write a serialized value
    fn set(&self, namespace: &str, key: &str, value: String);

    /// Remove a value
    fn remove(&self, namespace: &str, key: &str);
}

/// In-memory storage used by tests and hosts without an LMS backend
pub struct MemoryStorage {
    entries: RwLock<HashMap<(String, String), String>>,
    ready: AtomicBool,
}

impl MemoryStorage {
    /// Create an empty store, already ready
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ready: AtomicBool::new(true),
        }
    }

    /// Create an empty store that reports unready until released
    pub fn unready() -> Self {
        let storage = Self::new();
        storage.ready.store(false, Ordering::SeqCst);
        storage
    }

    /// Flip the readiness gate
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    /// Whether the store holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl OfflineStorage for MemoryStorage {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn get(&self, namespace: &str, key: &str) -> Option<String> {
        if !self.is_ready() {
            return None;
        }
        self.entries
            .read()
            .ok()?
            .get(&(namespace.to_string(), key.to_string()))
            .cloned()
    }

    fn set(&self, namespace: &str, key: &str, value: String) {
        if !self.is_ready() {
            warn!(namespace, key, "storage write dropped: store not ready");
            return;
        }
        if let Ok(mut entries) = self.entries.write() {
            entries.insert((namespace.to_string(), key.to_string()), value);
        }
    }

    fn remove(&self, namespace: &str, key: &str) {
        if !self.is_ready() {
            return;
        }
        if let Ok(mut entries) = self.entries.write() {
            entries.remove(&(namespace.to_string(), key.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let storage = MemoryStorage::new();
        storage.set("scoring", "performance", "[[1,0],[2,3]]".to_string());
        assert_eq!(
            storage.get("scoring", "performance").as_deref(),
            Some("[[1,0],[2,3]]")
        );

        storage.remove("scoring", "performance");
        assert!(storage.get("scoring", "performance").is_none());
    }

    #[test]
    fn test_namespaces_do_not_collide() {
        let storage = MemoryStorage::new();
        storage.set("a", "key", "1".to_string());
        storage.set("b", "key", "2".to_string());
        assert_eq!(storage.get("a", "key").as_deref(), Some("1"));
        assert_eq!(storage.get("b", "key").as_deref(), Some("2"));
    }

    #[test]
    fn test_unready_store_drops_io() {
        let storage = MemoryStorage::unready();
        storage.set("scoring", "x", "1".to_string());
        assert!(storage.get("scoring", "x").is_none());

        storage.set_ready(true);
        // The earlier write was dropped, not deferred
        assert!(storage.get("scoring", "x").is_none());

        storage.set("scoring", "x", "2".to_string());
        assert_eq!(storage.get("scoring", "x").as_deref(), Some("2"));
    }
}
