//! Shared engine context
//!
//! One `ScoringContext` value is threaded through every set, query, and
//! lifecycle component instead of process-wide singletons. Cloning is
//! cheap; all fields are handles.

use crate::registry::RegistryShared;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use tally_common::events::EventBus;
use tally_common::model::ContentTree;
use tally_common::storage::OfflineStorage;
use tokio::sync::mpsc;

/// A programmatic trigger raised by a set, consumed by the controller
#[derive(Debug, Clone)]
pub struct SetTrigger {
    /// Id of the set that raised the trigger
    pub set_id: String,
    /// What the set asked for
    pub kind: TriggerKind,
}

/// Trigger kinds a set can raise
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    /// Notify intersecting sets that this set's data changed
    Update,
    /// Notify same-model sets that this set reset its state
    Reset,
}

/// Handles shared by every engine component
#[derive(Clone)]
pub struct ScoringContext {
    tree: Arc<RwLock<ContentTree>>,
    bus: EventBus,
    storage: Arc<dyn OfflineStorage>,
    registry: Weak<RegistryShared>,
    triggers: mpsc::UnboundedSender<SetTrigger>,
    stamp: Arc<AtomicU64>,
}

impl ScoringContext {
    pub(crate) fn new(
        tree: Arc<RwLock<ContentTree>>,
        bus: EventBus,
        storage: Arc<dyn OfflineStorage>,
        registry: Weak<RegistryShared>,
        triggers: mpsc::UnboundedSender<SetTrigger>,
    ) -> Self {
        Self {
            tree,
            bus,
            storage,
            registry,
            triggers,
            stamp: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Read access to the content tree
    ///
    /// Lock poisoning is recovered fail-open: a panicking lifecycle
    /// callback must not take the whole engine down with it.
    pub fn tree(&self) -> RwLockReadGuard<'_, ContentTree> {
        match self.tree.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Write access to the content tree
    pub fn tree_mut(&self) -> RwLockWriteGuard<'_, ContentTree> {
        match self.tree.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// The shared tree handle, for host adapters
    pub fn tree_handle(&self) -> Arc<RwLock<ContentTree>> {
        Arc::clone(&self.tree)
    }

    /// The scoring event bus
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// The offline-storage port
    pub fn storage(&self) -> Arc<dyn OfflineStorage> {
        Arc::clone(&self.storage)
    }

    /// The set registry, `None` once the engine has been torn down
    pub fn registry(&self) -> Option<Arc<RegistryShared>> {
        self.registry.upgrade()
    }

    /// Raise a trigger toward the lifecycle controller
    pub fn send_trigger(&self, trigger: SetTrigger) {
        // Receiver gone means the engine is shutting down; nothing to do.
        let _ = self.triggers.send(trigger);
    }

    /// Current dirty stamp keying derived-view caches
    pub fn stamp(&self) -> u64 {
        self.stamp.load(Ordering::Acquire)
    }

    /// Invalidate every derived-view cache
    pub fn bump_stamp(&self) {
        self.stamp.fetch_add(1, Ordering::AcqRel);
    }
}
