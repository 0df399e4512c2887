//! Set registry
//!
//! Holds every root set by unique id in registration order. Intersected
//! clones never enter; they are rejected outright. Registration and
//! deregistration are announced on the event bus.

use crate::sets::hierarchy::intersects_hierarchy;
use crate::sets::{ContentSet, SetHandle};
use std::sync::{Arc, RwLock};
use tally_common::events::{EventBus, ScoringEvent};
use tally_common::model::ModelId;
use tally_common::time;
use tally_common::{Error, Result};
use tracing::debug;

/// Shared registry state, reachable from every set through the context
pub struct RegistryShared {
    sets: RwLock<Vec<SetHandle>>,
    bus: EventBus,
}

impl RegistryShared {
    pub(crate) fn new(bus: EventBus) -> Self {
        Self {
            sets: RwLock::new(Vec::new()),
            bus,
        }
    }

    fn sets_read(&self) -> Vec<SetHandle> {
        match self.sets.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Register a root set
    ///
    /// Duplicate ids are fatal to the caller; intersected clones are
    /// rejected as a contract violation.
    pub fn register(&self, set: SetHandle) -> Result<()> {
        if set.is_intersected() {
            return Err(Error::Internal(
                "intersected clones cannot be registered".to_string(),
            ));
        }
        let mut sets = match self.sets.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if sets.iter().any(|s| s.id() == set.id()) {
            return Err(Error::DuplicateSetId {
                id: set.id().to_string(),
            });
        }
        let (id, set_type) = (set.id().to_string(), set.set_type().to_string());
        sets.push(set);
        drop(sets);
        debug!(set = %id, set_type = %set_type, "set registered");
        self.bus.emit_lossy(ScoringEvent::SetRegistered {
            set_id: id,
            set_type,
            timestamp: time::now(),
        });
        Ok(())
    }

    /// Remove a root set by id
    pub fn deregister(&self, id: &str) -> Option<SetHandle> {
        let mut sets = match self.sets.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let index = sets.iter().position(|s| s.id() == id)?;
        let set = sets.remove(index);
        drop(sets);
        debug!(set = %id, "set deregistered");
        self.bus.emit_lossy(ScoringEvent::SetDeregistered {
            set_id: set.id().to_string(),
            set_type: set.set_type().to_string(),
            timestamp: time::now(),
        });
        Some(set)
    }

    /// Remove every root set, announcing each departure
    pub fn clear(&self) {
        let ids: Vec<String> = self.sets_read().iter().map(|s| s.id().to_string()).collect();
        for id in ids {
            self.deregister(&id);
        }
    }

    /// Find a root set by id
    pub fn get(&self, id: &str) -> Option<SetHandle> {
        self.sets_read().into_iter().find(|s| s.id() == id)
    }

    /// Root sets of the given type, in registration order
    pub fn by_type(&self, set_type: &str) -> Vec<SetHandle> {
        self.sets_read()
            .into_iter()
            .filter(|s| s.set_type() == set_type)
            .collect()
    }

    /// Root sets whose models overlap the given model's hierarchy
    pub fn by_intersecting_model_id(&self, model_id: &str) -> Vec<SetHandle> {
        let target = [ModelId::from(model_id)];
        self.sets_read()
            .into_iter()
            .filter(|set| {
                let models = set.models();
                let ctx = set.core().ctx();
                let tree = ctx.tree();
                intersects_hierarchy(&models, &target, &tree)
            })
            .collect()
    }

    /// Every root set in registration order
    pub fn all(&self) -> Vec<SetHandle> {
        self.sets_read()
    }

    /// Every root set sorted ascending by lifecycle order (stable)
    pub fn ordered(&self) -> Vec<SetHandle> {
        let mut sets = self.sets_read();
        sets.sort_by_key(|s| s.order());
        sets
    }

    /// Number of registered root sets
    pub fn len(&self) -> usize {
        match self.sets.read() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// First free `{prefix}-{n}` id, counting from zero
    pub fn next_free_id(&self, prefix: &str) -> String {
        let sets = self.sets_read();
        let mut n = 0usize;
        loop {
            let candidate = format!("{prefix}-{n}");
            if !sets.iter().any(|s| s.id() == candidate) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Owning handle for the registry
pub struct SetRegistry {
    shared: Arc<RegistryShared>,
}

impl SetRegistry {
    /// Create an empty registry announcing on the given bus
    pub fn new(bus: EventBus) -> Self {
        Self {
            shared: Arc::new(RegistryShared::new(bus)),
        }
    }

    /// The shared state, for weaving into a [`ScoringContext`]
    ///
    /// [`ScoringContext`]: crate::context::ScoringContext
    pub fn shared(&self) -> &Arc<RegistryShared> {
        &self.shared
    }
}

impl std::ops::Deref for SetRegistry {
    type Target = RegistryShared;

    fn deref(&self) -> &Self::Target {
        &self.shared
    }
}
