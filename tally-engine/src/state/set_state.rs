//! Per-set restoration blob adapter

use std::sync::Arc;
use tally_common::storage::{OfflineStorage, StateValue};
use tally_common::Result;
use tracing::warn;

/// Reads and writes one value under `{setType}[{setId}]`
///
/// Storage being unready degrades to silent no-ops: reads return `None`,
/// writes are dropped by the port.
pub struct SetState {
    storage: Arc<dyn OfflineStorage>,
    namespace: String,
    key: String,
}

impl SetState {
    pub fn new(storage: Arc<dyn OfflineStorage>, namespace: String, key: String) -> Self {
        Self {
            storage,
            namespace,
            key,
        }
    }

    /// Read and deserialize the stored value
    ///
    /// A blob that fails the shape check is discarded with a warning; a
    /// set must not restore from corrupt state.
    pub fn get(&self) -> Option<StateValue> {
        let raw = self.storage.get(&self.namespace, &self.key)?;
        match StateValue::deserialize(&raw) {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(
                    namespace = %self.namespace,
                    key = %self.key,
                    %error,
                    "discarding unreadable state blob"
                );
                None
            }
        }
    }

    /// Validate, serialize, and store a value
    pub fn set(&self, value: &StateValue) -> Result<()> {
        let raw = value.serialize()?;
        self.storage.set(&self.namespace, &self.key, raw);
        Ok(())
    }

    /// Remove the stored value
    pub fn clear(&self) {
        self.storage.remove(&self.namespace, &self.key);
    }
}
