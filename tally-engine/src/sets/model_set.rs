//! Per-model sets
//!
//! Every content model is wrapped in one queryable, non-scoring set so
//! queries can select by model position and the lifecycle can fan changes
//! out along the hierarchy. Lifecycle callbacks are the explicit no-op
//! defaults; a model set only carries identity.

use super::{ContentSet, LifecycleSet, SetConfig, SetCore, SetHandle};
use crate::context::ScoringContext;
use std::sync::Arc;
use tally_common::model::ModelId;
use tally_common::{Error, Result};

/// Ordering base; descendants run before their ancestors
const MODEL_ORDER_BASE: i32 = 100;

/// A set wrapping a single content model
pub struct ModelSet {
    core: SetCore,
}

impl ModelSet {
    /// Set type of every model set
    pub const TYPE: &'static str = "model";

    /// Wrap a model and register the set
    ///
    /// The set id is the model id, so `#a-300` style queries address the
    /// model's set directly. `order` is `100 - depth`, making descendant
    /// sets run before their ancestors within a phase.
    pub fn create(ctx: &ScoringContext, model_id: &str) -> Result<Arc<ModelSet>> {
        let depth = {
            let tree = ctx.tree();
            if tree.find_by_id(model_id).is_none() {
                return Err(Error::UnknownModel {
                    id: model_id.to_string(),
                });
            }
            tree.depth(model_id)
        };
        let core = SetCore::new(
            ctx.clone(),
            SetConfig {
                id: Some(model_id.to_string()),
                set_type: Some(Self::TYPE.to_string()),
                model_id: Some(ModelId::from(model_id)),
                models: Some(vec![ModelId::from(model_id)]),
                order: Some(MODEL_ORDER_BASE - depth as i32),
                ..Default::default()
            },
        );
        let set = Arc::new(ModelSet { core });
        if let Some(registry) = ctx.registry() {
            registry.register(set.clone())?;
        }
        Ok(set)
    }
}

impl ContentSet for ModelSet {
    fn core(&self) -> &SetCore {
        &self.core
    }

    fn clone_with_parent(&self, parent: SetHandle) -> SetHandle {
        Arc::new(ModelSet {
            core: self.core.with_parent(parent),
        })
    }
}

impl LifecycleSet for ModelSet {}
