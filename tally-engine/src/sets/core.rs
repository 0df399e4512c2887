//! Core set surface: own data, derived model views, intersection clones

use super::hierarchy::{
    filter_by_intersecting_hierarchy, is_available_in_hierarchy, unique_models,
};
use super::{ScoredSet, SetHandle};
use crate::context::{ScoringContext, SetTrigger, TriggerKind};
use std::sync::Mutex;
use tally_common::events::ScoringEvent;
use tally_common::model::{ModelId, ModelKind};
use tally_common::time;
use tracing::error;

/// Construction options for a set
///
/// Everything is optional; an id is generated from the type or anchor
/// model when absent.
#[derive(Debug, Clone, Default)]
pub struct SetConfig {
    pub id: Option<String>,
    pub set_type: Option<String>,
    pub title: Option<String>,
    pub model_id: Option<ModelId>,
    pub models: Option<Vec<ModelId>>,
    pub order: Option<i32>,
    /// Allow detached models in the `models` view (default true)
    pub allow_detached: Option<bool>,
}

/// Default lifecycle ordering for sets that do not choose one
pub const DEFAULT_ORDER: i32 = 400;

/// The enumerable own data every set carries
///
/// Clones built by intersection copy this data shallowly and swap in a new
/// intersection parent; every derived view recomputes against that parent.
pub struct SetCore {
    id: String,
    set_type: String,
    title: String,
    model_id: Option<ModelId>,
    explicit_models: Option<Vec<ModelId>>,
    order: i32,
    allow_detached: bool,
    intersection_parent: Option<SetHandle>,
    ctx: ScoringContext,
    effective_cache: Mutex<Option<(u64, Vec<ModelId>)>>,
}

impl SetCore {
    /// Build the own data of a root set
    ///
    /// When no id is supplied, the first free `{prefix}-{n}` is taken,
    /// with the prefix being the type, the anchor model id, or `unknown`.
    /// A set with neither type nor anchor logs an error (non-fatal).
    pub fn new(ctx: ScoringContext, config: SetConfig) -> Self {
        let set_type = config.set_type.unwrap_or_default();
        let id = match config.id {
            Some(id) => id,
            None => {
                if set_type.is_empty() && config.model_id.is_none() {
                    error!("set has neither type nor model; generated id will be unstable");
                }
                let prefix = if !set_type.is_empty() {
                    set_type.clone()
                } else if let Some(model_id) = &config.model_id {
                    model_id.to_string()
                } else {
                    "unknown".to_string()
                };
                match ctx.registry() {
                    Some(registry) => registry.next_free_id(&prefix),
                    None => format!("{prefix}-0"),
                }
            }
        };
        Self {
            id,
            set_type,
            title: config.title.unwrap_or_default(),
            model_id: config.model_id,
            explicit_models: config.models,
            order: config.order.unwrap_or(DEFAULT_ORDER),
            allow_detached: config.allow_detached.unwrap_or(true),
            intersection_parent: None,
            ctx,
            effective_cache: Mutex::new(None),
        }
    }

    /// Copy the own data into a clone hanging off a new intersection parent
    pub fn with_parent(&self, parent: SetHandle) -> Self {
        Self {
            id: self.id.clone(),
            set_type: self.set_type.clone(),
            title: self.title.clone(),
            model_id: self.model_id.clone(),
            explicit_models: self.explicit_models.clone(),
            order: self.order,
            allow_detached: self.allow_detached,
            intersection_parent: Some(parent),
            ctx: self.ctx.clone(),
            effective_cache: Mutex::new(None),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_type(&self) -> &str {
        &self.set_type
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn model_id(&self) -> Option<&ModelId> {
        self.model_id.as_ref()
    }

    pub fn order(&self) -> i32 {
        self.order
    }

    pub fn allow_detached(&self) -> bool {
        self.allow_detached
    }

    pub fn intersection_parent(&self) -> Option<&SetHandle> {
        self.intersection_parent.as_ref()
    }

    /// Whether this instance is an intersected clone rather than a root
    pub fn is_intersected(&self) -> bool {
        self.intersection_parent.is_some()
    }

    pub fn ctx(&self) -> &ScoringContext {
        &self.ctx
    }

    /// The default `models` view: the explicit list, else the anchor's
    /// children (including detached unless disallowed)
    pub fn default_models(&self) -> Vec<ModelId> {
        if let Some(models) = &self.explicit_models {
            return models.clone();
        }
        if let Some(model_id) = &self.model_id {
            let tree = self.ctx.tree();
            return if self.allow_detached {
                tree.all_children(model_id.as_str())
            } else {
                tree.children(model_id.as_str())
            };
        }
        error!(set = %self.id, "set does not override models and has no anchor model");
        Vec::new()
    }

    /// Intersect a models view with the parent chain, de-duplicated
    ///
    /// Results are cached per dirty stamp; the lifecycle controller bumps
    /// the stamp whenever relevant content inputs change.
    pub fn effective_from(&self, models: Vec<ModelId>) -> Vec<ModelId> {
        let stamp = self.ctx.stamp();
        if let Ok(cache) = self.effective_cache.lock() {
            if let Some((cached_stamp, cached)) = cache.as_ref() {
                if *cached_stamp == stamp {
                    return cached.clone();
                }
            }
        }
        let effective = match &self.intersection_parent {
            None => unique_models(models),
            Some(parent) => {
                let parent_models = parent.effective_models();
                let tree = self.ctx.tree();
                unique_models(filter_by_intersecting_hierarchy(
                    &models,
                    &parent_models,
                    &tree,
                ))
            }
        };
        if let Ok(mut cache) = self.effective_cache.lock() {
            *cache = Some((stamp, effective.clone()));
        }
        effective
    }

    fn emit(&self, event: ScoringEvent) {
        // Clones are query artifacts; only roots reach the bus.
        if self.is_intersected() {
            return;
        }
        self.ctx.bus().emit_lossy(event);
    }

    /// Emit the restored event for this set
    pub fn emit_restored(&self, was_restored: bool) {
        self.emit(ScoringEvent::SetRestored {
            set_id: self.id.clone(),
            set_type: self.set_type.clone(),
            was_restored,
            timestamp: time::now(),
        });
    }

    /// Emit the completed event for this set
    pub fn emit_completed(&self, passed: bool) {
        self.emit(ScoringEvent::SetCompleted {
            set_id: self.id.clone(),
            set_type: self.set_type.clone(),
            passed,
            timestamp: time::now(),
        });
    }

    /// Emit the passed event for this set
    pub fn emit_passed(&self) {
        self.emit(ScoringEvent::SetPassed {
            set_id: self.id.clone(),
            set_type: self.set_type.clone(),
            timestamp: time::now(),
        });
    }

    /// Emit the update event and raise the update trigger
    pub fn trigger_update(&self) {
        if self.is_intersected() {
            return;
        }
        self.emit(ScoringEvent::SetUpdated {
            set_id: self.id.clone(),
            set_type: self.set_type.clone(),
            timestamp: time::now(),
        });
        self.ctx.send_trigger(SetTrigger {
            set_id: self.id.clone(),
            kind: TriggerKind::Update,
        });
    }

    /// Emit the reset event and raise the reset trigger
    pub fn trigger_reset(&self) {
        if self.is_intersected() {
            return;
        }
        self.emit(ScoringEvent::SetReset {
            set_id: self.id.clone(),
            set_type: self.set_type.clone(),
            timestamp: time::now(),
        });
        self.ctx.send_trigger(SetTrigger {
            set_id: self.id.clone(),
            kind: TriggerKind::Reset,
        });
    }
}

/// The query and intersection surface shared by every set
pub trait ContentSet: Send + Sync {
    /// The set's own data
    fn core(&self) -> &SetCore;

    /// Rebuild this set as an intersected clone of the given parent
    ///
    /// Implementations construct a fresh instance of their own concrete
    /// type from the stable own data; the clone never registers.
    fn clone_with_parent(&self, parent: SetHandle) -> SetHandle;

    fn id(&self) -> &str {
        self.core().id()
    }

    fn set_type(&self) -> &str {
        self.core().set_type()
    }

    fn title(&self) -> &str {
        self.core().title()
    }

    fn model_id(&self) -> Option<&ModelId> {
        self.core().model_id()
    }

    fn order(&self) -> i32 {
        self.core().order()
    }

    fn intersection_parent(&self) -> Option<SetHandle> {
        self.core().intersection_parent().cloned()
    }

    fn is_intersected(&self) -> bool {
        self.core().is_intersected()
    }

    /// The set's model list before intersection
    fn models(&self) -> Vec<ModelId> {
        self.core().default_models()
    }

    /// Models after intersecting with the parent chain
    fn effective_models(&self) -> Vec<ModelId> {
        self.core().effective_from(self.models())
    }

    /// Effective models that are attached and available through their
    /// whole ancestry
    fn available_models(&self) -> Vec<ModelId> {
        let effective = self.effective_models();
        let tree = self.core().ctx().tree();
        effective
            .into_iter()
            .filter(|id| is_available_in_hierarchy(&tree, id.as_str()))
            .collect()
    }

    /// Components reachable from the effective models
    fn components(&self) -> Vec<ModelId> {
        let effective = self.effective_models();
        let tree = self.core().ctx().tree();
        let mut out = Vec::new();
        for id in effective {
            let Some(node) = tree.find_by_id(id.as_str()) else {
                continue;
            };
            if node.kind == ModelKind::Component {
                out.push(id);
                continue;
            }
            out.extend(tree.descendants(id.as_str()).into_iter().filter(|did| {
                tree.find_by_id(did.as_str())
                    .map(|n| n.kind == ModelKind::Component)
                    .unwrap_or(false)
            }));
        }
        drop(tree);
        unique_models(out)
    }

    /// Components that are available through their whole ancestry
    fn available_components(&self) -> Vec<ModelId> {
        let components = self.components();
        let tree = self.core().ctx().tree();
        components
            .into_iter()
            .filter(|id| is_available_in_hierarchy(&tree, id.as_str()))
            .collect()
    }

    /// Question components
    fn questions(&self) -> Vec<ModelId> {
        let components = self.components();
        let tree = self.core().ctx().tree();
        components
            .into_iter()
            .filter(|id| {
                tree.find_by_id(id.as_str())
                    .map(|n| n.is_question())
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Question components that are available; the view score sums use
    fn available_questions(&self) -> Vec<ModelId> {
        let components = self.available_components();
        let tree = self.core().ctx().tree();
        components
            .into_iter()
            .filter(|id| {
                tree.find_by_id(id.as_str())
                    .map(|n| n.is_question())
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Non-question components
    fn presentation_components(&self) -> Vec<ModelId> {
        let components = self.components();
        let tree = self.core().ctx().tree();
        components
            .into_iter()
            .filter(|id| {
                tree.find_by_id(id.as_str())
                    .map(|n| n.kind == ModelKind::Component && !n.is_question())
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Components flagged trackable
    fn trackable_components(&self) -> Vec<ModelId> {
        let components = self.components();
        let tree = self.core().ctx().tree();
        components
            .into_iter()
            .filter(|id| {
                tree.find_by_id(id.as_str())
                    .map(|n| n.is_trackable)
                    .unwrap_or(false)
            })
            .collect()
    }

    fn is_enabled(&self) -> bool {
        true
    }

    fn is_optional(&self) -> bool {
        let core = self.core();
        let Some(model_id) = core.model_id() else {
            return false;
        };
        core.ctx()
            .tree()
            .find_by_id(model_id.as_str())
            .map(|n| n.is_optional)
            .unwrap_or(false)
    }

    fn is_available(&self) -> bool {
        let core = self.core();
        let Some(model_id) = core.model_id() else {
            return true;
        };
        core.ctx()
            .tree()
            .find_by_id(model_id.as_str())
            .map(|n| n.is_available)
            .unwrap_or(false)
    }

    /// Whether any models survive the intersection chain
    fn is_populated(&self) -> bool {
        !self.effective_models().is_empty()
    }

    fn is_not_populated(&self) -> bool {
        !self.is_populated()
    }

    /// Whether the anchor model is attached and available through its
    /// whole ancestry
    fn is_model_available_in_hierarchy(&self) -> bool {
        let core = self.core();
        let Some(model_id) = core.model_id() else {
            return false;
        };
        let tree = core.ctx().tree();
        is_available_in_hierarchy(&tree, model_id.as_str())
    }

    /// Completion of this set; defaults to the anchor model's completion
    fn is_complete(&self) -> bool {
        let core = self.core();
        let Some(model_id) = core.model_id() else {
            return false;
        };
        core.ctx()
            .tree()
            .find_by_id(model_id.as_str())
            .map(|n| n.is_complete)
            .unwrap_or(false)
    }

    /// Pass state; non-scoring sets alias completion
    fn is_passed(&self) -> bool {
        self.is_complete()
    }

    /// Fail state: complete but not passed
    ///
    /// With the default pass alias this can never be true; scoring sets
    /// make it meaningful.
    fn is_failed(&self) -> bool {
        self.is_complete() && !self.is_passed()
    }

    /// Capability downcast to the scoring surface
    fn as_scoring(&self) -> Option<&dyn ScoredSet> {
        None
    }
}
