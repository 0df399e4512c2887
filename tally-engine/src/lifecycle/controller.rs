//! Lifecycle controller
//!
//! Consumes the content-model change stream, navigation changes, and set
//! triggers, and decides which sets enter which phase queues. Also owns
//! the per-set status vectors and the startup sequence.

use super::renderer::{PhaseHandler, Renderer};
use super::{Phase, SetStatus, StatusPhase};
use crate::context::{ScoringContext, SetTrigger, TriggerKind};
use crate::sets::hierarchy::intersects_hierarchy;
use crate::sets::{ContentSet, LifecycleSet, ModelSet, SetHandle};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tally_common::events::ScoringEvent;
use tally_common::model::{ContentEvent, ModelAttr};
use tally_common::time;
use tally_common::Result;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, trace, warn};

/// Maximum drain passes one `settle` call will run
const SETTLE_PASS_LIMIT: usize = 64;

/// Maps phases to set callbacks and keeps the status vectors current
struct Dispatcher {
    renderer: Arc<Renderer>,
    statuses: Arc<Mutex<HashMap<String, SetStatus>>>,
}

impl Dispatcher {
    fn set_status(&self, id: &str, apply: impl FnOnce(&mut SetStatus)) {
        let mut statuses = match self.statuses.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        apply(statuses.entry(id.to_string()).or_default());
    }
}

#[async_trait]
impl PhaseHandler for Dispatcher {
    async fn handle(&self, phase: Phase, set: SetHandle) -> Result<()> {
        match phase {
            Phase::Init => {
                set.on_init().await;
                self.set_status(set.id(), |status| status.phase = StatusPhase::Init);
            }
            Phase::Restore => {
                let was_restored = set.on_restore().await;
                self.set_status(set.id(), |status| {
                    status.phase = StatusPhase::Restored;
                    status.was_restored = was_restored;
                });
                if !was_restored {
                    // Start runs later in this same batch
                    self.renderer.enqueue(Phase::Start, [set]);
                }
            }
            Phase::Start | Phase::Restart => {
                set.on_start().await;
                self.set_status(set.id(), |status| status.phase = StatusPhase::Started);
            }
            Phase::Reset => {
                if set.can_reset() {
                    set.reset();
                }
                self.set_status(set.id(), |status| status.phase = StatusPhase::Resetting);
            }
            Phase::Leave => {
                set.on_leave().await;
                self.set_status(set.id(), |status| status.phase = StatusPhase::Leaving);
            }
            Phase::Visit => {
                set.on_visit().await;
                self.set_status(set.id(), |status| status.phase = StatusPhase::Visiting);
            }
            Phase::Update => {
                set.on_update().await;
                self.set_status(set.id(), |status| status.phase = StatusPhase::Updating);
            }
        }
        Ok(())
    }
}

/// The lifecycle controller
pub struct Controller {
    ctx: ScoringContext,
    renderer: Arc<Renderer>,
    dispatcher: Arc<Dispatcher>,
    statuses: Arc<Mutex<HashMap<String, SetStatus>>>,
    content_rx: broadcast::Receiver<ContentEvent>,
    bus_rx: broadcast::Receiver<ScoringEvent>,
    trigger_rx: mpsc::UnboundedReceiver<SetTrigger>,
    started: bool,
}

impl Controller {
    pub fn new(
        ctx: ScoringContext,
        renderer: Arc<Renderer>,
        content_rx: broadcast::Receiver<ContentEvent>,
        trigger_rx: mpsc::UnboundedReceiver<SetTrigger>,
    ) -> Self {
        let statuses: Arc<Mutex<HashMap<String, SetStatus>>> = Arc::default();
        let dispatcher = Arc::new(Dispatcher {
            renderer: renderer.clone(),
            statuses: statuses.clone(),
        });
        let bus_rx = ctx.bus().subscribe();
        Self {
            ctx,
            renderer,
            dispatcher,
            statuses,
            content_rx,
            bus_rx,
            trigger_rx,
            started: false,
        }
    }

    /// Whether the startup sequence has completed
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// The status vector of a registered set
    pub fn status(&self, set_id: &str) -> Option<SetStatus> {
        match self.statuses.lock() {
            Ok(guard) => guard.get(set_id).copied(),
            Err(poisoned) => poisoned.into_inner().get(set_id).copied(),
        }
    }

    /// Process every pending event and trigger without draining
    pub fn pump(&mut self) {
        while let Ok(event) = self.bus_rx.try_recv() {
            self.on_bus_event(event);
        }
        loop {
            match self.content_rx.try_recv() {
                Ok(event) => self.on_content_event(event),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "content change stream lagged; derived views may be stale");
                }
                Err(_) => break,
            }
        }
        while let Ok(trigger) = self.trigger_rx.try_recv() {
            self.on_trigger(trigger);
        }
    }

    fn on_bus_event(&mut self, event: ScoringEvent) {
        match event {
            ScoringEvent::SetRegistered { set_id, .. } => {
                let mut statuses = match self.statuses.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                statuses.entry(set_id).or_default();
            }
            ScoringEvent::SetDeregistered { set_id, .. } => {
                let mut statuses = match self.statuses.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                statuses.remove(&set_id);
            }
            _ => {}
        }
    }

    fn on_content_event(&mut self, event: ContentEvent) {
        // Any structural or attribute change invalidates derived views
        self.ctx.bump_stamp();
        match event {
            ContentEvent::Added { id, .. } => {
                let registry = self.ctx.registry();
                let already = registry
                    .as_ref()
                    .map(|r| r.get(id.as_str()).is_some())
                    .unwrap_or(false);
                if !already {
                    if let Err(err) = ModelSet::create(&self.ctx, id.as_str()) {
                        warn!(model = %id, error = %err, "model set not created");
                    }
                }
            }
            ContentEvent::Removed { id, .. } => {
                if let Some(registry) = self.ctx.registry() {
                    let doomed: Vec<String> = registry
                        .all()
                        .into_iter()
                        .filter(|set| set.model_id().map(|m| m == &id).unwrap_or(false))
                        .map(|set| set.id().to_string())
                        .collect();
                    for set_id in doomed {
                        registry.deregister(&set_id);
                    }
                }
            }
            ContentEvent::Changed { id, attr, .. } => {
                if !self.started {
                    trace!(model = %id, "change dropped before start");
                    return;
                }
                if matches!(
                    attr,
                    ModelAttr::Available
                        | ModelAttr::InteractionComplete
                        | ModelAttr::Active
                        | ModelAttr::Visited
                ) {
                    self.enqueue_intersecting(id.as_str(), Phase::Update);
                }
            }
            ContentEvent::ModelReset { id, .. } => {
                if !self.started {
                    return;
                }
                self.enqueue_anchored(id.as_str(), Phase::Restart);
            }
        }
    }

    fn on_trigger(&mut self, trigger: SetTrigger) {
        if !self.started {
            trace!(set = %trigger.set_id, "trigger dropped before start");
            return;
        }
        let Some(registry) = self.ctx.registry() else {
            return;
        };
        let Some(source) = registry.get(&trigger.set_id) else {
            return;
        };
        match trigger.kind {
            TriggerKind::Update => match source.model_id() {
                Some(model_id) => {
                    let model_id = model_id.clone();
                    self.enqueue_intersecting(model_id.as_str(), Phase::Update);
                }
                None => {
                    let source_models = source.models();
                    let targets: Vec<SetHandle> = registry
                        .all()
                        .into_iter()
                        .filter(|set| {
                            let models = set.models();
                            let tree = self.ctx.tree();
                            intersects_hierarchy(&models, &source_models, &tree)
                        })
                        .collect();
                    self.renderer.enqueue(Phase::Update, targets);
                }
            },
            TriggerKind::Reset => {
                if let Some(model_id) = source.model_id() {
                    let model_id = model_id.clone();
                    self.enqueue_anchored(model_id.as_str(), Phase::Restart);
                }
            }
        }
    }

    /// Enqueue every set whose models overlap the given model's hierarchy
    fn enqueue_intersecting(&self, model_id: &str, phase: Phase) {
        let Some(registry) = self.ctx.registry() else {
            return;
        };
        let targets = registry.by_intersecting_model_id(model_id);
        self.renderer.enqueue(phase, targets);
    }

    /// Enqueue every set anchored exactly on the given model
    fn enqueue_anchored(&self, model_id: &str, phase: Phase) {
        let Some(registry) = self.ctx.registry() else {
            return;
        };
        let targets: Vec<SetHandle> = registry
            .all()
            .into_iter()
            .filter(|set| {
                set.model_id()
                    .map(|m| m.as_str() == model_id)
                    .unwrap_or(false)
            })
            .collect();
        self.renderer.enqueue(phase, targets);
    }

    /// Sets local to a navigation location
    ///
    /// A set is local when it is anchored on the location itself, or on a
    /// descendant of the location that is not itself a different content
    /// object.
    fn local_sets(&self, location: &str) -> Vec<SetHandle> {
        let Some(registry) = self.ctx.registry() else {
            return Vec::new();
        };
        registry
            .all()
            .into_iter()
            .filter(|set| {
                let Some(anchor) = set.model_id() else {
                    return false;
                };
                if anchor.as_str() == location {
                    return true;
                }
                let tree = self.ctx.tree();
                let Some(node) = tree.find_by_id(anchor.as_str()) else {
                    return false;
                };
                if node.kind.is_content_object() {
                    return false;
                }
                tree.ancestors(anchor.as_str(), false)
                    .iter()
                    .any(|ancestor| ancestor.as_str() == location)
            })
            .collect()
    }

    /// Navigation moved from one content object to another
    pub fn navigated(&mut self, previous: Option<&str>, current: Option<&str>) {
        if !self.started {
            return;
        }
        if let Some(previous) = previous {
            let leaving = self.local_sets(previous);
            self.renderer.enqueue(Phase::Leave, leaving);
        }
        if let Some(current) = current {
            let visiting = self.local_sets(current);
            self.renderer.enqueue(Phase::Visit, visiting);
        }
    }

    /// Enqueue every registered set into the update phase
    pub fn enqueue_update_all(&self) {
        if let Some(registry) = self.ctx.registry() {
            self.renderer.enqueue(Phase::Update, registry.ordered());
        }
    }

    /// Enqueue every registered set into the reset phase
    pub fn enqueue_reset_all(&self) {
        if let Some(registry) = self.ctx.registry() {
            self.renderer.enqueue(Phase::Reset, registry.ordered());
        }
    }

    /// Run the startup batch: init, restore, start, update
    ///
    /// One batch, one wait token. Start is enqueued by the restore handler
    /// for sets that had nothing to restore, and runs later in the same
    /// batch. Change events arriving before this completes are dropped.
    pub async fn startup(&mut self) {
        self.pump();
        let roots = match self.ctx.registry() {
            Some(registry) => registry.ordered(),
            None => Vec::new(),
        };
        debug!(sets = roots.len(), "lifecycle startup");
        self.renderer.enqueue(Phase::Init, roots.clone());
        self.renderer.enqueue(Phase::Restore, roots.clone());
        self.renderer.enqueue(Phase::Update, roots);
        self.renderer.drain_now(self.dispatcher.as_ref()).await;
        self.started = true;
        self.ctx.bus().emit_lossy(ScoringEvent::Restored {
            timestamp: time::now(),
        });
    }

    /// Drain one batch now, regardless of the frame throttle
    pub async fn drain_now(&mut self) {
        self.renderer.drain_now(self.dispatcher.as_ref()).await;
    }

    /// Pump events and drain if the frame throttle allows
    pub async fn tick(&mut self) -> bool {
        self.pump();
        self.renderer.drain_due(self.dispatcher.as_ref()).await
    }

    /// Pump and drain until no work remains
    ///
    /// Bounded so a set that re-enqueues itself forever cannot hang the
    /// caller.
    pub async fn settle(&mut self) {
        for _ in 0..SETTLE_PASS_LIMIT {
            self.pump();
            if !self.renderer.has_pending() {
                return;
            }
            self.renderer.drain_now(self.dispatcher.as_ref()).await;
        }
        warn!("settle pass limit reached with work still pending");
    }
}
