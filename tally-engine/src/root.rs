//! Scoring root: the public engine API
//!
//! Owns the registry, the lifecycle controller and renderer, and the
//! total set. Hosts construct one `Scoring` per course runtime, feed it
//! `data_ready` / `start` / `navigated`, and drive `tick` from their
//! frame hook (or spawn the dispatch loop).

use crate::context::ScoringContext;
use crate::lifecycle::{Controller, Phase, Renderer, SetStatus, DEFAULT_FPS};
use crate::query;
use crate::registry::SetRegistry;
use crate::sets::{ModelSet, SetHandle, TotalSet};
use crate::state::{NoopGate, RuntimeGate};
use std::sync::{Arc, Mutex, RwLock};
use tally_common::config::ScoringConfig;
use tally_common::events::{EventBus, ScoringEvent};
use tally_common::model::ContentTree;
use tally_common::storage::OfflineStorage;
use tally_common::time;
use tally_common::Result;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Construction options for the scoring root
pub struct EngineOptions {
    pub tree: Arc<RwLock<ContentTree>>,
    pub storage: Arc<dyn OfflineStorage>,
    pub config: ScoringConfig,
    pub gate: Arc<dyn RuntimeGate>,
    pub fps: u32,
}

impl EngineOptions {
    /// Options with the default config, a no-op gate, and 30 fps
    pub fn new(tree: Arc<RwLock<ContentTree>>, storage: Arc<dyn OfflineStorage>) -> Self {
        Self {
            tree,
            storage,
            config: ScoringConfig::default(),
            gate: Arc::new(NoopGate),
            fps: DEFAULT_FPS,
        }
    }
}

/// The scoring root
pub struct Scoring {
    ctx: ScoringContext,
    registry: SetRegistry,
    renderer: Arc<Renderer>,
    controller: tokio::sync::Mutex<Controller>,
    total: Mutex<Option<Arc<TotalSet>>>,
    config: ScoringConfig,
    fps: u32,
}

impl Scoring {
    pub fn new(options: EngineOptions) -> Self {
        let bus = EventBus::new(256);
        let registry = SetRegistry::new(bus.clone());
        let (trigger_tx, trigger_rx) = mpsc::unbounded_channel();
        let ctx = ScoringContext::new(
            options.tree.clone(),
            bus,
            options.storage,
            Arc::downgrade(registry.shared()),
            trigger_tx,
        );
        let content_rx = ctx.tree().subscribe_changes();
        let renderer = Arc::new(Renderer::new(options.gate, options.fps));
        let controller = Controller::new(ctx.clone(), renderer.clone(), content_rx, trigger_rx);
        Self {
            ctx,
            registry,
            renderer,
            controller: tokio::sync::Mutex::new(controller),
            total: Mutex::new(None),
            config: options.config,
            fps: options.fps,
        }
    }

    /// The shared context, for constructing host-defined sets
    pub fn context(&self) -> &ScoringContext {
        &self.ctx
    }

    /// Content data is loaded: wrap every model and build the total set
    pub fn data_ready(&self) -> Result<()> {
        let model_ids: Vec<String> = {
            let tree = self.ctx.tree();
            tree.ids().map(|id| id.to_string()).collect()
        };
        for model_id in model_ids {
            if self.registry.get(&model_id).is_some() {
                continue;
            }
            if let Err(err) = ModelSet::create(&self.ctx, &model_id) {
                warn!(model = %model_id, error = %err, "model set not created");
            }
        }
        let total = TotalSet::create(&self.ctx, &self.config)?;
        info!(sets = self.registry.len(), "scoring data ready");
        match self.total.lock() {
            Ok(mut slot) => *slot = Some(total),
            Err(poisoned) => *poisoned.into_inner() = Some(total),
        }
        Ok(())
    }

    /// Run the lifecycle startup batch (init, restore, start, update)
    pub async fn start(&self) {
        self.controller.lock().await.startup().await;
    }

    /// Whether startup has completed
    pub async fn is_started(&self) -> bool {
        self.controller.lock().await.is_started()
    }

    /// The lifecycle status vector of a registered set
    pub async fn status(&self, set_id: &str) -> Option<SetStatus> {
        self.controller.lock().await.status(set_id)
    }

    /// Navigation moved between content objects
    pub async fn navigated(&self, previous: Option<&str>, current: Option<&str>) {
        self.controller.lock().await.navigated(previous, current);
    }

    /// Pump events and drain one batch if the frame throttle allows
    pub async fn tick(&self) -> bool {
        self.controller.lock().await.tick().await
    }

    /// Pump and drain until quiescent; deterministic alternative to `tick`
    pub async fn settle(&self) {
        self.controller.lock().await.settle().await;
    }

    /// Spawn a frame-cadenced dispatch loop
    ///
    /// Hosts with their own animation-frame hook should call [`tick`]
    /// from it instead. Abort the handle to stop the loop.
    ///
    /// [`tick`]: Scoring::tick
    pub fn spawn_dispatch_loop(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let scoring = Arc::clone(self);
        let frame = std::time::Duration::from_secs(1) / scoring.fps.max(1);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(frame);
            loop {
                interval.tick().await;
                scoring.tick().await;
            }
        })
    }

    /// Register a host-built root set
    pub fn register(&self, set: SetHandle) -> Result<()> {
        self.registry.register(set)
    }

    /// Remove a root set by id
    pub fn deregister(&self, id: &str) -> Option<SetHandle> {
        self.registry.deregister(id)
    }

    /// Deregister every set and drop the total
    pub fn clear(&self) {
        self.registry.clear();
        match self.total.lock() {
            Ok(mut slot) => *slot = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }

    /// Every registered root set, in registration order
    pub fn sets(&self) -> Vec<SetHandle> {
        self.registry.all()
    }

    /// The total set, once `data_ready` has built it
    pub fn total(&self) -> Option<Arc<TotalSet>> {
        match self.total.lock() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn is_backward_compatible(&self) -> bool {
        self.config.is_backward_compatible
    }

    /// Announce and enqueue a global update pass
    pub fn update(&self) {
        self.ctx.bus().emit_lossy(ScoringEvent::Updated {
            timestamp: time::now(),
        });
        self.renderer.enqueue(Phase::Update, self.registry.ordered());
    }

    /// Announce and enqueue a global reset pass
    pub fn reset(&self) {
        self.ctx.bus().emit_lossy(ScoringEvent::ResetAll {
            timestamp: time::now(),
        });
        self.renderer.enqueue(Phase::Reset, self.registry.ordered());
    }

    /// Find a root set by id
    pub fn set_by_id(&self, id: &str) -> Option<SetHandle> {
        self.registry.get(id)
    }

    /// Root sets of a type
    pub fn sets_by_type(&self, set_type: &str) -> Vec<SetHandle> {
        self.registry.by_type(set_type)
    }

    /// Root sets whose models overlap a model's hierarchy
    pub fn sets_by_intersecting_model_id(&self, model_id: &str) -> Vec<SetHandle> {
        self.registry.by_intersecting_model_id(model_id)
    }

    /// Evaluate an intersection query
    pub fn subsets_by_query(&self, query: &str) -> Result<Vec<SetHandle>> {
        query::evaluate(&self.registry.all(), query)
    }

    /// Evaluate an intersection query, keeping the first result
    pub fn subset_by_query(&self, query: &str) -> Result<Option<SetHandle>> {
        query::subset_by_query(&self.registry.all(), query)
    }

    /// Fold a `"a.b.c"` path of set ids through the intersection operator
    pub fn subset_by_path(&self, path: &str) -> Option<SetHandle> {
        self.subset_by_path_ids(&query::parse_path(path))
    }

    /// Path form taking the ids pre-split
    pub fn subset_by_path_ids(&self, ids: &[String]) -> Option<SetHandle> {
        query::subset_by_path(&self.registry.all(), ids)
    }
}
