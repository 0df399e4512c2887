//! Shared fixtures for the engine integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::{Arc, Mutex, RwLock};
use tally_common::model::{ContentNode, ContentTree, ModelId, ModelKind};
use tally_common::storage::{MemoryStorage, OfflineStorage};
use tally_engine::context::ScoringContext;
use tally_engine::sets::scoring::process_update;
use tally_engine::state::CountingGate;
use tally_engine::{
    ContentSet, EngineOptions, LifecycleSet, Result, ScoredSet, Scoring, ScoringCore,
    ScoringOptions, SetConfig, SetCore, SetHandle,
};

/// Engine plus the handles tests assert against
pub struct Fixture {
    pub scoring: Arc<Scoring>,
    pub tree: Arc<RwLock<ContentTree>>,
    pub storage: Arc<MemoryStorage>,
    pub gate: Arc<CountingGate>,
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Build an engine around the given tree
pub fn engine_with_tree(tree: ContentTree) -> Fixture {
    init_tracing();
    let tree = Arc::new(RwLock::new(tree));
    let storage = Arc::new(MemoryStorage::new());
    let gate = Arc::new(CountingGate::new());
    let mut options = EngineOptions::new(tree.clone(), storage.clone() as Arc<dyn OfflineStorage>);
    options.gate = gate.clone();
    let scoring = Arc::new(Scoring::new(options));
    Fixture {
        scoring,
        tree,
        storage,
        gate,
    }
}

pub fn node(id: &str, kind: ModelKind, parent: &str) -> ContentNode {
    let mut node = ContentNode::new(id, kind);
    node.parent = Some(ModelId::from(parent));
    node
}

pub fn question(id: &str, parent: &str, max_score: f64) -> ContentNode {
    let mut node = ContentNode::component(id, "mcq", true);
    node.parent = Some(ModelId::from(parent));
    node.max_score = max_score;
    node
}

/// course → p-05 → a-1(b-1: q-1 q-2), a-2(b-2: q-3 q-4)
pub fn two_article_tree() -> ContentTree {
    let mut tree = ContentTree::new();
    tree.add_node(ContentNode::new("course", ModelKind::Course)).unwrap();
    tree.add_node(node("p-05", ModelKind::Page, "course")).unwrap();
    tree.add_node(node("a-1", ModelKind::Article, "p-05")).unwrap();
    tree.add_node(node("a-2", ModelKind::Article, "p-05")).unwrap();
    tree.add_node(node("b-1", ModelKind::Block, "a-1")).unwrap();
    tree.add_node(node("b-2", ModelKind::Block, "a-2")).unwrap();
    tree.add_node(question("q-1", "b-1", 1.0)).unwrap();
    tree.add_node(question("q-2", "b-1", 1.0)).unwrap();
    tree.add_node(question("q-3", "b-2", 1.0)).unwrap();
    tree.add_node(question("q-4", "b-2", 1.0)).unwrap();
    tree
}

/// All question ids of the two-article tree
pub fn all_questions() -> Vec<ModelId> {
    ["q-1", "q-2", "q-3", "q-4"].iter().map(|id| ModelId::from(*id)).collect()
}

/// A concrete scoring set for tests: complete when every available
/// question is complete, passed at a configurable scaled-score threshold
pub struct TestScoringSet {
    scoring: ScoringCore,
    pass_threshold: i64,
}

impl TestScoringSet {
    pub fn create(
        ctx: &ScoringContext,
        id: &str,
        models: Vec<ModelId>,
        options: ScoringOptions,
        pass_threshold: i64,
    ) -> Result<Arc<TestScoringSet>> {
        let core = SetCore::new(
            ctx.clone(),
            SetConfig {
                id: Some(id.to_string()),
                set_type: Some("scoring".to_string()),
                title: Some(id.to_string()),
                models: Some(models),
                ..Default::default()
            },
        );
        let set = Arc::new(TestScoringSet {
            scoring: ScoringCore::new(core, options),
            pass_threshold,
        });
        if let Some(registry) = ctx.registry() {
            registry.register(set.clone())?;
        }
        Ok(set)
    }
}

impl ContentSet for TestScoringSet {
    fn core(&self) -> &SetCore {
        self.scoring.core()
    }

    fn clone_with_parent(&self, parent: SetHandle) -> SetHandle {
        Arc::new(TestScoringSet {
            scoring: ScoringCore::new(
                self.scoring.core().with_parent(parent),
                self.scoring.options().clone(),
            ),
            pass_threshold: self.pass_threshold,
        })
    }

    fn is_complete(&self) -> bool {
        let questions = self.available_questions();
        if questions.is_empty() {
            return false;
        }
        let tree = self.core().ctx().tree();
        questions.iter().all(|id| {
            tree.find_by_id(id.as_str())
                .map(|n| n.is_complete)
                .unwrap_or(false)
        })
    }

    fn is_passed(&self) -> bool {
        self.scaled_score() >= self.pass_threshold
    }

    fn as_scoring(&self) -> Option<&dyn ScoredSet> {
        Some(self)
    }
}

#[async_trait]
impl LifecycleSet for TestScoringSet {
    async fn on_update(&self) {
        process_update(self);
    }

    fn can_reset(&self) -> bool {
        self.scoring.options().can_reset
    }
}

impl ScoredSet for TestScoringSet {
    fn scoring(&self) -> &ScoringCore {
        &self.scoring
    }
}

/// A set that records every lifecycle callback it receives
pub struct RecordingSet {
    core: SetCore,
    log: Arc<Mutex<Vec<String>>>,
}

impl RecordingSet {
    pub fn create(
        ctx: &ScoringContext,
        id: &str,
        model_id: Option<&str>,
        order: i32,
        log: Arc<Mutex<Vec<String>>>,
    ) -> Result<Arc<RecordingSet>> {
        let core = SetCore::new(
            ctx.clone(),
            SetConfig {
                id: Some(id.to_string()),
                set_type: Some("recording".to_string()),
                model_id: model_id.map(ModelId::from),
                models: Some(model_id.map(|m| vec![ModelId::from(m)]).unwrap_or_default()),
                order: Some(order),
                ..Default::default()
            },
        );
        let set = Arc::new(RecordingSet { core, log });
        if let Some(registry) = ctx.registry() {
            registry.register(set.clone())?;
        }
        Ok(set)
    }

    fn record(&self, callback: &str) {
        if let Ok(mut log) = self.log.lock() {
            log.push(format!("{callback}:{}", self.id()));
        }
    }
}

impl ContentSet for RecordingSet {
    fn core(&self) -> &SetCore {
        &self.core
    }

    fn clone_with_parent(&self, parent: SetHandle) -> SetHandle {
        Arc::new(RecordingSet {
            core: self.core.with_parent(parent),
            log: self.log.clone(),
        })
    }
}

#[async_trait]
impl LifecycleSet for RecordingSet {
    async fn on_init(&self) {
        self.record("init");
    }

    async fn on_restore(&self) -> bool {
        self.record("restore");
        self.core().emit_restored(false);
        false
    }

    async fn on_start(&self) {
        self.record("start");
    }

    async fn on_visit(&self) {
        self.record("visit");
    }

    async fn on_leave(&self) {
        self.record("leave");
    }

    async fn on_update(&self) {
        self.record("update");
    }

    fn can_reset(&self) -> bool {
        true
    }
}

/// Entries of the log matching a callback prefix, in order
pub fn entries_for(log: &Arc<Mutex<Vec<String>>>, callback: &str) -> Vec<String> {
    log.lock()
        .unwrap()
        .iter()
        .filter(|entry| entry.starts_with(&format!("{callback}:")))
        .cloned()
        .collect()
}
