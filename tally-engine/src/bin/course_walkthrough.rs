//! Synthetic course walkthrough
//!
//! Builds a small course in memory, wires the engine, answers the
//! questions, and prints the rollup. Useful for eyeballing event flow
//! and objective writes without a host runtime.

use async_trait::async_trait;
use std::sync::{Arc, RwLock};
use tally_common::model::{ContentNode, ContentTree, ModelAttr, ModelId, ModelKind};
use tally_common::storage::{namespaces, MemoryStorage, OfflineStorage};
use tally_engine::context::ScoringContext;
use tally_engine::sets::scoring::process_update;
use tally_engine::{
    ContentSet, EngineOptions, LifecycleSet, Result, ScoredSet, Scoring, ScoringCore,
    ScoringOptions, SetConfig, SetCore, SetHandle,
};
use tracing::info;

/// A quiz set: complete once every question is answered, passed at 60%
struct QuizSet {
    scoring: ScoringCore,
}

impl QuizSet {
    fn create(ctx: &ScoringContext, id: &str, models: Vec<ModelId>) -> Result<Arc<QuizSet>> {
        let core = SetCore::new(
            ctx.clone(),
            SetConfig {
                id: Some(id.to_string()),
                set_type: Some("quiz".to_string()),
                title: Some(format!("Quiz {id}")),
                models: Some(models),
                ..Default::default()
            },
        );
        let set = Arc::new(QuizSet {
            scoring: ScoringCore::new(core, ScoringOptions::default()),
        });
        if let Some(registry) = ctx.registry() {
            registry.register(set.clone())?;
        }
        Ok(set)
    }
}

impl ContentSet for QuizSet {
    fn core(&self) -> &SetCore {
        self.scoring.core()
    }

    fn clone_with_parent(&self, parent: SetHandle) -> SetHandle {
        Arc::new(QuizSet {
            scoring: ScoringCore::new(
                self.scoring.core().with_parent(parent),
                self.scoring.options().clone(),
            ),
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
                .map(|n| n.is_interaction_complete)
                .unwrap_or(false)
        })
    }

    fn is_passed(&self) -> bool {
        self.scaled_score() >= 60
    }

    fn as_scoring(&self) -> Option<&dyn ScoredSet> {
        Some(self)
    }
}

#[async_trait]
impl LifecycleSet for QuizSet {
    async fn on_update(&self) {
        process_update(self);
    }
}

impl ScoredSet for QuizSet {
    fn scoring(&self) -> &ScoringCore {
        &self.scoring
    }
}

fn child(id: &str, kind: ModelKind, parent: &str) -> ContentNode {
    let mut node = ContentNode::new(id, kind);
    node.parent = Some(ModelId::from(parent));
    node
}

/// course → one page → two articles of one block with two questions each
fn build_course() -> ContentTree {
    let mut tree = ContentTree::new();
    tree.add_node(ContentNode::new("course", ModelKind::Course).with_title("Walkthrough"))
        .unwrap();
    tree.add_node(child("p-05", ModelKind::Page, "course")).unwrap();
    for a in 1..=2 {
        let article = format!("a-{a}");
        tree.add_node(child(&article, ModelKind::Article, "p-05")).unwrap();
        let block = format!("b-{a}");
        tree.add_node(child(&block, ModelKind::Block, &article)).unwrap();
        for q in 1..=2 {
            let mut question = ContentNode::component(format!("q-{a}-{q}"), "mcq", true);
            question.parent = Some(ModelId::from(block.as_str()));
            question.max_score = 1.0;
            tree.add_node(question).unwrap();
        }
    }
    tree
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let tree = Arc::new(RwLock::new(build_course()));
    let storage = Arc::new(MemoryStorage::new());
    let scoring = Arc::new(Scoring::new(EngineOptions::new(
        tree.clone(),
        storage.clone() as Arc<dyn OfflineStorage>,
    )));

    scoring.data_ready()?;
    let questions: Vec<ModelId> = ["q-1-1", "q-1-2", "q-2-1", "q-2-2"]
        .iter()
        .map(|id| ModelId::from(*id))
        .collect();
    QuizSet::create(scoring.context(), "quiz", questions)?;

    let mut events = scoring.context().bus().subscribe();
    scoring.start().await;
    scoring.navigated(None, Some("p-05")).await;
    scoring.settle().await;

    // Answer everything: three correct, one wrong
    {
        let mut tree = tree.write().unwrap();
        for (id, correct) in [("q-1-1", true), ("q-1-2", true), ("q-2-1", true), ("q-2-2", false)] {
            if correct {
                tree.set_score(id, 1.0)?;
                tree.set_flag(id, ModelAttr::Correct, true)?;
            }
            tree.set_flag(id, ModelAttr::Complete, true)?;
            tree.set_flag(id, ModelAttr::InteractionComplete, true)?;
        }
    }
    scoring.settle().await;

    while let Ok(event) = events.try_recv() {
        info!(event = event.event_type(), set = ?event.set_id(), "observed");
    }

    let total = scoring.total().expect("total built at data_ready");
    info!(
        score = total.score(),
        max_score = total.max_score(),
        scaled = total.scaled_score(),
        correctness = total.correctness(),
        complete = total.is_complete(),
        passed = total.is_passed(),
        "course rollup"
    );

    if let Some(raw) = storage.get(namespaces::OBJECTIVE_STATUS, "quiz") {
        info!(objective = %raw, "quiz objective status");
    } else {
        // Status writes are debounced; give the writer its window
        tokio::time::sleep(std::time::Duration::from_millis(150)).await;
        if let Some(raw) = storage.get(namespaces::OBJECTIVE_STATUS, "quiz") {
            info!(objective = %raw, "quiz objective status");
        }
    }

    Ok(())
}
