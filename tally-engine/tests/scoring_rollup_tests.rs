//! Integration tests for scoring aggregation and the total set

mod helpers;

use helpers::{engine_with_tree, node, question, two_article_tree, TestScoringSet};
use tally_common::model::{ContentNode, ContentTree, ModelAttr, ModelId, ModelKind};
use tally_common::storage::namespaces;
use tally_common::storage::OfflineStorage;
use tally_engine::{ContentSet, LifecycleSet, ScoredSet, ScoringOptions};

/// course → p-05 → a-1 with `count` questions, 1 point each
fn flat_tree(count: usize) -> ContentTree {
    let mut tree = ContentTree::new();
    tree.add_node(ContentNode::new("course", ModelKind::Course)).unwrap();
    tree.add_node(node("p-05", ModelKind::Page, "course")).unwrap();
    tree.add_node(node("a-1", ModelKind::Article, "p-05")).unwrap();
    tree.add_node(node("b-1", ModelKind::Block, "a-1")).unwrap();
    for index in 0..count {
        tree.add_node(question(&format!("q-{index}"), "b-1", 1.0)).unwrap();
    }
    tree
}

fn question_ids(count: usize) -> Vec<ModelId> {
    (0..count).map(|index| ModelId::from(format!("q-{index}"))).collect()
}

#[test]
fn test_scoring_set_aggregations() {
    let fixture = engine_with_tree(two_article_tree());
    fixture.scoring.data_ready().unwrap();
    let perf = TestScoringSet::create(
        fixture.scoring.context(),
        "performance",
        helpers::all_questions(),
        ScoringOptions::default(),
        60,
    )
    .unwrap();

    {
        let mut tree = fixture.tree.write().unwrap();
        tree.set_score("q-1", 1.0).unwrap();
        tree.set_score("q-2", 1.0).unwrap();
        tree.set_flag("q-1", ModelAttr::Correct, true).unwrap();
    }

    assert_eq!(perf.score(), 2.0);
    assert_eq!(perf.min_score(), 0.0);
    assert_eq!(perf.max_score(), 4.0);
    assert_eq!(perf.correctness(), 1);
    assert_eq!(perf.max_correctness(), 4);
    assert_eq!(perf.scaled_score(), 50);
    assert_eq!(perf.scaled_correctness(), 25);
    assert_eq!(perf.score_as_string(), "+2");
}

#[test]
fn test_unavailable_branch_leaves_score_sums() {
    let fixture = engine_with_tree(two_article_tree());
    fixture.scoring.data_ready().unwrap();
    let perf = TestScoringSet::create(
        fixture.scoring.context(),
        "performance",
        helpers::all_questions(),
        ScoringOptions::default(),
        60,
    )
    .unwrap();

    {
        let mut tree = fixture.tree.write().unwrap();
        tree.set_score("q-1", 1.0).unwrap();
        tree.set_score("q-3", 1.0).unwrap();
        tree.set_flag("a-2", ModelAttr::Available, false).unwrap();
    }

    // q-3/q-4 sit under the unavailable article and drop out
    assert_eq!(perf.max_correctness(), 2);
    assert_eq!(perf.score(), 1.0);
    assert_eq!(perf.max_score(), 2.0);
}

#[test]
fn test_negative_scores_scale_against_negative_range() {
    let mut tree = ContentTree::new();
    tree.add_node(ContentNode::new("course", ModelKind::Course)).unwrap();
    tree.add_node(node("p-05", ModelKind::Page, "course")).unwrap();
    tree.add_node(node("a-1", ModelKind::Article, "p-05")).unwrap();
    tree.add_node(node("b-1", ModelKind::Block, "a-1")).unwrap();
    for index in 0..2 {
        let mut q = question(&format!("q-{index}"), "b-1", 1.0);
        q.min_score = -1.0;
        tree.add_node(q).unwrap();
    }
    let fixture = engine_with_tree(tree);
    fixture.scoring.data_ready().unwrap();
    let perf = TestScoringSet::create(
        fixture.scoring.context(),
        "performance",
        question_ids(2),
        ScoringOptions::default(),
        60,
    )
    .unwrap();

    fixture.tree.write().unwrap().set_score("q-0", -1.0).unwrap();
    assert_eq!(perf.min_score(), -2.0);
    assert_eq!(perf.score(), -1.0);
    // Negative values scale against the negative range magnitude
    assert_eq!(perf.scaled_score(), -50);
    assert_eq!(perf.score_as_string(), "-1");
}

#[test]
fn test_total_sums_across_scoring_sets() {
    let fixture = engine_with_tree(two_article_tree());
    fixture.scoring.data_ready().unwrap();
    let ctx = fixture.scoring.context().clone();
    TestScoringSet::create(
        &ctx,
        "first",
        vec![ModelId::from("q-1"), ModelId::from("q-2")],
        ScoringOptions::default(),
        60,
    )
    .unwrap();
    TestScoringSet::create(
        &ctx,
        "second",
        vec![ModelId::from("q-3"), ModelId::from("q-4")],
        ScoringOptions::default(),
        60,
    )
    .unwrap();

    {
        let mut tree = fixture.tree.write().unwrap();
        tree.set_score("q-1", 1.0).unwrap();
        tree.set_score("q-4", 1.0).unwrap();
        tree.set_flag("q-1", ModelAttr::Correct, true).unwrap();
        tree.set_flag("q-4", ModelAttr::Correct, true).unwrap();
    }

    let total = fixture.scoring.total().unwrap();
    assert_eq!(total.scoring_sets().len(), 2);
    assert_eq!(total.score(), 2.0);
    assert_eq!(total.max_score(), 4.0);
    assert_eq!(total.correctness(), 2);
    assert_eq!(total.max_correctness(), 4);
    assert_eq!(total.scaled_score(), 50);
}

#[test]
fn test_total_completion_requires_every_completion_set() {
    let fixture = engine_with_tree(two_article_tree());
    fixture.scoring.data_ready().unwrap();
    let ctx = fixture.scoring.context().clone();
    TestScoringSet::create(
        &ctx,
        "first",
        vec![ModelId::from("q-1"), ModelId::from("q-2")],
        ScoringOptions::default(),
        60,
    )
    .unwrap();
    TestScoringSet::create(
        &ctx,
        "second",
        vec![ModelId::from("q-3"), ModelId::from("q-4")],
        ScoringOptions::default(),
        60,
    )
    .unwrap();
    let total = fixture.scoring.total().unwrap();

    assert!(!total.is_complete());
    {
        let mut tree = fixture.tree.write().unwrap();
        tree.set_flag("q-1", ModelAttr::Complete, true).unwrap();
        tree.set_flag("q-2", ModelAttr::Complete, true).unwrap();
    }
    assert!(!total.is_complete());
    {
        let mut tree = fixture.tree.write().unwrap();
        tree.set_flag("q-3", ModelAttr::Complete, true).unwrap();
        tree.set_flag("q-4", ModelAttr::Complete, true).unwrap();
    }
    assert!(total.is_complete());

    // Regressing a question re-opens the total
    fixture
        .tree
        .write()
        .unwrap()
        .set_flag("q-3", ModelAttr::Complete, false)
        .unwrap();
    assert!(!total.is_complete());
}

#[test]
fn test_passmark_thresholds() {
    // Scenario: scaled score 70 with scaled correctness 55 fails a 60/60
    // passmark; correctness 65 passes it
    let fixture = engine_with_tree(flat_tree(20));
    fixture.scoring.data_ready().unwrap();
    TestScoringSet::create(
        fixture.scoring.context(),
        "performance",
        question_ids(20),
        ScoringOptions::default(),
        60,
    )
    .unwrap();
    let total = fixture.scoring.total().unwrap();

    {
        let mut tree = fixture.tree.write().unwrap();
        for index in 0..14 {
            tree.set_score(&format!("q-{index}"), 1.0).unwrap();
        }
        for index in 0..11 {
            tree.set_flag(&format!("q-{index}"), ModelAttr::Correct, true).unwrap();
        }
    }
    assert_eq!(total.scaled_score(), 70);
    assert_eq!(total.scaled_correctness(), 55);
    assert!(!total.is_passed());

    {
        let mut tree = fixture.tree.write().unwrap();
        for index in 11..13 {
            tree.set_flag(&format!("q-{index}"), ModelAttr::Correct, true).unwrap();
        }
    }
    assert_eq!(total.scaled_correctness(), 65);
    assert!(total.is_passed());
}

#[test]
fn test_passmark_requires_passed_subsets() {
    let mut config = tally_common::config::ScoringConfig::default();
    config.passmark.requires_passed_subsets = true;
    config.passmark.score = 0.0;
    config.passmark.correctness = 0.0;

    let tree = std::sync::Arc::new(std::sync::RwLock::new(two_article_tree()));
    let storage = std::sync::Arc::new(tally_common::storage::MemoryStorage::new());
    let mut options = tally_engine::EngineOptions::new(
        tree.clone(),
        storage as std::sync::Arc<dyn tally_common::storage::OfflineStorage>,
    );
    options.config = config;
    let scoring = tally_engine::Scoring::new(options);
    scoring.data_ready().unwrap();
    let ctx = scoring.context().clone();
    TestScoringSet::create(
        &ctx,
        "first",
        vec![ModelId::from("q-1"), ModelId::from("q-2")],
        ScoringOptions::default(),
        60,
    )
    .unwrap();
    TestScoringSet::create(
        &ctx,
        "second",
        vec![ModelId::from("q-3"), ModelId::from("q-4")],
        ScoringOptions::default(),
        60,
    )
    .unwrap();
    let total = scoring.total().unwrap();

    // Zero thresholds are met, but one subset is below its own passmark
    {
        let mut guard = tree.write().unwrap();
        guard.set_score("q-1", 1.0).unwrap();
        guard.set_score("q-2", 1.0).unwrap();
    }
    assert!(!total.is_passed());

    {
        let mut guard = tree.write().unwrap();
        guard.set_score("q-3", 1.0).unwrap();
        guard.set_score("q-4", 1.0).unwrap();
    }
    assert!(total.is_passed());
}

#[test]
fn test_total_failed_only_without_reset_path() {
    let fixture = engine_with_tree(two_article_tree());
    fixture.scoring.data_ready().unwrap();
    let resettable = ScoringOptions {
        can_reset: true,
        ..Default::default()
    };
    TestScoringSet::create(
        fixture.scoring.context(),
        "performance",
        helpers::all_questions(),
        resettable,
        60,
    )
    .unwrap();
    let total = fixture.scoring.total().unwrap();

    // Complete everything with a failing score
    {
        let mut tree = fixture.tree.write().unwrap();
        for id in ["q-1", "q-2", "q-3", "q-4"] {
            tree.set_flag(id, ModelAttr::Complete, true).unwrap();
        }
    }
    assert!(total.is_complete());
    assert!(!total.is_passed());
    // A resettable subset means another attempt is possible
    assert!(total.can_reset());
    assert!(!total.is_failed());
}

#[tokio::test]
async fn test_completion_writes_objective_and_events() {
    let fixture = engine_with_tree(two_article_tree());
    fixture.scoring.data_ready().unwrap();
    TestScoringSet::create(
        fixture.scoring.context(),
        "performance",
        helpers::all_questions(),
        ScoringOptions::default(),
        60,
    )
    .unwrap();
    let mut events = fixture.scoring.context().bus().subscribe();
    fixture.scoring.start().await;
    // Drain the startup chatter
    while events.try_recv().is_ok() {}

    {
        let mut tree = fixture.tree.write().unwrap();
        for id in ["q-1", "q-2", "q-3", "q-4"] {
            tree.set_score(id, 1.0).unwrap();
            tree.set_flag(id, ModelAttr::Complete, true).unwrap();
            tree.set_flag(id, ModelAttr::InteractionComplete, true).unwrap();
        }
    }
    fixture.scoring.settle().await;

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event.event_type().to_string());
    }
    assert!(seen.contains(&"SetCompleted".to_string()));
    assert!(seen.contains(&"SetPassed".to_string()));
    assert!(seen.contains(&"Completed".to_string()));
    assert!(seen.contains(&"Passed".to_string()));

    // Description and score land immediately
    assert_eq!(
        fixture
            .storage
            .get(namespaces::OBJECTIVE_DESCRIPTION, "performance")
            .as_deref(),
        Some("performance")
    );
    let raw = fixture
        .storage
        .get(namespaces::OBJECTIVE_SCORE, "performance")
        .unwrap();
    assert!(raw.contains("\"score\":4.0"));

    // Status is debounced ~100ms to coalesce bursts
    tokio::time::sleep(std::time::Duration::from_millis(150)).await;
    let raw = fixture
        .storage
        .get(namespaces::OBJECTIVE_STATUS, "performance")
        .unwrap();
    assert!(raw.contains("completed"));
    assert!(raw.contains("passed"));
}
