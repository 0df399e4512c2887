//! Integration tests for the lifecycle controller and renderer
//!
//! Startup ordering, wait-token accounting, change fan-out, enqueue
//! de-duplication, navigation, restarts, and the global reset path.

mod helpers;

use helpers::{engine_with_tree, entries_for, two_article_tree, RecordingSet};
use std::sync::{Arc, Mutex};
use tally_common::model::ModelAttr;
use tally_engine::lifecycle::{Phase, Renderer};
use tally_engine::state::CountingGate;
use tally_engine::{ContentSet, LifecycleSet};

type Log = Arc<Mutex<Vec<String>>>;

fn position(log: &Log, entry: &str) -> usize {
    log.lock()
        .unwrap()
        .iter()
        .position(|e| e.as_str() == entry)
        .unwrap_or_else(|| panic!("{entry} not logged"))
}

/// Fixture with three recording sets at orders 300/400/500
async fn started_fixture() -> (helpers::Fixture, Log) {
    let fixture = engine_with_tree(two_article_tree());
    fixture.scoring.data_ready().unwrap();
    let log: Log = Arc::default();
    let ctx = fixture.scoring.context().clone();
    RecordingSet::create(&ctx, "r300", Some("b-1"), 300, log.clone()).unwrap();
    RecordingSet::create(&ctx, "r400", Some("b-2"), 400, log.clone()).unwrap();
    RecordingSet::create(&ctx, "r500", None, 500, log.clone()).unwrap();
    fixture.scoring.start().await;
    (fixture, log)
}

#[tokio::test]
async fn test_startup_phase_and_order_sequencing() {
    // Scenario: three sets at orders 500/400/300 start up
    let (fixture, log) = started_fixture().await;
    assert!(fixture.scoring.is_started().await);

    // Within each phase, sets run ascending by order
    assert_eq!(
        entries_for(&log, "init"),
        vec!["init:r300", "init:r400", "init:r500"]
    );
    assert_eq!(
        entries_for(&log, "restore"),
        vec!["restore:r300", "restore:r400", "restore:r500"]
    );
    // Nothing was restored, so every set starts
    assert_eq!(
        entries_for(&log, "start"),
        vec!["start:r300", "start:r400", "start:r500"]
    );
    assert_eq!(
        entries_for(&log, "update"),
        vec!["update:r300", "update:r400", "update:r500"]
    );

    // Phases drain strictly in order: init, restore, start, update
    assert!(position(&log, "init:r500") < position(&log, "restore:r300"));
    assert!(position(&log, "restore:r500") < position(&log, "start:r300"));
    assert!(position(&log, "start:r500") < position(&log, "update:r300"));

    // The whole startup is one batch: one hold, one release
    assert_eq!(fixture.gate.holds(), 1);
    assert_eq!(fixture.gate.releases(), 1);
    assert!(!fixture.gate.is_held());
}

#[tokio::test]
async fn test_change_propagates_to_intersecting_sets_only() {
    // Scenario: flipping isInteractionComplete on a component updates the
    // sets whose models overlap it, and no others
    let (fixture, log) = started_fixture().await;
    log.lock().unwrap().clear();

    fixture
        .tree
        .write()
        .unwrap()
        .set_flag("q-1", ModelAttr::InteractionComplete, true)
        .unwrap();
    fixture.scoring.settle().await;

    let updates = entries_for(&log, "update");
    // r300 wraps b-1, the ancestor of q-1; r400 wraps the sibling block
    assert!(updates.contains(&"update:r300".to_string()));
    assert!(!updates.contains(&"update:r400".to_string()));
}

#[tokio::test]
async fn test_enqueue_is_idempotent_within_a_batch() {
    let (fixture, log) = started_fixture().await;
    log.lock().unwrap().clear();

    // Two qualifying changes on the same model before any drain
    {
        let mut tree = fixture.tree.write().unwrap();
        tree.set_flag("q-1", ModelAttr::Active, true).unwrap();
        tree.set_flag("q-1", ModelAttr::Visited, true).unwrap();
    }
    fixture.scoring.settle().await;

    let updates = entries_for(&log, "update");
    assert_eq!(
        updates.iter().filter(|e| *e == "update:r300").count(),
        1,
        "one batch runs a set once per phase"
    );
}

#[tokio::test]
async fn test_changes_before_start_are_dropped() {
    let fixture = engine_with_tree(two_article_tree());
    fixture.scoring.data_ready().unwrap();
    let log: Log = Arc::default();
    let ctx = fixture.scoring.context().clone();
    RecordingSet::create(&ctx, "r300", Some("b-1"), 300, log.clone()).unwrap();

    fixture
        .tree
        .write()
        .unwrap()
        .set_flag("q-1", ModelAttr::InteractionComplete, true)
        .unwrap();
    fixture.scoring.settle().await;
    assert!(entries_for(&log, "update").is_empty());

    fixture.scoring.start().await;
    // Startup runs update once for every set regardless
    assert_eq!(entries_for(&log, "update"), vec!["update:r300"]);
}

#[tokio::test]
async fn test_navigation_enqueues_leave_and_visit() {
    let (fixture, log) = started_fixture().await;
    log.lock().unwrap().clear();

    // Entering the page visits the sets anchored under it
    fixture.scoring.navigated(None, Some("p-05")).await;
    fixture.scoring.settle().await;
    let visits = entries_for(&log, "visit");
    assert!(visits.contains(&"visit:r300".to_string()));
    assert!(visits.contains(&"visit:r400".to_string()));
    // An unanchored set is local to nothing
    assert!(!visits.iter().any(|e| e.ends_with(":r500")));

    // Leaving the page
    fixture.scoring.navigated(Some("p-05"), None).await;
    fixture.scoring.settle().await;
    let leaves = entries_for(&log, "leave");
    assert!(leaves.contains(&"leave:r300".to_string()));
    assert!(leaves.contains(&"leave:r400".to_string()));
}

#[tokio::test]
async fn test_model_reset_restarts_anchored_sets() {
    let (fixture, log) = started_fixture().await;
    log.lock().unwrap().clear();

    fixture.tree.write().unwrap().reset_model("b-1").unwrap();
    fixture.scoring.settle().await;

    // Restart re-runs on_start for sets anchored on the reset model only
    assert_eq!(entries_for(&log, "start"), vec!["start:r300"]);
}

#[tokio::test]
async fn test_programmatic_update_notifies_intersecting_sets() {
    let (fixture, log) = started_fixture().await;
    log.lock().unwrap().clear();

    let r300 = fixture.scoring.set_by_id("r300").unwrap();
    r300.update();
    fixture.scoring.settle().await;

    let updates = entries_for(&log, "update");
    assert!(updates.contains(&"update:r300".to_string()));
    assert!(!updates.contains(&"update:r400".to_string()));
}

#[tokio::test]
async fn test_global_reset_reaches_resettable_sets() {
    let (fixture, log) = started_fixture().await;
    log.lock().unwrap().clear();
    let mut events = fixture.scoring.context().bus().subscribe();

    fixture.scoring.reset();
    fixture.scoring.settle().await;

    // Recording sets can reset; their reset triggers restart on the
    // anchored sets in a following batch
    let starts = entries_for(&log, "start");
    assert!(starts.contains(&"start:r300".to_string()));
    assert!(starts.contains(&"start:r400".to_string()));

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event.event_type().to_string());
    }
    assert!(seen.contains(&"ResetAll".to_string()));
    assert!(seen.contains(&"SetReset".to_string()));
}

#[tokio::test]
async fn test_intersected_clones_never_enter_queues() {
    let (fixture, _log) = started_fixture().await;
    let clone = {
        let r300 = fixture.scoring.set_by_id("r300").unwrap();
        let r400 = fixture.scoring.set_by_id("r400").unwrap();
        r400.clone_with_parent(r300)
    };
    assert!(clone.is_intersected());

    let gate = Arc::new(CountingGate::new());
    let renderer = Renderer::new(gate.clone(), 30);
    renderer.enqueue(Phase::Update, [clone]);

    assert!(!renderer.has_pending());
    assert_eq!(gate.holds(), 0);
}

#[tokio::test]
async fn test_removed_model_deregisters_its_sets() {
    let (fixture, _log) = started_fixture().await;
    assert!(fixture.scoring.set_by_id("b-1").is_some());
    assert!(fixture.scoring.set_by_id("r300").is_some());

    fixture.tree.write().unwrap().remove_node("b-1").unwrap();
    fixture.scoring.settle().await;

    // The model set and the recording set anchored on b-1 are gone
    assert!(fixture.scoring.set_by_id("b-1").is_none());
    assert!(fixture.scoring.set_by_id("r300").is_none());
    // Its questions' model sets are gone too (subtree removal)
    assert!(fixture.scoring.set_by_id("q-1").is_none());
    assert!(fixture.scoring.set_by_id("r400").is_some());
}

#[tokio::test]
async fn test_added_model_gets_a_model_set() {
    let (fixture, _log) = started_fixture().await;
    assert!(fixture.scoring.set_by_id("b-3").is_none());

    {
        let mut tree = fixture.tree.write().unwrap();
        tree.add_node(helpers::node(
            "b-3",
            tally_common::model::ModelKind::Block,
            "a-1",
        ))
        .unwrap();
    }
    fixture.scoring.settle().await;

    let set = fixture.scoring.set_by_id("b-3").expect("model set created");
    assert_eq!(set.set_type(), "model");
}
