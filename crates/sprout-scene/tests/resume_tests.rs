//! Resume scenarios: reopening a scene from its persisted snapshot.

use std::sync::Arc;

use sprout_coach::{HideReason, MessageId};
use sprout_core::snapshot::StoredSnapshot;
use sprout_scene::application::engine::{SceneEngine, SceneServices};
use sprout_scene::application::reconciler::ResumeBranch;
use sprout_scene::config::EngineConfig;
use sprout_scene::domain::definition::{ItemId, Phase, SceneDefinition};
use sprout_scene::domain::inputs::{InteractionEvent, SceneInput};
use sprout_scene::domain::session::{Continuation, SceneSession};
use sprout_scene::domain::signals::SceneSignal;
use sprout_test_support::{
    ManualClock, RecordingCompletionStore, RecordingSnapshotStore, sample_scene, scene_key, t0,
};

struct Harness {
    clock: Arc<ManualClock>,
    snapshots: Arc<RecordingSnapshotStore>,
    completions: Arc<RecordingCompletionStore>,
    definition: Arc<SceneDefinition>,
}

impl Harness {
    fn new() -> Self {
        Self {
            clock: Arc::new(ManualClock::at_t0()),
            snapshots: Arc::new(RecordingSnapshotStore::new()),
            completions: Arc::new(RecordingCompletionStore::new()),
            definition: Arc::new(SceneDefinition::from_yaml(sample_scene()).unwrap()),
        }
    }

    fn with_session(session: &SceneSession) -> Self {
        let snapshot =
            StoredSnapshot::seal(scene_key(), serde_json::to_value(session).unwrap(), t0());
        Self {
            snapshots: Arc::new(RecordingSnapshotStore::with_snapshot(snapshot)),
            ..Self::new()
        }
    }

    fn open(&self) -> SceneEngine {
        let services = SceneServices::new(
            self.clock.clone(),
            self.snapshots.clone(),
            self.completions.clone(),
        );
        SceneEngine::open(
            scene_key(),
            self.definition.clone(),
            services,
            EngineConfig::default(),
        )
        .unwrap()
    }

    fn wait(&self, engine: &mut SceneEngine, ms: i64) {
        self.clock.advance_ms(ms);
        engine.pump();
    }
}

fn ids<'a>(names: &'a [&'a str]) -> impl Iterator<Item = ItemId> + 'a {
    names.iter().map(|name| ItemId::new(*name))
}

fn cues<'a>(names: &'a [&'a str]) -> impl Iterator<Item = MessageId> + 'a {
    names.iter().map(|name| MessageId::new(*name))
}

/// Collecting, with apple and berry gathered and the wisdom message on screen
/// when the app went away.
fn interrupted_wisdom() -> SceneSession {
    let mut session = SceneSession::fresh(Phase::Collecting, t0());
    session.ready_for_trigger = false;
    session
        .discovered_items
        .extend(ids(&["acorn", "feather", "sun_symbol"]));
    session.collected_counters.insert(ItemId::new("apple"), 1);
    session.collected_counters.insert(ItemId::new("berry"), 1);
    session.tutor_shown.extend(cues(&[
        "welcome",
        "look_for_symbols",
        "start_collecting",
        "wisdom_after_berry",
    ]));
    session.tutor_state_tag = Some(MessageId::new("wisdom_after_berry"));
    session.tutor_state_timestamp = Some(t0());
    session
}

fn hides_of<'a>(signals: &'a [SceneSignal], id: &'a str) -> Vec<HideReason> {
    signals
        .iter()
        .filter_map(|s| match s {
            SceneSignal::TutorHidden { id: hidden, reason } if hidden.as_str() == id => {
                Some(*reason)
            }
            _ => None,
        })
        .collect()
}

#[test]
fn test_interrupted_wisdom_message_replays_once_after_settle() {
    // Arrange
    let harness = Harness::with_session(&interrupted_wisdom());

    // Act
    let mut engine = harness.open();
    let rearmed = engine.session().clone();
    harness.wait(&mut engine, 300);
    let shown_after_settle = engine.view().tutor.map(|m| m.id.clone());
    harness.wait(&mut engine, 7_999);
    let still_up = engine.view().tutor.is_some();
    harness.wait(&mut engine, 1);
    let hidden_on_time = engine.view().tutor.is_none();
    harness.wait(&mut engine, 5_000);
    let signals = engine.take_signals();

    // Assert
    assert_eq!(engine.last_resume(), Some(ResumeBranch::TutorMessage));
    assert!(rearmed.ready_for_trigger);
    assert!(rearmed.is_reconciling);
    assert!(!rearmed.tutor_shown.contains(&MessageId::new("wisdom_after_berry")));
    assert_eq!(shown_after_settle, Some(MessageId::new("wisdom_after_berry")));
    assert!(still_up);
    assert!(hidden_on_time);
    let shows = signals
        .iter()
        .filter(|s| {
            matches!(s, SceneSignal::TutorShown { id } if id.as_str() == "wisdom_after_berry")
        })
        .count();
    assert_eq!(shows, 1);
    assert_eq!(
        hides_of(&signals, "wisdom_after_berry"),
        vec![HideReason::Expired]
    );
}

#[test]
fn test_no_cue_fires_before_the_settle_delay() {
    let harness = Harness::with_session(&interrupted_wisdom());

    let mut engine = harness.open();
    harness.wait(&mut engine, 299);

    assert!(engine.view().tutor.is_none());
    assert!(engine.session().is_reconciling);
}

#[test]
fn test_reconciling_twice_rebuilds_same_overlay_without_duplicate_rewards() {
    // Arrange
    let mut session = SceneSession::fresh(Phase::Discovering, t0());
    session.ready_for_trigger = false;
    session
        .discovered_items
        .extend(ids(&["acorn", "feather", "sun_symbol"]));
    session.highlight_tag = Some(ItemId::new("sun_symbol"));
    session
        .tutor_shown
        .extend(cues(&["welcome", "look_for_symbols"]));
    let harness = Harness::with_session(&session);

    // Act
    let mut first = harness.open();
    let first_overlay = first.session().highlight_tag.clone();
    let mut signals = first.take_signals();
    first.teardown();
    drop(first);
    let mut second = harness.open();
    signals.extend(second.take_signals());

    // Assert
    assert_eq!(second.last_resume(), Some(ResumeBranch::Highlight));
    assert_eq!(second.session().highlight_tag, first_overlay);
    assert!(signals.iter().all(|s| !matches!(
        s,
        SceneSignal::ItemCompleted { .. } | SceneSignal::SceneCompleted { .. }
    )));

    harness.wait(&mut second, 1_200);
    assert_eq!(
        second.session().popup_tag,
        Some(sprout_scene::domain::session::PopupTag::RewardCard {
            item: ItemId::new("sun_symbol")
        })
    );
}

#[test]
fn test_completed_session_without_record_is_recorded_once() {
    // Arrange
    let mut session = SceneSession::fresh(Phase::AllComplete, t0());
    session.completed = true;
    session.stars = 3;
    session.progress_percent = 100;
    session.showing_completion_screen = true;
    let harness = Harness::with_session(&session);

    // Act
    let mut first = harness.open();
    first.teardown();
    drop(first);
    let mut second = harness.open();
    second.handle(SceneInput::ConfirmCompletion);
    let exits_first_visit = second.take_signals();
    second.teardown();
    drop(second);
    let mut third = harness.open();
    third.handle(SceneInput::ConfirmCompletion);

    // Assert
    assert_eq!(third.last_resume(), Some(ResumeBranch::CompletionScreen));
    assert_eq!(harness.completions.saves().len(), 1);
    assert_eq!(
        exits_first_visit
            .iter()
            .filter(|s| matches!(s, SceneSignal::ExitScene(_)))
            .count(),
        1
    );
    assert!(
        third
            .take_signals()
            .iter()
            .all(|s| !matches!(s, SceneSignal::ExitScene(_)))
    );
}

#[test]
fn test_pending_continuation_runs_once_resume_settles() {
    // Arrange: the closing message hid, but the advance never committed
    let mut session = SceneSession::fresh(Phase::Collecting, t0());
    session.ready_for_trigger = false;
    session
        .discovered_items
        .extend(ids(&["acorn", "feather", "sun_symbol"]));
    for (item, count) in [("apple", 1), ("berry", 1), ("clover", 3)] {
        session.collected_counters.insert(ItemId::new(item), count);
    }
    session.tutor_shown.extend(cues(&[
        "welcome",
        "look_for_symbols",
        "start_collecting",
        "wisdom_after_berry",
        "collecting_done",
    ]));
    session.continuation = Some(Continuation::AdvancePhase {
        from: Phase::Collecting,
    });
    let harness = Harness::with_session(&session);

    // Act
    let mut engine = harness.open();
    let during = engine.session().phase;
    harness.wait(&mut engine, 300);

    // Assert
    assert_eq!(engine.last_resume(), Some(ResumeBranch::Idle));
    assert_eq!(during, Phase::Collecting);
    assert_eq!(engine.session().phase, Phase::Transforming);
    assert!(engine.session().continuation.is_none());
    assert_eq!(
        engine.view().tutor.map(|m| m.id.clone()),
        Some(MessageId::new("plant_the_seed"))
    );
}

#[test]
fn test_restart_marker_is_consumed_by_exactly_one_open() {
    // Arrange
    let harness = Harness::new();
    let mut engine = harness.open();
    engine.handle(SceneInput::Interact(InteractionEvent::tap("acorn")));
    engine.handle(SceneInput::RequestRestart);
    engine.teardown();
    drop(engine);

    // Act
    let mut restarted = harness.open();
    let after_restart = restarted.session().clone();
    restarted.teardown();
    drop(restarted);
    let resumed = harness.open();

    // Assert
    assert_eq!(harness.snapshots.marker_takes(), 1);
    assert_eq!(after_restart.phase, Phase::Searching);
    assert!(after_restart.discovered_items.is_empty());
    assert_ne!(resumed.last_resume(), Some(ResumeBranch::Restarted));
    assert!(resumed.session().discovered_items.is_empty());
}

#[test]
fn test_snapshot_saved_on_every_mutation_is_resumable() {
    // Arrange
    let harness = Harness::new();
    let mut engine = harness.open();
    engine.handle(SceneInput::Interact(InteractionEvent::tap("acorn")));
    harness.wait(&mut engine, 1_500);

    // Act: no teardown, as after a crash
    let latest = harness.snapshots.latest(&scene_key()).unwrap();
    drop(engine);
    let resumed = harness.open();

    // Assert
    assert!(latest.verify().is_ok());
    assert_eq!(resumed.last_resume(), Some(ResumeBranch::Popup));
    assert_eq!(
        resumed.session().popup_tag,
        Some(sprout_scene::domain::session::PopupTag::Info {
            item: ItemId::new("acorn")
        })
    );
}
