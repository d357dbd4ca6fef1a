//! Progression state machine: interactions, phase advance, completion.

use chrono::{DateTime, Utc};
use sprout_coach::HideReason;
use sprout_core::snapshot::CompletionRecord;

use super::engine::SceneEngine;
use crate::domain::definition::{ItemId, Phase};
use crate::domain::inputs::{InteractionEvent, InteractionKind};
use crate::domain::session::{Continuation, PopupTag};
use crate::domain::signals::{CompletionSummary, SceneSignal};

impl SceneEngine {
    /// Applies a player interaction. Anything that does not complete an open
    /// target of the current phase only nudges.
    pub(crate) fn handle_interaction(&mut self, event: &InteractionEvent, at: DateTime<Utc>) {
        if let Some(overlay) = self.session.overlay() {
            tracing::debug!(target_item = %event.target, ?overlay, "interaction blocked by overlay");
            self.nudge(Some(event.target.clone()));
            return;
        }
        let phase = self.session.phase;
        let Some(item) = self.definition.item_in_phase(phase, &event.target).cloned() else {
            tracing::debug!(target_item = %event.target, %phase, "not a target of this phase");
            self.nudge(Some(event.target.clone()));
            return;
        };
        if self.session.item_done(phase, &item) {
            tracing::debug!(target_item = %item.id, "item already done");
            self.nudge(Some(item.id));
            return;
        }

        match (phase, &event.kind) {
            (Phase::Searching, InteractionKind::Tap) => {
                self.session.discovered_items.insert(item.id.clone());
                self.item_completed(&item.id, phase);
                self.open_discovery(item.id, at);
            }
            (Phase::Discovering, InteractionKind::Tap) => {
                self.session.discovered_items.insert(item.id.clone());
                self.item_completed(&item.id, phase);
                self.open_highlight(item.id, at);
            }
            (Phase::Collecting, InteractionKind::Collect) => {
                let count = self
                    .session
                    .collected_counters
                    .entry(item.id.clone())
                    .or_insert(0);
                *count = (*count + 1).min(item.required);
                let done = *count >= item.required;
                tracing::debug!(target_item = %item.id, count = *count, required = item.required, "collected");
                if done {
                    self.item_completed(&item.id, phase);
                }
            }
            (Phase::Transforming, InteractionKind::Place { slot })
                if item.slot.as_ref() == Some(slot) =>
            {
                self.session.placed_items.insert(item.id.clone(), true);
                self.item_completed(&item.id, phase);
            }
            (_, kind) => {
                tracing::debug!(target_item = %item.id, ?kind, %phase, "interaction does not fit the phase");
                self.nudge(Some(item.id));
                return;
            }
        }

        self.session.recompute_progress(&self.definition);
        self.session.ready_for_trigger = true;
        self.dirty = true;
    }

    /// Advances the phase when every target is done and nothing is pending.
    /// A phase with a closing cue waits for that cue's continuation instead.
    pub(crate) fn check_phase_completion(&mut self, at: DateTime<Utc>) {
        let phase = self.session.phase;
        if phase.is_terminal()
            || self.session.is_reconciling
            || self.session.continuation.is_some()
            || self.session.overlay().is_some()
            || !self.session.phase_items_done(&self.definition, phase)
        {
            return;
        }
        if let Some(cue) = self.definition.closing_cue(phase) {
            if !self.session.tutor_shown.contains(&cue.id) {
                self.session.ready_for_trigger = true;
                return;
            }
            if self.coach.is_known(&cue.id) {
                return;
            }
        }
        self.advance_phase(at);
    }

    /// Runs the pending continuation once its message is gone and the screen
    /// is clear.
    pub(crate) fn resolve_continuation(&mut self, at: DateTime<Utc>) {
        if self.session.continuation.is_none()
            || self.session.tutor_state_tag.is_some()
            || self.session.is_reconciling
            || self.session.overlay().is_some()
            || self.coach.is_showing()
        {
            return;
        }
        let Some(continuation) = self.session.continuation.take() else {
            return;
        };
        self.dirty = true;
        match continuation {
            Continuation::AdvancePhase { from }
                if from == self.session.phase
                    && self.session.phase_items_done(&self.definition, from) =>
            {
                self.advance_phase(at);
            }
            Continuation::AdvancePhase { from } => {
                tracing::debug!(%from, phase = %self.session.phase, "stale advance dropped");
            }
            Continuation::OpenPopup {
                popup: PopupTag::Finale,
            } if !self.session.completed => {
                tracing::warn!("finale requested before the scene completed, dropped");
            }
            Continuation::OpenPopup { popup } => self.open_popup(popup),
        }
    }

    /// Moves exactly one step forward.
    pub(crate) fn advance_phase(&mut self, at: DateTime<Utc>) {
        let from = self.session.phase;
        let Some(to) = self.definition.next_phase(from) else {
            return;
        };
        self.session.phase = to;
        self.session.ready_for_trigger = true;
        self.dirty = true;
        tracing::info!(%from, %to, "phase advanced");
        self.signals.push(SceneSignal::PhaseAdvanced { from, to });
        if to.is_terminal() {
            self.complete_scene(at);
        }
    }

    fn complete_scene(&mut self, at: DateTime<Utc>) {
        self.session.completed = true;
        self.session.stars = self.definition.max_stars;
        self.session.progress_percent = 100;
        tracing::info!(stars = self.session.stars, "scene completed");
        self.signals.push(SceneSignal::SceneCompleted {
            stars: self.session.stars,
        });
        self.record_completion(at);
        self.open_popup(PopupTag::Finale);
    }

    /// Writes the permanent completion record unless one already exists.
    pub(crate) fn record_completion(&self, at: DateTime<Utc>) {
        match self.services.completions.load(&self.key) {
            Ok(Some(record)) if record.completed => {
                tracing::debug!("permanent completion already recorded");
                return;
            }
            Ok(_) => {}
            Err(error) => {
                tracing::error!(%error, "could not read permanent completion record");
                return;
            }
        }
        let record = CompletionRecord {
            completed: true,
            stars_earned: self.session.stars,
            items_unlocked: self
                .session
                .done_items(&self.definition)
                .iter()
                .map(ToString::to_string)
                .collect(),
            completed_at: at,
        };
        match self.services.completions.save(&self.key, &record) {
            Ok(()) => tracing::info!(stars = record.stars_earned, "permanent completion recorded"),
            Err(error) => tracing::error!(%error, "failed to write permanent completion record"),
        }
    }

    pub(crate) fn close_popup(&mut self) {
        let Some(popup) = self.session.popup_tag.take() else {
            tracing::debug!("no popup to close");
            self.nudge(None);
            return;
        };
        tracing::debug!(?popup, "popup closed");
        self.session.ready_for_trigger = true;
        self.dirty = true;
        if popup == PopupTag::Finale {
            self.open_completion_screen();
        }
    }

    pub(crate) fn close_tutor(&mut self) {
        match self.coach.hide(HideReason::Dismissed, &mut self.timers) {
            Some(hidden) => self.on_tutor_hidden(hidden),
            None => tracing::debug!("no tutor message to close"),
        }
    }

    pub(crate) fn confirm_completion(&mut self) {
        if !self.session.completed || !self.session.showing_completion_screen {
            tracing::debug!("completion screen is not up");
            self.nudge(None);
            return;
        }
        if self.session.exit_emitted {
            tracing::debug!("exit already emitted");
            return;
        }
        self.session.exit_emitted = true;
        self.dirty = true;
        let summary = CompletionSummary {
            key: self.key.clone(),
            stars: self.session.stars,
            items_unlocked: self.session.done_items(&self.definition),
        };
        tracing::info!(stars = summary.stars, "leaving completed scene");
        self.signals.push(SceneSignal::ExitScene(summary));
    }

    pub(crate) fn request_restart(&mut self) {
        match self.services.snapshots.set_restart_marker(&self.key) {
            Ok(()) => {
                tracing::info!("restart requested");
                self.signals.push(SceneSignal::RestartRequested);
            }
            Err(error) => tracing::error!(%error, "failed to write restart marker"),
        }
    }

    fn item_completed(&mut self, item: &ItemId, phase: Phase) {
        tracing::info!(%item, %phase, "item completed");
        self.signals.push(SceneSignal::ItemCompleted {
            item: item.clone(),
            phase,
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use sprout_coach::MessageId;
    use sprout_test_support::{
        ManualClock, RecordingCompletionStore, RecordingSnapshotStore, sample_scene, scene_key,
    };

    use crate::application::engine::{SceneEngine, SceneServices};
    use crate::config::EngineConfig;
    use crate::domain::definition::{FollowUp, ItemId, Phase, SceneDefinition};
    use crate::domain::inputs::{InteractionEvent, SceneInput};
    use crate::domain::session::PopupTag;
    use crate::domain::signals::SceneSignal;

    fn meadow() -> SceneDefinition {
        SceneDefinition::from_yaml(sample_scene()).unwrap()
    }

    /// The meadow with `follow_up` attached to the welcome cue, bypassing
    /// definition validation.
    fn welcome_followed_by(follow_up: FollowUp) -> SceneDefinition {
        let mut definition = meadow();
        let welcome = definition
            .cues
            .iter_mut()
            .find(|cue| cue.id == MessageId::new("welcome"))
            .unwrap();
        welcome.then = Some(follow_up);
        definition
    }

    struct Scene {
        clock: Arc<ManualClock>,
        snapshots: Arc<RecordingSnapshotStore>,
        completions: Arc<RecordingCompletionStore>,
        engine: SceneEngine,
    }

    impl Scene {
        fn open() -> Self {
            Self::open_with(RecordingCompletionStore::new())
        }

        fn open_with(completions: RecordingCompletionStore) -> Self {
            Self::open_scene(meadow(), completions)
        }

        fn open_scene(definition: SceneDefinition, completions: RecordingCompletionStore) -> Self {
            let clock = Arc::new(ManualClock::at_t0());
            let snapshots = Arc::new(RecordingSnapshotStore::new());
            let completions = Arc::new(completions);
            let definition = Arc::new(definition);
            let services =
                SceneServices::new(clock.clone(), snapshots.clone(), completions.clone());
            let engine =
                SceneEngine::open(scene_key(), definition, services, EngineConfig::default())
                    .unwrap();
            Self {
                clock,
                snapshots,
                completions,
                engine,
            }
        }

        fn send(&mut self, input: SceneInput) {
            self.engine.handle(input);
        }

        fn wait(&mut self, ms: i64) {
            self.clock.advance_ms(ms);
            self.engine.pump();
        }

        fn tap_and_read(&mut self, item: &str) {
            self.send(SceneInput::Interact(InteractionEvent::tap(item)));
            self.wait(2_000);
            self.send(SceneInput::ClosePopup);
        }

        /// Lets every visible and queued tutor message run out.
        fn let_tutor_finish(&mut self) {
            for _ in 0..10 {
                self.wait(10_000);
            }
        }

        fn to_collecting(&mut self) {
            self.tap_and_read("acorn");
            self.tap_and_read("feather");
            self.tap_and_read("sun_symbol");
        }

        fn collect(&mut self, item: &str, times: usize) {
            for _ in 0..times {
                self.send(SceneInput::Interact(InteractionEvent::collect(item)));
            }
        }

        fn signals(&mut self) -> Vec<SceneSignal> {
            self.engine.take_signals()
        }
    }

    #[test]
    fn test_second_tap_on_found_item_is_a_no_op() {
        // Arrange
        let mut scene = Scene::open();
        scene.tap_and_read("acorn");
        let found = scene.engine.session().discovered_items.clone();
        scene.signals();

        // Act
        scene.send(SceneInput::Interact(InteractionEvent::tap("acorn")));

        // Assert
        assert_eq!(scene.engine.session().discovered_items, found);
        assert!(scene.engine.session().discovery_tag.is_none());
        assert_eq!(
            scene.signals(),
            vec![SceneSignal::Nudge {
                target: Some(ItemId::new("acorn"))
            }]
        );
    }

    #[test]
    fn test_tap_while_popup_is_open_is_ignored() {
        let mut scene = Scene::open();
        scene.send(SceneInput::Interact(InteractionEvent::tap("acorn")));
        scene.wait(2_000);

        scene.send(SceneInput::Interact(InteractionEvent::tap("feather")));

        assert!(!scene.engine.session().discovered_items.contains(&ItemId::new("feather")));
    }

    #[test]
    fn test_finding_every_item_advances_to_discovering() {
        // Arrange
        let mut scene = Scene::open();

        // Act
        scene.tap_and_read("acorn");
        scene.tap_and_read("feather");

        // Assert
        assert_eq!(scene.engine.session().phase, Phase::Discovering);
        assert!(scene.signals().contains(&SceneSignal::PhaseAdvanced {
            from: Phase::Searching,
            to: Phase::Discovering,
        }));
    }

    #[test]
    fn test_discovering_tap_highlights_then_opens_reward_card() {
        let mut scene = Scene::open();
        scene.tap_and_read("acorn");
        scene.tap_and_read("feather");

        scene.send(SceneInput::Interact(InteractionEvent::tap("sun_symbol")));
        let highlighted = scene.engine.session().highlight_tag.clone();
        scene.wait(1_200);

        assert_eq!(highlighted, Some(ItemId::new("sun_symbol")));
        assert_eq!(
            scene.engine.session().popup_tag,
            Some(PopupTag::RewardCard {
                item: ItemId::new("sun_symbol")
            })
        );
    }

    #[test]
    fn test_collect_counts_up_to_required() {
        // Arrange
        let mut scene = Scene::open();
        scene.to_collecting();
        scene.signals();

        // Act
        scene.collect("clover", 2);
        let partial = scene.signals();
        scene.collect("clover", 2);
        let rest = scene.signals();

        // Assert
        assert!(partial.iter().all(|s| !matches!(s, SceneSignal::ItemCompleted { .. })));
        assert_eq!(scene.engine.session().collected_counters[&ItemId::new("clover")], 3);
        assert_eq!(
            rest.iter()
                .filter(|s| matches!(s, SceneSignal::ItemCompleted { .. }))
                .count(),
            1
        );
    }

    #[test]
    fn test_closing_cue_defers_advance_until_message_closes() {
        // Arrange
        let mut scene = Scene::open();
        scene.to_collecting();
        scene.let_tutor_finish();

        // Act
        scene.collect("apple", 1);
        scene.collect("berry", 1);
        scene.collect("clover", 3);
        let before_cue = scene.engine.session().phase;
        scene.let_tutor_finish();

        // Assert
        assert_eq!(before_cue, Phase::Collecting);
        assert!(scene.engine.session().tutor_shown.contains(&MessageId::new("collecting_done")));
        assert_eq!(scene.engine.session().phase, Phase::Transforming);
        assert!(scene.engine.session().continuation.is_none());
    }

    #[test]
    fn test_advance_continuation_waits_for_phase_items() {
        // Arrange
        let mut scene = Scene::open_scene(
            welcome_followed_by(FollowUp::AdvancePhase),
            RecordingCompletionStore::new(),
        );
        let armed = scene.engine.session().continuation.is_some();

        // Act
        scene.let_tutor_finish();

        // Assert
        let session = scene.engine.session();
        assert!(armed);
        assert_eq!(session.phase, Phase::Searching);
        assert!(session.discovered_items.is_empty());
        assert!(session.continuation.is_none());
    }

    #[test]
    fn test_finale_continuation_before_completion_is_dropped() {
        // Arrange
        let mut scene = Scene::open_scene(
            welcome_followed_by(FollowUp::OpenPopup {
                popup: PopupTag::Finale,
            }),
            RecordingCompletionStore::new(),
        );

        // Act
        scene.let_tutor_finish();
        scene.send(SceneInput::ClosePopup);
        scene.send(SceneInput::ConfirmCompletion);

        // Assert
        let session = scene.engine.session();
        assert!(session.popup_tag.is_none());
        assert!(!session.completed);
        assert!(!session.showing_completion_screen);
        assert!(
            !scene
                .signals()
                .iter()
                .any(|s| matches!(s, SceneSignal::ExitScene(_)))
        );
        assert!(scene.completions.saves().is_empty());
    }

    #[test]
    fn test_place_requires_matching_slot() {
        let mut scene = Scene::open();
        scene.to_collecting();
        scene.collect("apple", 1);
        scene.collect("berry", 1);
        scene.collect("clover", 3);
        scene.let_tutor_finish();
        assert_eq!(scene.engine.session().phase, Phase::Transforming);

        scene.send(SceneInput::Interact(InteractionEvent::place("seed", "pond")));

        assert!(scene.engine.session().placed_items.is_empty());
    }

    #[test]
    fn test_full_playthrough_records_completion_and_exits_once() {
        // Arrange
        let mut scene = Scene::open();
        scene.to_collecting();
        scene.collect("apple", 1);
        scene.collect("berry", 1);
        scene.collect("clover", 3);
        scene.let_tutor_finish();
        scene.signals();

        // Act
        scene.send(SceneInput::Interact(InteractionEvent::place("seed", "soil")));
        let finale = scene.engine.session().popup_tag.clone();
        scene.send(SceneInput::ClosePopup);
        scene.send(SceneInput::ConfirmCompletion);
        scene.send(SceneInput::ConfirmCompletion);

        // Assert
        let session = scene.engine.session();
        assert_eq!(finale, Some(PopupTag::Finale));
        assert_eq!(session.phase, Phase::AllComplete);
        assert!(session.completed);
        assert_eq!(session.stars, 3);
        assert_eq!(session.progress_percent, 100);
        assert!(session.showing_completion_screen);
        let saves = scene.completions.saves();
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0].1.items_unlocked.len(), 7);
        let exits: Vec<_> = scene
            .signals()
            .into_iter()
            .filter(|s| matches!(s, SceneSignal::ExitScene(_)))
            .collect();
        assert_eq!(exits.len(), 1);
    }

    #[test]
    fn test_existing_completion_record_is_not_rewritten() {
        // Arrange
        let existing = sprout_core::snapshot::CompletionRecord {
            completed: true,
            stars_earned: 3,
            items_unlocked: vec![],
            completed_at: sprout_test_support::t0(),
        };
        let mut scene =
            Scene::open_with(RecordingCompletionStore::with_record(scene_key(), existing));

        // Act
        scene.to_collecting();
        scene.collect("apple", 1);
        scene.collect("berry", 1);
        scene.collect("clover", 3);
        scene.let_tutor_finish();
        scene.send(SceneInput::Interact(InteractionEvent::place("seed", "soil")));

        // Assert
        assert!(scene.engine.session().completed);
        assert!(scene.completions.saves().is_empty());
    }

    #[test]
    fn test_request_restart_sets_marker_without_touching_session() {
        let mut scene = Scene::open();
        scene.tap_and_read("acorn");

        scene.send(SceneInput::RequestRestart);

        assert!(scene.signals().contains(&SceneSignal::RestartRequested));
        assert_eq!(scene.engine.session().discovered_items.len(), 1);
        assert!(scene.snapshots.has_restart_marker(&scene_key()));
    }
}
