//! Resume reconciler.
//!
//! A snapshot records what was on screen but not the timers or the tutor
//! scheduler that put it there. Resuming rebuilds exactly one overlay through
//! the same builders the live path uses, then holds cue evaluation back for a
//! short settle delay.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sprout_coach::HideReason;
use sprout_core::key::SceneKey;
use sprout_core::store::SnapshotStore;
use sprout_core::timer::{TimerService, millis};

use super::engine::{SceneEngine, SceneTimer};
use crate::domain::definition::SceneDefinition;
use crate::domain::session::SceneSession;
use crate::domain::signals::SceneSignal;

/// Which branch the reconciler took. The order of the variants is the order
/// branches are tried in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumeBranch {
    /// A restart marker was consumed and the session wiped.
    Restarted,
    /// The discovery animation was restarted.
    Discovery,
    /// The highlight animation was restarted.
    Highlight,
    /// A popup was reopened.
    Popup,
    /// The completion screen was reopened.
    CompletionScreen,
    /// The interrupted tutor cue was re-armed.
    TutorMessage,
    /// Nothing to rebuild.
    Idle,
}

/// Loads the session for `key`. Anything unreadable counts as no session.
pub(crate) fn load_session(
    key: &SceneKey,
    definition: &SceneDefinition,
    store: &dyn SnapshotStore,
) -> Option<SceneSession> {
    let snapshot = match store.load(key) {
        Ok(Some(snapshot)) => snapshot,
        Ok(None) => return None,
        Err(error) => {
            tracing::warn!(%error, "snapshot unreadable, starting fresh");
            return None;
        }
    };
    if let Err(error) = snapshot.verify() {
        tracing::warn!(%error, "snapshot failed verification, starting fresh");
        return None;
    }
    match serde_json::from_value::<SceneSession>(snapshot.payload) {
        Ok(session) if definition.phase_def(session.phase).is_some() => Some(session),
        Ok(session) => {
            tracing::warn!(phase = %session.phase, "snapshot phase not in this scene, starting fresh");
            None
        }
        Err(error) => {
            tracing::warn!(%error, "snapshot payload did not decode, starting fresh");
            None
        }
    }
}

impl SceneEngine {
    /// Reconciles a resumed session. Called once from `open`.
    pub(crate) fn reconcile(&mut self, at: DateTime<Utc>) -> ResumeBranch {
        match self.services.snapshots.take_restart_marker(&self.key) {
            Ok(true) => {
                self.reset(at);
                return ResumeBranch::Restarted;
            }
            Ok(false) => {}
            Err(error) => tracing::error!(%error, "could not read restart marker"),
        }

        self.session.is_reconciling = true;
        self.dirty = true;
        let branch = self.rebuild_overlay(at);
        tracing::info!(?branch, phase = %self.session.phase, "resuming scene");
        self.timers.schedule_after(
            at,
            millis(self.config.reconcile_settle_ms),
            SceneTimer::ReconcileSettled,
        );
        if self.session.completed {
            self.record_completion(at);
        }
        branch
    }

    /// Wipes the session back to a first visit.
    pub(crate) fn reset(&mut self, at: DateTime<Utc>) {
        if let Some(hidden) = self.coach.hide(HideReason::Reset, &mut self.timers) {
            self.on_tutor_hidden(hidden);
        }
        self.coach.clear_queue();
        self.timers.cancel_all();
        self.coach.start(at, &mut self.timers);
        self.session = SceneSession::fresh(self.definition.initial_phase(), at);
        self.dirty = true;
        self.signals.push(SceneSignal::SceneReset);
        tracing::info!("restart marker consumed, session reset");
    }

    fn rebuild_overlay(&mut self, at: DateTime<Utc>) -> ResumeBranch {
        if self.session.overlay_count() > 1 {
            tracing::warn!("snapshot records several overlays, keeping the first");
        }
        let discovery = self.session.discovery_tag.take();
        let highlight = self.session.highlight_tag.take();
        let popup = self.session.popup_tag.take();
        let completion_screen = std::mem::take(&mut self.session.showing_completion_screen);

        if let Some(item) = discovery {
            if self.definition.item(&item).is_none() {
                return unknown_tag("discovery", item.as_str());
            }
            self.open_discovery(item, at);
            return ResumeBranch::Discovery;
        }
        if let Some(item) = highlight {
            if self.definition.item(&item).is_none() {
                return unknown_tag("highlight", item.as_str());
            }
            self.open_highlight(item, at);
            return ResumeBranch::Highlight;
        }
        if let Some(popup) = popup {
            if !self.definition.popup_is_known(&popup) {
                return unknown_tag("popup", &format!("{popup:?}"));
            }
            self.open_popup(popup);
            return ResumeBranch::Popup;
        }
        if completion_screen {
            self.open_completion_screen();
            return ResumeBranch::CompletionScreen;
        }
        if let Some(id) = self.session.tutor_state_tag.clone() {
            if self.definition.cue(&id).is_none() {
                self.session.tutor_state_tag = None;
                self.session.tutor_state_timestamp = None;
                return unknown_tag("tutor", id.as_str());
            }
            self.session.tutor_shown.remove(&id);
            self.session.ready_for_trigger = true;
            return ResumeBranch::TutorMessage;
        }
        ResumeBranch::Idle
    }
}

fn unknown_tag(kind: &str, value: &str) -> ResumeBranch {
    tracing::warn!(kind, value, "unrecognized tag in snapshot, cleared");
    ResumeBranch::Idle
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use sprout_coach::MessageId;
    use sprout_core::snapshot::StoredSnapshot;
    use sprout_test_support::{
        ManualClock, RecordingCompletionStore, RecordingSnapshotStore, sample_scene, scene_key, t0,
    };

    use super::*;
    use crate::application::engine::SceneServices;
    use crate::config::EngineConfig;
    use crate::domain::definition::{ItemId, Phase};
    use crate::domain::session::PopupTag;

    fn resume(session: &SceneSession) -> (SceneEngine, Arc<RecordingSnapshotStore>) {
        resume_on(session, Arc::new(ManualClock::at_t0()))
    }

    fn resume_on(
        session: &SceneSession,
        clock: Arc<ManualClock>,
    ) -> (SceneEngine, Arc<RecordingSnapshotStore>) {
        let snapshot =
            StoredSnapshot::seal(scene_key(), serde_json::to_value(session).unwrap(), t0());
        let snapshots = Arc::new(RecordingSnapshotStore::with_snapshot(snapshot));
        let definition = Arc::new(SceneDefinition::from_yaml(sample_scene()).unwrap());
        let services = SceneServices::new(
            clock,
            snapshots.clone(),
            Arc::new(RecordingCompletionStore::new()),
        );
        let engine =
            SceneEngine::open(scene_key(), definition, services, EngineConfig::default()).unwrap();
        (engine, snapshots)
    }

    fn searching() -> SceneSession {
        let mut session = SceneSession::fresh(Phase::Searching, t0());
        session.ready_for_trigger = false;
        session.tutor_shown.insert(MessageId::new("welcome"));
        session
    }

    #[test]
    fn test_discovery_tag_restarts_animation() {
        // Arrange
        let mut session = searching();
        session.discovered_items.insert(ItemId::new("acorn"));
        session.discovery_tag = Some(ItemId::new("acorn"));

        // Act
        let (mut engine, _) = resume(&session);

        // Assert
        assert_eq!(engine.last_resume(), Some(ResumeBranch::Discovery));
        assert_eq!(engine.session().discovery_tag, Some(ItemId::new("acorn")));
        assert!(engine.session().is_reconciling);
        assert!(
            engine
                .take_signals()
                .iter()
                .all(|s| !matches!(s, SceneSignal::ItemCompleted { .. }))
        );
    }

    #[test]
    fn test_unknown_popup_falls_back_to_idle() {
        // Arrange
        let mut session = searching();
        session.popup_tag = Some(PopupTag::Unknown);

        // Act
        let (engine, _) = resume(&session);

        // Assert
        assert_eq!(engine.last_resume(), Some(ResumeBranch::Idle));
        assert!(engine.session().popup_tag.is_none());
    }

    #[test]
    fn test_popup_for_unknown_item_falls_back_to_idle() {
        let mut session = searching();
        session.popup_tag = Some(PopupTag::Info {
            item: ItemId::new("ghost"),
        });

        let (engine, _) = resume(&session);

        assert_eq!(engine.last_resume(), Some(ResumeBranch::Idle));
        assert!(engine.session().overlay().is_none());
    }

    /// Resumes `session`, then lets the settle delay run out.
    fn resume_and_settle(session: &SceneSession) -> (SceneEngine, Option<ResumeBranch>) {
        let clock = Arc::new(ManualClock::at_t0());
        let (mut engine, _) = resume_on(session, clock.clone());
        let branch = engine.last_resume();
        clock.advance_ms(300);
        engine.pump();
        (engine, branch)
    }

    #[test]
    fn test_discovery_tag_for_unknown_item_falls_back_to_idle() {
        // Arrange
        let mut session = searching();
        session.discovery_tag = Some(ItemId::new("ghost"));

        // Act
        let (engine, branch) = resume_and_settle(&session);

        // Assert
        assert_eq!(branch, Some(ResumeBranch::Idle));
        assert!(engine.session().discovery_tag.is_none());
        assert!(engine.session().overlay().is_none());
        assert!(!engine.session().is_reconciling);
    }

    #[test]
    fn test_highlight_tag_for_unknown_item_falls_back_to_idle() {
        // Arrange
        let mut session = searching();
        session.highlight_tag = Some(ItemId::new("ghost"));

        // Act
        let (engine, branch) = resume_and_settle(&session);

        // Assert
        assert_eq!(branch, Some(ResumeBranch::Idle));
        assert!(engine.session().highlight_tag.is_none());
        assert!(engine.session().overlay().is_none());
        assert!(!engine.session().is_reconciling);
    }

    #[test]
    fn test_tutor_tag_for_unknown_cue_falls_back_to_idle() {
        // Arrange
        let mut session = searching();
        session.tutor_state_tag = Some(MessageId::new("retired_cue"));
        session.tutor_state_timestamp = Some(t0());

        // Act
        let (engine, branch) = resume_and_settle(&session);

        // Assert
        assert_eq!(branch, Some(ResumeBranch::Idle));
        assert!(engine.session().tutor_state_tag.is_none());
        assert!(engine.session().tutor_state_timestamp.is_none());
        assert!(engine.view().tutor.is_none());
        assert!(!engine.session().is_reconciling);
    }

    #[test]
    fn test_first_branch_wins_and_other_overlays_are_dropped() {
        // Arrange
        let mut session = searching();
        session.highlight_tag = Some(ItemId::new("sun_symbol"));
        session.popup_tag = Some(PopupTag::Finale);

        // Act
        let (engine, _) = resume(&session);

        // Assert
        assert_eq!(engine.last_resume(), Some(ResumeBranch::Highlight));
        assert_eq!(engine.session().overlay_count(), 1);
    }

    #[test]
    fn test_restart_marker_resets_and_is_consumed() {
        // Arrange
        let mut session = searching();
        session.phase = Phase::Collecting;
        session.collected_counters.insert(ItemId::new("apple"), 1);
        let snapshot =
            StoredSnapshot::seal(scene_key(), serde_json::to_value(&session).unwrap(), t0());
        let snapshots = Arc::new(RecordingSnapshotStore::with_snapshot(snapshot));
        snapshots.set_restart_marker(&scene_key()).unwrap();
        let definition = Arc::new(SceneDefinition::from_yaml(sample_scene()).unwrap());
        let services = SceneServices::new(
            Arc::new(ManualClock::at_t0()),
            snapshots.clone(),
            Arc::new(RecordingCompletionStore::new()),
        );

        // Act
        let engine =
            SceneEngine::open(scene_key(), definition, services, EngineConfig::default()).unwrap();

        // Assert
        assert_eq!(engine.last_resume(), Some(ResumeBranch::Restarted));
        assert_eq!(engine.session().phase, Phase::Searching);
        assert!(engine.session().collected_counters.is_empty());
        assert!(!snapshots.has_restart_marker(&scene_key()));
        assert_eq!(
            engine.view().tutor.map(|m| m.id.clone()),
            Some(MessageId::new("welcome"))
        );
    }

    #[test]
    fn test_corrupt_snapshot_starts_fresh() {
        // Arrange
        let mut snapshot =
            StoredSnapshot::seal(scene_key(), serde_json::to_value(searching()).unwrap(), t0());
        snapshot.checksum = "0000".into();
        let snapshots = Arc::new(RecordingSnapshotStore::with_snapshot(snapshot));
        let definition = Arc::new(SceneDefinition::from_yaml(sample_scene()).unwrap());
        let services = SceneServices::new(
            Arc::new(ManualClock::at_t0()),
            snapshots,
            Arc::new(RecordingCompletionStore::new()),
        );

        // Act
        let engine =
            SceneEngine::open(scene_key(), definition, services, EngineConfig::default()).unwrap();

        // Assert
        assert!(engine.last_resume().is_none());
        assert!(!engine.session().is_reconciling);
        assert!(engine.session().tutor_shown.contains(&MessageId::new("welcome")));
    }
}
