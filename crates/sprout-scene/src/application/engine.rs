//! The scene engine.
//!
//! One `SceneEngine` owns one live scene: its session, its tutor scheduler,
//! and every timer acting on either. All mutation goes through `&mut self`;
//! timers are data in an engine-owned queue and fire from [`SceneEngine::pump`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sprout_coach::{Coach, CoachTimer, HiddenMessage, HideReason};
use sprout_core::clock::Clock;
use sprout_core::error::DomainError;
use sprout_core::key::SceneKey;
use sprout_core::snapshot::StoredSnapshot;
use sprout_core::store::{CompletionStore, SnapshotStore};
use sprout_core::timer::{TimerQueue, TimerService, millis};
use tracing::Span;

use super::reconciler::{ResumeBranch, load_session};
use super::view::SceneView;
use crate::config::EngineConfig;
use crate::domain::definition::{ItemId, SceneDefinition};
use crate::domain::inputs::SceneInput;
use crate::domain::session::{PopupTag, SceneSession};
use crate::domain::signals::SceneSignal;

/// Timer payloads of a scene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneTimer {
    /// A coach dismiss or health-check timer.
    Coach(CoachTimer),
    /// The discovery animation for an item ended.
    DiscoveryFinished(ItemId),
    /// The highlight animation for an item ended.
    HighlightFinished(ItemId),
    /// The post-resume settle delay elapsed.
    ReconcileSettled,
}

impl From<CoachTimer> for SceneTimer {
    fn from(timer: CoachTimer) -> Self {
        Self::Coach(timer)
    }
}

/// Collaborators a scene needs.
#[derive(Clone)]
pub struct SceneServices {
    /// Time source.
    pub clock: Arc<dyn Clock>,
    /// Per-scene session snapshots and restart markers.
    pub snapshots: Arc<dyn SnapshotStore>,
    /// Permanent completion records.
    pub completions: Arc<dyn CompletionStore>,
}

impl SceneServices {
    /// Bundles the collaborators.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        snapshots: Arc<dyn SnapshotStore>,
        completions: Arc<dyn CompletionStore>,
    ) -> Self {
        Self {
            clock,
            snapshots,
            completions,
        }
    }
}

/// A live scene.
pub struct SceneEngine {
    pub(crate) key: SceneKey,
    pub(crate) definition: Arc<SceneDefinition>,
    pub(crate) session: SceneSession,
    pub(crate) coach: Coach,
    pub(crate) timers: TimerQueue<SceneTimer>,
    pub(crate) services: SceneServices,
    pub(crate) config: EngineConfig,
    /// Signals not yet taken by the host.
    pub(crate) signals: Vec<SceneSignal>,
    /// The session changed since the last snapshot write.
    pub(crate) dirty: bool,
    live: bool,
    last_resume: Option<ResumeBranch>,
    span: Span,
}

impl SceneEngine {
    /// Opens the scene addressed by `key`.
    ///
    /// A missing or unreadable snapshot starts a fresh session. An existing
    /// snapshot is resumed through the reconciler.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::UnknownScene` if `definition` is not the scene
    /// `key` addresses.
    pub fn open(
        key: SceneKey,
        definition: Arc<SceneDefinition>,
        services: SceneServices,
        config: EngineConfig,
    ) -> Result<Self, DomainError> {
        if !definition.matches(&key) {
            return Err(DomainError::UnknownScene(key.to_string()));
        }
        let span = tracing::info_span!("scene", key = %key);
        let entered = span.clone().entered();

        let now = services.clock.now();
        let prior = load_session(&key, &definition, services.snapshots.as_ref());
        let resumed = prior.is_some();
        let session =
            prior.unwrap_or_else(|| SceneSession::fresh(definition.initial_phase(), now));

        let mut engine = Self {
            key,
            definition,
            session,
            coach: Coach::new(config.coach.clone()),
            timers: TimerQueue::new(),
            services,
            config,
            signals: Vec::new(),
            dirty: true,
            live: true,
            last_resume: None,
            span,
        };
        engine.coach.start(now, &mut engine.timers);
        if resumed {
            engine.last_resume = Some(engine.reconcile(now));
        } else {
            engine.discard_restart_marker();
            tracing::info!(phase = %engine.session.phase, "starting fresh session");
        }
        engine.settle(now);
        drop(entered);
        Ok(engine)
    }

    /// Applies one renderer input. Timers already due fire first.
    pub fn handle(&mut self, input: SceneInput) {
        if !self.live {
            tracing::debug!(?input, "input after teardown ignored");
            return;
        }
        let span = self.span.clone();
        let _entered = span.enter();

        self.fire_due_timers();
        let now = self.services.clock.now();
        match input {
            SceneInput::Interact(event) => self.handle_interaction(&event, now),
            SceneInput::ClosePopup => self.close_popup(),
            SceneInput::CloseTutor => self.close_tutor(),
            SceneInput::ConfirmCompletion => self.confirm_completion(),
            SceneInput::RequestRestart => self.request_restart(),
        }
        self.settle(now);
    }

    /// Fires every timer due at the current clock reading, in deadline order.
    /// Returns how many fired.
    pub fn pump(&mut self) -> usize {
        if !self.live {
            return 0;
        }
        let span = self.span.clone();
        let _entered = span.enter();
        self.fire_due_timers()
    }

    /// Cancels every outstanding timer and writes a final snapshot. Later
    /// inputs and pumps are ignored.
    pub fn teardown(&mut self) {
        if !self.live {
            return;
        }
        let span = self.span.clone();
        let _entered = span.enter();

        let now = self.services.clock.now();
        self.coach.stop(&mut self.timers);
        let cancelled = self.timers.cancel_all();
        self.live = false;
        self.dirty = true;
        self.persist(now);
        tracing::info!(cancelled, phase = %self.session.phase, "scene torn down");
    }

    /// Read-only view for the renderer.
    #[must_use]
    pub fn view(&self) -> SceneView<'_> {
        SceneView {
            key: &self.key,
            session: &self.session,
            overlay: self.session.overlay(),
            tutor: self.coach.active().map(|active| &active.message),
        }
    }

    /// Drains the signals emitted since the last call.
    pub fn take_signals(&mut self) -> Vec<SceneSignal> {
        std::mem::take(&mut self.signals)
    }

    /// The scene key.
    #[must_use]
    pub fn key(&self) -> &SceneKey {
        &self.key
    }

    /// The scene definition.
    #[must_use]
    pub fn definition(&self) -> &SceneDefinition {
        &self.definition
    }

    /// The current session.
    #[must_use]
    pub fn session(&self) -> &SceneSession {
        &self.session
    }

    /// The tutor scheduler.
    #[must_use]
    pub fn coach(&self) -> &Coach {
        &self.coach
    }

    /// The reconciler branch taken when this scene was opened, if it resumed.
    #[must_use]
    pub fn last_resume(&self) -> Option<ResumeBranch> {
        self.last_resume
    }

    /// Deadline of the next pending timer.
    #[must_use]
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.timers.next_deadline()
    }

    /// Returns whether the scene has not been torn down.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.live
    }

    fn fire_due_timers(&mut self) -> usize {
        let now = self.services.clock.now();
        let mut fired = 0;
        while let Some(deadline) = self.timers.next_deadline().filter(|d| *d <= now) {
            let Some((_, timer)) = self.timers.pop_due(deadline) else {
                break;
            };
            self.on_timer(timer, deadline);
            self.settle(deadline);
            fired += 1;
        }
        fired
    }

    fn on_timer(&mut self, timer: SceneTimer, at: DateTime<Utc>) {
        match timer {
            SceneTimer::Coach(timer) => {
                // The health check runs on the wall clock so missed ticks are skipped.
                let at = if timer == CoachTimer::HealthCheck {
                    self.services.clock.now()
                } else {
                    at
                };
                if let Some(hidden) = self.coach.on_timer(timer, at, &mut self.timers) {
                    self.on_tutor_hidden(hidden);
                }
            }
            SceneTimer::DiscoveryFinished(item) => {
                if self.session.discovery_tag.as_ref() != Some(&item) {
                    return;
                }
                self.session.discovery_tag = None;
                self.open_popup(PopupTag::Info { item });
            }
            SceneTimer::HighlightFinished(item) => {
                if self.session.highlight_tag.as_ref() != Some(&item) {
                    return;
                }
                self.session.highlight_tag = None;
                self.open_popup(PopupTag::RewardCard { item });
            }
            SceneTimer::ReconcileSettled => {
                self.session.is_reconciling = false;
                self.session.ready_for_trigger = true;
                self.dirty = true;
                tracing::info!("resume settled");
            }
        }
    }

    /// Runs the follow-up work every mutation needs: pending continuation,
    /// phase completion, cue evaluation, coach drain, and the snapshot write.
    pub(crate) fn settle(&mut self, at: DateTime<Utc>) {
        self.resolve_continuation(at);
        self.check_phase_completion(at);
        self.evaluate_triggers(at);
        self.drain_coach(at);
        self.persist(at);
    }

    pub(crate) fn persist(&mut self, at: DateTime<Utc>) {
        if !self.dirty {
            return;
        }
        self.session.updated_at = at;
        let payload = match serde_json::to_value(&self.session) {
            Ok(payload) => payload,
            Err(error) => {
                tracing::error!(%error, "failed to encode scene session");
                return;
            }
        };
        let snapshot = StoredSnapshot::seal(self.key.clone(), payload, at);
        match self.services.snapshots.save(&snapshot) {
            Ok(()) => self.dirty = false,
            Err(error) => tracing::error!(%error, "failed to persist scene snapshot"),
        }
    }

    /// Starts the discovery animation for `item`.
    pub(crate) fn open_discovery(&mut self, item: ItemId, at: DateTime<Utc>) {
        self.preempt_tutor();
        self.timers.schedule_after(
            at,
            millis(self.config.discovery_animation_ms),
            SceneTimer::DiscoveryFinished(item.clone()),
        );
        tracing::debug!(%item, "discovery animation started");
        self.session.discovery_tag = Some(item);
        self.dirty = true;
    }

    /// Starts the highlight animation for `item`.
    pub(crate) fn open_highlight(&mut self, item: ItemId, at: DateTime<Utc>) {
        self.preempt_tutor();
        self.timers.schedule_after(
            at,
            millis(self.config.highlight_animation_ms),
            SceneTimer::HighlightFinished(item.clone()),
        );
        tracing::debug!(%item, "highlight animation started");
        self.session.highlight_tag = Some(item);
        self.dirty = true;
    }

    /// Opens a modal popup.
    pub(crate) fn open_popup(&mut self, popup: PopupTag) {
        self.preempt_tutor();
        tracing::debug!(?popup, "popup opened");
        self.session.popup_tag = Some(popup);
        self.dirty = true;
    }

    /// Shows the end-of-scene summary.
    pub(crate) fn open_completion_screen(&mut self) {
        self.preempt_tutor();
        tracing::debug!("completion screen shown");
        self.session.showing_completion_screen = true;
        self.dirty = true;
    }

    pub(crate) fn on_tutor_hidden(&mut self, hidden: HiddenMessage) {
        let id = hidden.message.id;
        if self.session.tutor_state_tag.as_ref() == Some(&id) {
            self.session.tutor_state_tag = None;
            self.session.tutor_state_timestamp = None;
        }
        self.signals.push(SceneSignal::TutorHidden {
            id,
            reason: hidden.reason,
        });
        self.dirty = true;
    }

    pub(crate) fn nudge(&mut self, target: Option<ItemId>) {
        self.signals.push(SceneSignal::Nudge { target });
    }

    fn preempt_tutor(&mut self) {
        if let Some(hidden) = self.coach.hide(HideReason::Preempted, &mut self.timers) {
            self.on_tutor_hidden(hidden);
        }
    }

    fn discard_restart_marker(&self) {
        match self.services.snapshots.take_restart_marker(&self.key) {
            Ok(true) => tracing::debug!("restart marker without a snapshot discarded"),
            Ok(false) => {}
            Err(error) => tracing::error!(%error, "could not read restart marker"),
        }
    }
}

impl Drop for SceneEngine {
    fn drop(&mut self) {
        if self.live {
            self.coach.stop(&mut self.timers);
            self.timers.cancel_all();
        }
    }
}
