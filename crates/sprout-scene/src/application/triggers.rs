//! Tutor cue evaluation and the coach slot.

use chrono::{DateTime, Utc};
use sprout_coach::{EnqueueOutcome, MessageId};

use super::engine::SceneEngine;
use crate::domain::definition::{CueDef, CueTrigger, FollowUp};
use crate::domain::session::Continuation;
use crate::domain::signals::SceneSignal;

impl SceneEngine {
    /// Offers every unshown cue whose condition holds to the coach. Runs only
    /// when the progression flagged it, no resume is settling, and the screen
    /// is free of overlays; otherwise the flag waits for the next cycle.
    pub(crate) fn evaluate_triggers(&mut self, at: DateTime<Utc>) {
        if !self.session.ready_for_trigger
            || self.session.is_reconciling
            || self.session.overlay().is_some()
        {
            return;
        }
        self.session.ready_for_trigger = false;

        let due: Vec<CueDef> = self
            .definition
            .cues
            .iter()
            .filter(|cue| self.cue_is_due(cue))
            .cloned()
            .collect();
        for cue in due {
            let outcome = self
                .coach
                .enqueue(cue.message(), cue.mode, at, &mut self.timers);
            tracing::debug!(cue = %cue.id, ?outcome, "cue offered");
            match outcome {
                EnqueueOutcome::Shown => self.on_tutor_shown(&cue.id, at),
                EnqueueOutcome::Queued | EnqueueOutcome::Deferred => self.dirty = true,
                EnqueueOutcome::Duplicate => {}
            }
        }
        self.forget_stale_tutor_tag();
    }

    /// Moves the next queued message into the free slot.
    pub(crate) fn drain_coach(&mut self, at: DateTime<Utc>) {
        if self.session.overlay().is_some() {
            return;
        }
        if let Some(message) = self.coach.drain(at, &mut self.timers) {
            self.on_tutor_shown(&message.id, at);
        }
    }

    fn cue_is_due(&self, cue: &CueDef) -> bool {
        !self.session.tutor_shown.contains(&cue.id)
            && !self.coach.is_known(&cue.id)
            && self.condition_holds(&cue.trigger)
    }

    fn condition_holds(&self, trigger: &CueTrigger) -> bool {
        match trigger {
            CueTrigger::EnterPhase(phase) => self.session.phase == *phase,
            CueTrigger::ItemsDone(items) => items
                .iter()
                .all(|id| self.session.is_done(&self.definition, id)),
            CueTrigger::PhaseComplete(phase) => {
                self.session.phase == *phase
                    && self.session.phase_items_done(&self.definition, *phase)
            }
        }
    }

    fn on_tutor_shown(&mut self, id: &MessageId, at: DateTime<Utc>) {
        self.session.tutor_shown.insert(id.clone());
        self.session.tutor_state_tag = Some(id.clone());
        self.session.tutor_state_timestamp = Some(at);
        let follow_up = self.definition.cue(id).and_then(|cue| cue.then.clone());
        if let Some(follow_up) = follow_up {
            self.session.continuation = Some(match follow_up {
                FollowUp::AdvancePhase => Continuation::AdvancePhase {
                    from: self.session.phase,
                },
                FollowUp::OpenPopup { popup } => Continuation::OpenPopup { popup },
            });
        }
        self.signals.push(SceneSignal::TutorShown { id: id.clone() });
        self.dirty = true;
    }

    /// A resumed tutor tag whose cue no longer fires is dropped so the
    /// continuation it guards can run.
    fn forget_stale_tutor_tag(&mut self) {
        let stale = self
            .session
            .tutor_state_tag
            .as_ref()
            .is_some_and(|id| !self.coach.is_known(id));
        if stale {
            tracing::debug!(tag = ?self.session.tutor_state_tag, "tutor tag has no message, cleared");
            self.session.tutor_state_tag = None;
            self.session.tutor_state_timestamp = None;
            self.dirty = true;
        }
    }
}
