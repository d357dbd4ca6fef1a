//! The single-slot tutor scheduler.

use chrono::{DateTime, TimeDelta, Utc};
use sprout_core::timer::{TimerId, TimerService, millis};

use crate::config::CoachConfig;
use crate::message::{EnqueueMode, HideReason, MessageId, TutorMessage};
use crate::queue::MessageQueue;

/// Timer payloads owned by the coach. Dismiss timers carry the ticket of the
/// showing they belong to so a late timer never hides a newer message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoachTimer {
    /// Normal end of a message's display time.
    PrimaryDismiss {
        /// Showing the timer belongs to.
        ticket: u64,
    },
    /// Deadlock breaker, `safety_slack` after the primary dismiss.
    SafetyDismiss {
        /// Showing the timer belongs to.
        ticket: u64,
    },
    /// Periodic self-healing check.
    HealthCheck,
}

/// The message currently occupying the slot.
#[derive(Debug, Clone)]
pub struct ActiveMessage {
    /// The message.
    pub message: TutorMessage,
    /// Monotonic showing counter.
    pub ticket: u64,
    /// When the message was shown.
    pub shown_at: DateTime<Utc>,
    /// When the primary dismiss is due.
    pub expected_hide_at: DateTime<Utc>,
    /// Primary dismiss timer.
    pub primary: TimerId,
    /// Safety dismiss timer.
    pub safety: TimerId,
}

/// A message that just left the slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HiddenMessage {
    /// The message.
    pub message: TutorMessage,
    /// Why it was hidden.
    pub reason: HideReason,
}

/// Result of [`Coach::enqueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// The message took the free slot immediately.
    Shown,
    /// The message is waiting in the priority queue.
    Queued,
    /// An immediate message found the slot busy and waits at the queue head.
    Deferred,
    /// A message with the same id is already visible or queued.
    Duplicate,
}

/// Tutor message scheduler: a priority queue feeding a single visible slot.
///
/// State per message is `Empty -> Showing -> Empty`; a non-empty queue with a
/// free slot goes `Empty -> Draining -> Showing`.
#[derive(Debug)]
pub struct Coach {
    config: CoachConfig,
    queue: MessageQueue,
    active: Option<ActiveMessage>,
    draining: bool,
    next_ticket: u64,
    health_timer: Option<TimerId>,
}

impl Coach {
    /// Creates an idle coach.
    #[must_use]
    pub fn new(config: CoachConfig) -> Self {
        Self {
            config,
            queue: MessageQueue::default(),
            active: None,
            draining: false,
            next_ticket: 0,
            health_timer: None,
        }
    }

    /// Timing configuration.
    #[must_use]
    pub fn config(&self) -> &CoachConfig {
        &self.config
    }

    /// The visible message, if any.
    #[must_use]
    pub fn active(&self) -> Option<&ActiveMessage> {
        self.active.as_ref()
    }

    /// Returns true if a message is visible.
    #[must_use]
    pub fn is_showing(&self) -> bool {
        self.active.is_some()
    }

    /// Number of messages waiting for the slot.
    #[must_use]
    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    /// Returns true if a message with `id` is visible or queued.
    #[must_use]
    pub fn is_known(&self, id: &MessageId) -> bool {
        self.active.as_ref().is_some_and(|a| a.message.id == *id) || self.queue.contains(id)
    }

    /// Starts the periodic health check.
    pub fn start<T>(&mut self, now: DateTime<Utc>, timers: &mut T)
    where
        T: TimerService,
        T::Payload: From<CoachTimer>,
    {
        if let Some(id) = self.health_timer.take() {
            timers.cancel(id);
        }
        self.schedule_health_check(now, timers);
    }

    /// Cancels every coach timer and forgets the slot and queue without
    /// reporting a hide. Used when the scene is torn down.
    pub fn stop<T>(&mut self, timers: &mut T)
    where
        T: TimerService,
        T::Payload: From<CoachTimer>,
    {
        if let Some(id) = self.health_timer.take() {
            timers.cancel(id);
        }
        if let Some(active) = self.active.take() {
            timers.cancel(active.primary);
            timers.cancel(active.safety);
        }
        self.queue.clear();
        self.draining = false;
    }

    /// Offers a message to the scheduler.
    ///
    /// `Immediate` takes the slot right away when it is free, ahead of any
    /// queued message. It never interrupts a visible message: in that case
    /// it is deferred to the head of the queue.
    pub fn enqueue<T>(
        &mut self,
        message: TutorMessage,
        mode: EnqueueMode,
        now: DateTime<Utc>,
        timers: &mut T,
    ) -> EnqueueOutcome
    where
        T: TimerService,
        T::Payload: From<CoachTimer>,
    {
        if self.is_known(&message.id) {
            tracing::debug!(message = %message.id, "message already visible or queued");
            return EnqueueOutcome::Duplicate;
        }
        match mode {
            EnqueueMode::Immediate if self.active.is_none() && !self.draining => {
                self.show(message, now, timers);
                EnqueueOutcome::Shown
            }
            EnqueueMode::Immediate => {
                tracing::debug!(message = %message.id, "slot busy, deferring immediate message");
                self.queue.push(message, true);
                EnqueueOutcome::Deferred
            }
            EnqueueMode::Queued => {
                self.queue.push(message, false);
                EnqueueOutcome::Queued
            }
        }
    }

    /// Promotes the best queued message into the slot if the slot is free and
    /// no other drain is in flight. Returns the message that was shown.
    pub fn drain<T>(&mut self, now: DateTime<Utc>, timers: &mut T) -> Option<TutorMessage>
    where
        T: TimerService,
        T::Payload: From<CoachTimer>,
    {
        if self.draining || self.active.is_some() {
            return None;
        }
        self.draining = true;
        let shown = self
            .queue
            .pop_next()
            .map(|message| self.show(message, now, timers));
        self.draining = false;
        shown
    }

    /// Clears the slot and cancels both dismiss timers. Safe to call when
    /// nothing is visible.
    pub fn hide<T>(&mut self, reason: HideReason, timers: &mut T) -> Option<HiddenMessage>
    where
        T: TimerService,
        T::Payload: From<CoachTimer>,
    {
        let active = self.active.take()?;
        timers.cancel(active.primary);
        timers.cancel(active.safety);
        tracing::debug!(message = %active.message.id, ?reason, "tutor message hidden");
        Some(HiddenMessage {
            message: active.message,
            reason,
        })
    }

    /// Drops every queued message. The visible message is untouched.
    pub fn clear_queue(&mut self) {
        self.queue.clear();
    }

    /// Handles a fired coach timer. Returns the message hidden as a result.
    pub fn on_timer<T>(
        &mut self,
        timer: CoachTimer,
        now: DateTime<Utc>,
        timers: &mut T,
    ) -> Option<HiddenMessage>
    where
        T: TimerService,
        T::Payload: From<CoachTimer>,
    {
        match timer {
            CoachTimer::PrimaryDismiss { ticket } => {
                if self.active_ticket() != Some(ticket) {
                    return None;
                }
                self.hide(HideReason::Expired, timers)
            }
            CoachTimer::SafetyDismiss { ticket } => {
                if self.active_ticket() != Some(ticket) {
                    return None;
                }
                tracing::warn!(
                    message = ?self.active.as_ref().map(|a| a.message.id.clone()),
                    "primary dismiss did not run, safety timer clearing tutor message"
                );
                self.hide(HideReason::SafetyTimeout, timers)
            }
            CoachTimer::HealthCheck => {
                self.health_timer = None;
                let healed = self.check_health(now, timers);
                self.schedule_health_check(now, timers);
                healed
            }
        }
    }

    /// Force-hides a message that is still visible after its expected hide
    /// time plus the stale margin while neither of its timers is pending.
    pub fn check_health<T>(&mut self, now: DateTime<Utc>, timers: &mut T) -> Option<HiddenMessage>
    where
        T: TimerService,
        T::Payload: From<CoachTimer>,
    {
        let active = self.active.as_ref()?;
        if timers.is_pending(active.primary) || timers.is_pending(active.safety) {
            return None;
        }
        let stale_at = active
            .expected_hide_at
            .checked_add_signed(millis(self.config.stale_margin_ms))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        if now < stale_at {
            return None;
        }
        tracing::warn!(
            message = %active.message.id,
            expected_hide_at = %active.expected_hide_at,
            "tutor slot occupied with no pending dismiss timer, force-hiding"
        );
        self.hide(HideReason::SelfHealed, timers)
    }

    fn active_ticket(&self) -> Option<u64> {
        self.active.as_ref().map(|a| a.ticket)
    }

    fn show<T>(&mut self, message: TutorMessage, now: DateTime<Utc>, timers: &mut T) -> TutorMessage
    where
        T: TimerService,
        T::Payload: From<CoachTimer>,
    {
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        let duration = millis(message.duration_ms);
        let slack = millis(self.config.safety_slack_ms);
        let primary =
            timers.schedule_after(now, duration, CoachTimer::PrimaryDismiss { ticket }.into());
        let safety = timers.schedule_after(
            now,
            duration.checked_add(&slack).unwrap_or(TimeDelta::MAX),
            CoachTimer::SafetyDismiss { ticket }.into(),
        );
        tracing::info!(
            message = %message.id,
            priority = message.priority,
            duration_ms = message.duration_ms,
            "tutor message shown"
        );
        let expected_hide_at = now
            .checked_add_signed(duration)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.active = Some(ActiveMessage {
            message: message.clone(),
            ticket,
            shown_at: now,
            expected_hide_at,
            primary,
            safety,
        });
        message
    }

    fn schedule_health_check<T>(&mut self, now: DateTime<Utc>, timers: &mut T)
    where
        T: TimerService,
        T::Payload: From<CoachTimer>,
    {
        if self.config.health_check_interval_ms == 0 {
            return;
        }
        let interval = millis(self.config.health_check_interval_ms);
        let Some(deadline) = now.checked_add_signed(interval) else {
            tracing::warn!(%now, "health check falls past the end of time, not rescheduled");
            return;
        };
        self.health_timer = Some(timers.schedule_at(deadline, CoachTimer::HealthCheck.into()));
    }
}
