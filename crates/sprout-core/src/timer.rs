//! Timer service abstraction.
//!
//! Timers carry a typed payload instead of a callback. The owner asks for the
//! timers that are due at the current clock reading and dispatches each payload
//! itself, so every mutation still happens inside a single `&mut self` call.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, TimeDelta, Utc};

/// Handle for a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// Schedules and cancels delayed payloads.
pub trait TimerService {
    /// The value delivered when a timer fires.
    type Payload;

    /// Schedule `payload` to become due at `deadline`.
    fn schedule_at(&mut self, deadline: DateTime<Utc>, payload: Self::Payload) -> TimerId;

    /// Cancel a pending timer. Returns whether it was still pending.
    fn cancel(&mut self, id: TimerId) -> bool;

    /// Returns whether `id` is scheduled and has not fired or been cancelled.
    fn is_pending(&self, id: TimerId) -> bool;

    /// Cancel every pending timer. Returns how many were cancelled.
    fn cancel_all(&mut self) -> usize;

    /// The earliest pending deadline.
    fn next_deadline(&self) -> Option<DateTime<Utc>>;

    /// Remove and return the earliest timer due at or before `now`. Timers
    /// with the same deadline come out in scheduling order.
    fn pop_due(&mut self, now: DateTime<Utc>) -> Option<(TimerId, Self::Payload)>;

    /// Schedule `payload` to become due `delay` after `now`.
    fn schedule_after(
        &mut self,
        now: DateTime<Utc>,
        delay: TimeDelta,
        payload: Self::Payload,
    ) -> TimerId {
        let deadline = now.checked_add_signed(delay).unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.schedule_at(deadline, payload)
    }
}

/// Converts a configured millisecond count into a `TimeDelta`.
#[must_use]
pub fn millis(ms: u64) -> TimeDelta {
    i64::try_from(ms)
        .ok()
        .and_then(TimeDelta::try_milliseconds)
        .unwrap_or(TimeDelta::MAX)
}

/// Deterministic in-memory timer queue ordered by deadline, then by id.
#[derive(Debug)]
pub struct TimerQueue<P> {
    next_id: u64,
    by_deadline: BTreeMap<(DateTime<Utc>, TimerId), P>,
    deadlines: HashMap<TimerId, DateTime<Utc>>,
}

impl<P> TimerQueue<P> {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: 0,
            by_deadline: BTreeMap::new(),
            deadlines: HashMap::new(),
        }
    }

    /// Number of pending timers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    /// Returns true if no timer is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }

    /// Iterates pending payloads in firing order.
    pub fn pending(&self) -> impl Iterator<Item = (DateTime<Utc>, &P)> {
        self.by_deadline
            .iter()
            .map(|((deadline, _), payload)| (*deadline, payload))
    }
}

impl<P> Default for TimerQueue<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> TimerService for TimerQueue<P> {
    type Payload = P;

    fn schedule_at(&mut self, deadline: DateTime<Utc>, payload: P) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        self.by_deadline.insert((deadline, id), payload);
        self.deadlines.insert(id, deadline);
        id
    }

    fn cancel(&mut self, id: TimerId) -> bool {
        match self.deadlines.remove(&id) {
            Some(deadline) => self.by_deadline.remove(&(deadline, id)).is_some(),
            None => false,
        }
    }

    fn is_pending(&self, id: TimerId) -> bool {
        self.deadlines.contains_key(&id)
    }

    fn cancel_all(&mut self) -> usize {
        let cancelled = self.deadlines.len();
        self.deadlines.clear();
        self.by_deadline.clear();
        cancelled
    }

    fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.by_deadline.keys().next().map(|(deadline, _)| *deadline)
    }

    fn pop_due(&mut self, now: DateTime<Utc>) -> Option<(TimerId, P)> {
        let (deadline, id) = *self.by_deadline.keys().next()?;
        if deadline > now {
            return None;
        }
        self.deadlines.remove(&id);
        self.by_deadline
            .remove(&(deadline, id))
            .map(|payload| (id, payload))
    }
}
