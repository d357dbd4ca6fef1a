//! Wall time, injected so scenes and timers run the same under test.

use chrono::{DateTime, TimeDelta, Utc};

/// Source of the current time for a scene.
pub trait Clock: Send + Sync {
    /// The current time.
    fn now(&self) -> DateTime<Utc>;

    /// Time left until `deadline`; zero once it has passed.
    fn until(&self, deadline: DateTime<Utc>) -> TimeDelta {
        (deadline - self.now()).max(TimeDelta::zero())
    }
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
