use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a tutor message. Scene definitions use the same identifier
/// for the cue that produces the message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Creates a message identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A short advisory shown by the tutor. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TutorMessage {
    /// Message identifier.
    pub id: MessageId,
    /// Text shown (or narrated) to the player.
    pub text: String,
    /// How long the message stays visible.
    pub duration_ms: u64,
    /// Higher is more urgent.
    pub priority: i32,
    /// Tutor animation to play while the message is up.
    pub animation: Option<String>,
}

/// How a message enters the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnqueueMode {
    /// Wait in the priority queue.
    Queued,
    /// Show now if the slot is free; otherwise go to the head of the queue.
    Immediate,
}

/// Why a message left the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HideReason {
    /// The primary dismiss timer fired.
    Expired,
    /// The primary dismiss never ran and the safety timer fired instead.
    SafetyTimeout,
    /// The player closed it.
    Dismissed,
    /// An overlay took over the screen.
    Preempted,
    /// The health check found the slot stuck and cleared it.
    SelfHealed,
    /// The scene was reset or torn down.
    Reset,
}
