//! Signals a scene emits for the renderer and navigation.

use serde::{Deserialize, Serialize};
use sprout_coach::{HideReason, MessageId};
use sprout_core::key::SceneKey;

use super::definition::{ItemId, Phase};

/// What navigation receives when the player leaves a finished scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionSummary {
    /// The finished scene.
    pub key: SceneKey,
    /// Stars earned.
    pub stars: u32,
    /// Items unlocked in the scene.
    pub items_unlocked: Vec<ItemId>,
}

/// Outbound notification from a scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum SceneSignal {
    /// An input was ignored; the renderer plays its "not now" feedback.
    Nudge {
        /// Item the input was aimed at.
        target: Option<ItemId>,
    },
    /// An item was completed.
    ItemCompleted {
        /// The item.
        item: ItemId,
        /// Phase it belongs to.
        phase: Phase,
    },
    /// The scene moved to the next phase.
    PhaseAdvanced {
        /// Previous phase.
        from: Phase,
        /// New phase.
        to: Phase,
    },
    /// A tutor message became visible.
    TutorShown {
        /// The message.
        id: MessageId,
    },
    /// A tutor message left the screen.
    TutorHidden {
        /// The message.
        id: MessageId,
        /// Why.
        reason: HideReason,
    },
    /// The scene reached its terminal phase.
    SceneCompleted {
        /// Stars awarded.
        stars: u32,
    },
    /// The session was wiped back to its first phase.
    SceneReset,
    /// A replay was requested; navigation should reopen the scene.
    RestartRequested,
    /// The player is done with the scene.
    ExitScene(CompletionSummary),
}
