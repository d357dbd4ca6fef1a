//! Inputs the renderer sends to a scene.

use serde::{Deserialize, Serialize};

use super::definition::{ItemId, SlotId};

/// How the player interacted with an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InteractionKind {
    /// Tap on the item.
    Tap,
    /// Gather one unit of the item.
    Collect,
    /// Drop the item into a slot.
    Place {
        /// Slot the item was dropped on.
        slot: SlotId,
    },
}

/// A player interaction with an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionEvent {
    /// The item interacted with.
    pub target: ItemId,
    /// What the player did.
    #[serde(flatten)]
    pub kind: InteractionKind,
}

impl InteractionEvent {
    /// A tap on `target`.
    #[must_use]
    pub fn tap(target: impl Into<String>) -> Self {
        Self {
            target: ItemId::new(target),
            kind: InteractionKind::Tap,
        }
    }

    /// One collect of `target`.
    #[must_use]
    pub fn collect(target: impl Into<String>) -> Self {
        Self {
            target: ItemId::new(target),
            kind: InteractionKind::Collect,
        }
    }

    /// `target` dropped on `slot`.
    #[must_use]
    pub fn place(target: impl Into<String>, slot: impl Into<String>) -> Self {
        Self {
            target: ItemId::new(target),
            kind: InteractionKind::Place {
                slot: SlotId::new(slot),
            },
        }
    }
}

/// Everything the renderer can ask a scene to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "input", rename_all = "snake_case")]
pub enum SceneInput {
    /// The player touched an item.
    Interact(InteractionEvent),
    /// The player closed the open popup.
    ClosePopup,
    /// The player dismissed the tutor message.
    CloseTutor,
    /// The player confirmed the completion screen.
    ConfirmCompletion,
    /// The player asked to replay the scene from the start.
    RequestRestart,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interaction_decodes_from_flat_json() {
        // Arrange
        let line = r#"{"input":"interact","target":"seed","kind":"place","slot":"soil"}"#;

        // Act
        let input: SceneInput = serde_json::from_str(line).unwrap();

        // Assert
        assert_eq!(input, SceneInput::Interact(InteractionEvent::place("seed", "soil")));
    }

    #[test]
    fn test_unit_inputs_decode_by_tag() {
        let input: SceneInput = serde_json::from_str(r#"{"input":"close_popup"}"#).unwrap();

        assert_eq!(input, SceneInput::ClosePopup);
    }
}
