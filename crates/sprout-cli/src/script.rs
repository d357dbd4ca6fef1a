//! Replay scripts.
//!
//! A script is a YAML list of steps run in order against a simulated clock:
//!
//! ```yaml
//! steps:
//!   - tap: acorn
//!   - wait_ms: 1500
//!   - close_popup
//!   - place: { item: seed, slot: soil }
//!   - reopen
//! ```

use serde::Deserialize;
use sprout_scene::domain::inputs::{InteractionEvent, SceneInput};

use crate::error::CliError;

/// One step of a replay.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptStep {
    /// Tap an item.
    Tap(String),
    /// Collect one of an item.
    Collect(String),
    /// Drop an item on a slot.
    Place {
        /// The item.
        item: String,
        /// The slot.
        slot: String,
    },
    /// Close the open popup.
    ClosePopup,
    /// Dismiss the tutor message.
    CloseTutor,
    /// Confirm the completion screen.
    ConfirmCompletion,
    /// Ask for a restart.
    RequestRestart,
    /// Advance the simulated clock and fire due timers.
    WaitMs(u64),
    /// Tear the scene down and open it again from its stores.
    Reopen,
}

impl ScriptStep {
    /// The renderer input this step stands for, if it is one.
    #[must_use]
    pub fn input(&self) -> Option<SceneInput> {
        Some(match self {
            Self::Tap(item) => SceneInput::Interact(InteractionEvent::tap(item.as_str())),
            Self::Collect(item) => SceneInput::Interact(InteractionEvent::collect(item.as_str())),
            Self::Place { item, slot } => {
                SceneInput::Interact(InteractionEvent::place(item.as_str(), slot.as_str()))
            }
            Self::ClosePopup => SceneInput::ClosePopup,
            Self::CloseTutor => SceneInput::CloseTutor,
            Self::ConfirmCompletion => SceneInput::ConfirmCompletion,
            Self::RequestRestart => SceneInput::RequestRestart,
            Self::WaitMs(_) | Self::Reopen => return None,
        })
    }
}

/// A parsed replay script.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReplayScript {
    /// Steps in order.
    #[serde(with = "serde_yaml::with::singleton_map_recursive")]
    pub steps: Vec<ScriptStep>,
}

impl ReplayScript {
    /// Parses a script from YAML.
    ///
    /// # Errors
    ///
    /// Returns `CliError::Parse` if the YAML does not describe a script.
    pub fn from_yaml(source: &str) -> Result<Self, CliError> {
        serde_yaml::from_str(source).map_err(|e| CliError::Parse(format!("replay script: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_mixes_unit_and_valued_steps() {
        // Arrange
        let source = "
steps:
  - tap: acorn
  - wait_ms: 1500
  - close_popup
  - place: { item: seed, slot: soil }
  - reopen
";

        // Act
        let script = ReplayScript::from_yaml(source).unwrap();

        // Assert
        assert_eq!(
            script.steps,
            vec![
                ScriptStep::Tap("acorn".into()),
                ScriptStep::WaitMs(1_500),
                ScriptStep::ClosePopup,
                ScriptStep::Place {
                    item: "seed".into(),
                    slot: "soil".into()
                },
                ScriptStep::Reopen,
            ]
        );
        assert_eq!(
            script.steps[3].input(),
            Some(SceneInput::Interact(InteractionEvent::place("seed", "soil")))
        );
        assert!(script.steps[1].input().is_none());
    }

    #[test]
    fn test_bundled_playthrough_parses() {
        // Arrange
        let source = include_str!("../../../demos/meadow-playthrough.yaml");

        // Act
        let script = ReplayScript::from_yaml(source).unwrap();

        // Assert
        assert_eq!(script.steps.first(), Some(&ScriptStep::Tap("acorn".into())));
        assert!(script.steps.contains(&ScriptStep::Reopen));
        assert_eq!(script.steps.last(), Some(&ScriptStep::ConfirmCompletion));
    }

    #[test]
    fn test_unknown_step_is_a_parse_error() {
        let result = ReplayScript::from_yaml("steps:\n  - dance: acorn\n");

        assert!(matches!(result, Err(CliError::Parse(m)) if m.contains("replay script")));
    }
}
