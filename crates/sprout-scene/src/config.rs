//! Engine timing configuration.

use serde::{Deserialize, Serialize};
use sprout_coach::CoachConfig;

/// Timing knobs for a [`SceneEngine`](crate::application::engine::SceneEngine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Length of the discovery animation before the info popup opens.
    pub discovery_animation_ms: u64,
    /// Length of the highlight animation before the reward card opens.
    pub highlight_animation_ms: u64,
    /// Delay after a resume before cue triggers are evaluated again.
    pub reconcile_settle_ms: u64,
    /// Tutor scheduler timing.
    pub coach: CoachConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            discovery_animation_ms: 1_500,
            highlight_animation_ms: 1_200,
            reconcile_settle_ms: 300,
            coach: CoachConfig::default(),
        }
    }
}
