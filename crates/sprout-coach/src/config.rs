use serde::{Deserialize, Serialize};

/// Timing knobs for the [`Coach`](crate::Coach).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoachConfig {
    /// Extra time after a message's duration before the safety dismiss fires.
    pub safety_slack_ms: u64,
    /// Period of the self-healing health check. Zero disables the check.
    pub health_check_interval_ms: u64,
    /// How long past its expected hide time a message with no pending timers
    /// may stay visible before the health check force-hides it.
    pub stale_margin_ms: u64,
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            safety_slack_ms: 2_000,
            health_check_interval_ms: 5_000,
            stale_margin_ms: 1_000,
        }
    }
}
