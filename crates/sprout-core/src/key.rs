//! Scene addressing.
//!
//! Every persisted record is keyed by the player profile, the zone of the
//! world map the scene lives in, and the scene itself.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a player profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(pub Uuid);

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier of a zone on the world map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(String);

impl ZoneId {
    /// Creates a zone identifier.
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

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a scene within a zone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SceneId(String);

impl SceneId {
    /// Creates a scene identifier.
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

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Composite key for every per-scene record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SceneKey {
    /// The player profile.
    pub profile_id: ProfileId,
    /// The zone containing the scene.
    pub zone_id: ZoneId,
    /// The scene.
    pub scene_id: SceneId,
}

impl SceneKey {
    /// Creates a scene key.
    #[must_use]
    pub fn new(profile_id: ProfileId, zone_id: ZoneId, scene_id: SceneId) -> Self {
        Self {
            profile_id,
            zone_id,
            scene_id,
        }
    }

    /// Returns true if the zone and scene ids are safe to use as single path
    /// segments (non-empty, no separators, no parent references).
    #[must_use]
    pub fn is_path_safe(&self) -> bool {
        [self.zone_id.as_str(), self.scene_id.as_str()]
            .iter()
            .all(|segment| {
                !segment.is_empty()
                    && *segment != "."
                    && *segment != ".."
                    && !segment.contains(['/', '\\', '\0'])
            })
    }
}

impl fmt::Display for SceneKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.profile_id, self.zone_id, self.scene_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(zone: &str, scene: &str) -> SceneKey {
        SceneKey::new(ProfileId(Uuid::nil()), ZoneId::new(zone), SceneId::new(scene))
    }

    #[test]
    fn test_display_joins_segments_with_slashes() {
        let key = key("garden", "pond");
        assert_eq!(
            key.to_string(),
            "00000000-0000-0000-0000-000000000000/garden/pond"
        );
    }

    #[test]
    fn test_is_path_safe_rejects_traversal_and_separators() {
        assert!(key("garden", "pond").is_path_safe());
        assert!(!key("..", "pond").is_path_safe());
        assert!(!key("garden", "a/b").is_path_safe());
        assert!(!key("", "pond").is_path_safe());
        assert!(!key("garden", "a\\b").is_path_safe());
    }
}
