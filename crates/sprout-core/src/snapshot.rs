//! Persisted record envelopes.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::DomainError;
use crate::key::SceneKey;

/// Current layout version of [`StoredSnapshot`] payloads.
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// Stored representation of a scene session snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSnapshot {
    /// The scene this snapshot belongs to.
    pub key: SceneKey,
    /// Layout version of `payload`.
    pub schema_version: u32,
    /// Serialized session.
    pub payload: serde_json::Value,
    /// SHA-256 of the canonical payload text, lowercase hex.
    pub checksum: String,
    /// When the snapshot was written.
    pub saved_at: DateTime<Utc>,
}

impl StoredSnapshot {
    /// Wraps a serialized session, computing its checksum.
    #[must_use]
    pub fn seal(key: SceneKey, payload: serde_json::Value, saved_at: DateTime<Utc>) -> Self {
        let checksum = checksum_of(&payload);
        Self {
            key,
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            payload,
            checksum,
            saved_at,
        }
    }

    /// Checks the schema version and payload checksum.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::SnapshotCorrupt` if either check fails.
    pub fn verify(&self) -> Result<(), DomainError> {
        if self.schema_version != SNAPSHOT_SCHEMA_VERSION {
            return Err(DomainError::SnapshotCorrupt {
                key: self.key.to_string(),
                reason: format!(
                    "unsupported schema version {} (expected {SNAPSHOT_SCHEMA_VERSION})",
                    self.schema_version
                ),
            });
        }
        let actual = checksum_of(&self.payload);
        if actual != self.checksum {
            return Err(DomainError::SnapshotCorrupt {
                key: self.key.to_string(),
                reason: format!("checksum mismatch: stored {}, computed {actual}", self.checksum),
            });
        }
        Ok(())
    }
}

/// Permanent record of a finished scene. Distinct from the transient snapshot:
/// it survives replays and is written at most once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecord {
    /// Whether the scene was completed.
    pub completed: bool,
    /// Stars awarded for the scene.
    pub stars_earned: u32,
    /// Items unlocked during the scene.
    pub items_unlocked: Vec<String>,
    /// When the scene was completed.
    pub completed_at: DateTime<Utc>,
}

// `serde_json::Value` objects are backed by a sorted map, so the text form is
// canonical.
fn checksum_of(payload: &serde_json::Value) -> String {
    let digest = Sha256::digest(payload.to_string().as_bytes());
    digest.iter().fold(String::with_capacity(64), |mut out, byte| {
        let _ = write!(out, "{byte:02x}");
        out
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{ProfileId, SceneId, ZoneId};
    use chrono::TimeZone;
    use uuid::Uuid;

    fn key() -> SceneKey {
        SceneKey::new(
            ProfileId(Uuid::nil()),
            ZoneId::new("garden"),
            SceneId::new("pond"),
        )
    }

    #[test]
    fn test_sealed_snapshot_verifies() {
        // Arrange
        let saved_at = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();
        let snapshot = StoredSnapshot::seal(
            key(),
            serde_json::json!({ "phase": "collecting", "stars": 0 }),
            saved_at,
        );

        // Act / Assert
        assert_eq!(snapshot.checksum.len(), 64);
        assert!(snapshot.verify().is_ok());
    }

    #[test]
    fn test_tampered_payload_fails_verification() {
        // Arrange
        let saved_at = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();
        let mut snapshot =
            StoredSnapshot::seal(key(), serde_json::json!({ "stars": 0 }), saved_at);
        snapshot.payload = serde_json::json!({ "stars": 3 });

        // Act
        let result = snapshot.verify();

        // Assert
        match result {
            Err(DomainError::SnapshotCorrupt { key, reason }) => {
                assert_eq!(key, self::key().to_string());
                assert!(reason.contains("checksum mismatch"));
            }
            other => panic!("expected SnapshotCorrupt, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_schema_version_fails_verification() {
        let saved_at = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();
        let mut snapshot = StoredSnapshot::seal(key(), serde_json::json!({}), saved_at);
        snapshot.schema_version = 99;

        assert!(matches!(
            snapshot.verify(),
            Err(DomainError::SnapshotCorrupt { .. })
        ));
    }
}
