//! Store abstractions for scene snapshots and permanent completion records.
//!
//! Both traits are synchronous: the engine persists inside the same call that
//! mutated the session, so a reload always observes the last mutation.

use crate::error::DomainError;
use crate::key::SceneKey;
use crate::snapshot::{CompletionRecord, StoredSnapshot};

/// Store for transient scene snapshots and the one-shot restart marker.
pub trait SnapshotStore: Send + Sync {
    /// Load the snapshot for a scene. Returns `Ok(None)` for a fresh session.
    fn load(&self, key: &SceneKey) -> Result<Option<StoredSnapshot>, DomainError>;

    /// Write (replace) the snapshot for `snapshot.key`.
    fn save(&self, snapshot: &StoredSnapshot) -> Result<(), DomainError>;

    /// Remove the snapshot for a scene. Removing a missing snapshot succeeds.
    fn delete(&self, key: &SceneKey) -> Result<(), DomainError>;

    /// Record that the player asked to replay the scene from scratch.
    fn set_restart_marker(&self, key: &SceneKey) -> Result<(), DomainError>;

    /// Consume the restart marker. Returns whether it was present; a second
    /// call without an intervening `set_restart_marker` returns `false`.
    fn take_restart_marker(&self, key: &SceneKey) -> Result<bool, DomainError>;
}

/// Store for permanent completion records.
pub trait CompletionStore: Send + Sync {
    /// Load the completion record for a scene, if one was written.
    fn load(&self, key: &SceneKey) -> Result<Option<CompletionRecord>, DomainError>;

    /// Write the completion record for a scene. Callers check `load` first.
    fn save(&self, key: &SceneKey, record: &CompletionRecord) -> Result<(), DomainError>;
}
