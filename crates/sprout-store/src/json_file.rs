//! JSON file implementations of the store traits.
//!
//! Layout under the data directory:
//!
//! ```text
//! snapshots/<profile>/<zone>/<scene>.json
//! snapshots/<profile>/<zone>/<scene>.restart
//! completions/<profile>/<zone>/<scene>.json
//! ```

use std::path::{Path, PathBuf};

use sprout_core::error::DomainError;
use sprout_core::key::SceneKey;
use sprout_core::snapshot::{CompletionRecord, StoredSnapshot};
use sprout_core::store::{CompletionStore, SnapshotStore};

use crate::atomic_io::{read_if_exists, remove_if_exists, write_bytes_atomic};

fn scene_path(root: &Path, key: &SceneKey, extension: &str) -> Result<PathBuf, DomainError> {
    if !key.is_path_safe() {
        return Err(DomainError::Validation(format!(
            "scene key {key} cannot be used as a file path"
        )));
    }
    Ok(root
        .join(key.profile_id.to_string())
        .join(key.zone_id.as_str())
        .join(format!("{}.{extension}", key.scene_id)))
}

fn io_error(action: &str, path: &Path, err: &std::io::Error) -> DomainError {
    DomainError::Infrastructure(format!("failed to {action} {}: {err}", path.display()))
}

/// Snapshot store backed by one JSON file per scene.
#[derive(Debug, Clone)]
pub struct JsonFileSnapshotStore {
    root: PathBuf,
}

impl JsonFileSnapshotStore {
    /// Creates a store rooted at `<data_dir>/snapshots`.
    #[must_use]
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            root: data_dir.as_ref().join("snapshots"),
        }
    }

    /// Path of the snapshot file for `key`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the key is not path-safe.
    pub fn snapshot_path(&self, key: &SceneKey) -> Result<PathBuf, DomainError> {
        scene_path(&self.root, key, "json")
    }

    fn marker_path(&self, key: &SceneKey) -> Result<PathBuf, DomainError> {
        scene_path(&self.root, key, "restart")
    }
}

impl SnapshotStore for JsonFileSnapshotStore {
    fn load(&self, key: &SceneKey) -> Result<Option<StoredSnapshot>, DomainError> {
        let path = self.snapshot_path(key)?;
        let Some(bytes) = read_if_exists(&path).map_err(|e| io_error("read", &path, &e))? else {
            return Ok(None);
        };
        let snapshot: StoredSnapshot =
            serde_json::from_slice(&bytes).map_err(|e| DomainError::SnapshotCorrupt {
                key: key.to_string(),
                reason: format!("snapshot decoding failed: {e}"),
            })?;
        if snapshot.key != *key {
            return Err(DomainError::SnapshotCorrupt {
                key: key.to_string(),
                reason: format!("file holds snapshot for {}", snapshot.key),
            });
        }
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &StoredSnapshot) -> Result<(), DomainError> {
        let path = self.snapshot_path(&snapshot.key)?;
        let bytes = serde_json::to_vec_pretty(snapshot).map_err(|e| {
            DomainError::Infrastructure(format!("snapshot serialization failed: {e}"))
        })?;
        write_bytes_atomic(&path, &bytes).map_err(|e| io_error("write", &path, &e))?;
        tracing::debug!(path = %path.display(), "snapshot written");
        Ok(())
    }

    fn delete(&self, key: &SceneKey) -> Result<(), DomainError> {
        let path = self.snapshot_path(key)?;
        remove_if_exists(&path).map_err(|e| io_error("remove", &path, &e))?;
        Ok(())
    }

    fn set_restart_marker(&self, key: &SceneKey) -> Result<(), DomainError> {
        let path = self.marker_path(key)?;
        write_bytes_atomic(&path, b"restart").map_err(|e| io_error("write", &path, &e))
    }

    fn take_restart_marker(&self, key: &SceneKey) -> Result<bool, DomainError> {
        let path = self.marker_path(key)?;
        remove_if_exists(&path).map_err(|e| io_error("remove", &path, &e))
    }
}

/// Completion store backed by one JSON file per scene.
#[derive(Debug, Clone)]
pub struct JsonFileCompletionStore {
    root: PathBuf,
}

impl JsonFileCompletionStore {
    /// Creates a store rooted at `<data_dir>/completions`.
    #[must_use]
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            root: data_dir.as_ref().join("completions"),
        }
    }
}

impl CompletionStore for JsonFileCompletionStore {
    fn load(&self, key: &SceneKey) -> Result<Option<CompletionRecord>, DomainError> {
        let path = scene_path(&self.root, key, "json")?;
        let Some(bytes) = read_if_exists(&path).map_err(|e| io_error("read", &path, &e))? else {
            return Ok(None);
        };
        serde_json::from_slice(&bytes).map(Some).map_err(|e| {
            DomainError::Infrastructure(format!(
                "completion record {} is unreadable: {e}",
                path.display()
            ))
        })
    }

    fn save(&self, key: &SceneKey, record: &CompletionRecord) -> Result<(), DomainError> {
        let path = scene_path(&self.root, key, "json")?;
        let bytes = serde_json::to_vec_pretty(record).map_err(|e| {
            DomainError::Infrastructure(format!("completion serialization failed: {e}"))
        })?;
        write_bytes_atomic(&path, &bytes).map_err(|e| io_error("write", &path, &e))?;
        tracing::info!(%key, stars = record.stars_earned, "completion record written");
        Ok(())
    }
}
