//! Test stores: mock `SnapshotStore` and `CompletionStore` implementations.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use sprout_core::error::DomainError;
use sprout_core::key::{ProfileId, SceneId, SceneKey, ZoneId};
use sprout_core::snapshot::{CompletionRecord, StoredSnapshot};
use sprout_core::store::{CompletionStore, SnapshotStore};
use uuid::Uuid;

/// Key used by most tests: nil profile, `garden` zone, `meadow` scene.
#[must_use]
pub fn scene_key() -> SceneKey {
    SceneKey::new(
        ProfileId(Uuid::nil()),
        ZoneId::new("garden"),
        SceneId::new("meadow"),
    )
}

/// A snapshot store that keeps the latest snapshot per key and records every
/// `save` call.
#[derive(Debug, Default)]
pub struct RecordingSnapshotStore {
    latest: Mutex<HashMap<SceneKey, StoredSnapshot>>,
    saved: Mutex<Vec<StoredSnapshot>>,
    markers: Mutex<HashSet<SceneKey>>,
    marker_takes: Mutex<usize>,
}

impl RecordingSnapshotStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with `snapshot`, as if written by an earlier
    /// run. Seeding is not recorded as a save.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn with_snapshot(snapshot: StoredSnapshot) -> Self {
        let store = Self::default();
        store
            .latest
            .lock()
            .unwrap()
            .insert(snapshot.key.clone(), snapshot);
        store
    }

    /// Returns every snapshot passed to `save`, oldest first.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn saved(&self) -> Vec<StoredSnapshot> {
        self.saved.lock().unwrap().clone()
    }

    /// Returns the snapshot currently stored for `key`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn latest(&self, key: &SceneKey) -> Option<StoredSnapshot> {
        self.latest.lock().unwrap().get(key).cloned()
    }

    /// Returns whether a restart marker is currently set for `key`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn has_restart_marker(&self, key: &SceneKey) -> bool {
        self.markers.lock().unwrap().contains(key)
    }

    /// Number of `take_restart_marker` calls that found a marker.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn marker_takes(&self) -> usize {
        *self.marker_takes.lock().unwrap()
    }
}

impl SnapshotStore for RecordingSnapshotStore {
    fn load(&self, key: &SceneKey) -> Result<Option<StoredSnapshot>, DomainError> {
        Ok(self.latest.lock().unwrap().get(key).cloned())
    }

    fn save(&self, snapshot: &StoredSnapshot) -> Result<(), DomainError> {
        self.latest
            .lock()
            .unwrap()
            .insert(snapshot.key.clone(), snapshot.clone());
        self.saved.lock().unwrap().push(snapshot.clone());
        Ok(())
    }

    fn delete(&self, key: &SceneKey) -> Result<(), DomainError> {
        self.latest.lock().unwrap().remove(key);
        Ok(())
    }

    fn set_restart_marker(&self, key: &SceneKey) -> Result<(), DomainError> {
        self.markers.lock().unwrap().insert(key.clone());
        Ok(())
    }

    fn take_restart_marker(&self, key: &SceneKey) -> Result<bool, DomainError> {
        let taken = self.markers.lock().unwrap().remove(key);
        if taken {
            *self.marker_takes.lock().unwrap() += 1;
        }
        Ok(taken)
    }
}

/// A snapshot store that always returns an infrastructure error.
#[derive(Debug)]
pub struct FailingSnapshotStore;

impl SnapshotStore for FailingSnapshotStore {
    fn load(&self, _key: &SceneKey) -> Result<Option<StoredSnapshot>, DomainError> {
        Err(DomainError::Infrastructure("disk unavailable".into()))
    }

    fn save(&self, _snapshot: &StoredSnapshot) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("disk unavailable".into()))
    }

    fn delete(&self, _key: &SceneKey) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("disk unavailable".into()))
    }

    fn set_restart_marker(&self, _key: &SceneKey) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("disk unavailable".into()))
    }

    fn take_restart_marker(&self, _key: &SceneKey) -> Result<bool, DomainError> {
        Err(DomainError::Infrastructure("disk unavailable".into()))
    }
}

/// A completion store that keeps records in memory and records every `save`.
#[derive(Debug, Default)]
pub struct RecordingCompletionStore {
    records: Mutex<HashMap<SceneKey, CompletionRecord>>,
    saves: Mutex<Vec<(SceneKey, CompletionRecord)>>,
}

impl RecordingCompletionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `record` for `key`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn with_record(key: SceneKey, record: CompletionRecord) -> Self {
        let store = Self::default();
        store.records.lock().unwrap().insert(key, record);
        store
    }

    /// Returns every `save` call, oldest first.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn saves(&self) -> Vec<(SceneKey, CompletionRecord)> {
        self.saves.lock().unwrap().clone()
    }
}

impl CompletionStore for RecordingCompletionStore {
    fn load(&self, key: &SceneKey) -> Result<Option<CompletionRecord>, DomainError> {
        Ok(self.records.lock().unwrap().get(key).cloned())
    }

    fn save(&self, key: &SceneKey, record: &CompletionRecord) -> Result<(), DomainError> {
        self.records
            .lock()
            .unwrap()
            .insert(key.clone(), record.clone());
        self.saves
            .lock()
            .unwrap()
            .push((key.clone(), record.clone()));
        Ok(())
    }
}

/// A completion store that always returns an infrastructure error.
#[derive(Debug)]
pub struct FailingCompletionStore;

impl CompletionStore for FailingCompletionStore {
    fn load(&self, _key: &SceneKey) -> Result<Option<CompletionRecord>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    fn save(&self, _key: &SceneKey, _record: &CompletionRecord) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}
