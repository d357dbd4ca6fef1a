//! In-process store implementations.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use sprout_core::error::DomainError;
use sprout_core::key::SceneKey;
use sprout_core::snapshot::{CompletionRecord, StoredSnapshot};
use sprout_core::store::{CompletionStore, SnapshotStore};

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, DomainError> {
    mutex
        .lock()
        .map_err(|_| DomainError::Infrastructure("store lock poisoned".into()))
}

/// Snapshot store that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    snapshots: Mutex<HashMap<SceneKey, StoredSnapshot>>,
    markers: Mutex<HashSet<SceneKey>>,
}

impl MemorySnapshotStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self, key: &SceneKey) -> Result<Option<StoredSnapshot>, DomainError> {
        Ok(lock(&self.snapshots)?.get(key).cloned())
    }

    fn save(&self, snapshot: &StoredSnapshot) -> Result<(), DomainError> {
        lock(&self.snapshots)?.insert(snapshot.key.clone(), snapshot.clone());
        Ok(())
    }

    fn delete(&self, key: &SceneKey) -> Result<(), DomainError> {
        lock(&self.snapshots)?.remove(key);
        Ok(())
    }

    fn set_restart_marker(&self, key: &SceneKey) -> Result<(), DomainError> {
        lock(&self.markers)?.insert(key.clone());
        Ok(())
    }

    fn take_restart_marker(&self, key: &SceneKey) -> Result<bool, DomainError> {
        Ok(lock(&self.markers)?.remove(key))
    }
}

/// Completion store that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryCompletionStore {
    records: Mutex<HashMap<SceneKey, CompletionRecord>>,
}

impl MemoryCompletionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CompletionStore for MemoryCompletionStore {
    fn load(&self, key: &SceneKey) -> Result<Option<CompletionRecord>, DomainError> {
        Ok(lock(&self.records)?.get(key).cloned())
    }

    fn save(&self, key: &SceneKey, record: &CompletionRecord) -> Result<(), DomainError> {
        lock(&self.records)?.insert(key.clone(), record.clone());
        Ok(())
    }
}
