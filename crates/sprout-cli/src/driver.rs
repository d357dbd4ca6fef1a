//! Scene loading and store wiring shared by every command.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use sprout_core::clock::Clock;
use sprout_core::key::SceneKey;
use sprout_core::snapshot::{CompletionRecord, StoredSnapshot};
use sprout_core::store::{CompletionStore, SnapshotStore};
use sprout_scene::application::engine::{SceneEngine, SceneServices};
use sprout_scene::domain::definition::SceneDefinition;
use sprout_store::json_file::{JsonFileCompletionStore, JsonFileSnapshotStore};
use sprout_store::memory::{MemoryCompletionStore, MemorySnapshotStore};

use crate::config::DriverConfig;
use crate::error::{CliError, read_file};

/// A loaded scene definition bound to its stores.
pub struct Driver {
    /// Resolved configuration.
    pub config: DriverConfig,
    /// The scene being driven.
    pub definition: Arc<SceneDefinition>,
    /// Where its records live.
    pub key: SceneKey,
    snapshots: Arc<dyn SnapshotStore>,
    completions: Arc<dyn CompletionStore>,
}

impl Driver {
    /// Loads the definition at `scene` and opens the configured stores.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or the definition is invalid.
    pub fn load(config: DriverConfig, scene: &Path) -> Result<Self, CliError> {
        let definition = SceneDefinition::from_yaml(&read_file(scene)?)?;
        let key = SceneKey::new(
            config.profile,
            definition.zone.clone(),
            definition.scene.clone(),
        );
        let snapshots: Arc<dyn SnapshotStore>;
        let completions: Arc<dyn CompletionStore>;
        if config.memory {
            snapshots = Arc::new(MemorySnapshotStore::new());
            completions = Arc::new(MemoryCompletionStore::new());
        } else {
            snapshots = Arc::new(JsonFileSnapshotStore::new(&config.data_dir));
            completions = Arc::new(JsonFileCompletionStore::new(&config.data_dir));
        }
        tracing::info!(
            %key,
            memory = config.memory,
            data_dir = %config.data_dir.display(),
            "scene loaded"
        );
        Ok(Self {
            config,
            definition: Arc::new(definition),
            key,
            snapshots,
            completions,
        })
    }

    /// Opens a live engine on `clock`, resuming whatever the stores hold.
    ///
    /// # Errors
    ///
    /// Propagates `SceneEngine::open` failures.
    pub fn open(&self, clock: Arc<dyn Clock>) -> Result<SceneEngine, CliError> {
        let services = SceneServices::new(clock, self.snapshots.clone(), self.completions.clone());
        Ok(SceneEngine::open(
            self.key.clone(),
            self.definition.clone(),
            services,
            self.config.engine.clone(),
        )?)
    }

    /// Reads back what the stores hold for this scene.
    ///
    /// # Errors
    ///
    /// Propagates store read failures.
    pub fn inspect(&self) -> Result<Inspection, CliError> {
        let snapshot = self.snapshots.load(&self.key)?;
        let verified = snapshot.as_ref().map(|s| s.verify().is_ok());
        Ok(Inspection {
            key: self.key.clone(),
            verified,
            snapshot,
            completion: self.completions.load(&self.key)?,
        })
    }
}

/// Output of `sprout inspect`.
#[derive(Debug, Serialize)]
pub struct Inspection {
    /// The scene.
    pub key: SceneKey,
    /// Whether the snapshot passed its integrity check, if there is one.
    pub verified: Option<bool>,
    /// The stored snapshot.
    pub snapshot: Option<StoredSnapshot>,
    /// The permanent completion record.
    pub completion: Option<CompletionRecord>,
}

/// Summary line printed after a definition validates.
#[derive(Debug, Serialize)]
pub struct DefinitionSummary<'a> {
    /// Zone id.
    pub zone: &'a str,
    /// Scene id.
    pub scene: &'a str,
    /// Phases in order.
    pub phases: Vec<String>,
    /// Number of items across all phases.
    pub items: usize,
    /// Number of tutor cues.
    pub cues: usize,
}

impl<'a> DefinitionSummary<'a> {
    /// Summarizes `definition`.
    #[must_use]
    pub fn of(definition: &'a SceneDefinition) -> Self {
        Self {
            zone: definition.zone.as_str(),
            scene: definition.scene.as_str(),
            phases: definition
                .phases
                .iter()
                .map(|p| p.phase.to_string())
                .collect(),
            items: definition.items().count(),
            cues: definition.cues.len(),
        }
    }
}
