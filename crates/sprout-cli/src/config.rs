//! Driver configuration.
//!
//! Read from the environment first, then overridden by command-line flags:
//!
//! | Variable          | Default         | Meaning                                 |
//! |-------------------|-----------------|-----------------------------------------|
//! | `SPROUT_DATA_DIR` | `./sprout-data` | Root of the JSON file stores            |
//! | `SPROUT_PROFILE`  | nil UUID        | Player profile the scene is keyed under |
//! | `SPROUT_CONFIG`   | unset           | YAML file with engine timings           |

use std::path::{Path, PathBuf};

use sprout_core::key::ProfileId;
use sprout_scene::config::EngineConfig;
use uuid::Uuid;

use crate::error::{CliError, read_file};

const DEFAULT_DATA_DIR: &str = "./sprout-data";

/// Resolved settings for one driver run.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Where the JSON file stores live.
    pub data_dir: PathBuf,
    /// Profile the scene belongs to.
    pub profile: ProfileId,
    /// Keep all state in memory instead of on disk.
    pub memory: bool,
    /// Engine timings.
    pub engine: EngineConfig,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            profile: ProfileId(Uuid::nil()),
            memory: false,
            engine: EngineConfig::default(),
        }
    }
}

impl DriverConfig {
    /// Reads the process environment.
    ///
    /// # Errors
    ///
    /// See [`from_lookup`](Self::from_lookup).
    pub fn from_env() -> Result<Self, CliError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a configuration from a variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `CliError::Config` if the profile is not a UUID or the engine
    /// config file does not parse, and `CliError::Read` if it cannot be read.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CliError> {
        let mut config = Self::default();
        if let Some(dir) = lookup("SPROUT_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(profile) = lookup("SPROUT_PROFILE") {
            config.profile = parse_profile(&profile)?;
        }
        if let Some(path) = lookup("SPROUT_CONFIG") {
            config.engine = load_engine_config(Path::new(&path))?;
        }
        Ok(config)
    }
}

/// Parses a profile UUID.
///
/// # Errors
///
/// Returns `CliError::Config` if `value` is not a UUID.
pub fn parse_profile(value: &str) -> Result<ProfileId, CliError> {
    Uuid::parse_str(value)
        .map(ProfileId)
        .map_err(|e| CliError::Config(format!("profile must be a UUID: {e}")))
}

/// Loads engine timings from a YAML file. Missing keys keep their defaults.
///
/// # Errors
///
/// Returns `CliError::Read` if the file cannot be read and `CliError::Config`
/// if it does not parse.
pub fn load_engine_config(path: &Path) -> Result<EngineConfig, CliError> {
    let source = read_file(path)?;
    serde_yaml::from_str(&source)
        .map_err(|e| CliError::Config(format!("{}: {e}", path.display())))
}
