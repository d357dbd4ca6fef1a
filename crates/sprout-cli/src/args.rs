//! Command-line parsing.

use std::path::PathBuf;

use sprout_core::key::ProfileId;

use crate::config::{DriverConfig, load_engine_config, parse_profile};
use crate::error::CliError;

/// What the driver was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Parse and validate a scene definition.
    Validate {
        /// Scene definition file.
        scene: PathBuf,
    },
    /// Print the stored session and completion record of a scene.
    Inspect {
        /// Scene definition file.
        scene: PathBuf,
    },
    /// Run a scripted session against a simulated clock.
    Replay {
        /// Scene definition file.
        scene: PathBuf,
        /// Replay script file.
        script: PathBuf,
    },
    /// Run a scene in real time, reading inputs from stdin.
    Play {
        /// Scene definition file.
        scene: PathBuf,
    },
}

/// Global flags; each one overrides its environment variable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Flags {
    /// `--data-dir <path>`
    pub data_dir: Option<PathBuf>,
    /// `--profile <uuid>`
    pub profile: Option<ProfileId>,
    /// `--config <path>`
    pub config: Option<PathBuf>,
    /// `--memory`
    pub memory: bool,
}

impl Flags {
    /// Layers these flags over `config`.
    ///
    /// # Errors
    ///
    /// Fails if `--config` names a file that cannot be loaded.
    pub fn apply(&self, config: &mut DriverConfig) -> Result<(), CliError> {
        if let Some(dir) = &self.data_dir {
            config.data_dir.clone_from(dir);
        }
        if let Some(profile) = self.profile {
            config.profile = profile;
        }
        if let Some(path) = &self.config {
            config.engine = load_engine_config(path)?;
        }
        config.memory |= self.memory;
        Ok(())
    }
}

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// `-h` / `--help`
    Help,
    /// A command to run.
    Run {
        /// The command.
        command: Command,
        /// Global flags.
        flags: Flags,
    },
}

/// Parses the arguments after the program name.
///
/// # Errors
///
/// Returns `CliError::Usage` describing the first problem found.
pub fn parse_args(args: &[String]) -> Result<Invocation, CliError> {
    let usage = |message: String| CliError::Usage(message);
    if args.is_empty() {
        return Err(usage(usage_text()));
    }
    if args[0] == "-h" || args[0] == "--help" {
        return Ok(Invocation::Help);
    }

    let mut flags = Flags::default();
    let mut index = 0usize;
    while index < args.len() {
        let flag = args[index].as_str();
        let value = || {
            args.get(index + 1)
                .ok_or_else(|| usage(format!("missing value for {flag}")))
        };
        match flag {
            "--data-dir" => {
                flags.data_dir = Some(PathBuf::from(value()?));
                index += 2;
            }
            "--profile" => {
                flags.profile = Some(parse_profile(value()?)?);
                index += 2;
            }
            "--config" => {
                flags.config = Some(PathBuf::from(value()?));
                index += 2;
            }
            "--memory" => {
                flags.memory = true;
                index += 1;
            }
            _ => break,
        }
    }

    let name = args
        .get(index)
        .ok_or_else(|| usage("missing subcommand".to_string()))?
        .as_str();
    let rest = &args[(index + 1)..];
    let command = match (name, rest) {
        ("validate", [scene]) => Command::Validate {
            scene: scene.into(),
        },
        ("inspect", [scene]) => Command::Inspect {
            scene: scene.into(),
        },
        ("replay", [scene, script]) => Command::Replay {
            scene: scene.into(),
            script: script.into(),
        },
        ("play", [scene]) => Command::Play {
            scene: scene.into(),
        },
        ("validate" | "inspect" | "play", _) => {
            return Err(usage(format!("{name} takes exactly one scene file")));
        }
        ("replay", _) => {
            return Err(usage(
                "replay takes a scene file and a script file".to_string(),
            ));
        }
        (other, _) => return Err(usage(format!("unknown subcommand '{other}'"))),
    };
    Ok(Invocation::Run { command, flags })
}

/// Help text.
#[must_use]
pub fn usage_text() -> String {
    [
        "usage: sprout [flags] <command> [args]",
        "",
        "commands:",
        "  validate <scene.yaml>                 check a scene definition",
        "  inspect <scene.yaml>                  print the stored session and completion",
        "  replay <scene.yaml> <script.yaml>     run a scripted session on a simulated clock",
        "  play <scene.yaml>                     run in real time, JSON inputs on stdin",
        "",
        "flags:",
        "  --data-dir <path>   store directory (SPROUT_DATA_DIR, default ./sprout-data)",
        "  --profile <uuid>    player profile (SPROUT_PROFILE, default nil UUID)",
        "  --config <path>     engine timings YAML (SPROUT_CONFIG)",
        "  --memory            keep all state in memory",
        "",
        "logs go to stderr; set RUST_LOG to filter them",
    ]
    .join("\n")
}
