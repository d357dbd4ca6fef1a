//! Sprout CLI: headless driver for scene definitions.
//!
//! Used to check authored scenes, replay recorded sessions deterministically,
//! and drive a scene by hand without a renderer.

pub mod args;
pub mod config;
pub mod driver;
pub mod error;
pub mod play;
pub mod replay;
pub mod script;

use std::io::Write;

use chrono::Utc;
use sprout_scene::domain::definition::SceneDefinition;

use crate::args::Command;
use crate::config::DriverConfig;
use crate::driver::{DefinitionSummary, Driver};
use crate::error::{CliError, read_file};
use crate::script::ReplayScript;

/// Runs one command, writing its output to `out`.
///
/// # Errors
///
/// Returns the first failure; nothing is retried.
pub fn run(command: &Command, config: DriverConfig, out: &mut impl Write) -> Result<(), CliError> {
    match command {
        Command::Validate { scene } => {
            let definition = SceneDefinition::from_yaml(&read_file(scene)?)?;
            writeln!(
                out,
                "{}",
                serde_json::to_string(&DefinitionSummary::of(&definition))?
            )?;
        }
        Command::Inspect { scene } => {
            let driver = Driver::load(config, scene)?;
            writeln!(out, "{}", serde_json::to_string_pretty(&driver.inspect()?)?)?;
        }
        Command::Replay { scene, script } => {
            let script = ReplayScript::from_yaml(&read_file(script)?)?;
            let driver = Driver::load(config, scene)?;
            let report = replay::replay(&driver, &script, Utc::now())?;
            for signal in &report.signals {
                writeln!(out, "{}", serde_json::to_string(signal)?)?;
            }
            writeln!(
                out,
                "{}",
                serde_json::to_string(&serde_json::json!({ "summary": report.summary }))?
            )?;
        }
        Command::Play { scene } => {
            let driver = Driver::load(config, scene)?;
            play::play(&driver, out)?;
        }
    }
    Ok(())
}
