//! `sprout` entry point.

use std::io;
use std::process::ExitCode;

use sprout_cli::args::{Invocation, parse_args, usage_text};
use sprout_cli::config::DriverConfig;
use sprout_cli::error::CliError;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    // Signals own stdout, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .json()
        .init();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Usage(message)) => {
            eprintln!("{message}");
            ExitCode::from(2)
        }
        Err(error) => {
            tracing::error!(%error, "sprout failed");
            eprintln!("{error}");
            ExitCode::from(1)
        }
    }
}

fn run_cli() -> Result<(), CliError> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let (command, flags) = match parse_args(&args)? {
        Invocation::Help => {
            println!("{}", usage_text());
            return Ok(());
        }
        Invocation::Run { command, flags } => (command, flags),
    };
    let mut config = DriverConfig::from_env()?;
    flags.apply(&mut config)?;
    sprout_cli::run(&command, config, &mut io::stdout().lock())
}
