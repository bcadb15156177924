//! TidySleuth — desktop file-system maintenance.
//!
//! Thin binary entry point. All logic lives in the `tidysleuth-core`
//! and `tidysleuth-cli` crates.

use clap::Parser;
use std::process::ExitCode;

fn main() -> anyhow::Result<ExitCode> {
    let cli = tidysleuth_cli::Cli::parse();

    // Initialise structured logging.
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_target(false)
        .init();

    tracing::debug!("TidySleuth starting");

    let status = tidysleuth_cli::run(&cli)?;
    Ok(status.exit_code())
}
