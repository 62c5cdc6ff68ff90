//! CLI module for Fresco.
//!
//! This module provides command-line interface functionality for interacting
//! with the Fresco daemon over its control socket. Commands fail fast when
//! the daemon is not running.

mod commands;
mod output;

use clap::Parser;
pub use commands::Cli;

use crate::error::FrescoError;

/// Runs the CLI.
///
/// Parses command-line arguments and executes the appropriate command.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn run() -> Result<(), FrescoError> {
    let cli = Cli::parse();
    cli.execute()
}
