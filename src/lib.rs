//! Core library entry for the `taskdeck` CLI.
//!
//! A task list client for a hosted row-store: filtering, optimistic
//! updates, change subscriptions, sessions and profiles. External
//! boundaries are port traits in [`ports`], wired together by
//! [`context::ServiceContext`].

pub mod adapters;
pub mod cassette;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod model;
pub mod ports;
pub mod profile;
pub mod session;
pub mod tasks;

use clap::Parser;

/// Run the CLI with the provided arguments.
///
/// # Errors
///
/// Returns an error string when argument parsing fails or command execution fails.
pub fn run<I, T>(args: I) -> Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = match cli::Cli::try_parse_from(args) {
        Ok(cli) => cli,
        // --help and --version
        Err(err) if !err.use_stderr() => {
            err.print().map_err(|e| e.to_string())?;
            return Ok(());
        }
        Err(err) => return Err(err.to_string()),
    };
    logging::init_tracing(cli.verbose, cli.quiet)?;
    commands::dispatch(&cli.command)
}
