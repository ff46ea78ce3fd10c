//! Core library entry for the `hashlock` CLI.

pub mod adapters;
pub mod canonical;
pub mod cli;
pub mod commands;
pub mod context;
pub mod discover;
pub mod drift;
pub mod identity;
pub mod lockfile;
pub mod manifest;
pub mod ports;
pub mod scan;

#[cfg(test)]
pub(crate) mod testutil;

use clap::Parser;

/// Run the CLI with the provided arguments.
///
/// # Errors
///
/// Returns an error string when argument parsing fails or the selected
/// mode fails.
pub fn run<I, T>(args: I) -> Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = cli::Cli::try_parse_from(args).map_err(|err| err.to_string())?;
    commands::dispatch(&cli)
}
