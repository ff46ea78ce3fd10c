//! Command dispatch and handlers.

pub mod update;
pub mod verify;

use std::env;
use std::path::PathBuf;

use crate::cli::{Cli, DuplicateUrns, Mode};
use crate::context::ServiceContext;
use crate::discover::DEFAULT_ROOTS;
use crate::scan::{DuplicatePolicy, ScanOptions};

/// Environment variable overriding the default ledger location.
pub const HASHLOCK_FILE_ENV: &str = "HASHLOCK_FILE";

const DEFAULT_HASHLOCK_FILE: &str = "hashlock.json";

/// Dispatch a parsed command to its handler.
///
/// # Errors
///
/// Returns an error string if the selected mode fails.
pub fn dispatch(cli: &Cli) -> Result<(), String> {
    let ctx = ServiceContext::live();
    dispatch_with_context(cli, &ctx)
}

/// Dispatch a command with the given service context.
///
/// # Errors
///
/// Returns an error string if the selected mode fails.
pub fn dispatch_with_context(cli: &Cli, ctx: &ServiceContext) -> Result<(), String> {
    let opts = scan_options(cli);
    match cli.mode {
        Mode::Update => update::run_with_context(ctx, &opts),
        Mode::Verify => verify::run_with_context(ctx, &opts),
    }
}

/// Resolves CLI arguments into scan options.
///
/// The ledger path resolves flag over environment over the built-in
/// default; the conventional manifest roots apply when no paths are given.
fn scan_options(cli: &Cli) -> ScanOptions {
    let roots = if cli.paths.is_empty() {
        DEFAULT_ROOTS.iter().map(PathBuf::from).collect()
    } else {
        cli.paths.clone()
    };
    let hashlock_path = cli.hashlock.clone().unwrap_or_else(|| {
        env::var(HASHLOCK_FILE_ENV)
            .map_or_else(|_| PathBuf::from(DEFAULT_HASHLOCK_FILE), PathBuf::from)
    });
    ScanOptions {
        roots,
        hashlock_path,
        fail_fast: cli.fail_fast,
        duplicate_urns: match cli.duplicate_urns {
            DuplicateUrns::Allow => DuplicatePolicy::Allow,
            DuplicateUrns::Warn => DuplicatePolicy::Warn,
            DuplicateUrns::Deny => DuplicatePolicy::Deny,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn default_roots_apply_when_no_paths_given() {
        let cli = Cli::parse_from(["hashlock", "--mode", "update"]);
        let opts = scan_options(&cli);
        let roots: Vec<String> = opts.roots.iter().map(|p| p.display().to_string()).collect();
        assert_eq!(roots, DEFAULT_ROOTS);
    }

    #[test]
    fn explicit_paths_override_defaults() {
        let cli = Cli::parse_from(["hashlock", "--mode", "update", "--paths", "overlays/prod"]);
        let opts = scan_options(&cli);
        assert_eq!(opts.roots, vec![PathBuf::from("overlays/prod")]);
    }

    #[test]
    fn hashlock_flag_wins_over_default() {
        let cli =
            Cli::parse_from(["hashlock", "--mode", "verify", "--hashlock", "locks/lock.json"]);
        let opts = scan_options(&cli);
        assert_eq!(opts.hashlock_path, PathBuf::from("locks/lock.json"));
    }

    #[test]
    fn duplicate_policy_maps_through() {
        let cli = Cli::parse_from(["hashlock", "--mode", "verify", "--duplicate-urns", "deny"]);
        let opts = scan_options(&cli);
        assert_eq!(opts.duplicate_urns, DuplicatePolicy::Deny);
    }
}
