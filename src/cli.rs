//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Top-level CLI parser for `hashlock`.
#[derive(Debug, Parser)]
#[command(name = "hashlock", version, about = "Lock and verify manifest identities")]
pub struct Cli {
    /// Whether to rewrite identities or check for drift.
    #[arg(long, value_enum)]
    pub mode: Mode,

    /// Manifest roots to scan (directories or single files).
    #[arg(long = "paths", value_name = "PATH", num_args = 1..)]
    pub paths: Vec<PathBuf>,

    /// Ledger file location (defaults to $HASHLOCK_FILE, then hashlock.json).
    #[arg(long, value_name = "PATH")]
    pub hashlock: Option<PathBuf>,

    /// Stop at the first failure instead of reporting everything.
    #[arg(long)]
    pub fail_fast: bool,

    /// Policy when two source files produce the same URN.
    #[arg(long, value_enum, default_value = "warn")]
    pub duplicate_urns: DuplicateUrns,
}

/// Supported run modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Rewrite identity annotations and regenerate the ledger.
    Update,
    /// Recompute identities and compare against annotations and the ledger.
    Verify,
}

/// Duplicate-URN policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DuplicateUrns {
    /// Keep the last entry in sort order silently.
    Allow,
    /// Keep the last entry but warn, naming both sources.
    Warn,
    /// Treat the collision as a failure.
    Deny,
}
