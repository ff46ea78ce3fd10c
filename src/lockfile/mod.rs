//! Hashlock ledger model and persistence.
//!
//! The ledger is a JSON file committed next to the manifest tree, analogous
//! to a dependency lock file. It is rewritten wholesale on every update run
//! and is a read-only input during verification.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::ServiceContext;

/// Version of the ledger format itself.
pub const SPEC_VERSION: &str = "1";
/// The only hash algorithm this format carries.
pub const HASH_ALGORITHM: &str = "sha256";

/// One locked identity, uniquely keyed by `urn`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HashlockEntry {
    /// The object's `apiVersion`.
    pub api_version: String,
    /// The object's `kind`.
    pub kind: String,
    /// The object's namespace; empty when cluster-scoped.
    pub namespace: String,
    /// The object's name.
    pub name: String,
    /// Platform classification.
    pub platform: String,
    /// Component class from the governed-kind table.
    pub component: String,
    /// Content-independent location URI.
    pub uri: String,
    /// Content-addressed URN.
    pub urn: String,
    /// Lowercase hex SHA-256 of the canonical form.
    pub content_sha256: String,
    /// Manifest file the object was read from.
    pub source: String,
}

/// The committed ledger of expected identities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Hashlock {
    /// Ledger format version.
    pub spec_version: String,
    /// When this ledger was generated.
    pub generated_at: DateTime<Utc>,
    /// Hash algorithm used for `contentSha256` digests.
    pub hash_algorithm: String,
    /// Locked identities, sorted by `(source, kind, namespace, name)`.
    pub entries: Vec<HashlockEntry>,
}

impl Hashlock {
    /// Builds a ledger from accumulated entries, sorting them for stable
    /// diffs.
    #[must_use]
    pub fn new(generated_at: DateTime<Utc>, mut entries: Vec<HashlockEntry>) -> Self {
        sort_entries(&mut entries);
        Self {
            spec_version: SPEC_VERSION.to_string(),
            generated_at,
            hash_algorithm: HASH_ALGORITHM.to_string(),
            entries,
        }
    }

    /// Index of the entries by URN.
    #[must_use]
    pub fn urn_index(&self) -> BTreeMap<&str, &HashlockEntry> {
        self.entries.iter().map(|e| (e.urn.as_str(), e)).collect()
    }
}

/// Sorts entries by `(source, kind, namespace, name)`.
pub fn sort_entries(entries: &mut [HashlockEntry]) {
    entries.sort_by(|a, b| {
        (&a.source, &a.kind, &a.namespace, &a.name)
            .cmp(&(&b.source, &b.kind, &b.namespace, &b.name))
    });
}

/// Loads a ledger file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load(ctx: &ServiceContext, path: &Path) -> Result<Hashlock, String> {
    let contents = ctx
        .fs
        .read_to_string(path)
        .map_err(|e| format!("failed to read hashlock file {}: {e}", path.display()))?;
    serde_json::from_str(&contents)
        .map_err(|e| format!("failed to parse hashlock file {}: {e}", path.display()))
}

/// Writes a ledger file, replacing any previous version wholesale.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub fn save(ctx: &ServiceContext, path: &Path, lock: &Hashlock) -> Result<(), String> {
    let mut contents = serde_json::to_string_pretty(lock)
        .map_err(|e| format!("failed to serialize hashlock file: {e}"))?;
    contents.push('\n');
    ctx.fs
        .write(path, &contents)
        .map_err(|e| format!("failed to write hashlock file {}: {e}", path.display()))
}
