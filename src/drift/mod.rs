//! Drift detection: failure taxonomy, identity comparison, and reporting.
//!
//! Two comparison levels are required to catch every drift class. A content
//! edit changes the URN itself (the hash is embedded), so the per-object
//! annotation check catches it where the object still exists, while the
//! set-level ledger check catches additions, removals, and renames.

use std::collections::BTreeMap;

use crate::identity::{Identity, URI_ANNOTATION, URN_ANNOTATION};
use crate::lockfile::{Hashlock, HashlockEntry};

/// A single accumulated failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// A manifest file could not be read or parsed; it was skipped.
    Parse {
        /// Path of the offending file.
        source: String,
        /// Parser or I/O detail.
        detail: String,
    },
    /// A stored identity annotation disagrees with the computed identity.
    AnnotationDrift {
        /// Path of the manifest file.
        source: String,
        /// Qualified object name.
        object: String,
        /// The annotation key that drifted.
        annotation: String,
        /// Freshly computed value.
        expected: String,
        /// Currently stored value, or `(unset)`.
        actual: String,
    },
    /// A computed URN has no entry in the committed ledger: a new or changed
    /// resource not yet committed.
    MissingFromLock {
        /// The computed URN.
        urn: String,
        /// Path of the manifest file.
        source: String,
    },
    /// A ledger URN matches no object in the current tree: a resource
    /// removed or renamed without updating the ledger.
    StaleLockEntry {
        /// The committed URN.
        urn: String,
        /// Path recorded in the ledger entry.
        source: String,
    },
    /// The ledger file does not exist at all.
    MissingLockFile {
        /// Expected ledger path.
        path: String,
    },
    /// Two source files produced the same URN under the `deny` policy.
    DuplicateUrn {
        /// The colliding URN.
        urn: String,
        /// File that produced the URN first.
        first_source: String,
        /// File that produced it again.
        second_source: String,
    },
}

/// Aggregated outcome of one scan.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// Accumulated failures; non-empty means the run exits non-zero.
    pub failures: Vec<Failure>,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
}

impl ScanReport {
    /// Returns `true` if no failures accumulated.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Records a warning.
    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Records a failure.
    pub fn fail(&mut self, failure: Failure) {
        self.failures.push(failure);
    }
}

/// Compares an object's stored identity annotations against its freshly
/// computed identity. A missing annotation counts as drift.
#[must_use]
pub fn annotation_drift(
    source: &str,
    object: &str,
    stored_uri: Option<&str>,
    stored_urn: Option<&str>,
    identity: &Identity,
) -> Vec<Failure> {
    let mut failures = Vec::new();
    for (annotation, expected, actual) in [
        (URI_ANNOTATION, identity.uri.as_str(), stored_uri),
        (URN_ANNOTATION, identity.urn.as_str(), stored_urn),
    ] {
        if actual != Some(expected) {
            failures.push(Failure::AnnotationDrift {
                source: source.to_string(),
                object: object.to_string(),
                annotation: annotation.to_string(),
                expected: expected.to_string(),
                actual: actual.unwrap_or("(unset)").to_string(),
            });
        }
    }
    failures
}

/// Set-level comparison between freshly computed entries and the committed
/// ledger, in both directions.
#[must_use]
pub fn ledger_drift(computed: &[HashlockEntry], committed: &Hashlock) -> Vec<Failure> {
    let computed_index: BTreeMap<&str, &HashlockEntry> =
        computed.iter().map(|e| (e.urn.as_str(), e)).collect();
    let committed_index = committed.urn_index();

    let mut failures = Vec::new();
    for (urn, entry) in &computed_index {
        if !committed_index.contains_key(urn) {
            failures.push(Failure::MissingFromLock {
                urn: (*urn).to_string(),
                source: entry.source.clone(),
            });
        }
    }
    for (urn, entry) in &committed_index {
        if !computed_index.contains_key(urn) {
            failures.push(Failure::StaleLockEntry {
                urn: (*urn).to_string(),
                source: entry.source.clone(),
            });
        }
    }
    failures
}

/// Formats one failure as a tagged block: a `[FAIL]` line plus indented
/// detail rows with expected vs. actual values where applicable.
#[must_use]
pub fn format_failure(failure: &Failure) -> String {
    match failure {
        Failure::Parse { source, detail } => {
            format!("[FAIL] parse error: {source}\n       {detail}")
        }
        Failure::AnnotationDrift { source, object, annotation, expected, actual } => format!(
            "[FAIL] annotation drift: {object} ({source})\n       annotation: {annotation}\n       expected: {expected}\n       actual:   {actual}"
        ),
        Failure::MissingFromLock { urn, source } => format!(
            "[FAIL] missing from lock: {urn}\n       source: {source}\n       run update mode to commit this identity"
        ),
        Failure::StaleLockEntry { urn, source } => format!(
            "[FAIL] stale lock entry: {urn}\n       locked source: {source}\n       object no longer exists in the tree"
        ),
        Failure::MissingLockFile { path } => {
            format!("[FAIL] hashlock file not found: {path}")
        }
        Failure::DuplicateUrn { urn, first_source, second_source } => format!(
            "[FAIL] duplicate urn: {urn}\n       first:  {first_source}\n       second: {second_source}"
        ),
    }
}

/// Formats a full report: warnings first, then failures.
#[must_use]
pub fn format_report(report: &ScanReport) -> String {
    let mut lines = Vec::new();
    for warning in &report.warnings {
        lines.push(format!("[WARN] {warning}"));
    }
    for failure in &report.failures {
        lines.push(format_failure(failure));
    }
    lines.join("\n")
}
