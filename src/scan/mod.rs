//! Scan orchestration: discovery, canonicalization, identity computation,
//! and the update / verify workflows.
//!
//! The ledger accumulator is a plain `Vec` threaded through one scan; it is
//! owned exclusively by the running function and never shared. Likewise the
//! decoded document list of a file is owned for exactly one pass and only
//! this module serializes it back to disk.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::canonical;
use crate::context::ServiceContext;
use crate::discover;
use crate::drift::{self, Failure, ScanReport};
use crate::identity::{self, GovernedObject, Identity, URI_ANNOTATION, URN_ANNOTATION};
use crate::lockfile::{self, Hashlock, HashlockEntry};
use crate::manifest::{annotation, parse_documents, render_documents, set_annotation};

/// Policy for two source files producing the same URN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Keep the last entry in sort order silently (shared-resource case).
    Allow,
    /// Keep the last entry but emit a warning naming both sources.
    #[default]
    Warn,
    /// Record a failure.
    Deny,
}

/// Options for one scan run.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Root directories or files to scan.
    pub roots: Vec<PathBuf>,
    /// Ledger file location.
    pub hashlock_path: PathBuf,
    /// Stop at the first failure instead of accumulating everything.
    pub fail_fast: bool,
    /// Policy for colliding URNs.
    pub duplicate_urns: DuplicatePolicy,
}

/// Outcome of an update run.
#[derive(Debug)]
pub struct UpdateOutcome {
    /// Number of manifest files scanned.
    pub files_scanned: usize,
    /// Number of identities written to the ledger.
    pub objects_locked: usize,
    /// Number of manifest files rewritten in place.
    pub files_rewritten: usize,
    /// Accumulated failures and warnings.
    pub report: ScanReport,
}

/// Outcome of a verify run.
#[derive(Debug)]
pub struct VerifyOutcome {
    /// Number of governed objects checked.
    pub objects_checked: usize,
    /// Accumulated failures and warnings.
    pub report: ScanReport,
}

/// Rewrites identity annotations across the tree and regenerates the ledger.
///
/// Files whose stored annotations already match are left byte-untouched, so
/// back-to-back runs converge: the second run rewrites nothing and produces
/// an identical entry list (only `generatedAt` moves).
///
/// # Errors
///
/// Returns an error when a dirty file cannot be rewritten or the ledger
/// cannot be written; recoverable per-file problems accumulate in the
/// report instead.
pub fn run_update(ctx: &ServiceContext, opts: &ScanOptions) -> Result<UpdateOutcome, String> {
    let files = discover::discover(ctx, &opts.roots)?;
    let mut report = ScanReport::default();
    let mut entries: Vec<HashlockEntry> = Vec::new();
    let mut seen: BTreeMap<String, String> = BTreeMap::new();
    let mut files_rewritten = 0;

    'files: for path in &files {
        if opts.fail_fast && !report.is_clean() {
            break;
        }
        let source = path.display().to_string();
        let Some(mut docs) = read_documents(ctx, path, &source, &mut report) else {
            continue;
        };
        let mut dirty = false;
        for doc in &mut docs {
            if opts.fail_fast && !report.is_clean() {
                break 'files;
            }
            let Some(obj) = identity::govern(doc, path) else { continue };
            warn_defaulted_platform(&obj, &source, &mut report);
            let Some(id) = compute_identity(doc, &obj, &source, &mut report)? else {
                continue;
            };
            dirty |= set_annotation(doc, URI_ANNOTATION, &id.uri)
                .map_err(|e| format!("{source}: {e}"))?;
            dirty |= set_annotation(doc, URN_ANNOTATION, &id.urn)
                .map_err(|e| format!("{source}: {e}"))?;
            let entry = lock_entry(&obj, &id, &source);
            accumulate(&mut entries, &mut seen, entry, opts.duplicate_urns, &mut report);
        }
        if dirty {
            let rendered = render_documents(&docs).map_err(|e| format!("{source}: {e}"))?;
            ctx.fs
                .write(path, &rendered)
                .map_err(|e| format!("failed to rewrite {source}: {e}"))?;
            files_rewritten += 1;
        }
    }

    // A fail-fast abort skips the ledger so a partial scan can never
    // overwrite a complete one.
    if !(opts.fail_fast && !report.is_clean()) {
        let lock = Hashlock::new(ctx.clock.now(), entries);
        let objects_locked = lock.entries.len();
        lockfile::save(ctx, &opts.hashlock_path, &lock)?;
        return Ok(UpdateOutcome {
            files_scanned: files.len(),
            objects_locked,
            files_rewritten,
            report,
        });
    }

    Ok(UpdateOutcome { files_scanned: files.len(), objects_locked: 0, files_rewritten, report })
}

/// Recomputes all identities without mutating anything and compares them
/// against stored annotations and the committed ledger.
///
/// # Errors
///
/// Returns an error when the ledger exists but cannot be parsed;
/// recoverable problems accumulate in the report instead.
pub fn run_verify(ctx: &ServiceContext, opts: &ScanOptions) -> Result<VerifyOutcome, String> {
    let mut report = ScanReport::default();
    if !ctx.fs.exists(&opts.hashlock_path) {
        report.fail(Failure::MissingLockFile {
            path: opts.hashlock_path.display().to_string(),
        });
        return Ok(VerifyOutcome { objects_checked: 0, report });
    }
    let committed = lockfile::load(ctx, &opts.hashlock_path)?;
    if committed.hash_algorithm != lockfile::HASH_ALGORITHM {
        report.warn(format!(
            "ledger uses unsupported hash algorithm \"{}\"",
            committed.hash_algorithm
        ));
    }
    for entry in &committed.entries {
        if !identity::is_valid_urn(&entry.urn) {
            report.warn(format!("malformed urn in ledger: {}", entry.urn));
        }
    }

    let files = discover::discover(ctx, &opts.roots)?;
    let mut entries: Vec<HashlockEntry> = Vec::new();
    let mut seen: BTreeMap<String, String> = BTreeMap::new();

    'files: for path in &files {
        if opts.fail_fast && !report.is_clean() {
            break;
        }
        let source = path.display().to_string();
        let Some(docs) = read_documents(ctx, path, &source, &mut report) else {
            continue;
        };
        for doc in &docs {
            if opts.fail_fast && !report.is_clean() {
                break 'files;
            }
            let Some(obj) = identity::govern(doc, path) else { continue };
            warn_defaulted_platform(&obj, &source, &mut report);
            let Some(id) = compute_identity(doc, &obj, &source, &mut report)? else {
                continue;
            };
            for failure in drift::annotation_drift(
                &source,
                &obj.meta.qualified_name(),
                annotation(doc, URI_ANNOTATION),
                annotation(doc, URN_ANNOTATION),
                &id,
            ) {
                report.fail(failure);
            }
            let entry = lock_entry(&obj, &id, &source);
            accumulate(&mut entries, &mut seen, entry, opts.duplicate_urns, &mut report);
        }
    }

    if !(opts.fail_fast && !report.is_clean()) {
        for failure in drift::ledger_drift(&entries, &committed) {
            report.fail(failure);
            if opts.fail_fast {
                break;
            }
        }
    }

    Ok(VerifyOutcome { objects_checked: entries.len(), report })
}

/// Reads and parses one manifest file, recording a soft failure and
/// returning `None` when it cannot be processed.
fn read_documents(
    ctx: &ServiceContext,
    path: &Path,
    source: &str,
    report: &mut ScanReport,
) -> Option<Vec<serde_yaml::Value>> {
    let content = match ctx.fs.read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            report.fail(Failure::Parse { source: source.to_string(), detail: e.to_string() });
            return None;
        }
    };
    match parse_documents(&content) {
        Ok(docs) => Some(docs),
        Err(detail) => {
            report.fail(Failure::Parse { source: source.to_string(), detail });
            None
        }
    }
}

/// Canonicalizes one governed document and derives its identity. A document
/// that cannot be canonicalized records a soft failure and yields `None`.
fn compute_identity(
    doc: &serde_yaml::Value,
    obj: &GovernedObject,
    source: &str,
    report: &mut ScanReport,
) -> Result<Option<Identity>, String> {
    let canonical = match canonical::canonicalize(doc) {
        Ok(value) => value,
        Err(detail) => {
            report.fail(Failure::Parse { source: source.to_string(), detail });
            return Ok(None);
        }
    };
    let hash = canonical::content_hash(&canonical)?;
    Ok(Some(identity::identity_for(obj, &hash)))
}

fn warn_defaulted_platform(obj: &GovernedObject, source: &str, report: &mut ScanReport) {
    if obj.platform_defaulted {
        report.warn(format!(
            "platform label missing on {} ({source}); defaulting to \"{}\"",
            obj.meta.qualified_name(),
            identity::DEFAULT_PLATFORM,
        ));
    }
}

fn lock_entry(obj: &GovernedObject, id: &Identity, source: &str) -> HashlockEntry {
    HashlockEntry {
        api_version: obj.meta.api_version.clone(),
        kind: obj.meta.kind.clone(),
        namespace: obj.meta.namespace.clone(),
        name: obj.meta.name.clone(),
        platform: obj.platform.clone(),
        component: obj.component.clone(),
        uri: id.uri.clone(),
        urn: id.urn.clone(),
        content_sha256: id.content_hash.clone(),
        source: source.to_string(),
    }
}

/// Appends an entry to the accumulator, applying the duplicate-URN policy.
/// On a collision the later entry in scan order replaces the earlier one.
fn accumulate(
    entries: &mut Vec<HashlockEntry>,
    seen: &mut BTreeMap<String, String>,
    entry: HashlockEntry,
    policy: DuplicatePolicy,
    report: &mut ScanReport,
) {
    if let Some(first_source) = seen.get(&entry.urn) {
        match policy {
            DuplicatePolicy::Allow => {}
            DuplicatePolicy::Warn => report.warn(format!(
                "duplicate urn {} (first in {first_source}, again in {})",
                entry.urn, entry.source,
            )),
            DuplicatePolicy::Deny => report.fail(Failure::DuplicateUrn {
                urn: entry.urn.clone(),
                first_source: first_source.clone(),
                second_source: entry.source.clone(),
            }),
        }
        entries.retain(|e| e.urn != entry.urn);
    }
    seen.insert(entry.urn.clone(), entry.source.clone());
    entries.push(entry);
}
