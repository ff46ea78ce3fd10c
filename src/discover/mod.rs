//! Manifest file discovery.
//!
//! Walks the configured roots and returns, in sorted order, the files the
//! scan should consider. The scan itself treats this list as an opaque
//! ordered set of paths.

use std::path::{Path, PathBuf};

use crate::context::ServiceContext;

/// Conventional manifest directories scanned when no roots are given.
pub const DEFAULT_ROOTS: &[&str] = &["manifests", "k8s", "deploy"];

/// Directory names never descended into.
const EXCLUDED_DIRS: &[&str] =
    &[".git", "templates", "charts", "docs", "archive", "legacy", ".hashlock-cache"];

/// Returns the manifest files under the given roots, sorted and deduplicated.
///
/// A root that does not exist is skipped silently. A root that is itself a
/// file bypasses the extension and exclusion checks but not the content
/// checks. Directory entries are included only when they are YAML, contain
/// no unresolved templating delimiters, and carry the `apiVersion`, `kind`,
/// and `metadata` markers.
///
/// # Errors
///
/// Returns an error if a directory listing fails mid-walk.
pub fn discover(ctx: &ServiceContext, roots: &[PathBuf]) -> Result<Vec<PathBuf>, String> {
    let mut files = Vec::new();
    for root in roots {
        if !ctx.fs.exists(root) {
            continue;
        }
        if ctx.fs.is_dir(root) {
            walk(ctx, root, &mut files)?;
        } else if is_manifest_content(ctx, root) {
            files.push(root.clone());
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

fn walk(ctx: &ServiceContext, dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), String> {
    let entries = ctx
        .fs
        .list_dir(dir)
        .map_err(|e| format!("failed to list directory {}: {e}", dir.display()))?;
    for name in entries {
        let path = dir.join(&name);
        if ctx.fs.is_dir(&path) {
            if !EXCLUDED_DIRS.contains(&name.as_str()) {
                walk(ctx, &path, files)?;
            }
        } else if is_yaml(&path) && is_manifest_content(ctx, &path) {
            files.push(path);
        }
    }
    Ok(())
}

fn is_yaml(path: &Path) -> bool {
    matches!(path.extension().and_then(|e| e.to_str()), Some("yaml" | "yml"))
}

/// A candidate must carry the manifest markers and no unresolved template
/// delimiters. Unreadable files are excluded here; the scan never sees them.
fn is_manifest_content(ctx: &ServiceContext, path: &Path) -> bool {
    let Ok(content) = ctx.fs.read_to_string(path) else {
        return false;
    };
    !content.contains("{{")
        && content.contains("apiVersion")
        && content.contains("kind:")
        && content.contains("metadata")
}
