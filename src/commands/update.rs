//! Update-mode handler: rewrite identities and regenerate the ledger.

use crate::context::ServiceContext;
use crate::drift;
use crate::scan::{self, ScanOptions};

/// Execute an update run.
///
/// On success exactly one summary line is printed to stdout; warnings go to
/// stderr. When failures accumulated, the full tagged report is printed and
/// an error is returned so the process exits non-zero.
///
/// # Errors
///
/// Returns an error string when a manifest or ledger write fails, or when
/// any failure was recorded during the scan.
pub fn run_with_context(ctx: &ServiceContext, opts: &ScanOptions) -> Result<(), String> {
    let outcome = scan::run_update(ctx, opts)?;
    if outcome.report.is_clean() {
        for warning in &outcome.report.warnings {
            eprintln!("[WARN] {warning}");
        }
        println!(
            "hashlock update: {} files scanned, {} objects locked, {} files rewritten",
            outcome.files_scanned, outcome.objects_locked, outcome.files_rewritten,
        );
        Ok(())
    } else {
        println!("{}", drift::format_report(&outcome.report));
        Err(format!(
            "hashlock update failed with {} failure(s)",
            outcome.report.failures.len()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::{DuplicatePolicy, ScanOptions};
    use crate::testutil::{test_context, MemFs};
    use std::path::PathBuf;

    fn opts() -> ScanOptions {
        ScanOptions {
            roots: vec![PathBuf::from("/repo/manifests")],
            hashlock_path: PathBuf::from("/repo/hashlock.json"),
            fail_fast: false,
            duplicate_urns: DuplicatePolicy::Warn,
        }
    }

    #[test]
    fn clean_update_succeeds() {
        let ctx = test_context(MemFs::new().seed(
            "/repo/manifests/web.yaml",
            "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: web\n  labels:\n    hashlock.dev/platform: core\n",
        ));
        assert!(run_with_context(&ctx, &opts()).is_ok());
        assert!(ctx.fs.exists(&PathBuf::from("/repo/hashlock.json")));
    }

    #[test]
    fn parse_failure_surfaces_as_error() {
        let ctx = test_context(MemFs::new().seed(
            "/repo/manifests/bad.yaml",
            "apiVersion: v1\nkind: Service\nmetadata: [unclosed\n",
        ));
        let err = run_with_context(&ctx, &opts()).unwrap_err();
        assert!(err.contains("1 failure(s)"));
    }
}
