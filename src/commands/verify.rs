//! Verify-mode handler: read-only drift check against the committed ledger.

use crate::context::ServiceContext;
use crate::drift;
use crate::scan::{self, ScanOptions};

/// Execute a verify run.
///
/// On success exactly one summary line is printed to stdout; warnings go to
/// stderr. When drift was detected, the full tagged report is printed and
/// an error is returned so the process exits non-zero.
///
/// # Errors
///
/// Returns an error string when the ledger exists but cannot be parsed, or
/// when any drift failure was recorded.
pub fn run_with_context(ctx: &ServiceContext, opts: &ScanOptions) -> Result<(), String> {
    let outcome = scan::run_verify(ctx, opts)?;
    if outcome.report.is_clean() {
        for warning in &outcome.report.warnings {
            eprintln!("[WARN] {warning}");
        }
        println!(
            "hashlock verify: no drift detected ({} objects checked)",
            outcome.objects_checked,
        );
        Ok(())
    } else {
        println!("{}", drift::format_report(&outcome.report));
        Err(format!(
            "hashlock verify failed with {} failure(s)",
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
    fn missing_ledger_fails() {
        let ctx = test_context(MemFs::new().seed(
            "/repo/manifests/web.yaml",
            "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: web\n",
        ));
        let err = run_with_context(&ctx, &opts()).unwrap_err();
        assert!(err.contains("1 failure(s)"));
    }

    #[test]
    fn verify_after_update_succeeds() {
        let ctx = test_context(MemFs::new().seed(
            "/repo/manifests/web.yaml",
            "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: web\n  labels:\n    hashlock.dev/platform: core\n",
        ));
        crate::commands::update::run_with_context(&ctx, &opts()).unwrap();
        assert!(run_with_context(&ctx, &opts()).is_ok());
    }

    #[test]
    fn corrupt_ledger_is_a_hard_error() {
        let ctx = test_context(
            MemFs::new()
                .seed(
                    "/repo/manifests/web.yaml",
                    "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: web\n",
                )
                .seed("/repo/hashlock.json", "not json"),
        );
        let err = run_with_context(&ctx, &opts()).unwrap_err();
        assert!(err.contains("failed to parse hashlock file"));
    }
}
