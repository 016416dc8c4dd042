//! Output formatting for CLI

use crate::RunSummary;
use std::fmt::Write;
use std::time::Duration;

/// Most failed targets listed individually in the summary
const MAX_LISTED_FAILURES: usize = 5;

#[must_use]
pub fn banner() -> String {
    format!(
        "lootspider {}: spider shares and directories for sensitive files",
        env!("CARGO_PKG_VERSION")
    )
}

/// Human-readable end-of-run summary
#[must_use]
pub fn format_summary(summary: &RunSummary, elapsed: Duration) -> String {
    let mut out = String::new();
    let stats = &summary.stats;

    let _ = writeln!(
        out,
        "Targets: {} attempted, {} completed, {} failed ({:.1}s)",
        summary.targets,
        summary.completed,
        summary.failed.len(),
        elapsed.as_secs_f64()
    );
    let _ = writeln!(
        out,
        "Files: {} considered, {} content checks, {} excluded paths",
        stats.files_considered, stats.content_checks, stats.excluded
    );
    let _ = writeln!(
        out,
        "Matches: {} reported, {} downloaded, {} duplicates",
        stats.matches, stats.downloads, stats.duplicates
    );
    if stats.errors > 0 {
        let _ = writeln!(out, "Errors: {}", stats.errors);
    }

    if !summary.failed.is_empty() {
        let _ = writeln!(out, "Failed targets:");
        for (target, reason) in summary.failed.iter().take(MAX_LISTED_FAILURES) {
            let _ = writeln!(out, "  {target}: {reason}");
        }
        if summary.failed.len() > MAX_LISTED_FAILURES {
            let _ = writeln!(
                out,
                "  ... and {} more",
                summary.failed.len() - MAX_LISTED_FAILURES
            );
        }
    }

    out
}
