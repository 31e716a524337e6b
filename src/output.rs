//! Output formatting utilities

use crate::change_detection::DiffSummary;
use crate::error::Result;
use crate::hash::{ContentDigest, DigestPrecision};
use crate::orchestrator::{CycleOutcome, CycleReport, RunSummary};
use crate::retention::SweepReport;
use crate::versioning::AcceptOutcome;
use crate::workspace::WorkingDirStats;
use std::path::{Path, PathBuf};

/// Pretty printer for tabvault output
pub struct PrettyPrinter;

impl PrettyPrinter {
    /// Print a content digest
    pub fn print_digest(path: &Path, digest: &ContentDigest) {
        println!("🔑 {}", path.display());
        println!("├─ Digest: {}", digest.value);
        match &digest.precision {
            DigestPrecision::Normalized => println!("└─ Precision: normalized"),
            DigestPrecision::RawFallback { reason } => {
                println!("└─ ⚠️  Precision: raw bytes ({})", reason)
            }
        }
    }

    /// Print the counts of a row comparison and where artifacts went
    pub fn print_diff_summary(
        summary: &DiffSummary,
        diff_artifact: Option<&Path>,
        deleted_artifact: Option<&Path>,
    ) {
        println!("🔍 Row comparison");
        if summary.baseline_missing {
            println!("└─ No baseline, nothing to compare");
            return;
        }
        if summary.header_drift {
            println!("├─ ⚠️  Headers differ, rows compared positionally");
        }
        println!("├─ Added: {}", summary.added);
        println!("├─ Modified: {}", summary.modified);
        println!("├─ Deleted: {}", summary.deleted);
        println!("├─ Unchanged: {}", summary.unchanged);
        println!("├─ Diff file: {}", display_optional(diff_artifact));
        println!("└─ Deleted file: {}", display_optional(deleted_artifact));
    }

    /// Print what happened to an accepted file
    pub fn print_accept_outcome(outcome: &AcceptOutcome) {
        match outcome {
            AcceptOutcome::Created { canonical } => {
                println!("✅ Created {}", canonical.display());
            }
            AcceptOutcome::Replaced { canonical, backup } => {
                println!("✅ Replaced {}", canonical.display());
                println!("└─ Previous version: {}", backup.display());
            }
            AcceptOutcome::DiscardedIdentical { canonical } => {
                println!("✅ Identical to {}, new file discarded", canonical.display());
            }
        }
    }

    pub fn print_quarantined(moved: &[PathBuf]) {
        if moved.is_empty() {
            println!("Nothing to quarantine.");
            return;
        }
        println!("🚧 Quarantined:");
        for (i, path) in moved.iter().enumerate() {
            let prefix = if i == moved.len() - 1 { "└─" } else { "├─" };
            println!("{} {}", prefix, path.display());
        }
    }

    pub fn print_sweep_report(report: &SweepReport) {
        println!("🧹 Retention");
        println!("├─ Files examined: {}", report.examined);
        println!("├─ Kept: {}", report.kept);
        println!("├─ Deleted: {} ({})", report.deleted.len(), format_bytes(report.bytes_freed));
        if report.failed.is_empty() {
            println!("└─ Failures: none");
        } else {
            println!("└─ ❌ Could not delete: {}", report.failed.len());
        }
    }

    pub fn print_working_dir_stats(root: &Path, stats: &WorkingDirStats) {
        println!("📊 {}", root.display());
        println!(
            "├─ Canonical file: {}",
            if stats.canonical_present { "present" } else { "missing" }
        );
        println!("├─ Backups: {}", stats.backups);
        println!("├─ Diff files: {}", stats.diff_artifacts);
        println!("├─ Deleted files: {}", stats.deleted_artifacts);
        println!("├─ Quarantined: {}", stats.quarantined);
        println!("├─ Other: {}", stats.other);
        println!(
            "└─ Total: {} files, {}",
            stats.total_files,
            format_bytes(stats.total_size)
        );
    }

    pub fn print_cycle_report(report: &CycleReport) {
        println!("🔄 Cycle {} ({})", report.cycle, report.started_at);
        match &report.outcome {
            CycleOutcome::NoSnapshot => println!("└─ No new snapshot"),
            CycleOutcome::Accepted { outcome } => {
                if let Some(diff) = &report.diff {
                    if !diff.baseline_missing {
                        println!(
                            "├─ Rows: +{} ~{} -{}",
                            diff.added, diff.modified, diff.deleted
                        );
                    }
                }
                match outcome {
                    AcceptOutcome::Created { .. } => println!("└─ ✅ Baseline created"),
                    AcceptOutcome::Replaced { backup, .. } => {
                        println!("└─ ✅ Snapshot replaced, previous kept as {}", backup.display())
                    }
                    AcceptOutcome::DiscardedIdentical { .. } => {
                        println!("└─ ✅ No changes, new file discarded")
                    }
                }
            }
            CycleOutcome::DiffAborted { reason, .. } => println!("└─ ❌ Diff aborted: {}", reason),
            CycleOutcome::Quarantined {
                reason, artifacts, ..
            } => {
                println!("├─ ❌ {}", reason);
                println!("└─ {} file(s) quarantined", artifacts.len());
            }
            CycleOutcome::AcceptFailed { reason } => {
                println!("└─ ❌ Update deferred to next cycle: {}", reason)
            }
        }
    }

    pub fn print_run_summary(summary: &RunSummary) {
        println!(
            "Finished {} cycle(s), {} failed{}",
            summary.cycles,
            summary.failures,
            if summary.cancelled { ", cancelled" } else { "" }
        );
    }
}

/// JSON formatter for machine-readable output
pub struct JsonFormatter;

impl JsonFormatter {
    /// Format any serializable data as JSON
    pub fn format<T: serde::Serialize + ?Sized>(data: &T) -> Result<String> {
        Ok(serde_json::to_string_pretty(data)?)
    }

    pub fn format_diff(
        summary: &DiffSummary,
        diff_artifact: Option<&Path>,
        deleted_artifact: Option<&Path>,
    ) -> Result<String> {
        let json = serde_json::json!({
            "summary": summary,
            "diff_file": diff_artifact,
            "deleted_file": deleted_artifact,
        });
        Ok(serde_json::to_string_pretty(&json)?)
    }
}

fn display_optional(path: Option<&Path>) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Format bytes in human-readable format
fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}
