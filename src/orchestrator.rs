//! The snapshot cycle: diff, hand off, then promote or quarantine

use crate::audit::AuditWriter;
use crate::change_detection::{DiffResult, DiffSummary, RowDiffer};
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::data::{RowStore, Snapshot};
use crate::error::{Result, TabvaultError};
use crate::fs_ops::FileOps;
use crate::loader::{BulkLoader, LoadRequest, SnapshotSource};
use crate::quarantine::QuarantineManager;
use crate::retention::{RetentionSweeper, SweepReport};
use crate::versioning::{AcceptOutcome, VersionManager};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How often the cycle repeats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatPolicy {
    Once,
    /// Sleep `interval` between cycles; stop after `max_cycles` if set
    Every {
        interval: Duration,
        max_cycles: Option<usize>,
    },
}

/// Shared stop flag checked between cycles
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Terminal state of one cycle
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CycleOutcome {
    /// The source had nothing new
    NoSnapshot,
    /// Diff (and downstream load, if needed) succeeded and the file went through `accept`
    Accepted { outcome: AcceptOutcome },
    /// A snapshot could not be read structurally; nothing was produced
    DiffAborted {
        reason: String,
        parked: Option<PathBuf>,
    },
    /// Artifacts or the downstream load failed; everything was set aside
    Quarantined {
        reason: String,
        artifacts: Vec<PathBuf>,
        parked: Option<PathBuf>,
    },
    /// Promotion failed; the new file stays where it is for the next cycle
    AcceptFailed { reason: String },
}

impl CycleOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::DiffAborted { .. } | Self::Quarantined { .. } | Self::AcceptFailed { .. }
        )
    }
}

/// Everything that happened in one cycle
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle: usize,
    pub started_at: String,
    pub diff: Option<DiffSummary>,
    pub diff_artifact: Option<PathBuf>,
    pub deleted_artifact: Option<PathBuf>,
    pub outcome: CycleOutcome,
    pub sweep: Option<SweepReport>,
}

/// Totals over a `run`
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub cycles: usize,
    pub failures: usize,
    pub cancelled: bool,
    pub last: Option<CycleReport>,
}

/// Runs snapshot cycles against one working directory
pub struct Orchestrator<S, L> {
    config: EngineConfig,
    source: S,
    loader: L,
    clock: Arc<dyn Clock>,
    fs: Arc<dyn FileOps>,
    cycles: usize,
}

impl<S: SnapshotSource, L: BulkLoader> Orchestrator<S, L> {
    pub fn new(
        config: EngineConfig,
        source: S,
        loader: L,
        clock: Arc<dyn Clock>,
        fs: Arc<dyn FileOps>,
    ) -> Self {
        Self {
            config,
            source,
            loader,
            clock,
            fs,
            cycles: 0,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Repeat cycles according to `policy` until done or cancelled.
    ///
    /// With `Every`, a cycle that cannot run at all is logged and counted as a
    /// failure and the loop carries on; only `Once` returns that error.
    pub fn run(&mut self, policy: RepeatPolicy, cancel: &CancellationToken) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        loop {
            if cancel.is_cancelled() {
                log::info!("Cancellation requested, stopping");
                summary.cancelled = true;
                break;
            }

            summary.cycles += 1;
            match self.run_cycle() {
                Ok(report) => {
                    if report.outcome.is_failure() {
                        summary.failures += 1;
                    }
                    summary.last = Some(report);
                }
                Err(e) if policy == RepeatPolicy::Once => return Err(e),
                Err(e) => {
                    log::error!("Cycle {} could not run: {}", self.cycles, e);
                    summary.failures += 1;
                }
            }

            match policy {
                RepeatPolicy::Once => break,
                RepeatPolicy::Every {
                    interval,
                    max_cycles,
                } => {
                    if max_cycles.is_some_and(|max| summary.cycles >= max) {
                        break;
                    }
                    log::info!("Next cycle in {}s", interval.as_secs());
                    self.clock.sleep(interval);
                }
            }
        }

        Ok(summary)
    }

    /// One full cycle. Only an unusable working directory is an error; every
    /// other failure is reported through [`CycleOutcome`].
    pub fn run_cycle(&mut self) -> Result<CycleReport> {
        self.cycles += 1;
        let working_dir = self.config.working_dir();
        working_dir.ensure()?;

        log::info!("=== Cycle {} ===", self.cycles);
        let mut report = CycleReport {
            cycle: self.cycles,
            started_at: self.clock.now().format("%Y-%m-%d %H:%M:%S").to_string(),
            diff: None,
            diff_artifact: None,
            deleted_artifact: None,
            outcome: CycleOutcome::NoSnapshot,
            sweep: None,
        };

        let outcome = match self.source.fetch() {
            Ok(Some(incoming)) => self.process(&incoming, &mut report),
            Ok(None) => CycleOutcome::NoSnapshot,
            Err(e) => {
                log::error!("Fetching the new snapshot failed: {}", e);
                CycleOutcome::NoSnapshot
            }
        };
        report.outcome = outcome;

        let sweeper = RetentionSweeper::new(Arc::clone(&self.fs)).protect(working_dir.canonical_path());
        match sweeper.sweep(&working_dir.root, self.config.max_files) {
            Ok(sweep) => report.sweep = Some(sweep),
            Err(e) => log::error!("Retention sweep failed: {}", e),
        }

        Ok(report)
    }

    fn process(&mut self, incoming: &Path, report: &mut CycleReport) -> CycleOutcome {
        let working_dir = self.config.working_dir();
        let canonical = working_dir.canonical_path();
        let quarantine = QuarantineManager::new(Arc::clone(&self.clock), Arc::clone(&self.fs));

        let (old, new) = match self.load_pair(&canonical, incoming) {
            Ok(pair) => pair,
            Err(e) => {
                log::error!("Diff aborted: {}", e);
                let parked = quarantine.park(incoming, &working_dir.root, &working_dir.target_filename);
                return CycleOutcome::DiffAborted {
                    reason: e.to_string(),
                    parked,
                };
            }
        };

        let diff = RowDiffer::diff(
            old.as_ref(),
            &new,
            self.config.volatile_column.as_deref(),
        );
        report.diff = Some(diff.summary.clone());

        let request = match self.write_artifacts(&diff, old.as_ref(), &new, report) {
            Ok(request) => request,
            Err(e) => {
                log::error!("Writing audit files failed: {}", e);
                let artifacts =
                    quarantine.quarantine(&[report.diff_artifact.clone(), report.deleted_artifact.clone()]);
                let parked = quarantine.park(incoming, &working_dir.root, &working_dir.target_filename);
                return CycleOutcome::Quarantined {
                    reason: e.to_string(),
                    artifacts,
                    parked,
                };
            }
        };

        if request.has_artifacts() {
            log::info!("Changes detected, updating downstream");
            if let Err(e) = self.loader.load(&request) {
                log::error!("Downstream update failed: {}; quarantining this cycle's files", e);
                let artifacts = quarantine.quarantine(&[request.diff, request.deleted]);
                let parked = quarantine.park(incoming, &working_dir.root, &working_dir.target_filename);
                return CycleOutcome::Quarantined {
                    reason: e.to_string(),
                    artifacts,
                    parked,
                };
            }
        } else {
            log::info!("No row changes, skipping downstream update");
        }

        let versions = VersionManager::new(
            Arc::clone(&self.clock),
            Arc::clone(&self.fs),
            self.config.columns(),
        );
        match versions.accept(incoming, &working_dir.root, &working_dir.target_filename) {
            Ok(outcome) => CycleOutcome::Accepted { outcome },
            Err(e) => {
                log::error!("Accepting {} failed: {}", incoming.display(), e);
                CycleOutcome::AcceptFailed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Baseline (if any) and new snapshot, both structurally validated
    fn load_pair(&self, canonical: &Path, incoming: &Path) -> Result<(Option<Snapshot>, Snapshot)> {
        let identity = &self.config.identity_column;
        let old = if canonical.exists() {
            Some(RowStore::load(canonical, identity)?)
        } else {
            None
        };
        let new = RowStore::load(incoming, identity)?;
        Ok((old, new))
    }

    fn write_artifacts(
        &self,
        diff: &DiffResult,
        old: Option<&Snapshot>,
        new: &Snapshot,
        report: &mut CycleReport,
    ) -> Result<LoadRequest> {
        let working_dir = self.config.working_dir();
        let writer = AuditWriter::new(
            Arc::clone(&self.clock),
            Arc::clone(&self.fs),
            self.config.audit_delimiter_byte(),
        );

        report.diff_artifact = writer.write(
            &diff.added_or_modified,
            &working_dir.root,
            &working_dir.diff_artifact_name(),
            &new.header,
        )?;

        if !diff.deleted.is_empty() {
            let header = old.map(|o| &o.header).ok_or_else(|| {
                TabvaultError::invalid_input("deleted rows without a baseline header")
            })?;
            report.deleted_artifact = writer.write(
                &diff.deleted,
                &working_dir.root,
                &working_dir.deleted_artifact_name(),
                header,
            )?;
        }

        Ok(LoadRequest {
            window: self.config.report_window,
            diff: report.diff_artifact.clone(),
            deleted: report.deleted_artifact.clone(),
        })
    }
}
