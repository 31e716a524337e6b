//! Command implementations for tabvault CLI

use crate::audit::AuditWriter;
use crate::change_detection::RowDiffer;
use crate::cli::Commands;
use crate::clock::SystemClock;
use crate::config::EngineConfig;
use crate::data::{ColumnSpec, RowStore};
use crate::error::{Result, TabvaultError};
use crate::fs_ops::OsFileOps;
use crate::hash::{ContentDigest, ContentHasher, DigestPrecision};
use crate::loader::{BulkLoader, CommandLoader, DroppedFile, LoadRequest, NoLoader};
use crate::orchestrator::{CancellationToken, Orchestrator, RepeatPolicy, RunSummary};
use crate::output::{JsonFormatter, PrettyPrinter};
use crate::progress::StepReporter;
use crate::quarantine::QuarantineManager;
use crate::retention::RetentionSweeper;
use crate::versioning::VersionManager;
use crate::workspace::WorkingDir;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Execute a command
pub fn execute_command(command: Commands) -> Result<()> {
    match command {
        Commands::Run {
            config,
            input,
            interval,
            max_cycles,
            stop_file,
            json,
        } => run_command(config.as_deref(), input, interval, max_cycles, stop_file, json),
        Commands::Hash {
            file,
            volatile,
            raw,
            json,
        } => hash_command(&file, volatile, raw, json),
        Commands::Diff {
            old,
            new,
            identity,
            volatile,
            out_dir,
            json,
        } => diff_command(&old, &new, &identity, volatile.as_deref(), out_dir.as_deref(), json),
        Commands::Accept {
            new,
            target_dir,
            target_name,
            volatile,
        } => accept_command(&new, &target_dir, &target_name, volatile),
        Commands::Quarantine { paths } => quarantine_command(paths),
        Commands::Sweep {
            dir,
            max_files,
            protect,
        } => sweep_command(&dir, max_files, protect),
        Commands::Status { config, json } => status_command(config.as_deref(), json),
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load(path),
        None => Ok(EngineConfig::default()),
    }
}

/// Run the snapshot cycle once or on an interval
fn run_command(
    config_path: Option<&Path>,
    input: Option<PathBuf>,
    interval: Option<u64>,
    max_cycles: Option<usize>,
    stop_file: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(input) = input {
        config.incoming = input;
    }
    config.validate()?;

    let policy = match interval {
        Some(secs) => RepeatPolicy::Every {
            interval: Duration::from_secs(secs),
            max_cycles,
        },
        None => RepeatPolicy::Once,
    };

    let summary = match config.loader.clone() {
        Some(loader) => run_with_loader(config, CommandLoader::new(loader), policy, stop_file)?,
        None => run_with_loader(config, NoLoader, policy, stop_file)?,
    };

    if json {
        println!("{}", JsonFormatter::format(&summary)?);
    } else {
        if let Some(last) = &summary.last {
            PrettyPrinter::print_cycle_report(last);
        }
        PrettyPrinter::print_run_summary(&summary);
    }

    match &summary.last {
        Some(last) if last.outcome.is_failure() && policy == RepeatPolicy::Once => {
            Err(TabvaultError::invalid_input("snapshot cycle did not complete"))
        }
        _ => Ok(()),
    }
}

fn run_with_loader<L: BulkLoader>(
    config: EngineConfig,
    loader: L,
    policy: RepeatPolicy,
    stop_file: Option<PathBuf>,
) -> Result<RunSummary> {
    let source = DroppedFile::new(&config.incoming);
    let clock = Arc::new(StopFileClock {
        inner: SystemClock,
        stop_file,
        cancel: CancellationToken::new(),
    });
    let cancel = clock.cancel.clone();

    let mut orchestrator = Orchestrator::new(config, source, loader, clock, Arc::new(OsFileOps));
    orchestrator.run(policy, &cancel)
}

/// System clock that polls a stop file while sleeping and raises the
/// cancellation flag once it appears
struct StopFileClock {
    inner: SystemClock,
    stop_file: Option<PathBuf>,
    cancel: CancellationToken,
}

impl crate::clock::Clock for StopFileClock {
    fn now(&self) -> chrono::NaiveDateTime {
        self.inner.now()
    }

    fn sleep(&self, duration: Duration) {
        let Some(stop_file) = &self.stop_file else {
            self.inner.sleep(duration);
            return;
        };

        let step = Duration::from_secs(1);
        let mut remaining = duration;
        while !remaining.is_zero() {
            if stop_file.exists() {
                log::info!("Stop file {} found", stop_file.display());
                self.cancel.cancel();
                return;
            }
            let nap = remaining.min(step);
            self.inner.sleep(nap);
            remaining -= nap;
        }
        if stop_file.exists() {
            self.cancel.cancel();
        }
    }
}

/// Print the digest of a file
fn hash_command(file: &Path, volatile: Option<String>, raw: bool, json: bool) -> Result<()> {
    let digest = if raw {
        ContentDigest {
            value: ContentHasher::raw_digest(file)?,
            precision: DigestPrecision::RawFallback {
                reason: "raw digest requested".to_string(),
            },
        }
    } else {
        // Identity plays no part in the digest
        ContentHasher::digest(file, &ColumnSpec::new(String::new(), volatile))?
    };

    if json {
        println!("{}", JsonFormatter::format(&digest)?);
    } else {
        PrettyPrinter::print_digest(file, &digest);
    }
    Ok(())
}

/// Compare two files and optionally write the audit artifacts
fn diff_command(
    old: &Path,
    new: &Path,
    identity: &str,
    volatile: Option<&str>,
    out_dir: Option<&Path>,
    json: bool,
) -> Result<()> {
    let mut progress = StepReporter::new(!json);

    progress.step("Loading baseline...");
    let old_snapshot = RowStore::load(old, identity)?;
    progress.step("Loading new snapshot...");
    let new_snapshot = RowStore::load(new, identity)?;
    progress.step("Comparing rows...");
    let diff = RowDiffer::diff(Some(&old_snapshot), &new_snapshot, volatile);
    progress.done("Comparison complete");

    let mut request = LoadRequest {
        window: None,
        diff: None,
        deleted: None,
    };
    if let Some(out_dir) = out_dir {
        std::fs::create_dir_all(out_dir)
            .map_err(|e| TabvaultError::filesystem("create directory", out_dir, e))?;
        let names = WorkingDir::new(
            out_dir,
            new.file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(crate::DEFAULT_TARGET_FILENAME),
        );
        let writer = AuditWriter::new(Arc::new(SystemClock), Arc::new(OsFileOps), b';');
        request.diff = writer.write(
            &diff.added_or_modified,
            out_dir,
            &names.diff_artifact_name(),
            &new_snapshot.header,
        )?;
        request.deleted = writer.write(
            &diff.deleted,
            out_dir,
            &names.deleted_artifact_name(),
            &old_snapshot.header,
        )?;
    }

    if json {
        println!(
            "{}",
            JsonFormatter::format_diff(&diff.summary, request.diff.as_deref(), request.deleted.as_deref())?
        );
    } else {
        PrettyPrinter::print_diff_summary(
            &diff.summary,
            request.diff.as_deref(),
            request.deleted.as_deref(),
        );
    }
    Ok(())
}

/// Promote a file to the canonical path
fn accept_command(
    new: &Path,
    target_dir: &Path,
    target_name: &str,
    volatile: Option<String>,
) -> Result<()> {
    let manager = VersionManager::new(
        Arc::new(SystemClock),
        Arc::new(OsFileOps),
        ColumnSpec::new(String::new(), volatile),
    );
    let outcome = manager.accept(new, target_dir, target_name)?;
    PrettyPrinter::print_accept_outcome(&outcome);
    Ok(())
}

fn quarantine_command(paths: Vec<PathBuf>) -> Result<()> {
    let manager = QuarantineManager::new(Arc::new(SystemClock), Arc::new(OsFileOps));
    let paths: Vec<Option<PathBuf>> = paths.into_iter().map(Some).collect();
    let moved = manager.quarantine(&paths);
    PrettyPrinter::print_quarantined(&moved);
    Ok(())
}

fn sweep_command(dir: &Path, max_files: usize, protect: Option<PathBuf>) -> Result<()> {
    let mut sweeper = RetentionSweeper::new(Arc::new(OsFileOps));
    if let Some(protect) = protect {
        sweeper = sweeper.protect(protect);
    }
    let report = sweeper.sweep(dir, max_files)?;
    PrettyPrinter::print_sweep_report(&report);
    Ok(())
}

fn status_command(config_path: Option<&Path>, json: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let working_dir = config.working_dir();
    let stats = working_dir.stats()?;

    if json {
        println!("{}", JsonFormatter::format(&stats)?);
    } else {
        PrettyPrinter::print_working_dir_stats(&working_dir.root, &stats);
    }
    Ok(())
}
