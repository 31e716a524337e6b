//! Boundaries to the collaborators on either side of a cycle: the fetcher
//! that produces a new snapshot file and the bulk loader that consumes the
//! audit artifacts.

use crate::config::{LoaderConfig, ReportWindow};
use crate::error::{Result, TabvaultError};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Produces the freshly fetched snapshot for a cycle
pub trait SnapshotSource {
    /// Path of the new file, or `None` when nothing was obtained this cycle
    fn fetch(&mut self) -> Result<Option<PathBuf>>;
}

/// The fetch collaborator drops its output at a fixed path
#[derive(Debug, Clone)]
pub struct DroppedFile {
    path: PathBuf,
}

impl DroppedFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SnapshotSource for DroppedFile {
    fn fetch(&mut self) -> Result<Option<PathBuf>> {
        if self.path.is_file() {
            Ok(Some(self.path.clone()))
        } else {
            log::info!("No new snapshot at {}", self.path.display());
            Ok(None)
        }
    }
}

/// What the downstream loader is asked to apply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub window: Option<ReportWindow>,
    /// Added/modified rows, when any were found
    pub diff: Option<PathBuf>,
    /// Deleted rows, when any were found
    pub deleted: Option<PathBuf>,
}

impl LoadRequest {
    pub fn has_artifacts(&self) -> bool {
        self.diff.is_some() || self.deleted.is_some()
    }
}

/// Applies a changeset downstream. `Ok(())` means the changes were accepted.
pub trait BulkLoader {
    fn load(&mut self, request: &LoadRequest) -> Result<()>;
}

/// Accepts every changeset without doing anything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLoader;

impl BulkLoader for NoLoader {
    fn load(&mut self, request: &LoadRequest) -> Result<()> {
        log::info!(
            "No loader configured; diff={:?} deleted={:?}",
            request.diff,
            request.deleted
        );
        Ok(())
    }
}

/// Runs an external program for each changeset.
///
/// Arguments are the configured ones followed by `--start`/`--end` when a
/// window is set and `--diff`/`--deleted` only for artifacts that exist.
/// A zero exit status is success.
#[derive(Debug, Clone)]
pub struct CommandLoader {
    config: LoaderConfig,
}

impl CommandLoader {
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    /// Arguments for `request`, with configured remote paths substituted
    pub fn arguments(&self, request: &LoadRequest) -> Vec<String> {
        let mut args = self.config.args.clone();
        if let Some(window) = &request.window {
            args.push("--start".to_string());
            args.push(window.start_str());
            args.push("--end".to_string());
            args.push(window.end_str());
        }
        if let Some(diff) = &request.diff {
            args.push("--diff".to_string());
            args.push(visible_path(diff, self.config.diff_path.as_deref()));
        }
        if let Some(deleted) = &request.deleted {
            args.push("--deleted".to_string());
            args.push(visible_path(deleted, self.config.deleted_path.as_deref()));
        }
        args
    }
}

fn visible_path(local: &Path, remote: Option<&str>) -> String {
    match remote {
        Some(remote) => remote.to_string(),
        None => local.display().to_string(),
    }
}

impl BulkLoader for CommandLoader {
    fn load(&mut self, request: &LoadRequest) -> Result<()> {
        let args = self.arguments(request);
        log::info!("Running loader: {} {}", self.config.program, args.join(" "));

        let output = Command::new(&self.config.program)
            .args(&args)
            .output()
            .map_err(|e| {
                TabvaultError::loader(format!("could not start {}: {}", self.config.program, e))
            })?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            log::info!("[loader] {}", line);
        }
        for line in String::from_utf8_lossy(&output.stderr).lines() {
            log::warn!("[loader] {}", line);
        }

        if output.status.success() {
            log::info!("Loader finished");
            Ok(())
        } else {
            Err(TabvaultError::loader(format!(
                "{} exited with {}",
                self.config.program, output.status
            )))
        }
    }
}
