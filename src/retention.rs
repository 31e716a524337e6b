//! Capping the number of files kept in the working directory

use crate::error::Result;
use crate::fs_ops::FileOps;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use walkdir::WalkDir;

/// Result of a sweep
#[derive(Debug, Default, Clone, Serialize)]
pub struct SweepReport {
    pub examined: usize,
    pub kept: usize,
    pub deleted: Vec<PathBuf>,
    /// Files that should have been deleted but could not be
    pub failed: Vec<PathBuf>,
    pub bytes_freed: u64,
}

/// Deletes the oldest files beyond a maximum count
pub struct RetentionSweeper {
    fs: Arc<dyn FileOps>,
    protected: Vec<PathBuf>,
}

impl RetentionSweeper {
    pub fn new(fs: Arc<dyn FileOps>) -> Self {
        Self {
            fs,
            protected: Vec::new(),
        }
    }

    /// Never delete `path`, whatever its age
    pub fn protect(mut self, path: impl Into<PathBuf>) -> Self {
        self.protected.push(path.into());
        self
    }

    /// Keep the `max_files` most recently modified files of `directory`.
    ///
    /// Only regular files directly inside `directory` count. Protected files
    /// are never deleted and take up part of the quota, so at most
    /// `max_files` remain unless more than that are protected.
    pub fn sweep(&self, directory: &Path, max_files: usize) -> Result<SweepReport> {
        let mut files: Vec<(PathBuf, SystemTime, u64)> = Vec::new();
        for entry in WalkDir::new(directory).min_depth(1).max_depth(1) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let metadata = entry.metadata()?;
            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            files.push((entry.into_path(), modified, metadata.len()));
        }

        let mut report = SweepReport {
            examined: files.len(),
            ..SweepReport::default()
        };

        if files.len() <= max_files {
            report.kept = files.len();
            return Ok(report);
        }

        let (protected, mut candidates): (Vec<_>, Vec<_>) =
            files.into_iter().partition(|(path, _, _)| self.is_protected(path));
        for (path, _, _) in &protected {
            log::debug!("Retaining protected file {}", path.display());
        }
        let slots = max_files.saturating_sub(protected.len());
        report.kept = protected.len() + slots.min(candidates.len());

        // Newest first
        candidates.sort_by(|a, b| b.1.cmp(&a.1));

        for (path, _, size) in candidates.into_iter().skip(slots) {
            match self.fs.remove_file(&path) {
                Ok(()) => {
                    log::info!("Removed old file: {}", path.display());
                    report.bytes_freed += size;
                    report.deleted.push(path);
                }
                Err(e) => {
                    log::error!("Could not remove {}: {}", path.display(), e);
                    report.failed.push(path);
                }
            }
        }

        Ok(report)
    }

    fn is_protected(&self, path: &Path) -> bool {
        self.protected.iter().any(|p| p == path)
    }
}
