//! Layout and naming of the working directory that holds the canonical snapshot

use crate::error::{Result, TabvaultError};
use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Tag inserted into the names of quarantined files
pub const ERROR_TAG: &str = "ERR";
/// Suffix of the added/modified audit artifact
pub const DIFF_SUFFIX: &str = "Diff";
/// Suffix of the deleted-rows audit artifact
pub const DELETED_SUFFIX: &str = "Del";

/// Split a file name into stem and extension (extension keeps its dot)
pub fn split_name(file_name: &str) -> (&str, &str) {
    match file_name.rfind('.') {
        Some(idx) if idx > 0 => (&file_name[..idx], &file_name[idx..]),
        _ => (file_name, ""),
    }
}

/// `{stem}_{suffix}{ext}`
pub fn with_suffix(file_name: &str, suffix: &str) -> String {
    let (stem, ext) = split_name(file_name);
    format!("{}_{}{}", stem, suffix, ext)
}

/// A sibling of `path` named `{stem}_{suffix}{ext}` that does not exist yet.
///
/// When the name is taken (two rotations within one second) `_2`, `_3`, ...
/// is appended after the suffix.
pub fn free_sibling(path: &Path, suffix: &str) -> Result<PathBuf> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            TabvaultError::invalid_input(format!("Not a file path: {}", path.display()))
        })?;
    let dir = path.parent().unwrap_or_else(|| Path::new(""));

    let candidate = dir.join(with_suffix(file_name, suffix));
    if !candidate.exists() {
        return Ok(candidate);
    }

    let mut n = 2;
    loop {
        let candidate = dir.join(with_suffix(file_name, &format!("{}_{}", suffix, n)));
        if !candidate.exists() {
            return Ok(candidate);
        }
        n += 1;
    }
}

/// Kind of file found in a working directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileRole {
    Canonical,
    Backup,
    DiffArtifact,
    DeletedArtifact,
    Quarantined,
    Other,
}

/// The directory holding one tracked snapshot and everything derived from it
#[derive(Debug, Clone)]
pub struct WorkingDir {
    pub root: PathBuf,
    pub target_filename: String,
}

impl WorkingDir {
    pub fn new(root: impl Into<PathBuf>, target_filename: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            target_filename: target_filename.into(),
        }
    }

    /// Create the directory if it is missing
    pub fn ensure(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root)
            .map_err(|e| TabvaultError::filesystem("create directory", &self.root, e))
    }

    pub fn canonical_path(&self) -> PathBuf {
        self.root.join(&self.target_filename)
    }

    pub fn diff_artifact_name(&self) -> String {
        with_suffix(&self.target_filename, DIFF_SUFFIX)
    }

    pub fn deleted_artifact_name(&self) -> String {
        with_suffix(&self.target_filename, DELETED_SUFFIX)
    }

    /// Classify a file name relative to the canonical name
    pub fn classify(&self, file_name: &str) -> FileRole {
        if file_name == self.target_filename {
            return FileRole::Canonical;
        }
        let (stem, ext) = split_name(&self.target_filename);
        let (name, name_ext) = split_name(file_name);
        if name_ext != ext {
            return FileRole::Other;
        }
        let Some(rest) = name.strip_prefix(stem).and_then(|r| r.strip_prefix('_')) else {
            return FileRole::Other;
        };

        if rest.contains(&format!("{}_", ERROR_TAG)) {
            FileRole::Quarantined
        } else if rest == DIFF_SUFFIX || rest.starts_with(&format!("{}_", DIFF_SUFFIX)) {
            FileRole::DiffArtifact
        } else if rest == DELETED_SUFFIX || rest.starts_with(&format!("{}_", DELETED_SUFFIX)) {
            FileRole::DeletedArtifact
        } else if rest.starts_with(|c: char| c.is_ascii_digit()) {
            FileRole::Backup
        } else {
            FileRole::Other
        }
    }

    /// Count the files in the directory by role
    pub fn stats(&self) -> Result<WorkingDirStats> {
        let mut stats = WorkingDirStats::default();
        if !self.root.exists() {
            return Ok(stats);
        }

        for entry in WalkDir::new(&self.root).min_depth(1).max_depth(1) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let size = entry.metadata()?.len();
            stats.total_files += 1;
            stats.total_size += size;

            let name = entry.file_name().to_string_lossy();
            match self.classify(&name) {
                FileRole::Canonical => stats.canonical_present = true,
                FileRole::Backup => stats.backups += 1,
                FileRole::DiffArtifact => stats.diff_artifacts += 1,
                FileRole::DeletedArtifact => stats.deleted_artifacts += 1,
                FileRole::Quarantined => stats.quarantined += 1,
                FileRole::Other => stats.other += 1,
            }
        }

        Ok(stats)
    }
}

/// Statistics about the working directory
#[derive(Debug, Default, Clone, Serialize)]
pub struct WorkingDirStats {
    pub canonical_present: bool,
    pub backups: usize,
    pub diff_artifacts: usize,
    pub deleted_artifacts: usize,
    pub quarantined: usize,
    pub other: usize,
    pub total_files: usize,
    pub total_size: u64,
}
