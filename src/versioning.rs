//! Promotion of a new snapshot file to the canonical path

use crate::clock::Clock;
use crate::data::ColumnSpec;
use crate::error::{Result, TabvaultError};
use crate::fs_ops::FileOps;
use crate::hash::ContentHasher;
use crate::workspace::free_sibling;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// What `accept` did with the new file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AcceptOutcome {
    /// No canonical file existed; the new file became it
    Created { canonical: PathBuf },
    /// Content differed; the old canonical file was kept as `backup`
    Replaced { canonical: PathBuf, backup: PathBuf },
    /// Content matched the canonical file; the new file was deleted
    DiscardedIdentical { canonical: PathBuf },
}

/// Decides between create, replace and discard for the canonical file.
///
/// The canonical path is never left empty: the old file is only moved aside
/// once its backup name is secured, and is moved back if the new file cannot
/// take its place.
pub struct VersionManager {
    clock: Arc<dyn Clock>,
    fs: Arc<dyn FileOps>,
    columns: ColumnSpec,
}

impl VersionManager {
    pub fn new(clock: Arc<dyn Clock>, fs: Arc<dyn FileOps>, columns: ColumnSpec) -> Self {
        Self { clock, fs, columns }
    }

    pub fn accept(
        &self,
        new_file: &Path,
        target_dir: &Path,
        target_filename: &str,
    ) -> Result<AcceptOutcome> {
        if !new_file.is_file() {
            return Err(TabvaultError::invalid_input(format!(
                "New snapshot does not exist: {}",
                new_file.display()
            )));
        }

        let canonical = target_dir.join(target_filename);

        if !canonical.exists() {
            log::info!("No previous file, creating {}", canonical.display());
            self.fs
                .move_file(new_file, &canonical)
                .map_err(|e| TabvaultError::filesystem("move into place", new_file, e))?;
            return Ok(AcceptOutcome::Created { canonical });
        }

        let new_digest = ContentHasher::digest(new_file, &self.columns)?;
        let old_digest = ContentHasher::digest(&canonical, &self.columns)?;

        if new_digest.same_content(&old_digest) {
            log::info!(
                "New snapshot is identical to {}, discarding it",
                canonical.display()
            );
            self.fs
                .remove_file(new_file)
                .map_err(|e| TabvaultError::filesystem("delete", new_file, e))?;
            return Ok(AcceptOutcome::DiscardedIdentical { canonical });
        }

        log::info!(
            "Snapshot changed ({} -> {})",
            old_digest.value,
            new_digest.value
        );

        let backup = free_sibling(&canonical, &self.clock.stamp())?;
        if let Err(source) = self.fs.rename(&canonical, &backup) {
            let err = TabvaultError::BackupRotation {
                path: canonical.clone(),
                backup,
                source,
            };
            log::error!("{}; leaving {} for the next cycle", err, new_file.display());
            return Err(err);
        }
        log::info!("Previous snapshot kept as {}", backup.display());

        if let Err(e) = self.fs.move_file(new_file, &canonical) {
            log::error!(
                "Could not move {} into place: {}; restoring previous snapshot",
                new_file.display(),
                e
            );
            if let Err(restore) = self.fs.rename(&backup, &canonical) {
                log::error!(
                    "Restoring {} from {} failed: {}",
                    canonical.display(),
                    backup.display(),
                    restore
                );
            }
            return Err(TabvaultError::filesystem("move into place", new_file, e));
        }

        log::info!("Snapshot updated at {}", canonical.display());
        Ok(AcceptOutcome::Replaced { canonical, backup })
    }
}
