//! Parking artifacts of a failed cycle under error-tagged names

use crate::clock::Clock;
use crate::fs_ops::FileOps;
use crate::workspace::{free_sibling, ERROR_TAG};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Best-effort relocation of files that must not be promoted.
///
/// Nothing here returns an error: missing files are skipped and refused
/// renames are logged.
pub struct QuarantineManager {
    clock: Arc<dyn Clock>,
    fs: Arc<dyn FileOps>,
}

impl QuarantineManager {
    pub fn new(clock: Arc<dyn Clock>, fs: Arc<dyn FileOps>) -> Self {
        Self { clock, fs }
    }

    /// Rename each present, existing path to `{stem}_ERR_{stamp}{ext}` in place.
    ///
    /// Returns the new names of the files that were moved.
    pub fn quarantine(&self, paths: &[Option<PathBuf>]) -> Vec<PathBuf> {
        let suffix = self.suffix();
        let mut moved = Vec::new();

        for path in paths.iter().flatten() {
            if !path.exists() {
                continue;
            }
            let target = match free_sibling(path, &suffix) {
                Ok(target) => target,
                Err(e) => {
                    log::error!("Could not quarantine {}: {}", path.display(), e);
                    continue;
                }
            };
            match self.fs.rename(path, &target) {
                Ok(()) => {
                    log::warn!("Quarantined {} as {}", path.display(), target.display());
                    moved.push(target);
                }
                Err(e) => log::error!("Could not quarantine {}: {}", path.display(), e),
            }
        }

        moved
    }

    /// Move a rejected incoming file next to the canonical one as
    /// `{canonical stem}_ERR_{stamp}{ext}`, leaving the canonical file alone.
    pub fn park(&self, incoming: &Path, target_dir: &Path, target_filename: &str) -> Option<PathBuf> {
        if !incoming.exists() {
            return None;
        }

        let target = match free_sibling(&target_dir.join(target_filename), &self.suffix()) {
            Ok(target) => target,
            Err(e) => {
                log::error!("Could not park {}: {}", incoming.display(), e);
                return None;
            }
        };

        match self.fs.move_file(incoming, &target) {
            Ok(()) => {
                log::warn!("Rejected snapshot kept as {}", target.display());
                Some(target)
            }
            Err(e) => {
                log::error!("Could not park {}: {}", incoming.display(), e);
                None
            }
        }
    }

    fn suffix(&self) -> String {
        format!("{}_{}", ERROR_TAG, self.clock.stamp())
    }
}
