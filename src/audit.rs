//! Writing changed rows to rotated audit files

use crate::clock::Clock;
use crate::data::Row;
use crate::error::{Result, TabvaultError};
use crate::fs_ops::FileOps;
use crate::workspace::free_sibling;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Persists row sets as fully quoted delimited files.
///
/// An existing file at the target name is renamed with a timestamp before the
/// new one is written; it is never overwritten or deleted.
pub struct AuditWriter {
    clock: Arc<dyn Clock>,
    fs: Arc<dyn FileOps>,
    delimiter: u8,
}

impl AuditWriter {
    pub fn new(clock: Arc<dyn Clock>, fs: Arc<dyn FileOps>, delimiter: u8) -> Self {
        Self {
            clock,
            fs,
            delimiter,
        }
    }

    /// Write `rows` under `target_dir/base_name` with `header` as first line.
    ///
    /// Returns `None` without touching the filesystem when `rows` is empty.
    pub fn write(
        &self,
        rows: &[Row],
        target_dir: &Path,
        base_name: &str,
        header: &[String],
    ) -> Result<Option<PathBuf>> {
        if rows.is_empty() {
            return Ok(None);
        }

        let final_path = target_dir.join(base_name);
        if final_path.exists() {
            self.rotate(&final_path);
        }

        self.write_rows(&final_path, header, rows)
            .map_err(|e| match e {
                TabvaultError::Io(source) => TabvaultError::filesystem("write", &final_path, source),
                other => other,
            })?;

        log::info!(
            "Wrote audit file {} ({} rows)",
            final_path.display(),
            rows.len()
        );
        Ok(Some(final_path))
    }

    /// Move the current file aside. Failure is logged and the write proceeds.
    fn rotate(&self, path: &Path) {
        let backup = match free_sibling(path, &self.clock.stamp()) {
            Ok(backup) => backup,
            Err(e) => {
                log::warn!("Could not name a backup for {}: {}", path.display(), e);
                return;
            }
        };

        match self.fs.rename(path, &backup) {
            Ok(()) => log::info!("Rotated {} to {}", path.display(), backup.display()),
            Err(source) => {
                let err = TabvaultError::BackupRotation {
                    path: path.to_path_buf(),
                    backup,
                    source,
                };
                log::warn!("{}; overwriting in place", err);
            }
        }
    }

    fn write_rows(&self, path: &Path, header: &[String], rows: &[Row]) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .terminator(csv::Terminator::Any(b'\n'))
            .quote_style(csv::QuoteStyle::Always)
            .flexible(true)
            .from_writer(BufWriter::new(file));

        writer.write_record(header)?;
        for row in rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}
