//! Filesystem mutations used by the versioning components

use std::fs;
use std::io;
use std::path::Path;

/// The three mutations the engine performs on the working directory.
///
/// Everything that renames, moves or deletes goes through this trait so a
/// refused operation (locked file, permission denied) can be reproduced.
pub trait FileOps: Send + Sync {
    /// Same-directory rename; expected to be atomic.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Move that may cross filesystems.
    fn move_file(&self, from: &Path, to: &Path) -> io::Result<()>;

    fn remove_file(&self, path: &Path) -> io::Result<()>;
}

/// Operations backed by `std::fs`
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFileOps;

impl FileOps for OsFileOps {
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn move_file(&self, from: &Path, to: &Path) -> io::Result<()> {
        match fs::rename(from, to) {
            Ok(()) => Ok(()),
            Err(e) if is_cross_device(&e) => {
                log::debug!(
                    "Rename across filesystems refused ({}), copying {} to {}",
                    e,
                    from.display(),
                    to.display()
                );
                fs::copy(from, to)?;
                fs::remove_file(from)
            }
            Err(e) => Err(e),
        }
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}

fn is_cross_device(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::CrossesDevices
}
