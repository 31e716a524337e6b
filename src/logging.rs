//! Process-wide logger setup with an explicit handle for the log file

use crate::error::{Result, TabvaultError};
use anyhow::Context;
use chrono::Local;
use log::LevelFilter;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// How the logger should be set up
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    pub verbose: bool,
    /// Append every line to this file as well as stderr
    pub file: Option<PathBuf>,
}

type SharedFile = Arc<Mutex<BufWriter<File>>>;

/// Owns the log file for the life of the process; dropping it flushes.
#[derive(Debug)]
pub struct LogHandle {
    file: Option<SharedFile>,
    path: Option<PathBuf>,
}

impl LogHandle {
    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    pub fn flush(&self) {
        if let Some(file) = &self.file {
            if let Ok(mut file) = file.lock() {
                let _ = file.flush();
            }
        }
    }

    /// Flush and release the file
    pub fn shutdown(mut self) {
        self.flush();
        self.file = None;
    }
}

impl Drop for LogHandle {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Writes each formatted line to stderr and, if open, to the log file
struct TeeWriter {
    file: Option<SharedFile>,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        if let Some(file) = &self.file {
            if let Ok(mut file) = file.lock() {
                // The console copy already went out
                if let Err(e) = file.write_all(buf) {
                    let _ = writeln!(io::stderr(), "[LOG ERROR] could not write log file: {}", e);
                }
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        if let Some(file) = &self.file {
            if let Ok(mut file) = file.lock() {
                file.flush()?;
            }
        }
        Ok(())
    }
}

/// Install the global logger. Call once, at startup.
///
/// Lines look like `[2026-01-15 08:05:09] [INFO] message`. `RUST_LOG`
/// overrides the default level.
pub fn init(options: LogOptions) -> Result<LogHandle> {
    let file = match &options.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            Some(Arc::new(Mutex::new(BufWriter::new(file))))
        }
        None => None,
    };

    let level = if options.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(level)
        .parse_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] [{}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(TeeWriter { file: file.clone() })));

    builder
        .try_init()
        .map_err(|e| TabvaultError::config(format!("logger already initialized: {}", e)))?;

    Ok(LogHandle {
        file,
        path: options.file,
    })
}
