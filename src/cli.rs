//! Command-line interface for tabvault

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tabvault")]
#[command(about = "Versioning and row-level change detection for tabular snapshots")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Also append log lines to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run snapshot cycles: diff, hand off to the loader, then promote or quarantine
    Run {
        /// JSON configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Where the fetcher drops each new snapshot (overrides config)
        #[arg(long)]
        input: Option<PathBuf>,

        /// Repeat every N seconds instead of running once
        #[arg(long, value_parser = validate_interval)]
        interval: Option<u64>,

        /// Stop after this many cycles
        #[arg(long, requires = "interval")]
        max_cycles: Option<usize>,

        /// Stop looping once this file exists
        #[arg(long)]
        stop_file: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compute the order-insensitive digest of a file
    Hash {
        /// File to hash
        file: PathBuf,

        /// Column left out of the digest
        #[arg(long)]
        volatile: Option<String>,

        /// Hash the raw bytes without normalization
        #[arg(long)]
        raw: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compare two files row by row
    Diff {
        /// Baseline file
        old: PathBuf,

        /// New file
        new: PathBuf,

        /// Column identifying each row
        #[arg(long)]
        identity: String,

        /// Column ignored when comparing rows
        #[arg(long)]
        volatile: Option<String>,

        /// Write _Diff/_Del files into this directory
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Promote a new file to the canonical path unless it is identical
    Accept {
        /// Newly fetched file
        new: PathBuf,

        /// Directory of the canonical file
        #[arg(long)]
        target_dir: PathBuf,

        /// Canonical file name
        #[arg(long)]
        target_name: String,

        /// Column ignored when comparing contents
        #[arg(long)]
        volatile: Option<String>,
    },

    /// Rename files to error-tagged names
    Quarantine {
        /// Files to quarantine; missing ones are skipped
        paths: Vec<PathBuf>,
    },

    /// Delete the oldest files beyond a maximum count
    Sweep {
        /// Directory to sweep
        dir: PathBuf,

        /// Number of most recent files to keep
        #[arg(long)]
        max_files: usize,

        /// File that must never be deleted
        #[arg(long)]
        protect: Option<PathBuf>,
    },

    /// Show what the working directory contains
    Status {
        /// JSON configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Validate that the loop interval is greater than 0
fn validate_interval(s: &str) -> Result<u64, String> {
    let secs: u64 = s
        .parse()
        .map_err(|_| format!("Invalid interval: '{}'. Must be a positive integer.", s))?;

    if secs == 0 {
        return Err("Interval must be greater than 0".to_string());
    }

    Ok(secs)
}
