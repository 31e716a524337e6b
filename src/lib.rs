//! # tabvault
//!
//! Keeps a single canonical copy of a periodically re-fetched tabular file,
//! detects row-level changes against the previous copy and hands those
//! changes to a downstream loader before promoting the new version.

pub mod audit;
pub mod change_detection;
pub mod cli;
pub mod clock;
pub mod commands;
pub mod config;
pub mod data;
pub mod dialect;
pub mod error;
pub mod fs_ops;
pub mod hash;
pub mod loader;
pub mod logging;
pub mod orchestrator;
pub mod output;
pub mod progress;
pub mod quarantine;
pub mod retention;
pub mod versioning;
pub mod workspace;

pub use change_detection::{DiffResult, DiffSummary, RowDiffer};
pub use config::EngineConfig;
pub use data::{ColumnSpec, RowStore, Snapshot};
pub use error::{Result, TabvaultError};
pub use hash::{ContentDigest, ContentHasher};
pub use orchestrator::{CancellationToken, CycleOutcome, Orchestrator, RepeatPolicy};
pub use versioning::{AcceptOutcome, VersionManager};

/// Canonical file name when none is configured
pub const DEFAULT_TARGET_FILENAME: &str = "snapshot.csv";

/// Where the fetcher drops each new snapshot
pub const DEFAULT_INCOMING_FILENAME: &str = "download_temp.csv";

pub const DEFAULT_IDENTITY_COLUMN: &str = "RecordId";

/// Per-export row counter that changes between otherwise identical files
pub const DEFAULT_VOLATILE_COLUMN: &str = "Item";

/// Files kept in the working directory after each cycle
pub const DEFAULT_MAX_FILES: usize = 50;

/// Log file used by `run` when `--log-file` is not given
pub const DEFAULT_LOG_FILE: &str = "logs.txt";
