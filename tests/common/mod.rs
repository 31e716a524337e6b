//! Common test utilities and helpers

use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tabvault::clock::ManualClock;
use tabvault::config::EngineConfig;
use tabvault::fs_ops::OsFileOps;
use tabvault::loader::{BulkLoader, DroppedFile, LoadRequest};
use tabvault::{Orchestrator, Result, TabvaultError};
use tempfile::TempDir;

/// Timestamp every `ManualClock` from [`TestFixture::clock`] starts at
pub const START_STAMP: &str = "20260102_030405";

/// Test fixture manager for creating temporary working directories
pub struct TestFixture {
    pub temp_dir: TempDir,
}

impl TestFixture {
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp_dir: TempDir::new()?,
        })
    }

    /// Get the root path of the test fixture
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Directory holding the canonical file
    pub fn work_dir(&self) -> PathBuf {
        self.root().join("work")
    }

    /// Where the fetcher drops new snapshots
    pub fn incoming(&self) -> PathBuf {
        self.root().join("incoming.csv")
    }

    pub fn canonical(&self) -> PathBuf {
        self.work_dir().join("R.csv")
    }

    /// Engine configuration pointing at this fixture
    pub fn config(&self) -> EngineConfig {
        EngineConfig {
            target_dir: self.work_dir(),
            target_filename: "R.csv".to_string(),
            incoming: self.incoming(),
            ..EngineConfig::default()
        }
    }

    /// Write a config file for CLI runs and return its path
    pub fn write_config(&self, config: &EngineConfig) -> Result<PathBuf> {
        let path = self.root().join("tabvault.json");
        fs::write(&path, serde_json::to_string_pretty(config)?)?;
        Ok(path)
    }

    pub fn clock(&self) -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            NaiveDate::from_ymd_opt(2026, 1, 2)
                .and_then(|d| d.and_hms_opt(3, 4, 5))
                .expect("valid start time"),
        ))
    }

    /// Create a file with raw content relative to the fixture root
    pub fn create_file(&self, name: &str, content: &str) -> Result<PathBuf> {
        let path = self.root().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        Ok(path)
    }

    /// Drop a new snapshot where the fetcher would
    pub fn drop_incoming(&self, content: &str) -> Result<PathBuf> {
        fs::write(self.incoming(), content)?;
        Ok(self.incoming())
    }

    /// Install a canonical file directly
    pub fn seed_canonical(&self, content: &str) -> Result<PathBuf> {
        fs::create_dir_all(self.work_dir())?;
        fs::write(self.canonical(), content)?;
        Ok(self.canonical())
    }

    /// Path inside the working directory
    pub fn work_file(&self, name: &str) -> PathBuf {
        self.work_dir().join(name)
    }

    pub fn read_work_file(&self, name: &str) -> String {
        fs::read_to_string(self.work_file(name))
            .unwrap_or_else(|e| panic!("could not read {}: {}", name, e))
    }

    /// Sorted file names of the working directory
    pub fn work_files(&self) -> Vec<String> {
        let mut names: Vec<String> = match fs::read_dir(self.work_dir()) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect(),
            Err(_) => Vec::new(),
        };
        names.sort();
        names
    }

    /// Orchestrator over this fixture with a manual clock
    pub fn orchestrator<L: BulkLoader>(
        &self,
        loader: L,
        clock: Arc<ManualClock>,
    ) -> Orchestrator<DroppedFile, L> {
        let config = self.config();
        Orchestrator::new(
            config.clone(),
            DroppedFile::new(&config.incoming),
            loader,
            clock,
            Arc::new(OsFileOps),
        )
    }
}

/// Loader that records every request and optionally refuses them
#[derive(Debug, Default)]
pub struct RecordingLoader {
    pub requests: Vec<LoadRequest>,
    pub fail: bool,
}

impl RecordingLoader {
    pub fn failing() -> Self {
        Self {
            requests: Vec::new(),
            fail: true,
        }
    }
}

impl BulkLoader for &mut RecordingLoader {
    fn load(&mut self, request: &LoadRequest) -> Result<()> {
        self.requests.push(request.clone());
        if self.fail {
            Err(TabvaultError::loader("bulk loader exited with status 1"))
        } else {
            Ok(())
        }
    }
}

/// Helper for running CLI commands in tests
pub struct CliTestRunner {
    fixture: TestFixture,
}

impl CliTestRunner {
    pub fn new() -> Result<Self> {
        Ok(Self {
            fixture: TestFixture::new()?,
        })
    }

    pub fn fixture(&self) -> &TestFixture {
        &self.fixture
    }

    /// Run a tabvault command and return the result
    pub fn run_command(&self, args: &[&str]) -> Result<()> {
        use clap::Parser;
        use tabvault::cli::Cli;
        use tabvault::commands::execute_command;

        let mut cmd_args = vec!["tabvault"];
        cmd_args.extend(args);

        let cli = Cli::try_parse_from(cmd_args)
            .map_err(|e| TabvaultError::invalid_input(e.to_string()))?;

        execute_command(cli.command)
    }

    /// Run a command and expect it to succeed
    pub fn expect_success(&self, args: &[&str]) {
        self.run_command(args).expect("Command should succeed");
    }

    /// Run a command and expect it to fail
    pub fn expect_failure(&self, args: &[&str]) -> TabvaultError {
        self.run_command(args).expect_err("Command should fail")
    }
}

/// Sample snapshots in the `Item;RecordId;...` layout of the exports
pub mod sample_data {
    pub const BASELINE: &str = "Item;RecordId;Product;Amount\n\
                                1;100;Apple;1.50\n\
                                2;101;Banana;0.75\n\
                                3;102;Cherry;2.00\n";

    /// Same rows as [`BASELINE`] in another order with renumbered `Item`
    pub const BASELINE_REORDERED: &str = "Item;RecordId;Product;Amount\n\
                                          1;102;Cherry;2.00\n\
                                          2;100;Apple;1.50\n\
                                          3;101;Banana;0.75\n";

    /// 100 repriced, 102 removed, 103 added
    pub const UPDATED: &str = "Item;RecordId;Product;Amount\n\
                               1;100;Apple;1.60\n\
                               2;101;Banana;0.75\n\
                               3;103;Date;3.00\n";

    pub const COMMA_SEPARATED: &str = "Item,RecordId,Product,Amount\n\
                                       1,100,Apple,1.50\n\
                                       2,101,Banana,0.75\n";
}

/// Assertion helpers for test validation
pub mod assertions {
    use std::path::Path;

    /// Assert that a file exists and is not empty
    pub fn assert_file_exists_and_not_empty(path: &Path) {
        assert!(path.exists(), "File should exist: {}", path.display());
        let metadata = std::fs::metadata(path).expect("Should be able to read file metadata");
        assert!(metadata.len() > 0, "File should not be empty: {}", path.display());
    }

    pub fn assert_not_exists(path: &Path) {
        assert!(!path.exists(), "File should not exist: {}", path.display());
    }

    /// Assert that a file holds exactly `expected`
    pub fn assert_file_content(path: &Path, expected: &str) {
        let content = std::fs::read_to_string(path)
            .unwrap_or_else(|e| panic!("could not read {}: {}", path.display(), e));
        assert_eq!(content, expected, "unexpected content in {}", path.display());
    }
}
