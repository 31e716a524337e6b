//! Engine configuration loaded from a JSON file

use crate::data::ColumnSpec;
use crate::error::{Result, TabvaultError};
use crate::workspace::{split_name, WorkingDir};
use anyhow::Context;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Date range handed to the downstream loader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ReportWindow {
    /// Format the downstream collaborator expects
    pub const DATE_FORMAT: &'static str = "%d/%m/%Y";

    pub fn start_str(&self) -> String {
        self.start.format(Self::DATE_FORMAT).to_string()
    }

    pub fn end_str(&self) -> String {
        self.end.format(Self::DATE_FORMAT).to_string()
    }
}

/// External program that bulk-loads the audit artifacts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Path the loader sees for the added/modified artifact, if it differs from ours
    #[serde(default)]
    pub diff_path: Option<String>,
    /// Path the loader sees for the deleted artifact, if it differs from ours
    #[serde(default)]
    pub deleted_path: Option<String>,
}

/// Everything a snapshot cycle needs to know
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory holding the canonical file, its backups and audit artifacts
    pub target_dir: PathBuf,
    pub target_filename: String,
    /// Where the fetch collaborator drops each new snapshot
    pub incoming: PathBuf,
    pub identity_column: String,
    pub volatile_column: Option<String>,
    /// Files kept in `target_dir` after each cycle
    pub max_files: usize,
    pub audit_delimiter: char,
    pub report_window: Option<ReportWindow>,
    pub loader: Option<LoaderConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            target_dir: PathBuf::from("."),
            target_filename: crate::DEFAULT_TARGET_FILENAME.to_string(),
            incoming: PathBuf::from(crate::DEFAULT_INCOMING_FILENAME),
            identity_column: crate::DEFAULT_IDENTITY_COLUMN.to_string(),
            volatile_column: Some(crate::DEFAULT_VOLATILE_COLUMN.to_string()),
            max_files: crate::DEFAULT_MAX_FILES,
            audit_delimiter: ';',
            report_window: None,
            loader: None,
        }
    }
}

impl EngineConfig {
    /// Read a JSON config file; missing fields take their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.identity_column.trim().is_empty() {
            return Err(TabvaultError::config("identity_column must not be empty"));
        }
        if self.volatile_column.as_deref() == Some(self.identity_column.as_str()) {
            return Err(TabvaultError::config(
                "volatile_column cannot be the identity column",
            ));
        }
        let (stem, _) = split_name(&self.target_filename);
        if stem.is_empty() || self.target_filename.contains(['/', '\\']) {
            return Err(TabvaultError::config(format!(
                "target_filename '{}' must be a plain file name",
                self.target_filename
            )));
        }
        if !self.audit_delimiter.is_ascii() || matches!(self.audit_delimiter, '"' | '\n' | '\r') {
            return Err(TabvaultError::config(format!(
                "audit_delimiter '{}' must be a single ASCII character other than a quote or newline",
                self.audit_delimiter.escape_default()
            )));
        }
        if let Some(window) = &self.report_window {
            if window.end < window.start {
                return Err(TabvaultError::config(format!(
                    "report_window ends ({}) before it starts ({})",
                    window.end, window.start
                )));
            }
        }
        Ok(())
    }

    pub fn columns(&self) -> ColumnSpec {
        ColumnSpec::new(self.identity_column.clone(), self.volatile_column.clone())
    }

    pub fn working_dir(&self) -> WorkingDir {
        WorkingDir::new(&self.target_dir, &self.target_filename)
    }

    pub fn canonical_path(&self) -> PathBuf {
        self.working_dir().canonical_path()
    }

    /// Delimiter byte for audit artifacts; `validate` guarantees it is ASCII
    pub fn audit_delimiter_byte(&self) -> u8 {
        let mut buf = [0u8; 4];
        self.audit_delimiter.encode_utf8(&mut buf);
        buf[0]
    }
}
