//! Loading delimited tabular files into memory

use crate::dialect::detect_delimiter;
use crate::error::{Result, TabvaultError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// One data row, fields positionally aligned to the header
pub type Row = Vec<String>;

/// Every record of a file, header included, plus the delimiter it was read with
#[derive(Debug, Clone)]
pub struct RawTable {
    pub delimiter: u8,
    pub records: Vec<Row>,
}

impl RawTable {
    /// Read and parse a whole file, detecting its delimiter from the first bytes.
    ///
    /// Rows may have differing lengths. Invalid UTF-8 or broken quoting is an
    /// error.
    pub fn read(path: &Path) -> Result<Self> {
        let content =
            fs::read(path).map_err(|e| TabvaultError::filesystem("read", path, e))?;
        Self::parse(&content)
    }

    pub fn parse(content: &[u8]) -> Result<Self> {
        let delimiter = detect_delimiter(content);
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(content);

        let mut records = Vec::new();
        for result in reader.records() {
            let record = result?;
            records.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self { delimiter, records })
    }
}

/// Names the columns that drive identity and equality
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Header name whose value identifies a row across snapshots
    pub identity: String,
    /// Header name excluded from hashing and row comparison
    pub volatile: Option<String>,
}

impl ColumnSpec {
    pub fn new(identity: impl Into<String>, volatile: Option<String>) -> Self {
        Self {
            identity: identity.into(),
            volatile,
        }
    }

    /// Position of the volatile column in `header`, if it has one
    pub fn volatile_index(&self, header: &[String]) -> Option<usize> {
        self.volatile
            .as_deref()
            .and_then(|name| header.iter().position(|h| h == name))
    }
}

/// A file materialized as header plus rows keyed by identity.
///
/// Iteration follows first appearance in the file; a duplicate identity
/// replaces the earlier row's content.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub source: PathBuf,
    pub delimiter: u8,
    pub header: Row,
    pub identity_index: usize,
    pub rows: IndexMap<String, Row>,
    /// Rows dropped because they were too short to carry an identity
    pub skipped: usize,
    /// Rows that replaced an earlier row with the same identity
    pub duplicates: usize,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, identity: &str) -> Option<&Row> {
        self.rows.get(identity)
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.rows.contains_key(identity)
    }
}

/// Builds [`Snapshot`]s from files on disk
pub struct RowStore;

impl RowStore {
    /// Load `path` keyed by the `identity_column` value of each row.
    ///
    /// Fails when the file has no header or the header lacks the identity
    /// column. Rows too short to reach the identity column are skipped.
    pub fn load(path: &Path, identity_column: &str) -> Result<Snapshot> {
        let table = RawTable::read(path)?;
        Self::from_table(path, table, identity_column)
    }

    pub fn from_table(path: &Path, table: RawTable, identity_column: &str) -> Result<Snapshot> {
        let mut records = table.records.into_iter();
        let header = records
            .next()
            .ok_or_else(|| TabvaultError::structural(path, "file has no header row"))?;

        let identity_index = header
            .iter()
            .position(|h| h == identity_column)
            .ok_or_else(|| {
                TabvaultError::structural(
                    path,
                    format!("identity column '{}' not found in header", identity_column),
                )
            })?;

        let mut rows: IndexMap<String, Row> = IndexMap::new();
        let mut skipped = 0;
        let mut duplicates = 0;

        for (line, row) in records.enumerate() {
            let Some(identity) = row.get(identity_index).cloned() else {
                log::warn!(
                    "Skipping malformed row {} in {}: {} fields, identity column is #{}",
                    line + 2,
                    path.display(),
                    row.len(),
                    identity_index + 1
                );
                skipped += 1;
                continue;
            };

            if rows.insert(identity.clone(), row).is_some() {
                log::debug!(
                    "Duplicate identity '{}' in {}, keeping the later row",
                    identity,
                    path.display()
                );
                duplicates += 1;
            }
        }

        log::debug!(
            "Loaded {} rows from {} ({} skipped, {} duplicates)",
            rows.len(),
            path.display(),
            skipped,
            duplicates
        );

        Ok(Snapshot {
            source: path.to_path_buf(),
            delimiter: table.delimiter,
            header,
            identity_index,
            rows,
            skipped,
            duplicates,
        })
    }
}
