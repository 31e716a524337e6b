//! Order-insensitive content hashing for tabular files

use crate::data::{ColumnSpec, RawTable, Row};
use crate::error::{Result, TabvaultError};
use md5::{Digest, Md5};
use serde::Serialize;
use std::fs::File;
use std::io;
use std::path::Path;

/// A hash value represented as a hex string
pub type HashValue = String;

/// How much normalization went into a digest
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DigestPrecision {
    /// Header and rows parsed, volatile column dropped, rows sorted
    Normalized,
    /// Parsing failed, the raw bytes were hashed instead
    RawFallback { reason: String },
}

/// Digest of a file together with the precision it was computed at
#[derive(Debug, Clone, Serialize)]
pub struct ContentDigest {
    pub value: HashValue,
    pub precision: DigestPrecision,
}

impl ContentDigest {
    pub fn is_fallback(&self) -> bool {
        matches!(self.precision, DigestPrecision::RawFallback { .. })
    }

    /// Two digests describe the same content
    pub fn same_content(&self, other: &ContentDigest) -> bool {
        self.value == other.value
    }
}

/// Computes change-detection digests.
///
/// The normalized digest ignores row order and the volatile column, so a
/// file whose rows were merely shuffled or renumbered hashes the same.
pub struct ContentHasher;

impl ContentHasher {
    /// Digest of `path` under the given column configuration.
    ///
    /// Falls back to the raw byte digest when the file cannot be parsed, which
    /// can only make two files compare as different, never as equal.
    pub fn digest(path: &Path, columns: &ColumnSpec) -> Result<ContentDigest> {
        let table = match RawTable::read(path) {
            Ok(table) => table,
            Err(TabvaultError::Filesystem { source, .. }) => {
                return Err(TabvaultError::filesystem("hash", path, source))
            }
            Err(e) => return Self::fallback(path, e.to_string()),
        };

        match Self::normalized_bytes(table, columns) {
            Ok(bytes) => Ok(ContentDigest {
                value: hex::encode(Md5::digest(&bytes)),
                precision: DigestPrecision::Normalized,
            }),
            Err(e) => Self::fallback(path, e.to_string()),
        }
    }

    /// MD5 of the file bytes with no normalization
    pub fn raw_digest(path: &Path) -> Result<HashValue> {
        let mut file = File::open(path).map_err(|e| TabvaultError::filesystem("open", path, e))?;
        let mut hasher = Md5::new();
        io::copy(&mut file, &mut hasher).map_err(|e| TabvaultError::filesystem("read", path, e))?;
        Ok(hex::encode(hasher.finalize()))
    }

    /// Canonical byte form: header then sorted rows, volatile column removed,
    /// written back with the file's own delimiter and `\n` line endings.
    pub fn normalized_bytes(table: RawTable, columns: &ColumnSpec) -> Result<Vec<u8>> {
        let RawTable { delimiter, records } = table;
        let mut records = records.into_iter();

        let Some(mut header) = records.next() else {
            return Ok(Vec::new());
        };
        let mut rows: Vec<Row> = records.collect();

        if let Some(idx) = columns.volatile_index(&header) {
            header.remove(idx);
            for row in rows.iter_mut() {
                if row.len() > idx {
                    row.remove(idx);
                }
            }
        }

        rows.sort();

        let mut writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .terminator(csv::Terminator::Any(b'\n'))
            .flexible(true)
            .from_writer(Vec::new());
        writer.write_record(&header)?;
        for row in &rows {
            writer.write_record(row)?;
        }

        writer.into_inner().map_err(|e| {
            TabvaultError::Io(std::io::Error::new(e.error().kind(), e.error().to_string()))
        })
    }

    fn fallback(path: &Path, reason: String) -> Result<ContentDigest> {
        log::warn!(
            "Could not normalize {} for hashing ({}), using raw digest",
            path.display(),
            reason
        );
        Ok(ContentDigest {
            value: Self::raw_digest(path)?,
            precision: DigestPrecision::RawFallback { reason },
        })
    }
}
