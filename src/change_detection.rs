//! Keyed row-level change detection between two snapshots

use crate::data::{Row, Snapshot};
use serde::Serialize;
use std::collections::HashSet;

/// Rows that changed between the baseline and the new snapshot
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiffResult {
    /// New identities and existing identities whose content changed, in new-file order
    pub added_or_modified: Vec<Row>,
    /// Identities missing from the new snapshot, in baseline order
    pub deleted: Vec<Row>,
    pub summary: DiffSummary,
}

/// Counts behind a [`DiffResult`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    pub added: usize,
    pub modified: usize,
    pub deleted: usize,
    pub unchanged: usize,
    /// Baseline and new headers differed; rows were compared positionally
    pub header_drift: bool,
    /// No baseline existed, so nothing was compared
    pub baseline_missing: bool,
}

impl DiffResult {
    pub fn is_empty(&self) -> bool {
        self.added_or_modified.is_empty() && self.deleted.is_empty()
    }

    pub fn total_changes(&self) -> usize {
        self.added_or_modified.len() + self.deleted.len()
    }
}

/// Compares snapshots by identity
pub struct RowDiffer;

impl RowDiffer {
    /// Classify every row of `new` against `old`.
    ///
    /// Without a baseline the result is empty. The volatile column, when the
    /// header carries it, is left out of row equality on each side.
    pub fn diff(old: Option<&Snapshot>, new: &Snapshot, volatile_column: Option<&str>) -> DiffResult {
        let Some(old) = old else {
            log::info!("No baseline snapshot, skipping row comparison");
            return DiffResult {
                summary: DiffSummary {
                    baseline_missing: true,
                    ..DiffSummary::default()
                },
                ..DiffResult::default()
            };
        };

        let header_drift = old.header != new.header;
        if header_drift {
            log::warn!(
                "HEADER DRIFT: baseline {} has [{}], new {} has [{}]; comparing rows positionally",
                old.source.display(),
                old.header.join(", "),
                new.source.display(),
                new.header.join(", ")
            );
        }

        let old_volatile = volatile_position(&old.header, volatile_column);
        let new_volatile = volatile_position(&new.header, volatile_column);

        let mut summary = DiffSummary {
            header_drift,
            ..DiffSummary::default()
        };
        let mut added_or_modified = Vec::new();
        let mut seen: HashSet<&str> = HashSet::with_capacity(new.len());

        for (identity, row) in &new.rows {
            seen.insert(identity.as_str());
            match old.get(identity) {
                None => {
                    summary.added += 1;
                    added_or_modified.push(row.clone());
                }
                Some(old_row) => {
                    if comparable(old_row, old_volatile) == comparable(row, new_volatile) {
                        summary.unchanged += 1;
                    } else {
                        summary.modified += 1;
                        added_or_modified.push(row.clone());
                    }
                }
            }
        }

        let deleted: Vec<Row> = old
            .rows
            .iter()
            .filter(|(identity, _)| !seen.contains(identity.as_str()))
            .map(|(_, row)| row.clone())
            .collect();
        summary.deleted = deleted.len();

        log::info!(
            "Row comparison: {} added, {} modified, {} deleted, {} unchanged",
            summary.added,
            summary.modified,
            summary.deleted,
            summary.unchanged
        );

        DiffResult {
            added_or_modified,
            deleted,
            summary,
        }
    }
}

fn volatile_position(header: &[String], volatile_column: Option<&str>) -> Option<usize> {
    volatile_column.and_then(|name| header.iter().position(|h| h == name))
}

/// Row fields with the volatile position dropped
fn comparable(row: &Row, volatile: Option<usize>) -> Vec<&str> {
    row.iter()
        .enumerate()
        .filter(|(i, _)| Some(*i) != volatile)
        .map(|(_, field)| field.as_str())
        .collect()
}
