//! Append-only trend history.
//!
//! Each run appends its deduplicated records stamped with the run date.
//! Rows are never merged, so running twice on the same date yields two rows
//! for the same product.

use std::path::Path;

use chrono::NaiveDate;
use tracing::info;

use crate::error::Result;
use crate::model::{DedupedRecord, HistorySnapshot};
use crate::store;

/// Concatenate `records`, stamped with `date`, after the existing rows.
pub fn extend_ledger(
    mut existing: Vec<HistorySnapshot>,
    records: &[DedupedRecord],
    date: NaiveDate,
) -> Vec<HistorySnapshot> {
    existing.extend(records.iter().cloned().map(|record| HistorySnapshot {
        record,
        snapshot_date: date,
    }));
    existing
}

/// Append a run to the ledger at `path`, creating it if absent.
///
/// Returns the ledger's row count after the append.
pub fn append_snapshot(path: &Path, records: &[DedupedRecord], date: NaiveDate) -> Result<usize> {
    let existing = store::read_ledger(path)?;
    let before = existing.len();
    let ledger = extend_ledger(existing, records, date);
    store::write_ledger(path, &ledger)?;
    info!(
        path = %path.display(),
        appended = ledger.len() - before,
        total = ledger.len(),
        "history ledger updated"
    );
    Ok(ledger.len())
}

/// Filter ledger rows by item substring and exact country, both
/// case-insensitive. Ledger order is kept.
pub fn filter_history<'a>(
    rows: &'a [HistorySnapshot],
    item: Option<&str>,
    country: Option<&str>,
) -> Vec<&'a HistorySnapshot> {
    let item = item.map(str::to_lowercase);
    rows.iter()
        .filter(|row| {
            item.as_deref()
                .map_or(true, |needle| row.record.item.to_lowercase().contains(needle))
        })
        .filter(|row| country.map_or(true, |c| row.record.country.eq_ignore_ascii_case(c)))
        .collect()
}
