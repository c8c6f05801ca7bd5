//! CSV persistence for the current-day snapshot and the history ledger.
//!
//! URL lists are written as JSON arrays in a single cell. Files written by
//! older collectors may hold a bracketed list of single-quoted strings
//! (`['a', 'b']`). Those are still read; anything else reads as an empty set.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::NaiveDate;
use tracing::debug;

use crate::error::{Result, TrendError};
use crate::model::{DedupedRecord, HistorySnapshot};

pub const SNAPSHOT_COLUMNS: [&str; 8] = [
    "item",
    "country",
    "market_type",
    "trend_strength",
    "platform_count",
    "marketplace",
    "urls",
    "lifecycle_stage",
];

pub const SNAPSHOT_DATE_COLUMN: &str = "snapshot_date";

// ---------------------------------------------------------------------------
// Write
// ---------------------------------------------------------------------------

/// Overwrite the current-day snapshot.
pub fn write_snapshot(path: &Path, records: &[DedupedRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(SNAPSHOT_COLUMNS).map_err(|e| TrendError::csv(path, e))?;
    for record in records {
        writer.write_record(record_fields(record)).map_err(|e| TrendError::csv(path, e))?;
    }
    finish(path, writer)
}

/// Rewrite the whole ledger.
pub fn write_ledger(path: &Path, rows: &[HistorySnapshot]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let header = SNAPSHOT_COLUMNS.iter().copied().chain([SNAPSHOT_DATE_COLUMN]);
    writer.write_record(header).map_err(|e| TrendError::csv(path, e))?;
    for row in rows {
        let date = row.snapshot_date.format("%Y-%m-%d").to_string();
        let fields = record_fields(&row.record).into_iter().chain([date]);
        writer.write_record(fields).map_err(|e| TrendError::csv(path, e))?;
    }
    finish(path, writer)
}

fn record_fields(r: &DedupedRecord) -> [String; 8] {
    [
        r.item.clone(),
        r.country.clone(),
        r.market_type.clone(),
        format!("{:.2}", r.trend_strength),
        r.platform_count.to_string(),
        r.marketplace_label(),
        format_url_cell(&r.urls),
        r.lifecycle_stage.to_string(),
    ]
}

fn finish(path: &Path, writer: csv::Writer<Vec<u8>>) -> Result<()> {
    let bytes = writer.into_inner().map_err(|e| TrendError::csv(path, e))?;
    write_atomic(path, &bytes)
}

/// Write to a sibling temp file, then rename over the target.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| TrendError::io(parent, e))?;
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "trendlens".into());
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));
    std::fs::write(&tmp, bytes).map_err(|e| TrendError::io(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(TrendError::io(path, e));
    }
    Ok(())
}

pub fn format_url_cell(urls: &BTreeSet<String>) -> String {
    serde_json::to_string(urls).unwrap_or_else(|_| "[]".into())
}

// ---------------------------------------------------------------------------
// Read
// ---------------------------------------------------------------------------

pub fn read_snapshot(path: &Path) -> Result<Vec<DedupedRecord>> {
    let data = std::fs::read_to_string(path).map_err(|e| TrendError::io(path, e))?;
    parse_rows(path, &data, false).map(|rows| rows.into_iter().map(|(r, _)| r).collect())
}

/// Read the ledger; a missing file is an empty ledger.
pub fn read_ledger(path: &Path) -> Result<Vec<HistorySnapshot>> {
    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(TrendError::io(path, e)),
    };
    let rows = parse_rows(path, &data, true)?;
    rows.into_iter()
        .enumerate()
        .map(|(n, (record, date))| {
            date.map(|snapshot_date| HistorySnapshot { record, snapshot_date })
                .ok_or_else(|| TrendError::LedgerParse {
                    row: n + 2,
                    message: "missing snapshot_date".into(),
                })
        })
        .collect()
}

fn parse_rows(
    path: &Path,
    data: &str,
    with_date: bool,
) -> Result<Vec<(DedupedRecord, Option<NaiveDate>)>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(data.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| TrendError::csv(path, e))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let idx = |name: &str| -> Result<usize> {
        headers.iter().position(|h| h == name).ok_or_else(|| TrendError::LedgerParse {
            row: 1,
            message: format!("missing column '{name}'"),
        })
    };

    let [item_i, country_i, market_i, strength_i, count_i, marketplace_i, urls_i, stage_i] = [
        idx("item")?,
        idx("country")?,
        idx("market_type")?,
        idx("trend_strength")?,
        idx("platform_count")?,
        idx("marketplace")?,
        idx("urls")?,
        idx("lifecycle_stage")?,
    ];
    let date_i = if with_date { Some(idx(SNAPSHOT_DATE_COLUMN)?) } else { None };

    let mut rows = Vec::new();
    for (n, record) in reader.records().enumerate() {
        let record = record.map_err(|e| TrendError::csv(path, e))?;
        let row = n + 2;
        let cell = |i: usize| record.get(i).unwrap_or("").trim();
        let bad = |message: String| TrendError::LedgerParse { row, message };

        let trend_strength: f64 = cell(strength_i)
            .parse()
            .map_err(|_| bad(format!("bad trend_strength '{}'", cell(strength_i))))?;
        let platform_count = parse_count(cell(count_i))
            .ok_or_else(|| bad(format!("bad platform_count '{}'", cell(count_i))))?;
        let lifecycle_stage = cell(stage_i).parse().map_err(bad)?;
        let date = match date_i {
            Some(i) => Some(
                NaiveDate::parse_from_str(cell(i), "%Y-%m-%d")
                    .map_err(|_| bad(format!("bad snapshot_date '{}'", cell(i))))?,
            ),
            None => None,
        };

        let record = DedupedRecord {
            item: cell(item_i).to_string(),
            country: cell(country_i).to_string(),
            market_type: cell(market_i).to_string(),
            trend_strength,
            platform_count,
            marketplace: parse_marketplace(cell(marketplace_i)),
            urls: parse_url_cell(cell(urls_i)),
            lifecycle_stage,
        };
        rows.push((record, date));
    }
    Ok(rows)
}

/// Accepts integer or float-formatted counts ("2", "2.0").
fn parse_count(cell: &str) -> Option<usize> {
    if let Ok(n) = cell.parse::<usize>() {
        return Some(n);
    }
    let f: f64 = cell.parse().ok()?;
    (f.is_finite() && f >= 0.0 && f.fract() == 0.0).then_some(f as usize)
}

fn parse_marketplace(cell: &str) -> BTreeSet<String> {
    cell.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Parse a URL-list cell. Never fails: unreadable cells are empty sets.
pub fn parse_url_cell(cell: &str) -> BTreeSet<String> {
    let cell = cell.trim();
    if cell.is_empty() {
        return BTreeSet::new();
    }
    if let Ok(urls) = serde_json::from_str::<Vec<String>>(cell) {
        return urls.into_iter().filter(|u| !u.is_empty()).collect();
    }
    match parse_list_literal(cell) {
        Some(urls) => urls.into_iter().filter(|u| !u.is_empty()).collect(),
        None => {
            debug!(cell, "unreadable URL list, treating as empty");
            BTreeSet::new()
        }
    }
}

/// Parse `['a', "b"]`-style list literals of quoted strings.
fn parse_list_literal(cell: &str) -> Option<Vec<String>> {
    let inner = cell.strip_prefix('[')?.strip_suffix(']')?;
    let mut items = Vec::new();
    let mut chars = inner.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        let quote = match chars.next() {
            None => break,
            Some(q @ ('\'' | '"')) => q,
            Some(_) => return None,
        };

        let mut item = String::new();
        loop {
            match chars.next()? {
                '\\' => item.push(chars.next()?),
                c if c == quote => break,
                c => item.push(c),
            }
        }
        items.push(item);

        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        match chars.next() {
            None => break,
            Some(',') => continue,
            Some(_) => return None,
        }
    }

    Some(items)
}
