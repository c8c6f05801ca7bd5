use std::collections::BTreeMap;

use crate::model::{NormalizedRecord, SignalRecord, Source, TrendInput};

/// Min-max rescale each source's raw scores to `[0, 100]`, independently.
///
/// A source whose scores are all equal maps every row to 0.
pub fn normalize_scores(input: TrendInput) -> Vec<NormalizedRecord> {
    let mut out = Vec::with_capacity(input.total_rows());
    for (_, rows) in input.batches {
        out.extend(normalize_source(rows));
    }
    out
}

fn normalize_source(rows: Vec<SignalRecord>) -> impl Iterator<Item = NormalizedRecord> {
    let (min, max) = rows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), r| {
        (lo.min(r.raw_score), hi.max(r.raw_score))
    });
    let span = max - min;

    rows.into_iter().map(move |signal| {
        let platform_relative_score = if span > 0.0 {
            ((signal.raw_score - min) / span * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        };
        NormalizedRecord { signal, platform_relative_score }
    })
}

/// Row counts per source label, for the run summary.
pub fn rows_per_source(input: &TrendInput) -> BTreeMap<String, usize> {
    input
        .batches
        .iter()
        .map(|(source, rows)| (Source::label(source).to_string(), rows.len()))
        .collect()
}
