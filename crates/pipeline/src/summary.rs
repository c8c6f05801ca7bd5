use std::collections::BTreeMap;

use crate::model::{DedupedRecord, TrendSummary};

/// Run counters. `merged_rows` is how many aggregated rows were absorbed
/// into another row's cluster.
pub fn compute_summary(
    rows_per_source: BTreeMap<String, usize>,
    aggregated_groups: usize,
    comparisons: usize,
    records: &[DedupedRecord],
) -> TrendSummary {
    let mut stage_counts: BTreeMap<String, usize> = BTreeMap::new();
    for r in records {
        *stage_counts.entry(r.lifecycle_stage.to_string()).or_insert(0) += 1;
    }

    TrendSummary {
        input_rows: rows_per_source.values().sum(),
        rows_per_source,
        aggregated_groups,
        clusters: records.len(),
        merged_rows: aggregated_groups.saturating_sub(records.len()),
        comparisons,
        stage_counts,
    }
}
