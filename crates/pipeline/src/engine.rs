use chrono::NaiveDate;
use tracing::info;

use crate::aggregate::aggregate_records;
use crate::config::TrendConfig;
use crate::dedup::Deduplicator;
use crate::error::Result;
use crate::lifecycle::assign_lifecycle;
use crate::model::{TrendInput, TrendMeta, TrendReport};
use crate::normalize::{normalize_scores, rows_per_source};
use crate::summary::compute_summary;

/// Run the pipeline over pre-loaded batches. No file IO.
///
/// Normalize → aggregate → deduplicate → classify. Output records are sorted
/// by trend strength, descending.
pub fn run(config: &TrendConfig, input: TrendInput, snapshot_date: NaiveDate) -> Result<TrendReport> {
    let deduplicator = Deduplicator::new(&config.dedup)?;
    let per_source = rows_per_source(&input);

    let normalized = normalize_scores(input);
    info!(rows = normalized.len(), "normalized scores");

    let aggregated = aggregate_records(normalized, &config.confidence);
    info!(groups = aggregated.len(), "aggregated signals");

    let outcome = deduplicator.deduplicate(&aggregated);
    info!(
        mode = %config.dedup.mode,
        clusters = outcome.records.len(),
        comparisons = outcome.comparisons,
        "deduplicated"
    );

    let records = assign_lifecycle(outcome.records, &config.lifecycle);
    let summary = compute_summary(per_source, aggregated.len(), outcome.comparisons, &records);

    Ok(TrendReport {
        meta: TrendMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            snapshot_date,
            cluster_mode: config.dedup.mode,
        },
        summary,
        records,
    })
}
