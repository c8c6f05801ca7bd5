use std::collections::{BTreeMap, BTreeSet};

use crate::config::ConfidenceConfig;
use crate::model::{AggregateKey, AggregatedRecord, NormalizedRecord, Source};

/// Group rows by exact (item, country, market_type), sum relative scores,
/// collect distinct sources and URLs.
///
/// Output is in canonical order: weighted strength descending, ties by key
/// ascending. This order seeds the deduplicator.
pub fn aggregate_records(
    rows: Vec<NormalizedRecord>,
    confidence: &ConfidenceConfig,
) -> Vec<AggregatedRecord> {
    let mut groups: BTreeMap<AggregateKey, (f64, BTreeSet<Source>, BTreeSet<String>)> =
        BTreeMap::new();

    for row in rows {
        let NormalizedRecord { signal, platform_relative_score } = row;
        let key = AggregateKey {
            item: signal.item,
            country: signal.country,
            market_type: signal.market_type,
        };
        let entry = groups.entry(key).or_default();
        entry.0 += platform_relative_score;
        entry.1.insert(signal.source);
        if !signal.url.is_empty() {
            entry.2.insert(signal.url);
        }
    }

    let mut aggregated: Vec<AggregatedRecord> = groups
        .into_iter()
        .map(|(key, (base_strength, sources, urls))| AggregatedRecord {
            item: key.item,
            country: key.country,
            market_type: key.market_type,
            base_strength,
            confidence_multiplier: confidence.multiplier(sources.len()),
            platform_count: sources.len(),
            sources,
            urls,
        })
        .collect();

    // Stable: ties keep the BTreeMap key order.
    aggregated.sort_by(|a, b| b.weighted_strength().total_cmp(&a.weighted_strength()));
    aggregated
}
