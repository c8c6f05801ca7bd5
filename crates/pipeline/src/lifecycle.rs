use crate::config::LifecycleConfig;
use crate::dedup::ClusterRecord;
use crate::model::{DedupedRecord, LifecycleStage};

/// First matching rule wins; cross-source validation overrides magnitude.
pub fn classify(platform_count: usize, trend_strength: f64, config: &LifecycleConfig) -> LifecycleStage {
    if platform_count >= config.validated_platforms {
        LifecycleStage::Validated
    } else if trend_strength >= config.rising {
        LifecycleStage::Rising
    } else if trend_strength >= config.emerging {
        LifecycleStage::Emerging
    } else {
        LifecycleStage::Watch
    }
}

pub fn assign_lifecycle(records: Vec<ClusterRecord>, config: &LifecycleConfig) -> Vec<DedupedRecord> {
    records
        .into_iter()
        .map(|r| DedupedRecord {
            lifecycle_stage: classify(r.platform_count, r.trend_strength, config),
            item: r.item,
            country: r.country,
            market_type: r.market_type,
            trend_strength: r.trend_strength,
            platform_count: r.platform_count,
            marketplace: r.marketplace,
            urls: r.urls,
        })
        .collect()
}
