use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::ClusterMode;

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// A marketplace or search platform that produces signal batches.
///
/// Declaration order is the canonical load order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Amazon,
    Ebay,
    AliExpress,
    Etsy,
    Reddit,
    YouTube,
}

impl Source {
    pub const ALL: [Source; 6] = [
        Self::Amazon,
        Self::Ebay,
        Self::AliExpress,
        Self::Etsy,
        Self::Reddit,
        Self::YouTube,
    ];

    /// Human-facing label, as written to the `marketplace` column.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Amazon => "Amazon",
            Self::Ebay => "eBay",
            Self::AliExpress => "AliExpress",
            Self::Etsy => "Etsy",
            Self::Reddit => "Reddit",
            Self::YouTube => "YouTube",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.label())
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One row of evidence from exactly one source.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalRecord {
    pub item: String,
    pub raw_score: f64,
    pub url: String,
    pub country: String,
    pub market_type: String,
    pub source: Source,
}

/// Pre-loaded signal batches keyed by source. Absent sources have no entry.
#[derive(Debug, Clone, Default)]
pub struct TrendInput {
    pub batches: BTreeMap<Source, Vec<SignalRecord>>,
}

impl TrendInput {
    pub fn total_rows(&self) -> usize {
        self.batches.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_rows() == 0
    }
}

// ---------------------------------------------------------------------------
// Normalization + Aggregation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub signal: SignalRecord,
    /// Per-source min-max rescaled score in `[0, 100]`.
    pub platform_relative_score: f64,
}

/// Aggregate key = exact (item, country, market_type) text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AggregateKey {
    pub item: String,
    pub country: String,
    pub market_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedRecord {
    pub item: String,
    pub country: String,
    pub market_type: String,
    pub base_strength: f64,
    pub confidence_multiplier: f64,
    pub platform_count: usize,
    pub sources: BTreeSet<Source>,
    pub urls: BTreeSet<String>,
}

impl AggregatedRecord {
    pub fn weighted_strength(&self) -> f64 {
        self.base_strength * self.confidence_multiplier
    }

    /// Sorted, comma-joined source labels.
    pub fn sources_label(&self) -> String {
        let labels: BTreeSet<&str> = self.sources.iter().map(Source::label).collect();
        labels.into_iter().collect::<Vec<_>>().join(", ")
    }
}

// ---------------------------------------------------------------------------
// Dedup + Lifecycle
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleStage {
    Validated,
    Rising,
    Emerging,
    Watch,
}

impl LifecycleStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validated => "Validated",
            Self::Rising => "Rising",
            Self::Emerging => "Emerging",
            Self::Watch => "Watch",
        }
    }
}

impl std::fmt::Display for LifecycleStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for LifecycleStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Validated" => Ok(Self::Validated),
            "Rising" => Ok(Self::Rising),
            "Emerging" => Ok(Self::Emerging),
            "Watch" => Ok(Self::Watch),
            other => Err(format!("unknown lifecycle stage '{other}'")),
        }
    }
}

/// One canonical product per dedup cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DedupedRecord {
    pub item: String,
    pub country: String,
    pub market_type: String,
    pub trend_strength: f64,
    pub platform_count: usize,
    pub marketplace: BTreeSet<String>,
    pub urls: BTreeSet<String>,
    pub lifecycle_stage: LifecycleStage,
}

impl DedupedRecord {
    pub fn marketplace_label(&self) -> String {
        self.marketplace.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
    }
}

/// A deduped record stamped with the run date it was observed on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    #[serde(flatten)]
    pub record: DedupedRecord,
    pub snapshot_date: NaiveDate,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrendSummary {
    pub input_rows: usize,
    pub rows_per_source: BTreeMap<String, usize>,
    pub aggregated_groups: usize,
    pub clusters: usize,
    /// Aggregated rows absorbed into another row's cluster.
    pub merged_rows: usize,
    pub comparisons: usize,
    pub stage_counts: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
    pub snapshot_date: NaiveDate,
    pub cluster_mode: ClusterMode,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendReport {
    pub meta: TrendMeta,
    pub summary: TrendSummary,
    pub records: Vec<DedupedRecord>,
}
