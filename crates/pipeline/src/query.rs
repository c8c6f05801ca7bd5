//! Read-side filtering of the current snapshot.

use serde::Serialize;

use crate::category::CategoryVocabulary;
use crate::model::DedupedRecord;

pub const DEFAULT_QUERY_LIMIT: usize = 50;

/// Shown for records stored without a market type.
pub const DEFAULT_MARKET_TYPE: &str = "Global";

#[derive(Debug, Clone, PartialEq)]
pub struct TrendQuery {
    pub country: Option<String>,
    pub category: Option<String>,
    pub limit: usize,
}

impl Default for TrendQuery {
    fn default() -> Self {
        Self { country: None, category: None, limit: DEFAULT_QUERY_LIMIT }
    }
}

/// A snapshot record with its inferred category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueriedTrend {
    #[serde(flatten)]
    pub record: DedupedRecord,
    pub category: String,
}

/// Filter by country and category (both case-insensitive), sort by trend
/// strength descending and keep the first `limit` rows. A blank market type
/// reads as [`DEFAULT_MARKET_TYPE`].
pub fn query_trends(
    records: &[DedupedRecord],
    query: &TrendQuery,
    vocabulary: &CategoryVocabulary,
) -> Vec<QueriedTrend> {
    let mut hits: Vec<QueriedTrend> = records
        .iter()
        .filter(|r| {
            query.country.as_deref().map_or(true, |c| r.country.eq_ignore_ascii_case(c))
        })
        .map(|r| {
            let mut record = r.clone();
            if record.market_type.trim().is_empty() {
                record.market_type = DEFAULT_MARKET_TYPE.to_string();
            }
            QueriedTrend { category: vocabulary.infer(&r.item).to_string(), record }
        })
        .filter(|t| {
            query.category.as_deref().map_or(true, |c| t.category.eq_ignore_ascii_case(c))
        })
        .collect();

    hits.sort_by(|a, b| b.record.trend_strength.total_cmp(&a.record.trend_strength));
    hits.truncate(query.limit);
    hits
}
