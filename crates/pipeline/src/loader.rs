use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::{SourceConfig, TrendConfig};
use crate::error::{Result, TrendError};
use crate::model::{SignalRecord, Source, TrendInput};

/// Load CSV rows for one source, applying the column mapping and row limit.
///
/// Every mapped column must be present. An unmapped `market_type` falls
/// back to `default_market_type`.
pub fn load_csv_rows(
    source: Source,
    csv_data: &str,
    source_config: &SourceConfig,
    default_market_type: &str,
) -> Result<Vec<SignalRecord>> {
    let origin = PathBuf::from(&source_config.file);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(csv_data.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| TrendError::csv(&origin, e))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let col = &source_config.columns;

    let idx = |name: &str| -> Result<usize> {
        headers.iter().position(|h| h == name).ok_or_else(|| TrendError::MissingColumn {
            platform: source,
            column: name.into(),
        })
    };

    let item_idx = idx(&col.item)?;
    let score_idx = idx(&col.raw_score)?;
    let url_idx = idx(&col.url)?;
    let country_idx = idx(&col.country)?;
    let market_type_idx = col.market_type.as_deref().map(|name| idx(name)).transpose()?;

    let mut rows = Vec::new();

    for (n, record) in reader.records().enumerate() {
        let record = record.map_err(|e| TrendError::csv(&origin, e))?;
        // Header is line 1.
        let row = n + 2;

        let score_str = record.get(score_idx).unwrap_or("").trim();
        let raw_score = score_str
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| TrendError::ScoreParse {
                platform: source,
                row,
                value: score_str.into(),
            })?;

        let market_type = match market_type_idx {
            Some(i) => record.get(i).unwrap_or("").to_string(),
            None => default_market_type.to_string(),
        };

        rows.push(SignalRecord {
            item: record.get(item_idx).unwrap_or("").to_string(),
            raw_score,
            url: record.get(url_idx).unwrap_or("").trim().to_string(),
            country: record.get(country_idx).unwrap_or("").to_string(),
            market_type,
            source,
        });
    }

    // Stable: equal scores keep file order.
    rows.sort_by(|a, b| b.raw_score.total_cmp(&a.raw_score));
    if rows.len() > source_config.limit {
        debug!(%source, kept = source_config.limit, dropped = rows.len() - source_config.limit, "applied row limit");
        rows.truncate(source_config.limit);
    }

    Ok(rows)
}

/// Load every configured source whose batch file exists.
///
/// Missing files are skipped. If none exist the input is empty, which is
/// not an error.
pub fn load_sources(config: &TrendConfig, base_dir: &Path) -> Result<TrendInput> {
    let mut input = TrendInput::default();

    for (&source, source_config) in &config.sources {
        let path = base_dir.join(&source_config.file);
        let csv_data = match std::fs::read_to_string(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(%source, path = %path.display(), "batch file not found, skipping source");
                continue;
            }
            Err(e) => return Err(TrendError::io(path, e)),
        };

        let rows = load_csv_rows(
            source,
            &csv_data,
            source_config,
            &config.output.default_market_type,
        )?;
        info!(%source, rows = rows.len(), "loaded batch");
        input.batches.insert(source, rows);
    }

    if input.batches.is_empty() {
        warn!("no source batches found; producing an empty trend set");
    }

    Ok(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColumnMapping;

    fn amazon_config(limit: usize) -> SourceConfig {
        SourceConfig {
            file: "amazon_trending.csv".into(),
            columns: ColumnMapping {
                item: "product_title".into(),
                raw_score: "trend_score".into(),
                url: "product_url".into(),
                country: "country".into(),
                market_type: Some("amazon_market_type".into()),
            },
            limit,
        }
    }

    const AMAZON_CSV: &str = "\
product_title,trend_score,product_url,country,amazon_market_type,price
Apple Watch Series 9,120,https://amazon.com/dp/1,USA,local,399
\"Stanley Quencher Tumbler, 40oz\",300,https://amazon.com/dp/2,USA,local,45
Ninja Air Fryer,45.5,,UK,local,99
";

    #[test]
    fn load_projects_and_tags() {
        let rows = load_csv_rows(Source::Amazon, AMAZON_CSV, &amazon_config(10), "Global").unwrap();
        assert_eq!(rows.len(), 3);
        // Sorted by raw score, descending.
        assert_eq!(rows[0].item, "Stanley Quencher Tumbler, 40oz");
        assert_eq!(rows[0].raw_score, 300.0);
        assert_eq!(rows[1].item, "Apple Watch Series 9");
        assert_eq!(rows[1].url, "https://amazon.com/dp/1");
        assert_eq!(rows[1].market_type, "local");
        assert_eq!(rows[2].raw_score, 45.5);
        assert_eq!(rows[2].url, "");
        assert!(rows.iter().all(|r| r.source == Source::Amazon));
    }

    #[test]
    fn limit_keeps_top_scores() {
        let rows = load_csv_rows(Source::Amazon, AMAZON_CSV, &amazon_config(2), "Global").unwrap();
        let items: Vec<&str> = rows.iter().map(|r| r.item.as_str()).collect();
        assert_eq!(items, vec!["Stanley Quencher Tumbler, 40oz", "Apple Watch Series 9"]);
    }

    #[test]
    fn missing_column_is_fatal() {
        let csv = "product_title,trend_score,country,amazon_market_type\nLamp,1,USA,local\n";
        let err = load_csv_rows(Source::Amazon, csv, &amazon_config(10), "Global").unwrap_err();
        match err {
            TrendError::MissingColumn { platform, column } => {
                assert_eq!(platform, Source::Amazon);
                assert_eq!(column, "product_url");
            }
            other => panic!("expected MissingColumn, got {other:?}"),
        }
    }

    #[test]
    fn unparseable_score_is_fatal() {
        let csv = "\
product_title,trend_score,product_url,country,amazon_market_type
Lamp,high,https://a/1,USA,local
";
        let err = load_csv_rows(Source::Amazon, csv, &amazon_config(10), "Global").unwrap_err();
        assert!(matches!(err, TrendError::ScoreParse { row: 2, .. }), "{err:?}");
        assert!(err.to_string().contains("'high'"));
    }

    #[test]
    fn non_finite_score_is_rejected() {
        let csv = "\
product_title,trend_score,product_url,country,amazon_market_type
Lamp,NaN,https://a/1,USA,local
";
        assert!(load_csv_rows(Source::Amazon, csv, &amazon_config(10), "Global").is_err());
    }

    #[test]
    fn unmapped_market_type_uses_default() {
        let mut config = amazon_config(10);
        config.columns.market_type = None;
        let csv = "product_title,trend_score,product_url,country\nMug,3,https://r/1,USA\n";
        let rows = load_csv_rows(Source::Reddit, csv, &config, "Global").unwrap();
        assert_eq!(rows[0].market_type, "Global");
        assert_eq!(rows[0].source, Source::Reddit);
    }

    #[test]
    fn header_only_batch_is_empty() {
        let csv = "product_title,trend_score,product_url,country,amazon_market_type\n";
        let rows = load_csv_rows(Source::Amazon, csv, &amazon_config(10), "Global").unwrap();
        assert!(rows.is_empty());
    }
}
