use std::path::PathBuf;

use chrono::NaiveDate;

use trendlens_pipeline::config::TrendConfig;
use trendlens_pipeline::history::{append_snapshot, filter_history};
use trendlens_pipeline::loader::load_sources;
use trendlens_pipeline::model::{LifecycleStage, SignalRecord, Source, TrendInput, TrendReport};
use trendlens_pipeline::query::{query_trends, TrendQuery};
use trendlens_pipeline::{run, store, ClusterMode, TrendError};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn fixture_config() -> TrendConfig {
    let toml = std::fs::read_to_string(fixtures_dir().join("trends.toml")).unwrap();
    TrendConfig::from_toml(&toml).unwrap()
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, d).unwrap()
}

fn load_and_run(config: &TrendConfig) -> TrendReport {
    let input = load_sources(config, &fixtures_dir()).unwrap();
    run(config, input, day(15)).unwrap()
}

fn signal(source: Source, item: &str, country: &str, raw: f64) -> SignalRecord {
    SignalRecord {
        item: item.into(),
        raw_score: raw,
        url: format!("https://{}.example/{}", source.label().to_lowercase(), item.replace(' ', "-")),
        country: country.into(),
        market_type: "local".into(),
        source,
    }
}

fn input(rows: Vec<SignalRecord>) -> TrendInput {
    let mut input = TrendInput::default();
    for row in rows {
        input.batches.entry(row.source).or_default().push(row);
    }
    input
}

fn minimal_config() -> TrendConfig {
    TrendConfig::from_toml(
        r#"
name = "inline"

[sources.amazon]
file = "amazon.csv"

[sources.amazon.columns]
item = "product_title"
raw_score = "trend_score"
url = "product_url"
country = "country"
"#,
    )
    .unwrap()
}

// -------------------------------------------------------------------------
// Fixture batches
// -------------------------------------------------------------------------

#[test]
fn fixture_end_to_end() {
    let report = load_and_run(&fixture_config());

    assert_eq!(report.meta.config_name, "Fixture Trends");
    assert_eq!(report.meta.cluster_mode, ClusterMode::Star);
    assert_eq!(report.meta.snapshot_date, day(15));

    let s = &report.summary;
    assert_eq!(s.input_rows, 10);
    assert_eq!(s.rows_per_source["Amazon"], 5);
    assert_eq!(s.rows_per_source["eBay"], 3);
    assert_eq!(s.rows_per_source["Etsy"], 2);
    assert!(!s.rows_per_source.contains_key("YouTube"));
    assert_eq!(s.aggregated_groups, 8);
    assert_eq!(s.clusters, 6);
    assert_eq!(s.merged_rows, 2);
    assert_eq!(s.comparisons, 10);
    assert_eq!(s.stage_counts["Validated"], 2);
    assert_eq!(s.stage_counts["Rising"], 2);
    assert_eq!(s.stage_counts["Watch"], 2);

    let summary: Vec<(&str, f64, usize, LifecycleStage)> = report
        .records
        .iter()
        .map(|r| (r.item.as_str(), r.trend_strength, r.platform_count, r.lifecycle_stage))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("Apple AirPods Pro 2", 200.0, 2, LifecycleStage::Validated),
            ("Stanley Quencher Tumbler", 137.25, 1, LifecycleStage::Rising),
            ("Handmade Ceramic Vase", 100.0, 1, LifecycleStage::Rising),
            ("Ninja Air Fryer", 35.29, 2, LifecycleStage::Validated),
            ("Yoga Mat", 5.88, 1, LifecycleStage::Watch),
            ("Macrame Wall Hanging", 0.0, 1, LifecycleStage::Watch),
        ]
    );
}

#[test]
fn fixture_merges_marketplaces_and_urls() {
    let report = load_and_run(&fixture_config());

    let stanley = &report.records[1];
    assert_eq!(stanley.marketplace_label(), "Amazon, eBay");
    assert_eq!(stanley.urls.len(), 2);
    assert!(stanley.urls.contains("https://ebay.com/itm/2"));

    // Canonical record keeps the seed's market type.
    let vase = &report.records[2];
    assert_eq!(vase.country, "UK");
    assert_eq!(vase.market_type, "Global");
    assert_eq!(vase.marketplace_label(), "Amazon, Etsy");
}

#[test]
fn fixture_transitive_mode_matches_star_here() {
    let mut config = fixture_config();
    config.dedup.mode = ClusterMode::Transitive;
    let report = load_and_run(&config);
    assert_eq!(report.meta.cluster_mode, ClusterMode::Transitive);
    assert_eq!(report.summary.clusters, 6);
    assert_eq!(report.records[1].trend_strength, 137.25);
}

#[test]
fn all_batches_missing_is_empty_not_error() {
    let config = fixture_config();
    let dir = tempfile::tempdir().unwrap();
    let input = load_sources(&config, dir.path()).unwrap();
    assert!(input.is_empty());

    let report = run(&config, input, day(15)).unwrap();
    assert!(report.records.is_empty());
    assert_eq!(report.summary.clusters, 0);
    assert_eq!(report.summary.comparisons, 0);
}

#[test]
fn missing_column_in_present_batch_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("amazon.csv"), "product_title,trend_score,country\nLamp,1,USA\n").unwrap();
    let err = load_sources(&minimal_config(), dir.path()).unwrap_err();
    assert!(err.is_input_error());
    assert!(err.to_string().contains("product_url"), "{err}");
}

#[test]
fn bad_config_rejected() {
    let err = TrendConfig::from_toml("name = \"x\"\nsources = {}\n").unwrap_err();
    assert!(matches!(err, TrendError::ConfigValidation(_)), "{err:?}");
    let err = TrendConfig::from_toml("name = ").unwrap_err();
    assert!(matches!(err, TrendError::ConfigParse(_)), "{err:?}");
}

// -------------------------------------------------------------------------
// Reference scenarios
// -------------------------------------------------------------------------

#[test]
fn review_title_folds_into_product() {
    // Anchors pin Amazon's min/max so the watch rows rescale to 50 and 30.
    let report = run(
        &minimal_config(),
        input(vec![
            signal(Source::Amazon, "Standing Desk", "DE", 100.0),
            signal(Source::Amazon, "Apple Watch Series 9", "USA", 50.0),
            signal(Source::Amazon, "Apple Watch Series 9 (2023) Review", "USA", 30.0),
            signal(Source::Amazon, "Desk Lamp", "DE", 0.0),
        ]),
        day(15),
    )
    .unwrap();

    let watch = report.records.iter().find(|r| r.country == "USA").unwrap();
    assert_eq!(watch.item, "Apple Watch Series 9");
    assert_eq!(watch.trend_strength, 80.0);
    assert_eq!(watch.platform_count, 1);
    assert_eq!(watch.lifecycle_stage, LifecycleStage::Rising);
    assert_eq!(watch.urls.len(), 2);
    assert_eq!(report.records.len(), 3);
}

#[test]
fn three_sources_validate_weak_signal() {
    // Each source: an anchor pair in DE plus the mat in UK.
    let mut rows = Vec::new();
    for (source, score) in [(Source::Amazon, 3.0), (Source::Ebay, 3.0), (Source::Etsy, 4.0)] {
        rows.push(signal(source, "Standing Desk", "DE", 100.0));
        rows.push(signal(source, "Desk Lamp", "DE", 0.0));
        rows.push(signal(source, "Yoga Mat", "UK", score));
    }

    let report = run(&minimal_config(), input(rows), day(15)).unwrap();
    let mat = report.records.iter().find(|r| r.item == "Yoga Mat").unwrap();
    assert_eq!(mat.trend_strength, 10.0);
    assert_eq!(mat.platform_count, 3);
    assert_eq!(mat.lifecycle_stage, LifecycleStage::Validated);
    assert_eq!(mat.marketplace_label(), "Amazon, Etsy, eBay");
}

#[test]
fn same_title_in_two_countries_stays_apart() {
    let report = run(
        &minimal_config(),
        input(vec![
            signal(Source::Amazon, "Stanley Cup", "USA", 10.0),
            signal(Source::Amazon, "Stanley Cup", "UK", 5.0),
        ]),
        day(15),
    )
    .unwrap();

    assert_eq!(report.records.len(), 2);
    assert_eq!(report.summary.comparisons, 0);
    let countries: Vec<&str> = report.records.iter().map(|r| r.country.as_str()).collect();
    assert_eq!(countries, vec!["USA", "UK"]);
}

#[test]
fn history_across_two_runs() {
    let config = fixture_config();
    let dir = tempfile::tempdir().unwrap();
    let ledger = dir.path().join(&config.output.history);

    let first = load_and_run(&config);
    append_snapshot(&ledger, &first.records, day(15)).unwrap();
    let second = load_and_run(&config);
    let total = append_snapshot(&ledger, &second.records, day(16)).unwrap();
    assert_eq!(total, 12);

    let rows = store::read_ledger(&ledger).unwrap();
    let airpods = filter_history(&rows, Some("airpods"), Some("usa"));
    assert_eq!(airpods.len(), 2);
    assert_eq!(airpods[0].snapshot_date, day(15));
    assert_eq!(airpods[1].snapshot_date, day(16));
    assert_eq!(airpods[0].record, airpods[1].record);
}

// -------------------------------------------------------------------------
// Snapshot + query
// -------------------------------------------------------------------------

#[test]
fn snapshot_feeds_query() {
    let config = fixture_config();
    let report = load_and_run(&config);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(&config.output.snapshot);

    store::write_snapshot(&path, &report.records).unwrap();
    let records = store::read_snapshot(&path).unwrap();
    assert_eq!(records, report.records);

    let vocab = config.category_vocabulary();
    let q = TrendQuery { category: Some("home & kitchen".into()), ..TrendQuery::default() };
    let hits = query_trends(&records, &q, &vocab);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].record.item, "Ninja Air Fryer");

    let q = TrendQuery { country: Some("uk".into()), ..TrendQuery::default() };
    let items: Vec<String> = query_trends(&records, &q, &vocab)
        .into_iter()
        .map(|t| t.record.item)
        .collect();
    assert_eq!(items, vec!["Handmade Ceramic Vase", "Ninja Air Fryer"]);
}
