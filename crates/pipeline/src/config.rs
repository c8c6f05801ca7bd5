use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::category::CategoryVocabulary;
use crate::error::{Result, TrendError};
use crate::model::Source;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct TrendConfig {
    pub name: String,
    pub sources: BTreeMap<Source, SourceConfig>,
    #[serde(default)]
    pub confidence: ConfidenceConfig,
    #[serde(default)]
    pub dedup: DedupConfig,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
    #[serde(default)]
    pub categories: Option<CategoryVocabulary>,
    #[serde(default)]
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Batch file, relative to the config file's directory.
    pub file: String,
    pub columns: ColumnMapping,
    /// Keep only the top-N rows by raw score.
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    10_000
}

/// Maps the common signal fields onto a source's own column names.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnMapping {
    pub item: String,
    pub raw_score: String,
    pub url: String,
    pub country: String,
    /// Social and video sources carry no market type.
    #[serde(default)]
    pub market_type: Option<String>,
}

// ---------------------------------------------------------------------------
// Confidence
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfidenceConfig {
    /// Extra weight per source beyond the first. Zero keeps the multiplier at 1.0.
    #[serde(default)]
    pub per_extra_platform: f64,
}

impl ConfidenceConfig {
    pub fn multiplier(&self, platform_count: usize) -> f64 {
        1.0 + platform_count.saturating_sub(1) as f64 * self.per_extra_platform
    }
}

// ---------------------------------------------------------------------------
// Dedup
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterMode {
    /// Greedy single pass; candidates are compared to the seed only.
    #[default]
    Star,
    /// Union-find over every matching pair.
    Transitive,
}

impl std::fmt::Display for ClusterMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Star => write!(f, "star"),
            Self::Transitive => write!(f, "transitive"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DedupConfig {
    #[serde(default)]
    pub mode: ClusterMode,
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    #[serde(default = "default_brand_similarity_threshold")]
    pub brand_similarity_threshold: f64,
    /// Checked in order; the first substring hit is the brand.
    #[serde(default = "default_brands")]
    pub brands: Vec<String>,
    /// Removed as whole words during item normalization.
    #[serde(default = "default_noise_words")]
    pub noise_words: Vec<String>,
}

fn default_similarity_threshold() -> f64 {
    0.6
}

fn default_brand_similarity_threshold() -> f64 {
    0.5
}

pub fn default_brands() -> Vec<String> {
    [
        "apple", "samsung", "sony", "nike", "adidas", "oneplus", "xiaomi", "boat", "jbl",
        "philips", "hp", "dell", "lenovo", "asus", "acer",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

pub fn default_noise_words() -> Vec<String> {
    [
        "review", "unboxing", "best", "latest", "new", "official", "vs", "comparison", "2022",
        "2023", "2024", "2025",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            mode: ClusterMode::default(),
            similarity_threshold: default_similarity_threshold(),
            brand_similarity_threshold: default_brand_similarity_threshold(),
            brands: default_brands(),
            noise_words: default_noise_words(),
        }
    }
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct LifecycleConfig {
    #[serde(default = "default_validated_platforms")]
    pub validated_platforms: usize,
    #[serde(default = "default_rising")]
    pub rising: f64,
    #[serde(default = "default_emerging")]
    pub emerging: f64,
}

fn default_validated_platforms() -> usize {
    2
}

fn default_rising() -> f64 {
    70.0
}

fn default_emerging() -> f64 {
    40.0
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            validated_platforms: default_validated_platforms(),
            rising: default_rising(),
            emerging: default_emerging(),
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_snapshot")]
    pub snapshot: String,
    #[serde(default = "default_history")]
    pub history: String,
    #[serde(default = "default_save_history")]
    pub save_history: bool,
    #[serde(default = "default_market_type")]
    pub default_market_type: String,
}

fn default_snapshot() -> String {
    "outputs/final_trending_products_deduped.csv".into()
}

fn default_history() -> String {
    "history/trend_history.csv".into()
}

fn default_save_history() -> bool {
    true
}

fn default_market_type() -> String {
    "Global".into()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            snapshot: default_snapshot(),
            history: default_history(),
            save_history: default_save_history(),
            default_market_type: default_market_type(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl TrendConfig {
    pub fn from_toml(input: &str) -> Result<Self> {
        let config: TrendConfig =
            toml::from_str(input).map_err(|e| TrendError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            return Err(TrendError::ConfigValidation(
                "at least one source is required".into(),
            ));
        }

        for (source, sc) in &self.sources {
            if sc.file.trim().is_empty() {
                return Err(TrendError::ConfigValidation(format!(
                    "source '{source}': file must not be empty"
                )));
            }
            if sc.limit == 0 {
                return Err(TrendError::ConfigValidation(format!(
                    "source '{source}': limit must be at least 1"
                )));
            }
            let col = &sc.columns;
            let mapped = [
                ("item", Some(&col.item)),
                ("raw_score", Some(&col.raw_score)),
                ("url", Some(&col.url)),
                ("country", Some(&col.country)),
                ("market_type", col.market_type.as_ref()),
            ];
            for (field, name) in mapped {
                if name.is_some_and(|n| n.trim().is_empty()) {
                    return Err(TrendError::ConfigValidation(format!(
                        "source '{source}': column for '{field}' must not be empty"
                    )));
                }
            }
        }

        let d = &self.dedup;
        for (field, value) in [
            ("similarity_threshold", d.similarity_threshold),
            ("brand_similarity_threshold", d.brand_similarity_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(TrendError::ConfigValidation(format!(
                    "dedup.{field} must be within [0, 1], got {value}"
                )));
            }
        }
        if d.brands.iter().any(|b| b.trim().is_empty()) {
            return Err(TrendError::ConfigValidation(
                "dedup.brands must not contain empty entries".into(),
            ));
        }

        let l = &self.lifecycle;
        if l.validated_platforms == 0 {
            return Err(TrendError::ConfigValidation(
                "lifecycle.validated_platforms must be at least 1".into(),
            ));
        }
        if l.emerging > l.rising {
            return Err(TrendError::ConfigValidation(format!(
                "lifecycle.emerging ({}) must not exceed lifecycle.rising ({})",
                l.emerging, l.rising
            )));
        }

        if self.confidence.per_extra_platform < 0.0 {
            return Err(TrendError::ConfigValidation(
                "confidence.per_extra_platform must not be negative".into(),
            ));
        }

        Ok(())
    }

    /// Category vocabulary from config, or the built-in one.
    pub fn category_vocabulary(&self) -> CategoryVocabulary {
        self.categories.clone().unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
name = "Daily Trends"

[sources.amazon]
file = "amazon_trending.csv"

[sources.amazon.columns]
item        = "product_title"
raw_score   = "trend_score"
url         = "product_url"
country     = "country"
market_type = "amazon_market_type"

[sources.ebay]
file = "ebay_trending.csv"
limit = 50

[sources.ebay.columns]
item        = "product_title"
raw_score   = "trend_score"
url         = "product_url"
country     = "country"
market_type = "market_type"
"#;

    #[test]
    fn parse_valid_with_defaults() {
        let config = TrendConfig::from_toml(VALID).unwrap();
        assert_eq!(config.name, "Daily Trends");
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources[&Source::Amazon].limit, 10_000);
        assert_eq!(config.sources[&Source::Ebay].limit, 50);
        assert_eq!(config.dedup.mode, ClusterMode::Star);
        assert_eq!(config.dedup.similarity_threshold, 0.6);
        assert_eq!(config.dedup.brand_similarity_threshold, 0.5);
        assert_eq!(config.dedup.brands.first().map(String::as_str), Some("apple"));
        assert_eq!(config.dedup.brands.len(), 15);
        assert!(config.dedup.noise_words.contains(&"unboxing".to_string()));
        assert_eq!(config.lifecycle.validated_platforms, 2);
        assert_eq!(config.lifecycle.rising, 70.0);
        assert_eq!(config.lifecycle.emerging, 40.0);
        assert_eq!(config.confidence.multiplier(3), 1.0);
        assert!(config.output.save_history);
        assert_eq!(config.output.default_market_type, "Global");
    }

    #[test]
    fn sources_iterate_in_declaration_order() {
        let input = VALID.replace("[sources.amazon", "[sources.youtube");
        let config = TrendConfig::from_toml(&input).unwrap();
        let order: Vec<Source> = config.sources.keys().copied().collect();
        assert_eq!(order, vec![Source::Ebay, Source::YouTube]);
    }

    #[test]
    fn parse_dedup_and_lifecycle_overrides() {
        let input = format!(
            r#"{VALID}

[dedup]
mode = "transitive"
similarity_threshold = 0.7
brands = ["acme"]
noise_words = ["refurbished"]

[lifecycle]
validated_platforms = 3
rising = 80
emerging = 30

[confidence]
per_extra_platform = 0.5
"#
        );
        let config = TrendConfig::from_toml(&input).unwrap();
        assert_eq!(config.dedup.mode, ClusterMode::Transitive);
        assert_eq!(config.dedup.similarity_threshold, 0.7);
        assert_eq!(config.dedup.brand_similarity_threshold, 0.5);
        assert_eq!(config.dedup.brands, vec!["acme"]);
        assert_eq!(config.dedup.noise_words, vec!["refurbished"]);
        assert_eq!(config.lifecycle.validated_platforms, 3);
        assert_eq!(config.lifecycle.rising, 80.0);
        assert_eq!(config.confidence.multiplier(1), 1.0);
        assert_eq!(config.confidence.multiplier(3), 2.0);
    }

    #[test]
    fn market_type_column_is_optional() {
        let input = r#"
name = "Social"

[sources.reddit]
file = "reddit_trending.csv"

[sources.reddit.columns]
item      = "title"
raw_score = "trend_score"
url       = "url"
country   = "country"
"#;
        let config = TrendConfig::from_toml(input).unwrap();
        assert!(config.sources[&Source::Reddit].columns.market_type.is_none());
    }

    #[test]
    fn reject_unknown_source() {
        let input = VALID.replace("[sources.amazon", "[sources.walmart");
        let err = TrendConfig::from_toml(&input).unwrap_err();
        assert!(matches!(err, TrendError::ConfigParse(_)));
    }

    #[test]
    fn reject_no_sources() {
        let err = TrendConfig::from_toml("name = \"Empty\"\nsources = {}\n").unwrap_err();
        assert!(err.to_string().contains("at least one source"));
    }

    #[test]
    fn reject_threshold_out_of_range() {
        let input = format!("{VALID}\n[dedup]\nsimilarity_threshold = 1.5\n");
        let err = TrendConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("similarity_threshold"));
    }

    #[test]
    fn reject_inverted_lifecycle_thresholds() {
        let input = format!("{VALID}\n[lifecycle]\nrising = 30\nemerging = 40\n");
        let err = TrendConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("must not exceed"));
    }

    #[test]
    fn reject_empty_column_name() {
        let input = VALID.replace("raw_score   = \"trend_score\"", "raw_score   = \"\"");
        let err = TrendConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("raw_score"));
    }
}
