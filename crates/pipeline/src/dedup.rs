//! Near-duplicate clustering of aggregated records.
//!
//! Records are normalized (lowercase, parentheticals and noise words
//! stripped), tagged with a brand, and bucketed by country. Within a bucket
//! they are clustered by Ratcliff–Obershelp similarity:
//!
//! - [`ClusterMode::Star`]: greedy single pass in canonical order. Each
//!   unassigned record seeds a cluster and absorbs every later unassigned
//!   record that matches *the seed*. Two members need not match each other.
//! - [`ClusterMode::Transitive`]: every matching pair is joined; clusters
//!   are the connected components.
//!
//! Pairwise work is `O(n_c^2)` per country bucket `c`; nothing is compared
//! across countries.

use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;

use crate::config::{ClusterMode, DedupConfig};
use crate::error::{Result, TrendError};
use crate::model::{AggregatedRecord, Source};
use crate::similarity;

// ---------------------------------------------------------------------------
// Text normalization
// ---------------------------------------------------------------------------

/// Normalizes item text for comparison. Built once per vocabulary.
#[derive(Debug, Clone)]
pub struct ItemNormalizer {
    parenthetical: Regex,
    non_alnum: Regex,
    noise: Option<Regex>,
    whitespace: Regex,
}

impl ItemNormalizer {
    pub fn new(noise_words: &[String]) -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| {
                TrendError::ConfigValidation(format!("invalid normalization pattern: {e}"))
            })
        };

        let words: Vec<String> = noise_words
            .iter()
            .map(|w| w.trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .map(|w| regex::escape(&w))
            .collect();
        let noise = if words.is_empty() {
            None
        } else {
            Some(compile(&format!(r"\b(?:{})\b", words.join("|")))?)
        };

        Ok(Self {
            parenthetical: compile(r"\(.*?\)")?,
            non_alnum: compile(r"[^a-z0-9 ]")?,
            noise,
            whitespace: compile(r"\s+")?,
        })
    }

    pub fn normalize(&self, text: &str) -> String {
        let text = text.to_lowercase();
        let text = self.parenthetical.replace_all(&text, "");
        // Replace with a space, not nothing, so "wh-1000" stays two words.
        let text = self.non_alnum.replace_all(&text, " ");
        let text = match &self.noise {
            Some(noise) => noise.replace_all(&text, ""),
            None => text,
        };
        self.whitespace.replace_all(&text, " ").trim().to_string()
    }
}

/// First brand, in vocabulary order, found as a substring.
pub fn extract_brand<'a>(normalized: &str, brands: &'a [String]) -> Option<&'a str> {
    brands
        .iter()
        .map(String::as_str)
        .find(|brand| !brand.is_empty() && normalized.contains(brand))
}

// ---------------------------------------------------------------------------
// Clustering
// ---------------------------------------------------------------------------

/// Comparison view of one aggregated record.
#[derive(Debug, Clone)]
pub struct PreparedItem<'a> {
    pub country: &'a str,
    pub normalized: String,
    pub brand: Option<&'a str>,
}

/// One merged cluster, before lifecycle classification.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterRecord {
    pub item: String,
    pub country: String,
    pub market_type: String,
    pub trend_strength: f64,
    pub platform_count: usize,
    pub marketplace: BTreeSet<String>,
    pub urls: BTreeSet<String>,
}

#[derive(Debug, Clone)]
pub struct DedupOutcome {
    /// Sorted by trend strength, descending.
    pub records: Vec<ClusterRecord>,
    /// `clusters[i]` lists the input indices merged into `records[i]`; the
    /// first index is the canonical (seed) record.
    pub clusters: Vec<Vec<usize>>,
    /// Pairwise similarity evaluations performed.
    pub comparisons: usize,
}

pub struct Deduplicator<'a> {
    config: &'a DedupConfig,
    normalizer: ItemNormalizer,
    /// Lowercased and trimmed, to match normalized text.
    brands: Vec<String>,
}

impl<'a> Deduplicator<'a> {
    pub fn new(config: &'a DedupConfig) -> Result<Self> {
        let brands = config
            .brands
            .iter()
            .map(|b| b.trim().to_lowercase())
            .filter(|b| !b.is_empty())
            .collect();
        Ok(Self {
            config,
            normalizer: ItemNormalizer::new(&config.noise_words)?,
            brands,
        })
    }

    pub fn prepare<'r>(&'r self, record: &'r AggregatedRecord) -> PreparedItem<'r> {
        let normalized = self.normalizer.normalize(&record.item);
        let brand = extract_brand(&normalized, &self.brands);
        PreparedItem { country: &record.country, normalized, brand }
    }

    /// Whether `candidate` belongs in `seed`'s cluster.
    pub fn is_match(&self, seed: &PreparedItem<'_>, candidate: &PreparedItem<'_>) -> bool {
        if seed.country != candidate.country {
            return false;
        }
        let score = similarity::ratio(&seed.normalized, &candidate.normalized);
        let same_brand = seed.brand.is_some() && seed.brand == candidate.brand;
        score > self.config.similarity_threshold
            || (same_brand && score > self.config.brand_similarity_threshold)
    }

    /// Cluster `records`, which must already be in canonical order.
    pub fn deduplicate(&self, records: &[AggregatedRecord]) -> DedupOutcome {
        let prepared: Vec<PreparedItem<'_>> = records.iter().map(|r| self.prepare(r)).collect();

        let mut buckets: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (idx, item) in prepared.iter().enumerate() {
            buckets.entry(item.country).or_default().push(idx);
        }

        let mut clusters = Vec::new();
        let mut comparisons = 0;
        for bucket in buckets.values() {
            let (found, compared) = match self.config.mode {
                ClusterMode::Star => self.cluster_star(&prepared, bucket),
                ClusterMode::Transitive => self.cluster_transitive(&prepared, bucket),
            };
            clusters.extend(found);
            comparisons += compared;
        }

        // Restore global seed order so output does not depend on bucketing.
        clusters.sort_by_key(|members| members[0]);

        let mut merged: Vec<(ClusterRecord, Vec<usize>)> = clusters
            .into_iter()
            .map(|members| (merge_cluster(records, &members), members))
            .collect();
        merged.sort_by(|a, b| b.0.trend_strength.total_cmp(&a.0.trend_strength));

        let (records, clusters) = merged.into_iter().unzip();
        DedupOutcome { records, clusters, comparisons }
    }

    fn cluster_star(
        &self,
        prepared: &[PreparedItem<'_>],
        bucket: &[usize],
    ) -> (Vec<Vec<usize>>, usize) {
        let mut used = vec![false; bucket.len()];
        let mut clusters = Vec::new();
        let mut comparisons = 0;

        for (pos, &seed) in bucket.iter().enumerate() {
            if used[pos] {
                continue;
            }
            used[pos] = true;
            let mut cluster = vec![seed];

            for (cpos, &candidate) in bucket.iter().enumerate().skip(pos + 1) {
                if used[cpos] {
                    continue;
                }
                comparisons += 1;
                if self.is_match(&prepared[seed], &prepared[candidate]) {
                    used[cpos] = true;
                    cluster.push(candidate);
                }
            }

            clusters.push(cluster);
        }

        (clusters, comparisons)
    }

    fn cluster_transitive(
        &self,
        prepared: &[PreparedItem<'_>],
        bucket: &[usize],
    ) -> (Vec<Vec<usize>>, usize) {
        let mut sets = DisjointSets::new(bucket.len());
        let mut comparisons = 0;

        for a in 0..bucket.len() {
            for b in (a + 1)..bucket.len() {
                comparisons += 1;
                // Either direction may pass the brand rule; check both.
                if self.is_match(&prepared[bucket[a]], &prepared[bucket[b]])
                    || self.is_match(&prepared[bucket[b]], &prepared[bucket[a]])
                {
                    sets.union(a, b);
                }
            }
        }

        let mut components: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for pos in 0..bucket.len() {
            components.entry(sets.find(pos)).or_default().push(bucket[pos]);
        }
        // Members are pushed in bucket (canonical) order, so [0] is the earliest.
        (components.into_values().collect(), comparisons)
    }
}

/// Merge a cluster's members into one record. `members[0]` is canonical.
fn merge_cluster(records: &[AggregatedRecord], members: &[usize]) -> ClusterRecord {
    let seed = &records[members[0]];
    let mut strength = 0.0;
    let mut platform_count = 0;
    let mut marketplace = BTreeSet::new();
    let mut urls = BTreeSet::new();

    for &idx in members {
        let r = &records[idx];
        strength += r.weighted_strength();
        platform_count = platform_count.max(r.platform_count);
        marketplace.extend(r.sources.iter().map(|s| Source::label(s).to_string()));
        urls.extend(r.urls.iter().cloned());
    }

    ClusterRecord {
        item: seed.item.clone(),
        country: seed.country.clone(),
        market_type: seed.market_type.clone(),
        trend_strength: round2(strength),
        platform_count,
        marketplace,
        urls,
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Union-find with path halving.
struct DisjointSets {
    parent: Vec<usize>,
}

impl DisjointSets {
    fn new(len: usize) -> Self {
        Self { parent: (0..len).collect() }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            // Smaller root wins so the root is the earliest member.
            let (keep, drop) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[drop] = keep;
        }
    }
}
