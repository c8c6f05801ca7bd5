//! `trendlens-pipeline`: multi-source trending product reconciliation.
//!
//! Loads per-platform trend batches, rescales scores per platform, merges
//! exact and near-duplicate products within each country, assigns a
//! lifecycle stage and keeps a dated history of every run.
//!
//! [`engine::run`] is pure; [`loader`], [`store`] and [`history`] do the IO.

pub mod aggregate;
pub mod category;
pub mod config;
pub mod dedup;
pub mod engine;
pub mod error;
pub mod history;
pub mod lifecycle;
pub mod loader;
pub mod model;
pub mod normalize;
pub mod query;
pub mod similarity;
pub mod store;
pub mod summary;

pub use category::CategoryVocabulary;
pub use config::{ClusterMode, TrendConfig};
pub use engine::run;
pub use error::{Result, TrendError};
pub use model::{DedupedRecord, HistorySnapshot, LifecycleStage, Source, TrendInput, TrendReport};
