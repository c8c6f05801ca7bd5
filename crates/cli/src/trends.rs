//! `trendlens run | validate | query | history` handlers.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use trendlens_pipeline::history::{append_snapshot, filter_history};
use trendlens_pipeline::loader::load_sources;
use trendlens_pipeline::query::{query_trends, TrendQuery};
use trendlens_pipeline::{store, TrendConfig};

use crate::exit_codes::{EXIT_TRENDS_NO_SNAPSHOT, EXIT_TRENDS_RUNTIME, EXIT_USAGE};
use crate::CliError;

fn trends_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError::new(code, msg)
}

/// Read and validate the config. File paths inside it resolve against the
/// returned base directory.
fn load_config(config_path: &Path) -> Result<(TrendConfig, PathBuf), CliError> {
    let config_str = std::fs::read_to_string(config_path).map_err(|e| {
        trends_err(EXIT_TRENDS_RUNTIME, format!("cannot read config {}: {e}", config_path.display()))
    })?;
    let config = TrendConfig::from_toml(&config_str).map_err(CliError::pipeline)?;

    let base_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    Ok((config, base_dir))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), CliError> {
    let json_str = serde_json::to_string_pretty(value)
        .map_err(|e| trends_err(EXIT_TRENDS_RUNTIME, format!("JSON serialization error: {e}")))?;
    println!("{json_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

pub fn cmd_run(
    config_path: PathBuf,
    json_output: bool,
    output_file: Option<PathBuf>,
    date: Option<NaiveDate>,
    no_history: bool,
) -> Result<(), CliError> {
    let (config, base_dir) = load_config(&config_path)?;
    let snapshot_date = date.unwrap_or_else(|| chrono::Local::now().date_naive());

    let input = load_sources(&config, &base_dir).map_err(CliError::pipeline)?;
    let report = trendlens_pipeline::run(&config, input, snapshot_date).map_err(CliError::pipeline)?;

    let snapshot_path = base_dir.join(&config.output.snapshot);
    store::write_snapshot(&snapshot_path, &report.records).map_err(CliError::pipeline)?;
    eprintln!("wrote {}", snapshot_path.display());

    if config.output.save_history && !no_history {
        let history_path = base_dir.join(&config.output.history);
        let total = append_snapshot(&history_path, &report.records, snapshot_date)
            .map_err(CliError::pipeline)?;
        eprintln!("history: {} rows in {}", total, history_path.display());
    }

    if let Some(ref path) = output_file {
        let json_str = serde_json::to_string_pretty(&report)
            .map_err(|e| trends_err(EXIT_TRENDS_RUNTIME, format!("JSON serialization error: {e}")))?;
        std::fs::write(path, &json_str)
            .map_err(|e| trends_err(EXIT_TRENDS_RUNTIME, format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if json_output {
        print_json(&report)?;
    }

    // Human summary to stderr
    let s = &report.summary;
    eprintln!(
        "{} ({}): {} rows from {} sources -> {} groups -> {} products ({} merged, {} comparisons, {} mode)",
        report.meta.config_name,
        report.meta.snapshot_date,
        s.input_rows,
        s.rows_per_source.len(),
        s.aggregated_groups,
        s.clusters,
        s.merged_rows,
        s.comparisons,
        report.meta.cluster_mode,
    );
    if !s.stage_counts.is_empty() {
        let stages: Vec<String> = s.stage_counts.iter().map(|(k, v)| format!("{v} {k}")).collect();
        eprintln!("stages: {}", stages.join(", "));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let (config, _) = load_config(&config_path)?;
    let sources: Vec<&str> = config.sources.keys().map(|s| s.label()).collect();
    eprintln!(
        "valid: \"{}\" ({} sources: {}, {} mode)",
        config.name,
        sources.len(),
        sources.join(", "),
        config.dedup.mode,
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// query
// ---------------------------------------------------------------------------

pub fn cmd_query(
    config_path: PathBuf,
    country: Option<String>,
    category: Option<String>,
    limit: usize,
    json_output: bool,
) -> Result<(), CliError> {
    if limit == 0 {
        return Err(trends_err(EXIT_USAGE, "--limit must be at least 1"));
    }
    let (config, base_dir) = load_config(&config_path)?;

    let snapshot_path = base_dir.join(&config.output.snapshot);
    if !snapshot_path.exists() {
        return Err(trends_err(
            EXIT_TRENDS_NO_SNAPSHOT,
            format!("no snapshot at {}", snapshot_path.display()),
        )
        .with_hint(format!("run `trendlens run {}` first", config_path.display())));
    }
    let records = store::read_snapshot(&snapshot_path).map_err(CliError::pipeline)?;

    let query = TrendQuery { country, category, limit };
    let hits = query_trends(&records, &query, &config.category_vocabulary());

    if json_output {
        return print_json(&hits);
    }

    for t in &hits {
        println!(
            "{:>8.2}  {:<9}  {:<14}  {:<6}  {}  [{}]",
            t.record.trend_strength,
            t.record.lifecycle_stage,
            t.category,
            t.record.country,
            t.record.item,
            t.record.marketplace_label(),
        );
    }
    eprintln!("{} of {} products", hits.len(), records.len());
    Ok(())
}

// ---------------------------------------------------------------------------
// history
// ---------------------------------------------------------------------------

pub fn cmd_history(
    config_path: PathBuf,
    item: Option<String>,
    country: Option<String>,
    json_output: bool,
) -> Result<(), CliError> {
    let (config, base_dir) = load_config(&config_path)?;
    let history_path = base_dir.join(&config.output.history);
    let rows = store::read_ledger(&history_path).map_err(CliError::pipeline)?;
    let hits = filter_history(&rows, item.as_deref(), country.as_deref());

    if json_output {
        return print_json(&hits);
    }

    for h in &hits {
        println!(
            "{}  {:>8.2}  {:<9}  {:<6}  {}",
            h.snapshot_date,
            h.record.trend_strength,
            h.record.lifecycle_stage,
            h.record.country,
            h.record.item,
        );
    }
    eprintln!("{} of {} ledger rows", hits.len(), rows.len());
    Ok(())
}
