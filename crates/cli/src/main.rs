// trendlens CLI - daily trending product reconciliation

mod exit_codes;
mod logging;
mod trends;

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use exit_codes::EXIT_SUCCESS;

#[derive(Parser)]
#[command(name = "trendlens")]
#[command(about = "Merge per-platform trend batches into one deduplicated, staged product list")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline: load batches, dedupe, classify, write snapshot and history
    #[command(after_help = "\
Examples:
  trendlens run trends.toml
  trendlens run trends.toml --json
  trendlens run trends.toml --date 2026-01-15
  trendlens run trends.toml --output report.json --no-history")]
    Run {
        /// Path to the trends TOML config
        config: PathBuf,

        /// Print the JSON report to stdout
        #[arg(long)]
        json: bool,

        /// Write the JSON report to a file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Snapshot date (YYYY-MM-DD); defaults to today
        #[arg(long, value_name = "YYYY-MM-DD")]
        date: Option<NaiveDate>,

        /// Do not append to the history ledger
        #[arg(long)]
        no_history: bool,
    },

    /// Validate a trends config without running
    #[command(after_help = "\
Examples:
  trendlens validate trends.toml")]
    Validate {
        /// Path to the trends TOML config
        config: PathBuf,
    },

    /// Filter the latest snapshot by country and category
    #[command(after_help = "\
Examples:
  trendlens query trends.toml
  trendlens query trends.toml --country usa --category fitness
  trendlens query trends.toml --limit 10 --json")]
    Query {
        /// Path to the trends TOML config
        config: PathBuf,

        /// Country (case-insensitive exact match)
        #[arg(long)]
        country: Option<String>,

        /// Category (case-insensitive exact match)
        #[arg(long)]
        category: Option<String>,

        /// Maximum rows to return
        #[arg(long, default_value_t = trendlens_pipeline::query::DEFAULT_QUERY_LIMIT)]
        limit: usize,

        /// Output JSON to stdout
        #[arg(long)]
        json: bool,
    },

    /// List history ledger rows
    #[command(after_help = "\
Examples:
  trendlens history trends.toml --item 'air fryer'
  trendlens history trends.toml --country UK --json")]
    History {
        /// Path to the trends TOML config
        config: PathBuf,

        /// Item text (case-insensitive substring)
        #[arg(long)]
        item: Option<String>,

        /// Country (case-insensitive exact match)
        #[arg(long)]
        country: Option<String>,

        /// Output JSON to stdout
        #[arg(long)]
        json: bool,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\npipeline: trendlens-pipeline ", env!("CARGO_PKG_VERSION"),
        "\ntarget:   ", env!("TARGET"),
    )
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging();

    let result = match cli.command {
        Commands::Run { config, json, output, date, no_history } => {
            trends::cmd_run(config, json, output, date, no_history)
        }
        Commands::Validate { config } => trends::cmd_validate(config),
        Commands::Query { config, country, category, limit, json } => {
            trends::cmd_query(config, country, category, limit, json)
        }
        Commands::History { config, item, country, json } => {
            trends::cmd_history(config, item, country, json)
        }
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    /// Map a pipeline error to its exit code.
    pub fn pipeline(err: trendlens_pipeline::TrendError) -> Self {
        Self::new(exit_codes::pipeline_exit_code(&err), err.to_string())
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
