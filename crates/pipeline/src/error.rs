use std::path::PathBuf;

use thiserror::Error;

use crate::model::Source;

pub type Result<T> = std::result::Result<T, TrendError>;

#[derive(Debug, Error)]
pub enum TrendError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),

    /// Config validation error (bad threshold, empty column name, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),

    /// A mapped column is absent from a present source batch.
    #[error("source '{platform}': missing column '{column}'")]
    MissingColumn { platform: Source, column: String },

    /// Raw score cell is not a number.
    #[error("source '{platform}', row {row}: cannot parse score '{value}'")]
    ScoreParse { platform: Source, row: usize, value: String },

    /// Malformed CSV (bad quoting, unreadable header, etc.).
    #[error("{}: CSV error: {message}", .path.display())]
    Csv { path: PathBuf, message: String },

    /// Required column or value missing from a snapshot or ledger file.
    #[error("ledger row {row}: {message}")]
    LedgerParse { row: usize, message: String },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TrendError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::Csv { path: path.into(), message: err.to_string() }
    }

    /// Errors caused by the input batches rather than config or the filesystem.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::MissingColumn { .. } | Self::ScoreParse { .. } | Self::Csv { .. }
        )
    }
}
