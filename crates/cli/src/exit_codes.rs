//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: schedulers rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 2       | Universal        | CLI usage error (bad args)               |
//! | 60-69   | trends           | Pipeline config, input and storage codes |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into `pipeline_exit_code` or the command's error handling

use trendlens_pipeline::TrendError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// Usage error - bad arguments. clap exits with this on parse failure.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Trends (60-69)
// =============================================================================

/// Config cannot be parsed or fails validation.
pub const EXIT_TRENDS_INVALID_CONFIG: u8 = 60;

/// A present batch is unusable: missing mapped column, bad score, bad CSV.
pub const EXIT_TRENDS_INPUT: u8 = 61;

/// Filesystem or storage failure (unreadable config, unwritable output,
/// corrupt ledger).
pub const EXIT_TRENDS_RUNTIME: u8 = 62;

/// `query` found no snapshot to read.
pub const EXIT_TRENDS_NO_SNAPSHOT: u8 = 63;

/// Map a pipeline error to its exit code.
pub fn pipeline_exit_code(err: &TrendError) -> u8 {
    match err {
        TrendError::ConfigParse(_) | TrendError::ConfigValidation(_) => EXIT_TRENDS_INVALID_CONFIG,
        e if e.is_input_error() => EXIT_TRENDS_INPUT,
        _ => EXIT_TRENDS_RUNTIME,
    }
}
