//! `quake-triage` command implementations.
//!
//! ## Exit Codes
//!
//! - 0: Success
//! - 1: Run failed (cancelled or internal error)
//! - 2: Configuration error
//! - 3: Invalid input (unreadable files, unusable event)

pub mod config_cmd;
pub mod run_cmd;

use quake_triage::{ConfigError, ErrorCategory, TriageError};

/// Exit codes shared by all subcommands
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const FAILURE: i32 = 1;
    pub const CONFIG_ERROR: i32 = 2;
    pub const INVALID_INPUT: i32 = 3;
}

/// Map an error chain to an exit code by its root triage error.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<ConfigError>().is_some() {
        return exit_codes::CONFIG_ERROR;
    }
    match err.downcast_ref::<TriageError>().map(TriageError::category) {
        Some(ErrorCategory::ConfigError) => exit_codes::CONFIG_ERROR,
        Some(ErrorCategory::InvalidEvent | ErrorCategory::IoError) => exit_codes::INVALID_INPUT,
        Some(ErrorCategory::Cancelled | ErrorCategory::InternalError) | None => {
            exit_codes::FAILURE
        }
    }
}
