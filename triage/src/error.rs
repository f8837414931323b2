//! Error types for triage runs
//!
//! Two tiers: `TriageError` rejects the whole call (a malformed event, bad
//! configuration, cancellation), while `AccountIssue` is attached to a single
//! account and never fails the batch.

use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;

/// Triage result type alias
pub type Result<T> = std::result::Result<T, TriageError>;

/// Error category for structured logging and exit-code mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The earthquake event itself is unusable
    InvalidEvent,
    /// Configuration could not be loaded or failed validation
    ConfigError,
    /// Input files could not be read or decoded
    IoError,
    /// The caller abandoned the run
    Cancelled,
    /// Unexpected worker failure
    InternalError,
}

impl ErrorCategory {
    /// Machine-readable code for logging
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidEvent => "INVALID_EVENT",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::Cancelled => "CANCELLED",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

/// Whole-call failures.
#[derive(Debug, Error)]
pub enum TriageError {
    #[error("invalid event time '{value}': {reason}")]
    InvalidEventTime { value: String, reason: String },

    #[error("invalid magnitude {value}: expected a finite number >= 0")]
    InvalidMagnitude { value: f64 },

    #[error("invalid maximum intensity '{value}'")]
    InvalidIntensity { value: String },

    #[error("event epicenter is empty")]
    InvalidEpicenter,

    #[error("no earthquake event found{}", .id.as_ref().map(|id| format!(" with id '{id}'")).unwrap_or_default())]
    EventNotFound { id: Option<String> },

    #[error("triage run cancelled")]
    Cancelled,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to read {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to decode {path}: {source}")]
    JsonDeserialize {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("account worker failed: {0}")]
    Internal(String),
}

impl TriageError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidEventTime { .. }
            | Self::InvalidMagnitude { .. }
            | Self::InvalidIntensity { .. }
            | Self::InvalidEpicenter
            | Self::EventNotFound { .. } => ErrorCategory::InvalidEvent,
            Self::Config(_) => ErrorCategory::ConfigError,
            Self::FileRead { .. } | Self::JsonDeserialize { .. } => ErrorCategory::IoError,
            Self::Cancelled => ErrorCategory::Cancelled,
            Self::Internal(_) => ErrorCategory::InternalError,
        }
    }
}

/// A location lookup that could not produce coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupFailure {
    #[error("location '{location}' could not be resolved")]
    Unresolved { location: String },

    #[error("lookup for '{location}' timed out after {timeout_ms}ms")]
    Timeout { location: String, timeout_ms: u64 },

    #[error("lookup backend failed for '{location}': {message}")]
    Backend { location: String, message: String },

    #[error("'{location}' only resolved to a centroid shared with the epicenter's prefecture")]
    Inconclusive { location: String },
}

/// Non-fatal problem attached to one account.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountIssue {
    /// The account was skipped and produced no assessment.
    #[error("malformed input: {reason}")]
    MalformedInput { reason: String },

    /// A location degraded to the FAR distance class.
    #[error(transparent)]
    LookupFailure(#[from] LookupFailure),
}

impl AccountIssue {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            reason: reason.into(),
        }
    }

    /// Machine-readable code for logs and reports
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedInput { .. } => "MALFORMED_INPUT",
            Self::LookupFailure(_) => "LOOKUP_FAILURE",
        }
    }

    /// Whether the account was dropped from the run because of this issue.
    pub fn skips_account(&self) -> bool {
        matches!(self, Self::MalformedInput { .. })
    }
}
