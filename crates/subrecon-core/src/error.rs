//! Error types for SubRecon
//!
//! This module defines all error types used throughout the crate, plus the
//! cloneable failure records that the orchestrator aggregates and the
//! resolver caches.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Result type alias for SubRecon operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for SubRecon
#[derive(Error, Debug)]
pub enum Error {
    /// Empty or malformed input (fatal to a single run, not the process)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A single source failed to produce results
    #[error("Source error ({source_name}): {message}")]
    Source {
        /// Source name
        source_name: String,
        /// Error message
        message: String,
    },

    /// Rate limiter wait was cancelled before a token was granted
    #[error("Rate limit wait aborted for source {0}")]
    RateLimitAborted(String),

    /// Deadline or external cancellation fired
    #[error("Operation cancelled")]
    Cancelled,

    /// Every source failed and nothing was discovered
    #[error("All sources failed: {}", join_failures(.0))]
    AllSourcesFailed(Vec<SourceFailure>),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem and network I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML configuration parse errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid filter pattern
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// HTTP client errors (from source APIs)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a source-specific error
    pub fn source_error(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Source {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Whether this error represents cancellation (deadline or external)
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

fn join_failures(failures: &[SourceFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Category of a per-source failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFailureKind {
    /// The source ran and returned an error
    Execution,
    /// The rate limiter wait was aborted before the source ran
    RateLimitAborted,
    /// The run was cancelled while the source was waiting or running
    Cancelled,
    /// The source task panicked
    Panicked,
}

/// A recorded failure of one source within one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFailure {
    /// Source name
    pub source: String,
    /// Failure category
    pub kind: SourceFailureKind,
    /// Human-readable reason
    pub message: String,
}

impl SourceFailure {
    /// Build a failure record from an error returned while dispatching `source`
    pub fn from_error(source: impl Into<String>, error: &Error) -> Self {
        let kind = match error {
            Error::RateLimitAborted(_) => SourceFailureKind::RateLimitAborted,
            Error::Cancelled => SourceFailureKind::Cancelled,
            _ => SourceFailureKind::Execution,
        };
        Self {
            source: source.into(),
            kind,
            message: error.to_string(),
        }
    }

    /// Failure record for a source task that panicked
    pub fn panicked(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            kind: SourceFailureKind::Panicked,
            message: message.into(),
        }
    }
}

impl fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.message)
    }
}

/// Category of a DNS lookup failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupFailureKind {
    /// The name does not exist or has no address records
    NotFound,
    /// The lookup did not complete within the per-lookup timeout
    Timeout,
    /// A transient transport or server condition
    Temporary,
    /// The lookup was cancelled
    Cancelled,
    /// Any other non-retryable failure
    Other,
}

/// A DNS lookup failure, cached alongside the resolution it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LookupFailure {
    /// Failure category
    pub kind: LookupFailureKind,
    /// Backend-provided detail
    pub message: String,
}

impl LookupFailure {
    /// Create a failure of the given kind
    pub fn new(kind: LookupFailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// The name has no address records
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(LookupFailureKind::NotFound, message)
    }

    /// The lookup timed out
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(LookupFailureKind::Timeout, message)
    }

    /// A transient failure worth retrying
    pub fn temporary(message: impl Into<String>) -> Self {
        Self::new(LookupFailureKind::Temporary, message)
    }

    /// The lookup was cancelled before completing
    pub fn cancelled() -> Self {
        Self::new(LookupFailureKind::Cancelled, "lookup cancelled")
    }

    /// Any other permanent failure
    pub fn other(message: impl Into<String>) -> Self {
        Self::new(LookupFailureKind::Other, message)
    }

    /// Timeouts and temporary failures are retried; everything else stops immediately
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            LookupFailureKind::Timeout | LookupFailureKind::Temporary
        )
    }
}

impl fmt::Display for LookupFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            LookupFailureKind::NotFound => "not found",
            LookupFailureKind::Timeout => "timeout",
            LookupFailureKind::Temporary => "temporary failure",
            LookupFailureKind::Cancelled => "cancelled",
            LookupFailureKind::Other => "lookup failed",
        };
        write!(f, "{}: {}", kind, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_error_names_every_failure() {
        let err = Error::AllSourcesFailed(vec![
            SourceFailure::from_error("crtsh", &Error::http("status 503")),
            SourceFailure::from_error("urlscan", &Error::RateLimitAborted("urlscan".into())),
        ]);

        let text = err.to_string();
        assert!(text.contains("crtsh: HTTP error: status 503"));
        assert!(text.contains("urlscan: Rate limit wait aborted"));
    }

    #[test]
    fn failure_kind_follows_error_variant() {
        let aborted = SourceFailure::from_error("a", &Error::RateLimitAborted("a".into()));
        let cancelled = SourceFailure::from_error("b", &Error::Cancelled);
        let failed = SourceFailure::from_error("c", &Error::source_error("c", "boom"));

        assert_eq!(aborted.kind, SourceFailureKind::RateLimitAborted);
        assert_eq!(cancelled.kind, SourceFailureKind::Cancelled);
        assert_eq!(failed.kind, SourceFailureKind::Execution);
    }

    #[test]
    fn only_timeouts_and_temporary_failures_retry() {
        assert!(LookupFailure::timeout("t").is_retryable());
        assert!(LookupFailure::temporary("t").is_retryable());
        assert!(!LookupFailure::not_found("n").is_retryable());
        assert!(!LookupFailure::other("o").is_retryable());
        assert!(!LookupFailure::cancelled().is_retryable());
    }
}
