//! Error types for pr-relay
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//!
//! Every variant maps onto the closed [`ErrorKind`] set, which is what retry
//! decisions and the command line's exit codes are derived from.

use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

/// Classification of an [`Error`], stable across wording changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Credentials missing, invalid, or lacking permission
    Auth,
    /// Repository (or other resource) does not exist or is not visible
    NotFound,
    /// The source's rate limit is exhausted
    RateLimit,
    /// The source rejected the query as too expensive
    QueryTooComplex,
    /// Transport failure or transient server status
    Network,
    /// No checkpoint exists for an incremental run
    CheckpointMissing,
    /// Checkpoint file is unreadable JSON or fails its checksum
    CheckpointCorrupt,
    /// Checkpoint file was written by another schema version
    CheckpointIncompatible,
    /// Checkpoint belongs to a different resource
    CheckpointMismatch,
    /// Caller cancelled the run
    Cancelled,
    /// Anything else
    Generic,
}

impl ErrorKind {
    /// Whether the transport should retry errors of this kind
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::RateLimit | Self::Network)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Auth => "auth",
            Self::NotFound => "not-found",
            Self::RateLimit => "rate-limit",
            Self::QueryTooComplex => "query-too-complex",
            Self::Network => "network",
            Self::CheckpointMissing => "checkpoint-missing",
            Self::CheckpointCorrupt => "checkpoint-corrupt",
            Self::CheckpointIncompatible => "checkpoint-incompatible",
            Self::CheckpointMismatch => "checkpoint-resource-mismatch",
            Self::Cancelled => "cancelled",
            Self::Generic => "generic",
        };
        f.write_str(name)
    }
}

/// The main error type for pr-relay
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Source API Errors
    // ============================================================================
    #[error("Authentication failed: {message}. Provide a valid token via --token or the configured token environment variable")]
    Auth { message: String },

    #[error("Repository '{resource}' not found. Check the name and your access permissions")]
    NotFound { resource: String },

    #[error("Rate limit exceeded: {message}{}", format_reset(.reset_at))]
    RateLimited {
        message: String,
        reset_at: Option<DateTime<Utc>>,
    },

    #[error("Query complexity exceeded: {message}")]
    QueryComplexity { message: String },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("API error: {message}")]
    Api { message: String },

    #[error("Failed to decode response: {message}")]
    Decode { message: String },

    // ============================================================================
    // HTTP Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Response size exceeded limit of {limit} bytes")]
    ResponseTooLarge { limit: u64 },

    #[error("Failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<Error>,
    },

    #[error("Failed after {attempts} attempts to reduce query complexity (batch size {batch_size})")]
    ComplexityExhausted { attempts: u32, batch_size: u32 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Checkpoint Errors
    // ============================================================================
    #[error("No previous fetch state found for {resource} at {path}. Run a full fetch (--all) before using --incremental")]
    CheckpointMissing { resource: String, path: String },

    #[error("State file {path} is corrupted ({reason}). To recover: delete it and run a full fetch; previously written output is unaffected")]
    CheckpointCorrupt { path: String, reason: String },

    #[error("State file {path} has version {found}, expected {expected}. To recover: delete it and run a full fetch")]
    CheckpointIncompatible {
        path: String,
        found: u32,
        expected: u32,
    },

    #[error("State file is for repository {found} but this run is for {expected}")]
    CheckpointMismatch { expected: String, found: String },

    #[error("Checkpoint failed: {message}")]
    Checkpoint { message: String },

    // ============================================================================
    // Output Errors
    // ============================================================================
    #[error("Output error: {message}")]
    Output { message: String },

    #[error("Audit error: {message}")]
    Audit { message: String },

    // ============================================================================
    // Control Flow
    // ============================================================================
    #[error("Operation cancelled")]
    Cancelled,

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_reset(reset_at: &Option<DateTime<Utc>>) -> String {
    match reset_at {
        Some(at) => format!(" (resets at {})", at.format("%H:%M:%S UTC")),
        None => String::new(),
    }
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create a not-found error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create a rate limit error
    pub fn rate_limited(message: impl Into<String>, reset_at: Option<DateTime<Utc>>) -> Self {
        Self::RateLimited {
            message: message.into(),
            reset_at,
        }
    }

    /// Create a query complexity error
    pub fn complexity(message: impl Into<String>) -> Self {
        Self::QueryComplexity {
            message: message.into(),
        }
    }

    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a generic API error
    pub fn api(message: impl Into<String>) -> Self {
        Self::Api {
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create a checkpoint error
    pub fn checkpoint(message: impl Into<String>) -> Self {
        Self::Checkpoint {
            message: message.into(),
        }
    }

    /// Create a corrupt checkpoint error
    pub fn checkpoint_corrupt(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CheckpointCorrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an output error
    pub fn output(message: impl Into<String>) -> Self {
        Self::Output {
            message: message.into(),
        }
    }

    /// Create an audit error
    pub fn audit(message: impl Into<String>) -> Self {
        Self::Audit {
            message: message.into(),
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Auth { .. } => ErrorKind::Auth,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::RateLimited { .. } => ErrorKind::RateLimit,
            Error::QueryComplexity { .. } | Error::ComplexityExhausted { .. } => {
                ErrorKind::QueryTooComplex
            }
            Error::Network { .. } => ErrorKind::Network,
            Error::Http(e) if e.is_timeout() || e.is_connect() || e.is_request() || e.is_body() => {
                ErrorKind::Network
            }
            Error::HttpStatus { status, .. } if is_transient_status(*status) => ErrorKind::Network,
            Error::RetriesExhausted { source, .. } => source.kind(),
            Error::CheckpointMissing { .. } => ErrorKind::CheckpointMissing,
            Error::CheckpointCorrupt { .. } => ErrorKind::CheckpointCorrupt,
            Error::CheckpointIncompatible { .. } => ErrorKind::CheckpointIncompatible,
            Error::CheckpointMismatch { .. } => ErrorKind::CheckpointMismatch,
            Error::Cancelled => ErrorKind::Cancelled,
            _ => ErrorKind::Generic,
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            // Already retried; never again
            Error::RetriesExhausted { .. } => false,
            _ => self.kind().is_retryable(),
        }
    }

    /// The signalled reset time of a rate limit error
    pub fn rate_limit_reset(&self) -> Option<DateTime<Utc>> {
        match self {
            Error::RateLimited { reset_at, .. } => *reset_at,
            Error::RetriesExhausted { source, .. } => source.rate_limit_reset(),
            _ => None,
        }
    }
}

/// Check if an HTTP status code is transient
pub(crate) fn is_transient_status(status: u16) -> bool {
    matches!(status, 500 | 502 | 503 | 504 | 520..=524)
}

/// Result type alias for pr-relay
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("test message");
        assert_eq!(err.to_string(), "Configuration error: test message");

        let err = Error::http_status(404, "Not found");
        assert_eq!(err.to_string(), "HTTP 404: Not found");

        let err = Error::not_found("octo/repo");
        assert!(err.to_string().contains("'octo/repo' not found"));
    }

    #[test]
    fn test_kind_classification() {
        assert_eq!(Error::auth("bad").kind(), ErrorKind::Auth);
        assert_eq!(Error::not_found("a/b").kind(), ErrorKind::NotFound);
        assert_eq!(Error::rate_limited("x", None).kind(), ErrorKind::RateLimit);
        assert_eq!(Error::complexity("x").kind(), ErrorKind::QueryTooComplex);
        assert_eq!(
            Error::ComplexityExhausted {
                attempts: 4,
                batch_size: 5
            }
            .kind(),
            ErrorKind::QueryTooComplex
        );
        assert_eq!(Error::network("reset").kind(), ErrorKind::Network);
        assert_eq!(Error::http_status(502, "").kind(), ErrorKind::Network);
        assert_eq!(Error::http_status(400, "").kind(), ErrorKind::Generic);
        assert_eq!(Error::Cancelled.kind(), ErrorKind::Cancelled);
        assert_eq!(
            Error::ResponseTooLarge { limit: 10 }.kind(),
            ErrorKind::Generic
        );
    }

    #[test]
    fn test_is_retryable() {
        assert!(Error::rate_limited("x", None).is_retryable());
        assert!(Error::network("timeout").is_retryable());
        assert!(Error::http_status(500, "").is_retryable());
        assert!(Error::http_status(503, "").is_retryable());

        assert!(!Error::http_status(400, "").is_retryable());
        assert!(!Error::auth("x").is_retryable());
        assert!(!Error::not_found("x").is_retryable());
        assert!(!Error::complexity("x").is_retryable());
        assert!(!Error::Cancelled.is_retryable());
        assert!(!Error::ResponseTooLarge { limit: 1 }.is_retryable());
    }

    #[test]
    fn test_retries_exhausted_keeps_kind() {
        let err = Error::RetriesExhausted {
            attempts: 4,
            source: Box::new(Error::network("connection refused")),
        };
        assert_eq!(err.kind(), ErrorKind::Network);
        assert!(!err.is_retryable());
        assert!(err.to_string().starts_with("Failed after 4 attempts"));
    }

    #[test]
    fn test_rate_limit_reset_passthrough() {
        let reset = Utc::now();
        let err = Error::RetriesExhausted {
            attempts: 2,
            source: Box::new(Error::rate_limited("slow down", Some(reset))),
        };
        assert_eq!(err.rate_limit_reset(), Some(reset));
        assert!(err.to_string().contains("resets at"));
    }
}
