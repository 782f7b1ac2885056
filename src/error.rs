//! Error types for racecard.

use std::time::Duration;

/// Top-level error type for the crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Adapter error: {0}")]
    Adapter(#[from] AdapterError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

/// Configuration-related errors.
///
/// These are fatal to a pipeline run and are raised before any fetch begins.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("No adapters registered")]
    NoAdapters,

    #[error("Unknown adapter: {0}")]
    UnknownAdapter(String),

    #[error("Adapter {0} is already registered")]
    DuplicateAdapter(String),
}

/// Errors from a single resilient network request.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    /// Connection failure, DNS failure or request timeout.
    #[error("Network error fetching {target}: {reason}")]
    Network { target: String, reason: String },

    #[error("HTTP {code} fetching {target}")]
    HttpStatus { target: String, code: u16 },

    #[error("Invalid fetch target {target}: {reason}")]
    InvalidTarget { target: String, reason: String },
}

impl FetchError {
    /// Whether the retry policy should try this request again.
    ///
    /// Network failures and server-side (5xx) statuses are transient;
    /// client-side statuses and malformed targets are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } => true,
            Self::HttpStatus { code, .. } => (500..600).contains(code),
            Self::InvalidTarget { .. } => false,
        }
    }
}

/// Adapter-level failures. Each one becomes an `ERROR` entry in the status report.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Adapter {adapter} could not parse its document: {reason}")]
    Parsing { adapter: String, reason: String },

    #[error("Adapter {adapter} is offline: {reason}")]
    Offline { adapter: String, reason: String },

    #[error("Adapter {adapter} timed out after {after:?}")]
    Timeout { adapter: String, after: Duration },

    #[error("Adapter {adapter} failed unexpectedly: {reason}")]
    Unexpected { adapter: String, reason: String },
}

/// A single record inside one document that could not be normalized.
///
/// Never escalates past the adapter: the record is logged and skipped.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParsingError {
    #[error("Missing field {0}")]
    MissingField(&'static str),

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },

    #[error("JSON error: {0}")]
    Json(String),
}

impl From<serde_json::Error> for ParsingError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e.to_string())
    }
}

/// Pipeline-related errors.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_and_server_errors_are_retryable() {
        let network = FetchError::Network {
            target: "https://example.com".into(),
            reason: "connection reset".into(),
        };
        assert!(network.is_retryable());

        let server = FetchError::HttpStatus {
            target: "https://example.com".into(),
            code: 503,
        };
        assert!(server.is_retryable());
    }

    #[test]
    fn client_errors_are_not_retryable() {
        for code in [400, 403, 404, 429] {
            let err = FetchError::HttpStatus {
                target: "https://example.com".into(),
                code,
            };
            assert!(!err.is_retryable(), "{code} should not be retried");
        }

        let invalid = FetchError::InvalidTarget {
            target: "not a url".into(),
            reason: "relative URL without a base".into(),
        };
        assert!(!invalid.is_retryable());
    }

    #[test]
    fn adapter_error_wraps_fetch_error_transparently() {
        let err: AdapterError = FetchError::HttpStatus {
            target: "https://feed.test/cards".into(),
            code: 404,
        }
        .into();
        assert_eq!(err.to_string(), "HTTP 404 fetching https://feed.test/cards");
    }
}
