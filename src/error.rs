//! Error types for the fetch layer and the aggregation boundary.
//!
//! Two families exist:
//! - [`FetchError`]: one failed upstream request. Parse strategies, the link
//!   resolver and the image enricher all swallow these and move on.
//! - [`AggregatorError`]: failures that cross the public boundary, such as an
//!   unknown source id or a resolution task that panicked.

use thiserror::Error;

/// A single upstream request that did not produce a usable body.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure (DNS, TLS, connection reset, bad redirect).
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The per-request deadline elapsed.
    #[error("request to {url} timed out")]
    Timeout { url: String },

    /// The server answered with a non-success status.
    #[error("request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The HTTP client itself could not be constructed.
    #[error("http client setup failed: {0}")]
    Client(String),
}

impl FetchError {
    /// Classify a reqwest error for `url`, separating timeouts from other transport errors.
    pub fn from_reqwest(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else {
            FetchError::Http {
                url: url.to_string(),
                source,
            }
        }
    }
}

/// Errors surfaced by the orchestrator and the configuration loader.
#[derive(Debug, Error)]
pub enum AggregatorError {
    /// No configured source carries this id.
    #[error("source not found: {0}")]
    SourceNotFound(String),

    /// Resolving a source panicked or was cancelled.
    #[error("resolution of source {source_id} failed: {reason}")]
    TaskFailed { source_id: String, reason: String },

    /// The source registry file is structurally valid YAML but semantically wrong.
    #[error("invalid source configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to parse source configuration: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_names_the_id() {
        let err = AggregatorError::SourceNotFound("bbc".to_string());
        assert_eq!(err.to_string(), "source not found: bbc");
    }

    #[test]
    fn test_status_error_display() {
        let err = FetchError::Status {
            url: "https://example.com/feed".to_string(),
            status: 503,
        };
        assert_eq!(
            err.to_string(),
            "request to https://example.com/feed returned HTTP 503"
        );
    }

    #[test]
    fn test_fetch_error_converts_into_aggregator_error() {
        let err: AggregatorError = FetchError::Timeout {
            url: "https://example.com".to_string(),
        }
        .into();
        assert!(matches!(err, AggregatorError::Fetch(FetchError::Timeout { .. })));
    }
}
