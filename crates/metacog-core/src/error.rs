//! Error types shared across the workspace.
//!
//! `ConfigError` is raised while a weights specification is turned into a
//! [`Framework`](crate::framework::Framework) and is always fatal.
//! `ProviderError` is defined here rather than in `metacog-providers` so the
//! batch engine and the retry decorator can downcast and classify provider
//! failures without string matching.

use thiserror::Error;

/// Invalid weights or metric configuration, detected at construction time.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A sibling group of weights does not sum to 1 within tolerance.
    #[error("weights of {group} sum to {sum}, expected 1.0 (tolerance {tolerance})")]
    WeightSum {
        group: String,
        sum: f64,
        tolerance: f64,
    },

    /// A single weight is outside `[0, 1]` or not finite.
    #[error("weight for {name} is {weight}, expected a value in [0, 1]")]
    WeightOutOfRange { name: String, weight: f64 },

    /// The weights specification names a dimension the framework does not know.
    #[error("unknown dimension: {0}")]
    UnknownDimension(String),

    /// One of the five fixed dimensions has no weights entry.
    #[error("missing dimension: {0}")]
    MissingDimension(String),

    /// The same dimension is declared twice.
    #[error("duplicate dimension: {0}")]
    DuplicateDimension(String),

    /// The weights specification names a metric the dimension has no measurement for.
    #[error("unknown metric '{metric}' in dimension {dimension}")]
    UnknownMetric { dimension: String, metric: String },

    /// The same metric is declared twice within one dimension.
    #[error("duplicate metric '{metric}' in dimension {dimension}")]
    DuplicateMetric { dimension: String, metric: String },

    /// A dimension declares no metrics at all.
    #[error("dimension {0} declares no metrics")]
    EmptyDimension(String),
}

/// Errors that can occur when interacting with an LLM provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The API returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Authentication failed (invalid API key).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The requested model was not found.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),

    /// A provider refused the request for reasons of its own (used by the mock).
    #[error("request rejected: {0}")]
    Rejected(String),
}

impl ProviderError {
    /// Returns `true` if this error is permanent and should not be retried.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            ProviderError::AuthenticationFailed(_)
                | ProviderError::ModelNotFound(_)
                | ProviderError::Rejected(_)
        )
    }

    /// Returns the retry-after delay in milliseconds, if applicable.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            ProviderError::RateLimited { retry_after_ms } => Some(*retry_after_ms),
            _ => None,
        }
    }
}
