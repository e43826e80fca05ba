//! YouTube client error taxonomy.
//!
//! All upstream failures are translated into these variants before they
//! cross into the worker or storage layers; no raw transport errors escape
//! the client boundary.

use thiserror::Error;

pub type YouTubeResult<T> = Result<T, YouTubeError>;

#[derive(Debug, Error)]
pub enum YouTubeError {
    /// Local quota budget exhausted (daily units or per-minute requests).
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Upstream reported throttling, or the local budget stayed exhausted
    /// after the single delay-and-retry.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Entity absent upstream.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Client-side request error; retrying will not help.
    #[error("Upstream rejected request ({status}): {message}")]
    Upstream4xx { status: u16, message: String },

    /// Server-side error; safe for the caller to retry.
    #[error("Upstream server error ({status})")]
    Upstream5xx { status: u16 },

    /// Transport failure (connect, timeout, TLS).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Response body did not match the expected shape.
    #[error("Unexpected response: {0}")]
    Parse(String),

    /// Startup configuration problem.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl YouTubeError {
    pub fn quota_exceeded(msg: impl Into<String>) -> Self {
        Self::QuotaExceeded(msg.into())
    }

    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Check if the error is transient: the job queue may retry these
    /// with backoff. `NotFound` and `Upstream4xx` fail immediately.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            YouTubeError::RateLimited(_)
                | YouTubeError::Upstream5xx { .. }
                | YouTubeError::Network(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryability() {
        assert!(YouTubeError::rate_limited("throttled").is_retryable());
        assert!(YouTubeError::Upstream5xx { status: 503 }.is_retryable());
        assert!(!YouTubeError::not_found("channel").is_retryable());
        assert!(!YouTubeError::Upstream4xx {
            status: 400,
            message: "bad part".into()
        }
        .is_retryable());
        assert!(!YouTubeError::quota_exceeded("daily budget").is_retryable());
    }
}
