//! YouTube client configuration.

use std::time::Duration;

use crate::error::{YouTubeError, YouTubeResult};

/// Default daily quota budget in YouTube quota units.
pub const DEFAULT_DAILY_QUOTA_UNITS: u64 = 10_000;

/// Default per-minute request budget.
pub const DEFAULT_PER_MINUTE_REQUESTS: u32 = 100;

/// YouTube Data API client configuration.
#[derive(Debug, Clone)]
pub struct YouTubeConfig {
    /// API key (required; the process refuses to start without it)
    pub api_key: String,
    /// Base URL of the Data API
    pub base_url: String,
    /// Per-request network timeout
    pub timeout: Duration,
    /// Single fixed delay before the one quota-consumption retry
    pub quota_retry_delay: Duration,
    /// Daily quota budget in units
    pub daily_quota_units: u64,
    /// Per-minute request budget
    pub per_minute_requests: u32,
}

impl YouTubeConfig {
    /// Create a config with defaults around the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://www.googleapis.com/youtube/v3".to_string(),
            timeout: Duration::from_secs(10),
            quota_retry_delay: Duration::from_secs(5),
            daily_quota_units: DEFAULT_DAILY_QUOTA_UNITS,
            per_minute_requests: DEFAULT_PER_MINUTE_REQUESTS,
        }
    }

    /// Create config from environment variables.
    ///
    /// Fails when `YOUTUBE_API_KEY` is absent or empty.
    pub fn from_env() -> YouTubeResult<Self> {
        let api_key = std::env::var("YOUTUBE_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| YouTubeError::Config("YOUTUBE_API_KEY is required".to_string()))?;

        let mut config = Self::new(api_key);

        if let Ok(base_url) = std::env::var("YOUTUBE_API_BASE_URL") {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(secs) = std::env::var("YOUTUBE_API_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(units) = std::env::var("YOUTUBE_DAILY_QUOTA_UNITS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.daily_quota_units = units;
        }
        if let Some(requests) = std::env::var("YOUTUBE_PER_MINUTE_REQUESTS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.per_minute_requests = requests;
        }

        Ok(config)
    }
}
