//! YouTube Data API HTTP client.
//!
//! Every outbound call flows through [`YouTubeClient::request`]:
//! cache lookup, quota consumption (with one fixed delay-and-retry),
//! bounded-timeout network call, status classification, cache store.

use std::sync::Arc;

use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use tuberank_models::{Channel, Video};

use crate::cache::{cache_key, ttl_for, ResponseCache};
use crate::config::YouTubeConfig;
use crate::error::{YouTubeError, YouTubeResult};
use crate::quota::QuotaTracker;
use crate::types::{ChannelListResponse, SearchListResponse, VideoListResponse};

/// Quota cost of a search.list call, in units.
pub const SEARCH_COST: u64 = 100;

/// Quota cost of channels.list / videos.list calls, in units.
pub const LOOKUP_COST: u64 = 1;

/// One page of a channel's video listing.
#[derive(Debug, Clone)]
pub struct VideoPage {
    /// Video IDs in upstream order
    pub video_ids: Vec<String>,
    /// Continuation token for the next page, if any
    pub next_page_token: Option<String>,
}

/// Client for the YouTube Data API v3.
pub struct YouTubeClient {
    http: Client,
    config: YouTubeConfig,
    quota: Arc<QuotaTracker>,
    cache: ResponseCache,
}

impl YouTubeClient {
    /// Create a new client sharing the given quota tracker.
    ///
    /// All clients within a process must share one tracker: the budget
    /// models a resource shared with the upstream service.
    pub fn new(config: YouTubeConfig, quota: Arc<QuotaTracker>) -> YouTubeResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(YouTubeError::Network)?;

        Ok(Self {
            http,
            config,
            quota,
            cache: ResponseCache::new(),
        })
    }

    /// Create from environment variables with a fresh tracker sized from
    /// the configured budgets.
    pub fn from_env() -> YouTubeResult<Self> {
        let config = YouTubeConfig::from_env()?;
        let quota = Arc::new(QuotaTracker::new(
            config.daily_quota_units,
            config.per_minute_requests,
        ));
        Self::new(config, quota)
    }

    /// The shared quota tracker (for health snapshots).
    pub fn quota(&self) -> &Arc<QuotaTracker> {
        &self.quota
    }

    /// Issue a GET against the Data API.
    ///
    /// Cached responses short-circuit before any quota consumption. On
    /// local quota exhaustion the call waits once for the fixed delay and
    /// retries consumption exactly once; if the budget is still exhausted
    /// it fails with `RateLimited` and callers must not loop further.
    pub async fn request(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
        cost: u64,
    ) -> YouTubeResult<Value> {
        let key = cache_key(endpoint, params);
        if let Some(cached) = self.cache.get(&key).await {
            return Ok(cached);
        }

        if self.quota.try_consume(cost).is_err() {
            debug!(
                endpoint,
                delay_secs = self.config.quota_retry_delay.as_secs(),
                "Quota exhausted, waiting before the single retry"
            );
            tokio::time::sleep(self.config.quota_retry_delay).await;
            if let Err(e) = self.quota.try_consume(cost) {
                return Err(YouTubeError::rate_limited(format!(
                    "local quota budget exhausted after retry: {e}"
                )));
            }
        }

        let url = format!("{}/{}", self.config.base_url, endpoint);
        let mut query: Vec<(&str, &str)> = params.to_vec();
        query.push(("key", self.config.api_key.as_str()));

        let response = self.http.get(&url).query(&query).send().await?;
        let status = response.status();

        if status.is_success() {
            let value: Value = response.json().await?;
            self.cache
                .insert(key, value.clone(), ttl_for(endpoint))
                .await;
            return Ok(value);
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_failure(endpoint, status, &body))
    }

    /// Fetch one channel's metadata.
    pub async fn get_channel(&self, channel_id: &str) -> YouTubeResult<Channel> {
        let value = self
            .request(
                "channels",
                &[
                    ("part", "snippet,statistics,brandingSettings"),
                    ("id", channel_id),
                ],
                LOOKUP_COST,
            )
            .await?;

        let parsed: ChannelListResponse =
            serde_json::from_value(value).map_err(|e| YouTubeError::parse(e.to_string()))?;

        parsed
            .items
            .into_iter()
            .next()
            .map(|item| item.into_channel())
            .ok_or_else(|| YouTubeError::not_found(format!("channel {channel_id}")))
    }

    /// Fetch one page of a channel's video listing.
    ///
    /// The list endpoint returns only IDs; full statistics come from a
    /// separate [`Self::get_video_details`] call.
    pub async fn list_videos(
        &self,
        channel_id: &str,
        page_token: Option<&str>,
    ) -> YouTubeResult<VideoPage> {
        let mut params = vec![
            ("part", "id"),
            ("channelId", channel_id),
            ("type", "video"),
            ("order", "date"),
            ("maxResults", "50"),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }

        let value = self.request("search", &params, SEARCH_COST).await?;
        let parsed: SearchListResponse =
            serde_json::from_value(value).map_err(|e| YouTubeError::parse(e.to_string()))?;

        Ok(VideoPage {
            video_ids: parsed
                .items
                .into_iter()
                .filter_map(|item| item.id.video_id)
                .collect(),
            next_page_token: parsed.next_page_token,
        })
    }

    /// Fetch full details for a batch of video IDs.
    ///
    /// Returned videos preserve upstream order; IDs upstream no longer
    /// knows about are simply absent from the result.
    pub async fn get_video_details(&self, video_ids: &[String]) -> YouTubeResult<Vec<Video>> {
        if video_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids = video_ids.join(",");
        let value = self
            .request(
                "videos",
                &[
                    ("part", "snippet,contentDetails,statistics"),
                    ("id", ids.as_str()),
                ],
                LOOKUP_COST,
            )
            .await?;

        let parsed: VideoListResponse =
            serde_json::from_value(value).map_err(|e| YouTubeError::parse(e.to_string()))?;

        Ok(parsed
            .items
            .into_iter()
            .map(|item| item.into_video())
            .collect())
    }
}

/// Map a non-2xx response onto the error taxonomy.
///
/// 403 is ambiguous upstream: quota exhaustion and an invalid key share
/// the status code and are told apart by the error reason in the body.
fn classify_failure(endpoint: &str, status: StatusCode, body: &str) -> YouTubeError {
    let (reason, message) = extract_error_detail(body);

    match status {
        StatusCode::FORBIDDEN => {
            let reason_lc = reason.to_lowercase();
            if reason_lc.contains("quota") || reason_lc.contains("ratelimit") {
                warn!(endpoint, reason, "Upstream reported quota exhaustion");
                YouTubeError::rate_limited(message)
            } else {
                YouTubeError::Upstream4xx {
                    status: 403,
                    message,
                }
            }
        }
        StatusCode::NOT_FOUND => YouTubeError::not_found(message),
        s if s.is_client_error() => YouTubeError::Upstream4xx {
            status: s.as_u16(),
            message,
        },
        s => YouTubeError::Upstream5xx { status: s.as_u16() },
    }
}

/// Pull the first error reason code and the message out of an upstream
/// error body, tolerating any shape.
fn extract_error_detail(body: &str) -> (String, String) {
    let parsed: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(_) => return (String::new(), body.to_string()),
    };

    let reason = parsed["error"]["errors"][0]["reason"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    let message = parsed["error"]["message"]
        .as_str()
        .map(|s| s.to_string())
        .unwrap_or_else(|| body.to_string());

    (reason, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_403_quota_vs_bad_key() {
        let quota_body = r#"{"error":{"message":"Quota exceeded.","errors":[{"reason":"quotaExceeded"}]}}"#;
        let err = classify_failure("search", StatusCode::FORBIDDEN, quota_body);
        assert!(matches!(err, YouTubeError::RateLimited(_)));

        let key_body = r#"{"error":{"message":"API key not valid.","errors":[{"reason":"forbidden"}]}}"#;
        let err = classify_failure("search", StatusCode::FORBIDDEN, key_body);
        assert!(matches!(err, YouTubeError::Upstream4xx { status: 403, .. }));
    }

    #[test]
    fn test_classify_status_families() {
        assert!(matches!(
            classify_failure("videos", StatusCode::NOT_FOUND, "{}"),
            YouTubeError::NotFound(_)
        ));
        assert!(matches!(
            classify_failure("videos", StatusCode::BAD_REQUEST, "{}"),
            YouTubeError::Upstream4xx { status: 400, .. }
        ));
        assert!(matches!(
            classify_failure("videos", StatusCode::INTERNAL_SERVER_ERROR, ""),
            YouTubeError::Upstream5xx { status: 500 }
        ));
        assert!(matches!(
            classify_failure("videos", StatusCode::SERVICE_UNAVAILABLE, "oops"),
            YouTubeError::Upstream5xx { status: 503 }
        ));
    }

    #[test]
    fn test_extract_error_detail_tolerates_garbage() {
        let (reason, message) = extract_error_detail("not json at all");
        assert!(reason.is_empty());
        assert_eq!(message, "not json at all");
    }
}
