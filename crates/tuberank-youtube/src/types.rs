//! Wire types for YouTube Data API v3 responses.
//!
//! Upstream serializes all counters as strings and omits fields freely, so
//! every numeric field is an optional string mapped through [`count`]
//! (absent means zero) and every URL maps to `Option`.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use tuberank_models::{Channel, Video};

use crate::parse::{is_short, parse_duration};

/// Parse an optional stringly-typed counter, defaulting to zero.
pub(crate) fn count(value: &Option<String>) -> i64 {
    value
        .as_deref()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}

#[derive(Debug, Clone, Deserialize)]
pub struct Thumbnail {
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Thumbnails {
    pub default: Option<Thumbnail>,
    pub medium: Option<Thumbnail>,
    pub high: Option<Thumbnail>,
}

impl Thumbnails {
    /// Highest-resolution thumbnail available.
    pub fn best_url(&self) -> Option<String> {
        self.high
            .as_ref()
            .or(self.medium.as_ref())
            .or(self.default.as_ref())
            .map(|t| t.url.clone())
    }
}

// ---------------------------------------------------------------------------
// channels.list
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ChannelListResponse {
    #[serde(default)]
    pub items: Vec<ChannelItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelItem {
    pub id: String,
    pub snippet: ChannelSnippet,
    #[serde(default)]
    pub statistics: ChannelStatistics,
    #[serde(default)]
    pub branding_settings: BrandingSettings,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSnippet {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub custom_url: Option<String>,
    #[serde(default)]
    pub thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStatistics {
    pub subscriber_count: Option<String>,
    pub video_count: Option<String>,
    pub view_count: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandingSettings {
    pub image: Option<BrandingImage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandingImage {
    pub banner_external_url: Option<String>,
}

impl ChannelItem {
    /// Map the raw upstream item into the stored entity.
    pub fn into_channel(self) -> Channel {
        let now = Utc::now();
        Channel {
            channel_id: self.id,
            title: self.snippet.title,
            description: self.snippet.description,
            custom_url: self.snippet.custom_url,
            thumbnail_url: self.snippet.thumbnails.best_url(),
            banner_url: self
                .branding_settings
                .image
                .and_then(|i| i.banner_external_url),
            subscriber_count: count(&self.statistics.subscriber_count),
            video_count: count(&self.statistics.video_count),
            view_count: count(&self.statistics.view_count),
            created_at: now,
            updated_at: now,
        }
    }
}

// ---------------------------------------------------------------------------
// search.list (video listings with continuation tokens)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchListResponse {
    pub next_page_token: Option<String>,
    #[serde(default)]
    pub items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
pub struct SearchItem {
    pub id: SearchItemId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchItemId {
    pub video_id: Option<String>,
}

// ---------------------------------------------------------------------------
// videos.list (full statistics for detail cross-referencing)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct VideoListResponse {
    #[serde(default)]
    pub items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoItem {
    pub id: String,
    pub snippet: VideoSnippet,
    #[serde(default)]
    pub content_details: VideoContentDetails,
    #[serde(default)]
    pub statistics: VideoStatistics,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSnippet {
    #[serde(default)]
    pub channel_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub thumbnails: Thumbnails,
    #[serde(default)]
    pub tags: Vec<String>,
    pub category_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct VideoContentDetails {
    pub duration: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStatistics {
    pub view_count: Option<String>,
    pub like_count: Option<String>,
    pub comment_count: Option<String>,
}

impl VideoItem {
    /// Map the raw upstream item into the stored entity, recomputing the
    /// Shorts flag from the current duration, tags, and category.
    pub fn into_video(self) -> Video {
        let duration_seconds = self
            .content_details
            .duration
            .as_deref()
            .map(parse_duration)
            .unwrap_or(0);
        let short = is_short(
            duration_seconds,
            &self.snippet.tags,
            self.snippet.category_id.as_deref(),
        );

        let now = Utc::now();
        Video {
            video_id: self.id,
            channel_id: self.snippet.channel_id,
            title: self.snippet.title,
            description: self.snippet.description,
            published_at: self.snippet.published_at,
            duration_seconds,
            view_count: count(&self.statistics.view_count),
            like_count: count(&self.statistics.like_count),
            comment_count: count(&self.statistics.comment_count),
            thumbnail_url: self.snippet.thumbnails.best_url(),
            is_short: short,
            category_id: self.snippet.category_id,
            tags: self.snippet.tags,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_count_defaults_to_zero() {
        assert_eq!(count(&None), 0);
        assert_eq!(count(&Some("not a number".to_string())), 0);
        assert_eq!(count(&Some("1234".to_string())), 1234);
    }

    #[test]
    fn test_video_item_mapping() {
        let item: VideoItem = serde_json::from_value(json!({
            "id": "vid-1",
            "snippet": {
                "channelId": "UCabc",
                "title": "My upload",
                "publishedAt": "2024-05-01T12:00:00Z",
                "tags": ["gaming"],
                "categoryId": "20",
                "thumbnails": {"high": {"url": "https://img/hq.jpg"}}
            },
            "contentDetails": {"duration": "PT2M5S"},
            "statistics": {"viewCount": "500", "likeCount": "20"}
        }))
        .expect("deserialize video item");

        let video = item.into_video();
        assert_eq!(video.video_id, "vid-1");
        assert_eq!(video.channel_id, "UCabc");
        assert_eq!(video.duration_seconds, 125);
        assert_eq!(video.view_count, 500);
        assert_eq!(video.like_count, 20);
        // comment_count was absent upstream
        assert_eq!(video.comment_count, 0);
        assert_eq!(video.thumbnail_url.as_deref(), Some("https://img/hq.jpg"));
        assert!(!video.is_short);
    }

    #[test]
    fn test_channel_item_defaults() {
        let item: ChannelItem = serde_json::from_value(json!({
            "id": "UCabc",
            "snippet": {"title": "Some channel"}
        }))
        .expect("deserialize channel item");

        let channel = item.into_channel();
        assert_eq!(channel.channel_id, "UCabc");
        assert_eq!(channel.subscriber_count, 0);
        assert!(channel.thumbnail_url.is_none());
        assert!(channel.banner_url.is_none());
    }
}
