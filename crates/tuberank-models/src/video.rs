//! Video entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A YouTube video as stored locally.
///
/// Identified by the immutable external video ID and foreign-keyed to its
/// channel by the channel's external ID. The `is_short` flag is the result
/// of the classification heuristic, not the platform's own designation, and
/// is recomputed on every fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    /// External video ID
    pub video_id: String,
    /// External ID of the owning channel
    pub channel_id: String,
    /// Video title
    pub title: String,
    /// Video description
    pub description: String,
    /// Publish timestamp, if known
    pub published_at: Option<DateTime<Utc>>,
    /// Duration in seconds (0 when the upstream duration was malformed)
    pub duration_seconds: i64,
    /// View count at last sync
    pub view_count: i64,
    /// Like count at last sync
    pub like_count: i64,
    /// Comment count at last sync
    pub comment_count: i64,
    /// Thumbnail URL
    pub thumbnail_url: Option<String>,
    /// Heuristic Shorts classification
    pub is_short: bool,
    /// Upstream category code
    pub category_id: Option<String>,
    /// Free-text tags
    pub tags: Vec<String>,
    /// When the local row was created
    pub created_at: DateTime<Utc>,
    /// When the local row was last written
    pub updated_at: DateTime<Utc>,
}

impl Video {
    /// Create a video record with both timestamps set to now.
    pub fn new(
        video_id: impl Into<String>,
        channel_id: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            video_id: video_id.into(),
            channel_id: channel_id.into(),
            title: title.into(),
            description: String::new(),
            published_at: None,
            duration_seconds: 0,
            view_count: 0,
            like_count: 0,
            comment_count: 0,
            thumbnail_url: None,
            is_short: false,
            category_id: None,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}
