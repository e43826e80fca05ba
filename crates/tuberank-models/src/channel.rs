//! Channel entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A YouTube channel as stored locally.
///
/// Identified by the immutable external channel ID. Counters are
/// externally sourced and may decrease between syncs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    /// External channel ID (e.g. "UC...")
    pub channel_id: String,
    /// Channel title
    pub title: String,
    /// Channel description
    pub description: String,
    /// Custom URL handle, if set
    pub custom_url: Option<String>,
    /// Channel avatar thumbnail URL
    pub thumbnail_url: Option<String>,
    /// Channel banner URL
    pub banner_url: Option<String>,
    /// Subscriber count at last sync
    pub subscriber_count: i64,
    /// Total uploaded video count at last sync
    pub video_count: i64,
    /// Cumulative channel view count at last sync
    pub view_count: i64,
    /// When the local row was created
    pub created_at: DateTime<Utc>,
    /// When the local row was last written
    pub updated_at: DateTime<Utc>,
}

impl Channel {
    /// Create a channel record with both timestamps set to now.
    pub fn new(channel_id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            channel_id: channel_id.into(),
            title: title.into(),
            description: String::new(),
            custom_url: None,
            thumbnail_url: None,
            banner_url: None,
            subscriber_count: 0,
            video_count: 0,
            view_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}
