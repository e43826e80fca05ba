//! Job payloads carried over the queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tuberank_models::JobId;

/// Job to fetch one channel's metadata and upsert it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchChannelJob {
    /// Unique job ID
    pub job_id: JobId,
    /// External channel ID (UC...)
    pub channel_id: String,
    /// When the job was created
    pub created_at: DateTime<Utc>,
}

impl FetchChannelJob {
    pub fn new(channel_id: impl Into<String>) -> Self {
        Self {
            job_id: JobId::new(),
            channel_id: channel_id.into(),
            created_at: Utc::now(),
        }
    }

    /// Generate idempotency key for deduplication.
    pub fn idempotency_key(&self) -> String {
        format!("channel_fetch:{}", self.channel_id)
    }
}

/// Job to walk a channel's video listing, upsert every video, and
/// recompute the channel's analytics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchVideosJob {
    /// Unique job ID
    pub job_id: JobId,
    /// External channel ID (UC...)
    pub channel_id: String,
    /// Pagination cap; 0 means walk every page
    #[serde(default)]
    pub max_pages: u32,
    /// When the job was created
    pub created_at: DateTime<Utc>,
}

impl FetchVideosJob {
    pub fn new(channel_id: impl Into<String>) -> Self {
        Self {
            job_id: JobId::new(),
            channel_id: channel_id.into(),
            max_pages: 0,
            created_at: Utc::now(),
        }
    }

    /// Cap the number of listing pages walked.
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Generate idempotency key for deduplication.
    pub fn idempotency_key(&self) -> String {
        format!("video_fetch:{}", self.channel_id)
    }
}

/// Generic job wrapper for queue storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueueJob {
    /// Fetch and upsert one channel's metadata
    FetchChannel(FetchChannelJob),
    /// Walk a channel's videos and recompute analytics
    FetchVideos(FetchVideosJob),
}

impl QueueJob {
    pub fn job_id(&self) -> &JobId {
        match self {
            QueueJob::FetchChannel(j) => &j.job_id,
            QueueJob::FetchVideos(j) => &j.job_id,
        }
    }

    pub fn channel_id(&self) -> &str {
        match self {
            QueueJob::FetchChannel(j) => &j.channel_id,
            QueueJob::FetchVideos(j) => &j.channel_id,
        }
    }

    pub fn idempotency_key(&self) -> String {
        match self {
            QueueJob::FetchChannel(j) => j.idempotency_key(),
            QueueJob::FetchVideos(j) => j.idempotency_key(),
        }
    }
}
