//! Job processing: fetch operations and their storage side effects.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use tuberank_models::JobId;
use tuberank_queue::{FetchChannelJob, FetchVideosJob};
use tuberank_storage::Store;
use tuberank_youtube::pagination::collect_videos;
use tuberank_youtube::YouTubeClient;

use crate::error::WorkerResult;

/// Page cap applied when a video fetch job does not carry one.
pub const DEFAULT_MAX_PAGES: u32 = 10;

/// The ingestion operations a worker can execute.
///
/// The executor only sees this trait; tests drive it with a stub
/// implementation instead of a live upstream.
#[async_trait]
pub trait FetchOps: Send + Sync {
    /// Fetch one channel's metadata and upsert it.
    async fn fetch_channel(&self, job: &FetchChannelJob) -> WorkerResult<()>;

    /// Walk a channel's videos, upsert them, recompute analytics.
    async fn fetch_videos(&self, job: &FetchVideosJob) -> WorkerResult<()>;
}

/// Production [`FetchOps`] over the live client and store.
///
/// Progress checkpoints: 50 after the primary fetch, 100 after storage.
pub struct IngestService {
    client: Arc<YouTubeClient>,
    store: Store,
}

impl IngestService {
    pub fn new(client: Arc<YouTubeClient>, store: Store) -> Self {
        Self { client, store }
    }

    async fn checkpoint(&self, job_id: &JobId, progress: u8) -> WorkerResult<()> {
        self.store.set_job_progress(job_id, progress).await?;
        Ok(())
    }
}

#[async_trait]
impl FetchOps for IngestService {
    async fn fetch_channel(&self, job: &FetchChannelJob) -> WorkerResult<()> {
        let channel = self.client.get_channel(&job.channel_id).await?;
        self.checkpoint(&job.job_id, 50).await?;

        self.store.upsert_channel(&channel).await?;
        self.checkpoint(&job.job_id, 100).await?;

        info!(
            channel_id = %job.channel_id,
            title = %channel.title,
            "Channel fetch complete"
        );
        Ok(())
    }

    async fn fetch_videos(&self, job: &FetchVideosJob) -> WorkerResult<()> {
        let max_pages = if job.max_pages == 0 {
            DEFAULT_MAX_PAGES
        } else {
            job.max_pages
        };

        let videos = collect_videos(&self.client, &job.channel_id, max_pages).await?;
        self.checkpoint(&job.job_id, 50).await?;

        for video in &videos {
            self.store.upsert_video(video).await?;
        }
        let analytics = self
            .store
            .recompute_channel_analytics(&job.channel_id)
            .await?;
        self.checkpoint(&job.job_id, 100).await?;

        info!(
            channel_id = %job.channel_id,
            videos = videos.len(),
            shorts = analytics.total_shorts,
            "Video fetch complete"
        );
        Ok(())
    }
}
