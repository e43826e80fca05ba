//! Application state.

use std::sync::Arc;

use tuberank_queue::JobQueue;
use tuberank_storage::Store;
use tuberank_youtube::{QuotaTracker, YouTubeClient};

use crate::config::ApiConfig;

/// Shared application state.
///
/// The quota tracker is the one piece of process-wide shared state: the
/// handlers read its snapshot and the embedded worker's client consumes
/// from it, so both must hold the same instance.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub store: Store,
    pub queue: Arc<JobQueue>,
    pub client: Arc<YouTubeClient>,
}

impl AppState {
    /// Create new application state.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let client = Arc::new(YouTubeClient::from_env()?);
        let store = Store::from_env().await?;
        let queue = JobQueue::from_env()?;

        Ok(Self {
            config,
            store,
            queue: Arc::new(queue),
            client,
        })
    }

    /// The process-wide quota tracker.
    pub fn quota(&self) -> &Arc<QuotaTracker> {
        self.client.quota()
    }
}
