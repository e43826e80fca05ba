//! Job executor.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use tuberank_queue::{Delivery, JobQueue, QueueJob};
use tuberank_storage::Store;

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::processor::FetchOps;
use crate::retry::{retry_async, RetryConfig, RetryResult};

/// Run one job to a terminal state: `started`, then the fetch operation
/// with bounded retries, then `completed` or `failed`.
///
/// Only transient errors are retried; a `NotFound` or other 4xx fails on
/// the first attempt.
pub async fn run_job(
    ops: &dyn FetchOps,
    store: &Store,
    config: &WorkerConfig,
    job: &QueueJob,
) -> WorkerResult<()> {
    let job_id = job.job_id().clone();
    store.mark_job_started(&job_id).await?;

    let retry = RetryConfig::new(format!("job {}", job_id))
        .with_max_attempts(config.max_attempts)
        .with_base_delay(config.retry_base_delay);

    let result = retry_async(
        &retry,
        || async {
            match job {
                QueueJob::FetchChannel(j) => ops.fetch_channel(j).await,
                QueueJob::FetchVideos(j) => ops.fetch_videos(j).await,
            }
        },
        WorkerError::is_retryable,
    )
    .await;

    match result {
        RetryResult::Success(()) => {
            store.mark_job_completed(&job_id).await?;
            Ok(())
        }
        RetryResult::Failed { error, attempts } => {
            store.mark_job_failed(&job_id, &error.to_string()).await?;
            warn!(job_id = %job_id, attempts, "Job failed: {}", error);
            Err(error)
        }
    }
}

/// Job executor that processes jobs from the queue.
pub struct JobExecutor {
    config: WorkerConfig,
    queue: Arc<JobQueue>,
    store: Store,
    ops: Arc<dyn FetchOps>,
    job_semaphore: Arc<Semaphore>,
    shutdown: tokio::sync::watch::Sender<bool>,
    consumer_name: String,
}

impl JobExecutor {
    /// Create a new job executor.
    pub fn new(
        config: WorkerConfig,
        queue: JobQueue,
        store: Store,
        ops: Arc<dyn FetchOps>,
    ) -> Self {
        let job_semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs));
        let (shutdown, _) = tokio::sync::watch::channel(false);
        let consumer_name = format!("worker-{}", Uuid::new_v4());

        Self {
            config,
            queue: Arc::new(queue),
            store,
            ops,
            job_semaphore,
            shutdown,
            consumer_name,
        }
    }

    /// Start the executor.
    pub async fn run(&self) -> WorkerResult<()> {
        info!(
            "Starting job executor '{}' with {} max concurrent jobs",
            self.consumer_name, self.config.max_concurrent_jobs
        );

        self.queue.init().await?;

        let mut shutdown_rx = self.shutdown.subscribe();

        // Periodically reclaim jobs orphaned by crashed workers
        let queue_clone = Arc::clone(&self.queue);
        let consumer_name = self.consumer_name.clone();
        let store_clone = self.store.clone();
        let ops_clone = Arc::clone(&self.ops);
        let config_clone = self.config.clone();
        let semaphore_clone = Arc::clone(&self.job_semaphore);
        let mut shutdown_rx_claim = self.shutdown.subscribe();

        let claim_task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(config_clone.claim_interval);
            loop {
                tokio::select! {
                    _ = shutdown_rx_claim.changed() => {
                        if *shutdown_rx_claim.borrow() {
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        let min_idle_ms = config_clone.claim_min_idle.as_millis() as u64;
                        match queue_clone.claim_pending(&consumer_name, min_idle_ms, 5).await {
                            Ok(deliveries) if !deliveries.is_empty() => {
                                info!("Claimed {} pending jobs", deliveries.len());
                                for Delivery { entry_id, job } in deliveries {
                                    let queue = Arc::clone(&queue_clone);
                                    let store = store_clone.clone();
                                    let ops = Arc::clone(&ops_clone);
                                    let config = config_clone.clone();
                                    let permit = match semaphore_clone.clone().acquire_owned().await {
                                        Ok(p) => p,
                                        Err(_) => break,
                                    };

                                    tokio::spawn(async move {
                                        let _permit = permit;
                                        Self::execute_job(ops, store, queue, config, entry_id, job)
                                            .await;
                                    });
                                }
                            }
                            Ok(_) => {}
                            Err(e) => {
                                warn!("Failed to claim pending jobs: {}", e);
                            }
                        }
                    }
                }
            }
        });

        // Main job consumption loop
        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping executor");
                        break;
                    }
                }
                result = self.consume_jobs() => {
                    if let Err(e) = result {
                        error!("Error consuming jobs: {}", e);
                        // Back off on error
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        }

        claim_task.abort();

        info!("Waiting for in-flight jobs to complete...");
        let _ = tokio::time::timeout(self.config.shutdown_timeout, self.wait_for_jobs()).await;

        info!("Job executor stopped");
        Ok(())
    }

    /// Consume and process jobs from the queue.
    async fn consume_jobs(&self) -> WorkerResult<()> {
        let available = self.job_semaphore.available_permits();
        if available == 0 {
            // All slots busy, wait a bit
            tokio::time::sleep(Duration::from_millis(100)).await;
            return Ok(());
        }

        let deliveries = self
            .queue
            .consume(
                &self.consumer_name,
                1000, // Block for 1 second
                available.min(5),
            )
            .await?;

        if deliveries.is_empty() {
            return Ok(());
        }

        debug!("Consumed {} jobs from queue", deliveries.len());

        for Delivery { entry_id, job } in deliveries {
            let queue = Arc::clone(&self.queue);
            let store = self.store.clone();
            let ops = Arc::clone(&self.ops);
            let config = self.config.clone();
            let permit = self
                .job_semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| WorkerError::job_failed("Semaphore closed"))?;

            tokio::spawn(async move {
                let _permit = permit;
                Self::execute_job(ops, store, queue, config, entry_id, job).await;
            });
        }

        Ok(())
    }

    /// Execute a single job with retry and DLQ handling.
    async fn execute_job(
        ops: Arc<dyn FetchOps>,
        store: Store,
        queue: Arc<JobQueue>,
        config: WorkerConfig,
        entry_id: String,
        job: QueueJob,
    ) {
        let job_id = job.job_id().to_string();
        info!("Executing job {}", job_id);

        match run_job(ops.as_ref(), &store, &config, &job).await {
            Ok(()) => {
                info!("Job {} completed successfully", job_id);
                if let Err(e) = queue.ack(&entry_id).await {
                    error!("Failed to ack job {}: {}", job_id, e);
                }
                // Clear dedup key so the same channel can be fetched again
                if let Err(e) = queue.clear_dedup(&job).await {
                    warn!("Failed to clear dedup key for job {}: {}", job_id, e);
                }
            }
            Err(e) => {
                error!("Job {} failed: {}", job_id, e);
                if let Err(dlq_err) = queue.dlq(&entry_id, &job, &e.to_string()).await {
                    error!("Failed to move job {} to DLQ: {}", job_id, dlq_err);
                }
                if let Err(e) = queue.clear_dedup(&job).await {
                    warn!("Failed to clear dedup key for job {}: {}", job_id, e);
                }
            }
        }
    }

    /// Wait for all in-flight jobs to complete.
    async fn wait_for_jobs(&self) {
        loop {
            let available = self.job_semaphore.available_permits();
            if available == self.config.max_concurrent_jobs {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use tuberank_models::{JobRecord, JobStatus, JobType};
    use tuberank_queue::{FetchChannelJob, FetchVideosJob};
    use tuberank_youtube::YouTubeError;

    /// Fails the first `fail_first` attempts with the given error factory,
    /// then succeeds.
    struct FlakyOps {
        calls: AtomicU32,
        fail_first: u32,
        error: fn() -> WorkerError,
    }

    impl FlakyOps {
        fn new(fail_first: u32, error: fn() -> WorkerError) -> Self {
            Self {
                calls: AtomicU32::new(0),
                fail_first,
                error,
            }
        }

        fn attempt(&self) -> WorkerResult<()> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                Err((self.error)())
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl FetchOps for FlakyOps {
        async fn fetch_channel(&self, _job: &FetchChannelJob) -> WorkerResult<()> {
            self.attempt()
        }

        async fn fetch_videos(&self, _job: &FetchVideosJob) -> WorkerResult<()> {
            self.attempt()
        }
    }

    fn transient() -> WorkerError {
        WorkerError::YouTube(YouTubeError::Upstream5xx { status: 503 })
    }

    fn permanent() -> WorkerError {
        WorkerError::YouTube(YouTubeError::not_found("no such channel"))
    }

    async fn seed_job(store: &Store) -> QueueJob {
        let queue_job = QueueJob::FetchChannel(FetchChannelJob::new("UC1"));
        let mut record = JobRecord::new(JobType::ChannelFetch, "UC1");
        record.id = queue_job.job_id().clone();
        store.insert_job(&record).await.expect("insert job");
        queue_job
    }

    fn fast_config() -> WorkerConfig {
        WorkerConfig {
            retry_base_delay: Duration::from_millis(1),
            ..WorkerConfig::default()
        }
    }

    #[tokio::test]
    async fn test_run_job_success_completes_record() {
        let store = Store::in_memory().await.expect("store");
        let job = seed_job(&store).await;
        let ops = FlakyOps::new(0, transient);

        run_job(&ops, &store, &fast_config(), &job)
            .await
            .expect("job should succeed");

        let record = store.get_job(job.job_id()).await.unwrap().expect("record");
        assert_eq!(record.status, JobStatus::Completed);
        assert_eq!(record.progress, 100);
    }

    #[tokio::test]
    async fn test_run_job_retries_transient_errors() {
        let store = Store::in_memory().await.expect("store");
        let job = seed_job(&store).await;
        // Fails twice, succeeds on the third attempt
        let ops = FlakyOps::new(2, transient);

        run_job(&ops, &store, &fast_config(), &job)
            .await
            .expect("job should succeed after retries");

        assert_eq!(ops.calls.load(Ordering::SeqCst), 3);
        let record = store.get_job(job.job_id()).await.unwrap().expect("record");
        assert_eq!(record.status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn test_run_job_exhausts_attempts_and_fails() {
        let store = Store::in_memory().await.expect("store");
        let job = seed_job(&store).await;
        let ops = FlakyOps::new(10, transient);

        let err = run_job(&ops, &store, &fast_config(), &job)
            .await
            .expect_err("job should fail");
        assert!(err.is_retryable());

        assert_eq!(ops.calls.load(Ordering::SeqCst), 3);
        let record = store.get_job(job.job_id()).await.unwrap().expect("record");
        assert_eq!(record.status, JobStatus::Failed);
        assert!(record.error_message.is_some());
    }

    #[tokio::test]
    async fn test_run_job_not_found_fails_immediately() {
        let store = Store::in_memory().await.expect("store");
        let job = seed_job(&store).await;
        let ops = FlakyOps::new(10, permanent);

        run_job(&ops, &store, &fast_config(), &job)
            .await
            .expect_err("job should fail");

        // No retries for a non-retryable error
        assert_eq!(ops.calls.load(Ordering::SeqCst), 1);
        let record = store.get_job(job.job_id()).await.unwrap().expect("record");
        assert_eq!(record.status, JobStatus::Failed);
    }
}
