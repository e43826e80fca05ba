//! Redis Streams transport for fetch jobs.
//!
//! Producers enqueue through a dedup guard keyed on the job's idempotency
//! key; consumers read through a consumer group and explicitly ack or
//! dead-letter every delivery. Retry policy is the worker's concern, not
//! the transport's: a delivery either completes (ack) or is exhausted
//! (DLQ), and the stream never redelivers on its own except through
//! [`JobQueue::claim_pending`].

use std::collections::HashMap;

use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::{debug, info, warn};

use crate::error::{QueueError, QueueResult};
use crate::job::{FetchChannelJob, FetchVideosJob, QueueJob};

/// Dedup key TTL. Bounds how long a crashed-and-never-cleared key can
/// block re-fetching a channel.
const DEDUP_TTL_SECS: u64 = 3600;

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Redis URL
    pub redis_url: String,
    /// Stream carrying live jobs
    pub stream: String,
    /// Consumer group reading the stream
    pub group: String,
    /// Stream receiving exhausted jobs
    pub dlq_stream: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            stream: "tuberank:jobs".to_string(),
            group: "tuberank:workers".to_string(),
            dlq_stream: "tuberank:dlq".to_string(),
        }
    }
}

impl QueueConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            redis_url: std::env::var("REDIS_URL").unwrap_or(defaults.redis_url),
            stream: std::env::var("QUEUE_STREAM").unwrap_or(defaults.stream),
            group: std::env::var("QUEUE_CONSUMER_GROUP").unwrap_or(defaults.group),
            dlq_stream: std::env::var("QUEUE_DLQ_STREAM").unwrap_or(defaults.dlq_stream),
        }
    }
}

/// One message handed to a consumer: the stream entry ID it must ack or
/// dead-letter, plus the decoded payload.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub entry_id: String,
    pub job: QueueJob,
}

/// Decode the `job` field of a stream entry.
///
/// Returns `None` for entries without a payload or with one that no
/// longer parses; callers ack those so they are not redelivered forever.
fn decode_entry(map: &HashMap<String, redis::Value>) -> Option<QueueJob> {
    let redis::Value::BulkString(payload) = map.get("job")? else {
        return None;
    };
    match serde_json::from_slice::<QueueJob>(payload) {
        Ok(job) => Some(job),
        Err(e) => {
            warn!("Undecodable job payload: {}", e);
            None
        }
    }
}

fn dedup_key(job: &QueueJob) -> String {
    format!("tuberank:dedup:{}", job.idempotency_key())
}

/// Job queue client.
pub struct JobQueue {
    client: redis::Client,
    config: QueueConfig,
}

impl JobQueue {
    pub fn new(config: QueueConfig) -> QueueResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> QueueResult<Self> {
        Self::new(QueueConfig::from_env())
    }

    async fn connection(&self) -> QueueResult<MultiplexedConnection> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }

    /// Create the consumer group if it does not exist yet.
    pub async fn init(&self) -> QueueResult<()> {
        let mut conn = self.connection().await?;

        let created: Result<(), redis::RedisError> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.config.stream)
            .arg(&self.config.group)
            .arg("$")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match created {
            Ok(_) => info!("Created consumer group: {}", self.config.group),
            Err(e) if e.to_string().contains("BUSYGROUP") => {
                debug!("Consumer group already exists: {}", self.config.group);
            }
            Err(e) => return Err(QueueError::Redis(e)),
        }

        Ok(())
    }

    // -----------------------------------------------------------------
    // Producing
    // -----------------------------------------------------------------

    pub async fn enqueue_channel_fetch(&self, job: FetchChannelJob) -> QueueResult<String> {
        self.enqueue(QueueJob::FetchChannel(job)).await
    }

    pub async fn enqueue_video_fetch(&self, job: FetchVideosJob) -> QueueResult<String> {
        self.enqueue(QueueJob::FetchVideos(job)).await
    }

    /// Append a job to the stream, guarded by its dedup key.
    ///
    /// While a prior job for the same channel and type is neither
    /// completed nor expired, enqueueing fails rather than piling up
    /// identical work.
    async fn enqueue(&self, job: QueueJob) -> QueueResult<String> {
        let mut conn = self.connection().await?;

        let guard = dedup_key(&job);
        if conn.exists(&guard).await? {
            warn!("Duplicate job rejected: {}", job.idempotency_key());
            return Err(QueueError::enqueue_failed("Duplicate job"));
        }

        let payload = serde_json::to_string(&job)?;
        let entry_id: String = redis::cmd("XADD")
            .arg(&self.config.stream)
            .arg("*")
            .arg("job")
            .arg(&payload)
            .query_async(&mut conn)
            .await?;

        conn.set_ex::<_, _, ()>(&guard, "1", DEDUP_TTL_SECS).await?;

        info!("Enqueued job {} as stream entry {}", job.job_id(), entry_id);
        Ok(entry_id)
    }

    /// Drop a job's dedup key so its channel can be re-fetched before the
    /// TTL expires. Called when the job reaches a terminal state.
    pub async fn clear_dedup(&self, job: &QueueJob) -> QueueResult<()> {
        let mut conn = self.connection().await?;
        conn.del::<_, ()>(&dedup_key(job)).await?;
        Ok(())
    }

    // -----------------------------------------------------------------
    // Consuming
    // -----------------------------------------------------------------

    /// Read up to `count` new deliveries for this consumer, blocking up to
    /// `block_ms`. Entries whose payload no longer decodes are acked and
    /// skipped.
    pub async fn consume(
        &self,
        consumer: &str,
        block_ms: u64,
        count: usize,
    ) -> QueueResult<Vec<Delivery>> {
        let mut conn = self.connection().await?;

        let reply: redis::streams::StreamReadReply = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.config.group)
            .arg(consumer)
            .arg("COUNT")
            .arg(count)
            .arg("BLOCK")
            .arg(block_ms)
            .arg("STREAMS")
            .arg(&self.config.stream)
            .arg(">")
            .query_async(&mut conn)
            .await?;

        let entries = reply.keys.into_iter().flat_map(|key| key.ids);
        self.collect_deliveries(entries).await
    }

    /// Take over deliveries another consumer left pending for at least
    /// `min_idle_ms`. Recovers jobs orphaned by a crashed worker.
    pub async fn claim_pending(
        &self,
        consumer: &str,
        min_idle_ms: u64,
        count: usize,
    ) -> QueueResult<Vec<Delivery>> {
        let mut conn = self.connection().await?;

        let pending: redis::streams::StreamPendingReply = redis::cmd("XPENDING")
            .arg(&self.config.stream)
            .arg(&self.config.group)
            .query_async(&mut conn)
            .await?;
        if pending.count() == 0 {
            return Ok(Vec::new());
        }

        let claimed: redis::streams::StreamClaimReply = redis::cmd("XCLAIM")
            .arg(&self.config.stream)
            .arg(&self.config.group)
            .arg(consumer)
            .arg(min_idle_ms)
            .arg("0-0")
            .arg("COUNT")
            .arg(count)
            .query_async(&mut conn)
            .await?;

        let deliveries = self.collect_deliveries(claimed.ids.into_iter()).await?;
        for delivery in &deliveries {
            info!("Claimed pending job {}", delivery.job.job_id());
        }
        Ok(deliveries)
    }

    async fn collect_deliveries(
        &self,
        entries: impl Iterator<Item = redis::streams::StreamId>,
    ) -> QueueResult<Vec<Delivery>> {
        let mut deliveries = Vec::new();
        for entry in entries {
            match decode_entry(&entry.map) {
                Some(job) => deliveries.push(Delivery {
                    entry_id: entry.id,
                    job,
                }),
                None => {
                    // Poison entry; drop it from the pending list.
                    self.ack(&entry.id).await.ok();
                }
            }
        }
        Ok(deliveries)
    }

    /// Acknowledge a delivery and drop it from the stream.
    pub async fn ack(&self, entry_id: &str) -> QueueResult<()> {
        let mut conn = self.connection().await?;

        redis::cmd("XACK")
            .arg(&self.config.stream)
            .arg(&self.config.group)
            .arg(entry_id)
            .query_async::<()>(&mut conn)
            .await?;
        redis::cmd("XDEL")
            .arg(&self.config.stream)
            .arg(entry_id)
            .query_async::<()>(&mut conn)
            .await?;

        debug!("Acknowledged delivery: {}", entry_id);
        Ok(())
    }

    /// Move an exhausted job to the dead-letter stream and ack the
    /// original delivery.
    pub async fn dlq(&self, entry_id: &str, job: &QueueJob, error: &str) -> QueueResult<()> {
        let mut conn = self.connection().await?;

        let payload = serde_json::to_string(job)?;
        redis::cmd("XADD")
            .arg(&self.config.dlq_stream)
            .arg("*")
            .arg("job")
            .arg(&payload)
            .arg("error")
            .arg(error)
            .arg("original_id")
            .arg(entry_id)
            .query_async::<()>(&mut conn)
            .await?;

        self.ack(entry_id).await?;

        warn!("Moved job {} to DLQ: {}", job.job_id(), error);
        Ok(())
    }

    /// Live stream length, for the readiness probe.
    pub async fn len(&self) -> QueueResult<u64> {
        let mut conn = self.connection().await?;
        Ok(conn.xlen(&self.config.stream).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_map(payload: Option<redis::Value>) -> HashMap<String, redis::Value> {
        let mut map = HashMap::new();
        if let Some(value) = payload {
            map.insert("job".to_string(), value);
        }
        map
    }

    #[test]
    fn test_decode_entry_roundtrips_payload() {
        let job = QueueJob::FetchVideos(FetchVideosJob::new("UCabc").with_max_pages(4));
        let payload = serde_json::to_vec(&job).expect("serialize");

        let decoded = decode_entry(&entry_map(Some(redis::Value::BulkString(payload))))
            .expect("decode");
        assert_eq!(decoded.job_id(), job.job_id());
        assert_eq!(decoded.channel_id(), "UCabc");
    }

    #[test]
    fn test_decode_entry_rejects_garbage() {
        // No payload field at all
        assert!(decode_entry(&entry_map(None)).is_none());

        // Payload that is not JSON
        let garbage = redis::Value::BulkString(b"not json".to_vec());
        assert!(decode_entry(&entry_map(Some(garbage))).is_none());

        // Payload of the wrong Redis type
        let wrong_type = redis::Value::Int(7);
        assert!(decode_entry(&entry_map(Some(wrong_type))).is_none());
    }

    #[test]
    fn test_dedup_key_is_namespaced_per_job_type() {
        let channel = QueueJob::FetchChannel(FetchChannelJob::new("UC1"));
        let videos = QueueJob::FetchVideos(FetchVideosJob::new("UC1"));

        assert_eq!(dedup_key(&channel), "tuberank:dedup:channel_fetch:UC1");
        assert_eq!(dedup_key(&videos), "tuberank:dedup:video_fetch:UC1");
        assert_ne!(dedup_key(&channel), dedup_key(&videos));
    }

    #[test]
    fn test_config_defaults() {
        let config = QueueConfig::default();
        assert_eq!(config.stream, "tuberank:jobs");
        assert_eq!(config.group, "tuberank:workers");
        assert_eq!(config.dlq_stream, "tuberank:dlq");
    }
}
