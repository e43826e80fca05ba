//! Redis Streams job queue.
//!
//! This crate provides:
//! - Job enqueueing via Redis Streams with idempotency-key dedup
//! - Worker consumption with consumer groups and DLQ

pub mod error;
pub mod job;
pub mod queue;

pub use error::{QueueError, QueueResult};
pub use job::{FetchChannelJob, FetchVideosJob, QueueJob};
pub use queue::{Delivery, JobQueue, QueueConfig};
