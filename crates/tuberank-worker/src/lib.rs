//! Background ingestion worker.
//!
//! This crate provides:
//! - Job executor with bounded concurrency and graceful shutdown
//! - Channel/video fetch operations with progress checkpoints
//! - Retry with exponential backoff for transient upstream failures

pub mod config;
pub mod error;
pub mod executor;
pub mod processor;
pub mod retry;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use executor::JobExecutor;
pub use processor::{FetchOps, IngestService};
