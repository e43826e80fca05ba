//! SQL storage adapter.
//!
//! Owns all Channel/Video/ChannelAnalytics persistence and the job-queue
//! lifecycle rows. Upserts are idempotent, keyed on the natural external
//! IDs, and bump `updated_at` on every write whether or not values
//! changed. Analytics are always recomputed by a full scan, never
//! incrementally.

pub mod error;
pub mod jobs;
pub mod store;

pub use error::{StorageError, StorageResult};
pub use store::Store;
