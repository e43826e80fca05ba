//! Quota-aware YouTube Data API v3 client.
//!
//! This crate is the ingestion core of the TubeRank backend:
//! - [`QuotaTracker`]: process-wide daily-unit and per-minute budgets
//! - [`ResponseCache`]: short-lived memoization of API responses
//! - [`YouTubeClient`]: outbound HTTP with quota checks, caching, and a
//!   typed error taxonomy
//! - [`pagination::collect_videos`]: token-driven multi-page video listing
//! - [`parse`]: ISO-8601 duration decoding and Shorts classification

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod pagination;
pub mod parse;
pub mod quota;
pub mod types;

pub use cache::ResponseCache;
pub use client::{VideoPage, YouTubeClient};
pub use config::YouTubeConfig;
pub use error::{YouTubeError, YouTubeResult};
pub use quota::{QuotaSnapshot, QuotaTracker};
