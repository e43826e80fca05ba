//! Shared data models for the TubeRank backend.
//!
//! This crate provides Serde-serializable types for:
//! - Channels, videos, and derived channel analytics
//! - Background jobs and their lifecycle states

pub mod analytics;
pub mod channel;
pub mod job;
pub mod video;

// Re-export common types
pub use analytics::{shorts_percentage, ChannelAnalytics};
pub use channel::Channel;
pub use job::{JobId, JobRecord, JobStatus, JobType};
pub use video::Video;
