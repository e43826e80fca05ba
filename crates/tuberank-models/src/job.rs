//! Background job records and lifecycle states.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Kind of work a job performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    /// Fetch one channel's metadata and upsert it
    ChannelFetch,
    /// Walk one channel's video listing, upsert videos, recompute analytics
    VideoFetch,
}

impl JobType {
    /// Get string representation of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::ChannelFetch => "channel_fetch",
            JobType::VideoFetch => "video_fetch",
        }
    }

    /// Parse from the stored string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "channel_fetch" => Some(JobType::ChannelFetch),
            "video_fetch" => Some(JobType::VideoFetch),
            _ => None,
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Job lifecycle status.
///
/// Transitions are strictly forward: `pending -> started -> completed`
/// or `pending -> started -> failed`. Terminal states never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job is queued waiting for a worker
    #[default]
    Pending,
    /// Job is actively being processed
    Started,
    /// Job completed successfully
    Completed,
    /// Job failed with an error
    Failed,
}

impl JobStatus {
    /// Get string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Started => "started",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Parse from the stored string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "started" => Some(JobStatus::Started),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    /// Check if this is a terminal state (no more transitions permitted).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One asynchronous unit of work, retained indefinitely for audit.
///
/// Only the worker executing a job mutates it, and only through the
/// transition helpers below, which enforce forward-only status movement
/// and non-decreasing progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Unique job ID
    pub id: JobId,
    /// Kind of work
    pub job_type: JobType,
    /// Target channel's external ID
    pub channel_id: String,
    /// Current lifecycle status
    pub status: JobStatus,
    /// Scheduling priority (higher runs first; informational)
    pub priority: i64,
    /// Progress percentage (0-100, non-decreasing)
    pub progress: u8,
    /// When the job was enqueued
    pub created_at: DateTime<Utc>,
    /// When a worker picked the job up
    pub started_at: Option<DateTime<Utc>>,
    /// When the job reached a terminal state
    pub completed_at: Option<DateTime<Utc>>,
    /// Error message recorded on failure
    pub error_message: Option<String>,
}

impl JobRecord {
    /// Create a freshly enqueued job.
    pub fn new(job_type: JobType, channel_id: impl Into<String>) -> Self {
        Self {
            id: JobId::new(),
            job_type,
            channel_id: channel_id.into(),
            status: JobStatus::Pending,
            priority: 0,
            progress: 0,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error_message: None,
        }
    }

    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Transition to `started`. Only legal from `pending`.
    pub fn start(&mut self) {
        if self.status != JobStatus::Pending {
            return;
        }
        self.status = JobStatus::Started;
        self.started_at = Some(Utc::now());
    }

    /// Raise progress. Decreasing updates are ignored.
    pub fn set_progress(&mut self, progress: u8) {
        if self.is_terminal() {
            return;
        }
        self.progress = self.progress.max(progress.min(100));
    }

    /// Transition to `completed` with progress forced to 100.
    pub fn complete(&mut self) {
        if self.status != JobStatus::Started {
            return;
        }
        self.status = JobStatus::Completed;
        self.progress = 100;
        self.completed_at = Some(Utc::now());
    }

    /// Transition to `failed`, recording the error.
    pub fn fail(&mut self, error: impl Into<String>) {
        if self.is_terminal() {
            return;
        }
        self.status = JobStatus::Failed;
        self.error_message = Some(error.into());
        self.completed_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_job_is_pending() {
        let job = JobRecord::new(JobType::ChannelFetch, "UC123");
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.progress, 0);
        assert!(job.started_at.is_none());
        assert!(!job.is_terminal());
    }

    #[test]
    fn test_forward_only_transitions() {
        let mut job = JobRecord::new(JobType::VideoFetch, "UC123");

        job.start();
        assert_eq!(job.status, JobStatus::Started);
        assert!(job.started_at.is_some());

        job.set_progress(50);
        assert_eq!(job.progress, 50);

        job.complete();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 100);
        assert!(job.is_terminal());

        // Terminal states never change
        job.fail("too late");
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.error_message.is_none());
    }

    #[test]
    fn test_progress_is_monotonic() {
        let mut job = JobRecord::new(JobType::VideoFetch, "UC123");
        job.start();
        job.set_progress(50);
        job.set_progress(30);
        assert_eq!(job.progress, 50);
        job.set_progress(200);
        assert_eq!(job.progress, 100);
    }

    #[test]
    fn test_fail_records_error() {
        let mut job = JobRecord::new(JobType::ChannelFetch, "UC123");
        job.start();
        job.fail("upstream returned 500");
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error_message.as_deref(), Some("upstream returned 500"));
        assert!(job.completed_at.is_some());
    }

    #[test]
    fn test_complete_requires_started() {
        let mut job = JobRecord::new(JobType::ChannelFetch, "UC123");
        job.complete();
        assert_eq!(job.status, JobStatus::Pending);
    }

    #[test]
    fn test_status_roundtrip() {
        for status in [
            JobStatus::Pending,
            JobStatus::Started,
            JobStatus::Completed,
            JobStatus::Failed,
        ] {
            assert_eq!(JobStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(JobStatus::parse("bogus"), None);
    }
}
