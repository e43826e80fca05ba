//! Job lifecycle rows.
//!
//! The job queue exclusively owns these transitions; every update guards
//! the forward-only status machine in SQL so a stray write can never move
//! a job backwards or resurrect a terminal one. Rows are retained
//! indefinitely for audit.

use chrono::{DateTime, Utc};
use tracing::debug;

use tuberank_models::{JobId, JobRecord, JobStatus, JobType};

use crate::error::{StorageError, StorageResult};
use crate::store::Store;

#[derive(sqlx::FromRow)]
struct JobRow {
    id: String,
    job_type: String,
    channel_id: String,
    status: String,
    priority: i64,
    progress: i64,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    error_message: Option<String>,
}

impl TryFrom<JobRow> for JobRecord {
    type Error = StorageError;

    fn try_from(r: JobRow) -> StorageResult<Self> {
        let job_type = JobType::parse(&r.job_type)
            .ok_or_else(|| StorageError::not_found(format!("unknown job type {}", r.job_type)))?;
        let status = JobStatus::parse(&r.status)
            .ok_or_else(|| StorageError::not_found(format!("unknown job status {}", r.status)))?;
        Ok(Self {
            id: JobId::from_string(r.id),
            job_type,
            channel_id: r.channel_id,
            status,
            priority: r.priority,
            progress: r.progress.clamp(0, 100) as u8,
            created_at: r.created_at,
            started_at: r.started_at,
            completed_at: r.completed_at,
            error_message: r.error_message,
        })
    }
}

impl Store {
    /// Persist a freshly enqueued job.
    pub async fn insert_job(&self, job: &JobRecord) -> StorageResult<()> {
        sqlx::query(
            r#"INSERT INTO job_queue (
                 id, job_type, channel_id, status, priority, progress,
                 created_at, started_at, completed_at, error_message
               ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(job.id.as_str())
        .bind(job.job_type.as_str())
        .bind(&job.channel_id)
        .bind(job.status.as_str())
        .bind(job.priority)
        .bind(job.progress as i64)
        .bind(job.created_at)
        .bind(job.started_at)
        .bind(job.completed_at)
        .bind(&job.error_message)
        .execute(self.pool())
        .await?;

        debug!(job_id = %job.id, job_type = %job.job_type, "Inserted job");
        Ok(())
    }

    pub async fn get_job(&self, job_id: &JobId) -> StorageResult<Option<JobRecord>> {
        let row = sqlx::query_as::<_, JobRow>("SELECT * FROM job_queue WHERE id = ?")
            .bind(job_id.as_str())
            .fetch_optional(self.pool())
            .await?;
        row.map(JobRecord::try_from).transpose()
    }

    /// Transition `pending -> started`. A no-op for any other state.
    pub async fn mark_job_started(&self, job_id: &JobId) -> StorageResult<()> {
        sqlx::query(
            r#"UPDATE job_queue SET status = 'started', started_at = ?
               WHERE id = ? AND status = 'pending'"#,
        )
        .bind(Utc::now())
        .bind(job_id.as_str())
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Raise progress. Decreasing updates and terminal jobs are ignored.
    pub async fn set_job_progress(&self, job_id: &JobId, progress: u8) -> StorageResult<()> {
        sqlx::query(
            r#"UPDATE job_queue SET progress = MAX(progress, ?)
               WHERE id = ? AND status NOT IN ('completed', 'failed')"#,
        )
        .bind(progress.min(100) as i64)
        .bind(job_id.as_str())
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Transition `started -> completed` with progress forced to 100.
    pub async fn mark_job_completed(&self, job_id: &JobId) -> StorageResult<()> {
        sqlx::query(
            r#"UPDATE job_queue
               SET status = 'completed', progress = 100, completed_at = ?
               WHERE id = ? AND status = 'started'"#,
        )
        .bind(Utc::now())
        .bind(job_id.as_str())
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Transition to `failed`, recording the error. Terminal jobs are
    /// left untouched.
    pub async fn mark_job_failed(&self, job_id: &JobId, error: &str) -> StorageResult<()> {
        sqlx::query(
            r#"UPDATE job_queue
               SET status = 'failed', error_message = ?, completed_at = ?
               WHERE id = ? AND status NOT IN ('completed', 'failed')"#,
        )
        .bind(error)
        .bind(Utc::now())
        .bind(job_id.as_str())
        .execute(self.pool())
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_job_lifecycle_happy_path() {
        let store = Store::in_memory().await.expect("store");

        let job = JobRecord::new(JobType::ChannelFetch, "UC1");
        store.insert_job(&job).await.expect("insert");

        let fetched = store.get_job(&job.id).await.unwrap().expect("fetched");
        assert_eq!(fetched.status, JobStatus::Pending);
        assert_eq!(fetched.progress, 0);

        store.mark_job_started(&job.id).await.unwrap();
        store.set_job_progress(&job.id, 50).await.unwrap();
        store.mark_job_completed(&job.id).await.unwrap();

        let done = store.get_job(&job.id).await.unwrap().expect("done");
        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.progress, 100);
        assert!(done.started_at.is_some());
        assert!(done.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_terminal_jobs_never_move() {
        let store = Store::in_memory().await.expect("store");

        let job = JobRecord::new(JobType::VideoFetch, "UC1");
        store.insert_job(&job).await.expect("insert");
        store.mark_job_started(&job.id).await.unwrap();
        store.mark_job_failed(&job.id, "upstream 500").await.unwrap();

        // No resurrection from failed.
        store.mark_job_completed(&job.id).await.unwrap();
        store.set_job_progress(&job.id, 90).await.unwrap();

        let failed = store.get_job(&job.id).await.unwrap().expect("failed");
        assert_eq!(failed.status, JobStatus::Failed);
        assert_eq!(failed.error_message.as_deref(), Some("upstream 500"));
    }

    #[tokio::test]
    async fn test_progress_is_monotonic_in_sql() {
        let store = Store::in_memory().await.expect("store");

        let job = JobRecord::new(JobType::VideoFetch, "UC1");
        store.insert_job(&job).await.expect("insert");
        store.mark_job_started(&job.id).await.unwrap();

        store.set_job_progress(&job.id, 50).await.unwrap();
        store.set_job_progress(&job.id, 30).await.unwrap();

        let row = store.get_job(&job.id).await.unwrap().expect("job");
        assert_eq!(row.progress, 50);
    }

    #[tokio::test]
    async fn test_completed_requires_started() {
        let store = Store::in_memory().await.expect("store");

        let job = JobRecord::new(JobType::ChannelFetch, "UC1");
        store.insert_job(&job).await.expect("insert");

        // Skipping 'started' is not a legal transition.
        store.mark_job_completed(&job.id).await.unwrap();

        let row = store.get_job(&job.id).await.unwrap().expect("job");
        assert_eq!(row.status, JobStatus::Pending);
    }
}
