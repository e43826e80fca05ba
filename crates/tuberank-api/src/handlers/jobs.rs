//! Job status handlers for progress polling.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use tuberank_models::JobId;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Job status response.
#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub job_id: String,
    pub job_type: String,
    pub channel_id: String,
    /// pending, started, completed, or failed
    pub status: String,
    /// Progress percentage (0-100)
    pub progress: u8,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// `GET /api/jobs/:id` — job status or 404.
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobStatusResponse>> {
    let id = JobId::from_string(job_id);
    let record = state
        .store
        .get_job(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("job {}", id)))?;

    Ok(Json(JobStatusResponse {
        job_id: record.id.to_string(),
        job_type: record.job_type.as_str().to_string(),
        channel_id: record.channel_id,
        status: record.status.as_str().to_string(),
        progress: record.progress,
        created_at: record.created_at.to_rfc3339(),
        started_at: record.started_at.map(|t| t.to_rfc3339()),
        completed_at: record.completed_at.map(|t| t.to_rfc3339()),
        error_message: record.error_message,
    }))
}
