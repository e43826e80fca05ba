//! Channel handlers: fetch enqueueing and stored-data reads.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use tuberank_models::{Channel, ChannelAnalytics, JobRecord, JobType, Video};
use tuberank_queue::{FetchChannelJob, FetchVideosJob, QueueError};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// External channel IDs are 24 characters, "UC"-prefixed, base64url.
pub fn is_valid_channel_id(id: &str) -> bool {
    id.len() == 24
        && id.starts_with("UC")
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

fn validate_channel_id(id: &str) -> ApiResult<()> {
    if is_valid_channel_id(id) {
        Ok(())
    } else {
        Err(ApiError::validation(format!("invalid channel ID: {}", id)))
    }
}

#[derive(Debug, Deserialize)]
pub struct FetchChannelRequest {
    pub channel_id: String,
}

#[derive(Debug, Deserialize)]
pub struct FetchVideosRequest {
    #[serde(default)]
    pub max_pages: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct EnqueuedResponse {
    pub job_id: String,
}

/// `POST /api/channels/fetch` — enqueue a channel metadata fetch.
pub async fn fetch_channel(
    State(state): State<AppState>,
    Json(req): Json<FetchChannelRequest>,
) -> ApiResult<(StatusCode, Json<EnqueuedResponse>)> {
    validate_channel_id(&req.channel_id)?;

    let job = FetchChannelJob::new(&req.channel_id);
    let mut record = JobRecord::new(JobType::ChannelFetch, &req.channel_id);
    record.id = job.job_id.clone();

    // The row exists before the queue message so a worker can always
    // transition it.
    state.store.insert_job(&record).await?;

    if let Err(e) = state.queue.enqueue_channel_fetch(job).await {
        state
            .store
            .mark_job_failed(&record.id, &e.to_string())
            .await?;
        return Err(map_enqueue_error(e));
    }

    info!(channel_id = %req.channel_id, job_id = %record.id, "Enqueued channel fetch");
    Ok((
        StatusCode::ACCEPTED,
        Json(EnqueuedResponse {
            job_id: record.id.to_string(),
        }),
    ))
}

/// `POST /api/channels/:id/videos/fetch` — enqueue a video listing walk.
pub async fn fetch_videos(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
    Json(req): Json<FetchVideosRequest>,
) -> ApiResult<(StatusCode, Json<EnqueuedResponse>)> {
    validate_channel_id(&channel_id)?;

    let mut job = FetchVideosJob::new(&channel_id);
    if let Some(max_pages) = req.max_pages {
        job = job.with_max_pages(max_pages);
    }
    let mut record = JobRecord::new(JobType::VideoFetch, &channel_id);
    record.id = job.job_id.clone();

    state.store.insert_job(&record).await?;

    if let Err(e) = state.queue.enqueue_video_fetch(job).await {
        state
            .store
            .mark_job_failed(&record.id, &e.to_string())
            .await?;
        return Err(map_enqueue_error(e));
    }

    info!(channel_id = %channel_id, job_id = %record.id, "Enqueued video fetch");
    Ok((
        StatusCode::ACCEPTED,
        Json(EnqueuedResponse {
            job_id: record.id.to_string(),
        }),
    ))
}

fn map_enqueue_error(e: QueueError) -> ApiError {
    match e {
        QueueError::EnqueueFailed(msg) if msg.contains("Duplicate") => {
            ApiError::conflict("a fetch for this channel is already queued")
        }
        other => other.into(),
    }
}

/// `GET /api/channels/:id` — stored channel or 404.
pub async fn get_channel(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
) -> ApiResult<Json<Channel>> {
    let channel = state
        .store
        .get_channel(&channel_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("channel {}", channel_id)))?;
    Ok(Json(channel))
}

#[derive(Debug, Deserialize)]
pub struct ListVideosQuery {
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
    #[serde(default)]
    pub include_shorts: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct VideoListResponse {
    pub videos: Vec<Video>,
    pub limit: i64,
    pub offset: i64,
}

/// `GET /api/channels/:id/videos` — paged stored videos, newest first.
pub async fn list_videos(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
    Query(query): Query<ListVideosQuery>,
) -> ApiResult<Json<VideoListResponse>> {
    let limit = query.limit.unwrap_or(50).clamp(1, 100);
    let offset = query.offset.unwrap_or(0).max(0);
    let include_shorts = query.include_shorts.unwrap_or(true);

    let videos = state
        .store
        .list_videos(&channel_id, limit, offset, include_shorts)
        .await?;

    Ok(Json(VideoListResponse {
        videos,
        limit,
        offset,
    }))
}

/// `GET /api/channels/:id/analytics` — stored aggregate, computed on
/// demand when absent.
pub async fn get_analytics(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
) -> ApiResult<Json<ChannelAnalytics>> {
    if state.store.get_channel(&channel_id).await?.is_none() {
        return Err(ApiError::not_found(format!("channel {}", channel_id)));
    }

    let analytics = match state.store.get_channel_analytics(&channel_id).await? {
        Some(a) => a,
        None => state.store.recompute_channel_analytics(&channel_id).await?,
    };

    Ok(Json(analytics))
}
