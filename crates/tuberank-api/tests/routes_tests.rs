//! Router tests over an in-memory store.
//!
//! Redis-backed enqueue paths are not exercised here; requests that fail
//! validation never reach the queue.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use tuberank_api::{create_router, ApiConfig, AppState};
use tuberank_models::{Channel, JobRecord, JobType, Video};
use tuberank_queue::{JobQueue, QueueConfig};
use tuberank_storage::Store;
use tuberank_youtube::{QuotaTracker, YouTubeClient, YouTubeConfig};

const CHANNEL_ID: &str = "UC1234567890abcdefghij-_";

async fn test_app() -> (Router, Store) {
    let quota = Arc::new(QuotaTracker::new(10_000, 100));
    let client = YouTubeClient::new(YouTubeConfig::new("test-key"), Arc::clone(&quota))
        .expect("client");
    let store = Store::in_memory().await.expect("store");
    let queue = JobQueue::new(QueueConfig::default()).expect("queue");

    let state = AppState {
        config: ApiConfig::default(),
        store: store.clone(),
        queue: Arc::new(queue),
        client: Arc::new(client),
    };

    (create_router(state), store)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn test_health_reports_quota_snapshot() {
    let (app, _store) = test_app().await;

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["quota"]["daily_limit"], 10_000);
    assert_eq!(json["quota"]["daily_used"], 0);
    assert_eq!(json["quota"]["minute_limit"], 100);
}

#[tokio::test]
async fn test_get_channel_404_then_200() {
    let (app, store) = test_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::get(format!("/api/channels/{}", CHANNEL_ID))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let mut channel = Channel::new(CHANNEL_ID, "Test Channel");
    channel.subscriber_count = 1200;
    store.upsert_channel(&channel).await.expect("upsert");

    let response = app
        .oneshot(
            Request::get(format!("/api/channels/{}", CHANNEL_ID))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["channel_id"], CHANNEL_ID);
    assert_eq!(json["title"], "Test Channel");
    assert_eq!(json["subscriber_count"], 1200);
}

#[tokio::test]
async fn test_list_videos_respects_shorts_filter() {
    let (app, store) = test_app().await;

    let mut long_video = Video::new("v-long", CHANNEL_ID, "Long video");
    long_video.duration_seconds = 600;
    store.upsert_video(&long_video).await.expect("upsert");

    let mut short_video = Video::new("v-short", CHANNEL_ID, "Short video");
    short_video.duration_seconds = 30;
    short_video.is_short = true;
    store.upsert_video(&short_video).await.expect("upsert");

    let response = app
        .clone()
        .oneshot(
            Request::get(format!("/api/channels/{}/videos", CHANNEL_ID))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["videos"].as_array().unwrap().len(), 2);

    let response = app
        .oneshot(
            Request::get(format!(
                "/api/channels/{}/videos?include_shorts=false",
                CHANNEL_ID
            ))
            .body(Body::empty())
            .unwrap(),
        )
        .await
        .unwrap();
    let json = body_json(response).await;
    let videos = json["videos"].as_array().unwrap();
    assert_eq!(videos.len(), 1);
    assert_eq!(videos[0]["video_id"], "v-long");
}

#[tokio::test]
async fn test_analytics_computed_on_demand() {
    let (app, store) = test_app().await;

    store
        .upsert_channel(&Channel::new(CHANNEL_ID, "Test Channel"))
        .await
        .expect("upsert channel");
    for i in 0..4 {
        let mut video = Video::new(format!("v{}", i), CHANNEL_ID, format!("Video {}", i));
        video.duration_seconds = if i == 0 { 30 } else { 300 };
        video.is_short = i == 0;
        video.view_count = 100;
        store.upsert_video(&video).await.expect("upsert video");
    }

    // No analytics row exists yet; the handler computes one.
    let response = app
        .oneshot(
            Request::get(format!("/api/channels/{}/analytics", CHANNEL_ID))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["total_videos"], 4);
    assert_eq!(json["total_shorts"], 1);
    assert_eq!(json["shorts_percentage"], 25.0);
    assert_eq!(json["total_views"], 400);
}

#[tokio::test]
async fn test_analytics_404_for_unknown_channel() {
    let (app, _store) = test_app().await;

    let response = app
        .oneshot(
            Request::get(format!("/api/channels/{}/analytics", CHANNEL_ID))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_fetch_channel_rejects_invalid_id() {
    let (app, _store) = test_app().await;

    let response = app
        .oneshot(
            Request::post("/api/channels/fetch")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"channel_id": "not-a-channel"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["detail"]
        .as_str()
        .unwrap()
        .contains("invalid channel ID"));
}

#[tokio::test]
async fn test_get_job_status() {
    let (app, store) = test_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::get("/api/jobs/no-such-job")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let job = JobRecord::new(JobType::ChannelFetch, CHANNEL_ID);
    store.insert_job(&job).await.expect("insert job");

    let response = app
        .oneshot(
            Request::get(format!("/api/jobs/{}", job.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "pending");
    assert_eq!(json["job_type"], "channel_fetch");
    assert_eq!(json["progress"], 0);
    assert_eq!(json["channel_id"], CHANNEL_ID);
}
