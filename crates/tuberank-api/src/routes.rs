//! API routes.

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::channels::{
    fetch_channel, fetch_videos, get_analytics, get_channel, list_videos,
};
use crate::handlers::health::{health, ready};
use crate::handlers::jobs::get_job;
use crate::middleware::{
    cors_layer, rate_limit_middleware, request_id, request_logging, RateLimiterCache,
};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    let channel_routes = Router::new()
        .route("/channels/fetch", post(fetch_channel))
        .route("/channels/:channel_id/videos/fetch", post(fetch_videos))
        .route("/channels/:channel_id", get(get_channel))
        .route("/channels/:channel_id/videos", get(list_videos))
        .route("/channels/:channel_id/analytics", get(get_analytics));

    let job_routes = Router::new().route("/jobs/:job_id", get(get_job));

    let rate_limiter = std::sync::Arc::new(RateLimiterCache::new(state.config.rate_limit_rps));

    let api_routes = Router::new()
        .merge(channel_routes)
        .merge(job_routes)
        .layer(middleware::from_fn_with_state(
            rate_limiter,
            rate_limit_middleware,
        ));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
