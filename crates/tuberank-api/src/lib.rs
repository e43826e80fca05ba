//! Axum HTTP API server.
//!
//! This crate provides:
//! - REST surface for enqueueing fetch jobs and reading stored data
//! - Job status polling
//! - Rate limiting, request IDs, and request logging

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
