//! Route registration and shared middleware.

use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub mod error;
pub mod handlers;
pub mod schemas;

pub use error::ApiError;

/// Upper bound on a single request, generation included.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/embed", post(handlers::embed))
        .route("/query", post(handlers::query))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
