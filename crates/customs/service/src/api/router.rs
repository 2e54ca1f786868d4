//! API Router configuration

use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Routes without middleware, for embedding and tests
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/health", get(handlers::health_check))
        .route("/v1/jobs", get(handlers::list_jobs).post(handlers::create_job))
        .route("/v1/jobs/:job_id", get(handlers::get_job))
        .route("/v1/jobs/:job_id/answers", post(handlers::record_answer))
        .route("/v1/jobs/:job_id/abort", post(handlers::abort_job))
        .route("/v1/orchestrate", post(handlers::orchestrate))
        .with_state(state)
}

/// Full router with tracing and optional CORS
pub fn create_router(state: AppState, enable_cors: bool) -> Router {
    let router = build_router(state).layer(TraceLayer::new_for_http());
    if enable_cors {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    }
}
