//! Router configuration for the HTTP API.
//!
//! This module sets up all routes, middleware (CORS, compression, tracing),
//! and creates the axum router ready for serving.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::state::AppState;

/// Trigger bodies are a single field.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Create the main application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // Reports are read by other in-cluster services and the frontend
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        .route("/reports", get(handlers::list_reports))
        .route("/reports/generate", post(handlers::trigger_generation))
        .route("/reports/latest/{kind}", get(handlers::get_latest_report))
        .route("/reports/{id}", get(handlers::get_report))
        .route("/reports/{id}/summary.html", get(handlers::get_report_summary))
        .route("/reports/{id}/metrics.csv", get(handlers::get_report_csv));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/generate", post(handlers::trigger_generation))
        .nest("/v1", api_v1)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
