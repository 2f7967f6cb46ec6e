//! HTTP request handlers for the point service.

pub mod heartbeat;
pub mod metadata;
pub mod point;

pub use heartbeat::heartbeat_handler;
pub use metadata::metadata_handler;
pub use point::point_handler;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::logging::http_trace_layer;
use crate::state::AppState;

/// Router with every endpoint of the point service
pub fn router(state: Arc<AppState>) -> Router {
    heartbeat::mark_start();
    let trace_layer = http_trace_layer(&state.profile);
    Router::new()
        .route("/point", get(point_handler))
        .route("/metadata", get(metadata_handler))
        .route("/heartbeat", get(heartbeat_handler))
        .layer(trace_layer)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
