//! Metadata endpoint handler.
//!
//! Returns JSON describing the served product and how points are extracted from it.

use axum::{extract::State, Json};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::logging::new_request_id;
use crate::state::AppState;

/// Handle GET /metadata requests
pub async fn metadata_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let request_id = new_request_id();
    let start_time = Instant::now();

    debug!(
        endpoint = "/metadata",
        request_id = %request_id,
        "Processing metadata request"
    );

    let metadata = &state.product.metadata;
    let response = serde_json::json!({
        "file_path": state.file_path.display().to_string(),
        "profile": state.profile.name,
        "variable": state.profile.variable,
        "default_policy": state.default_policy(),
        "global_attributes": metadata.global_attributes,
        "dimensions": metadata.dimensions,
        "variables": metadata.variables,
        "coordinates": metadata.coordinates,
    });

    info!(
        endpoint = "/metadata",
        request_id = %request_id,
        duration_us = start_time.elapsed().as_micros() as u64,
        variable_count = metadata.variables.len(),
        dimension_count = metadata.dimensions.len(),
        "Metadata request successful"
    );

    Json(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::composite_state;

    #[tokio::test]
    async fn test_metadata_handler() {
        let state = Arc::new(composite_state());
        let Json(json) = metadata_handler(State(state)).await;

        assert_eq!(json["profile"], "daily_avhrr");
        assert_eq!(json["variable"], "sst");
        assert_eq!(json["default_policy"], "closestwithin5");

        let vars = json["variables"].as_object().unwrap();
        assert!(vars.contains_key("sst"));
        assert!(vars.contains_key("mask"));

        let dims = json["dimensions"].as_object().unwrap();
        assert_eq!(dims["lat"]["size"], 3);
        assert_eq!(dims["time"]["size"], 1);

        let lat = json["coordinates"]["lat"].as_array().unwrap();
        assert_eq!(lat.len(), 3);
        assert_eq!(lat[0], serde_json::json!(38.0));
    }
}
