//! Point extraction endpoint handler.
//!
//! Returns the temperature the configured product gives at a location under a
//! radius policy.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::error::{ColdpixError, Result};
use crate::extract::{try_extract, ExtractionQuery, RadiusPolicy};
use crate::logging::{log_point_extracted, log_point_failure, new_request_id};
use crate::state::AppState;

/// Query parameters for point endpoint
#[derive(Debug, Deserialize)]
pub struct PointQuery {
    /// Longitude, degrees east
    pub lon: f64,
    /// Latitude, degrees north
    pub lat: f64,
    /// Radius policy ("5", "closest", "closestwithin5")
    pub policy: Option<String>,
}

/// Response for point query
#[derive(Debug, Serialize, Deserialize)]
pub struct PointResponse {
    pub lon: f64,
    pub lat: f64,
    pub variable: String,
    pub policy: String,
    /// Extracted value in degrees Celsius; `null` when nothing valid is in reach
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    pub request_id: String,
}

fn check_coordinates(lon: f64, lat: f64) -> Result<()> {
    if !lon.is_finite() || !(-180.0..=360.0).contains(&lon) {
        return Err(ColdpixError::InvalidCoordinates {
            message: format!("longitude {} outside [-180, 360]", lon),
        });
    }
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(ColdpixError::InvalidCoordinates {
            message: format!("latitude {} outside [-90, 90]", lat),
        });
    }
    Ok(())
}

/// Handle GET /point requests
///
/// Bad coordinates are a 400. An unknown policy or a product that cannot be
/// read at the point still answers 200, with `value: null` and a warning.
pub async fn point_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PointQuery>,
) -> Response {
    let request_id = new_request_id();
    let start_time = Instant::now();

    debug!(
        request_id = %request_id,
        lon = params.lon,
        lat = params.lat,
        policy = ?params.policy,
        "Processing point request"
    );

    if let Err(error) = check_coordinates(params.lon, params.lat) {
        log_point_failure(
            &request_id,
            &state.profile,
            params.lon,
            params.lat,
            params.policy.as_deref(),
            &error,
        );
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": error.to_string(),
                "request_id": request_id
            })),
        )
            .into_response();
    }

    let unanswered = |policy: String, error: ColdpixError, request_id: String| {
        log_point_failure(
            &request_id,
            &state.profile,
            params.lon,
            params.lat,
            params.policy.as_deref(),
            &error,
        );
        Json(PointResponse {
            lon: params.lon,
            lat: params.lat,
            variable: state.profile.variable.clone(),
            policy,
            value: None,
            warning: Some(error.to_string()),
            request_id,
        })
        .into_response()
    };

    let policy = match &params.policy {
        None => state.default_policy(),
        Some(text) => match text.parse::<RadiusPolicy>() {
            Ok(policy) => policy,
            Err(error) => return unanswered(text.clone(), error, request_id),
        },
    };

    let query = ExtractionQuery::new(params.lon, params.lat, policy);
    match try_extract(&state.product, &state.profile, &query) {
        Ok(value) => {
            log_point_extracted(
                &request_id,
                &state.profile,
                &query,
                value,
                start_time.elapsed(),
            );
            Json(PointResponse {
                lon: params.lon,
                lat: params.lat,
                variable: state.profile.variable.clone(),
                policy: policy.to_string(),
                value: value.is_finite().then_some(value),
                warning: None,
                request_id,
            })
            .into_response()
        }
        Err(error) => unanswered(policy.to_string(), error, request_id),
    }
}
