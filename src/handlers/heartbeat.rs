//! Heartbeat endpoint handler.
//!
//! Reports liveness, uptime, process memory and what the service is serving.

use axum::{extract::State, Json};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use uuid::Uuid;

use crate::state::AppState;

/// Unique per process
static SERVER_ID: Lazy<String> = Lazy::new(|| Uuid::new_v4().to_string());

static START_TIME: Lazy<SystemTime> = Lazy::new(SystemTime::now);

/// Heartbeat response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct HeartbeatResponse {
    pub server_id: String,
    /// RFC 3339 timestamp
    pub timestamp: String,
    pub uptime_seconds: u64,
    /// Resident set size, where the platform reports it
    pub memory_usage_bytes: Option<u64>,
    pub product: ProductInfo,
    pub status: String,
}

/// What the service extracts from
#[derive(Debug, Serialize, Deserialize)]
pub struct ProductInfo {
    pub file_path: String,
    pub profile: String,
    pub variable: String,
    pub default_policy: String,
    /// Grid shape as `(lat, lon)` sizes
    pub grid: (usize, usize),
    pub data_memory_bytes: usize,
}

/// Mark the process start; called once when the server comes up
pub fn mark_start() {
    Lazy::force(&START_TIME);
}

/// Handle GET /heartbeat requests
pub async fn heartbeat_handler(State(state): State<Arc<AppState>>) -> Json<HeartbeatResponse> {
    let now = SystemTime::now();
    let timestamp = chrono::DateTime::<chrono::Utc>::from(now)
        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
    let uptime = now
        .duration_since(*START_TIME)
        .unwrap_or(Duration::from_secs(0));

    let coordinate_len = |name: &str| {
        state
            .product
            .metadata
            .coordinates
            .get(name)
            .map_or(0, Vec::len)
    };

    let product = ProductInfo {
        file_path: state.file_path.display().to_string(),
        profile: state.profile.name.clone(),
        variable: state.profile.variable.clone(),
        default_policy: state.default_policy().to_string(),
        grid: (
            coordinate_len(&state.profile.lat_var),
            coordinate_len(&state.profile.lon_var),
        ),
        data_memory_bytes: state.product.data_memory_bytes(),
    };

    Json(HeartbeatResponse {
        server_id: SERVER_ID.clone(),
        timestamp,
        uptime_seconds: uptime.as_secs(),
        memory_usage_bytes: memory_usage(),
        product,
        status: "healthy".to_string(),
    })
}

/// Resident set size of this process
fn memory_usage() -> Option<u64> {
    #[cfg(target_os = "linux")]
    {
        // Second field of statm is RSS in pages
        let statm = std::fs::read_to_string("/proc/self/statm").ok()?;
        let pages: u64 = statm.split_whitespace().nth(1)?.parse().ok()?;
        Some(pages * 4096)
    }

    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::composite_state;

    #[tokio::test]
    async fn test_heartbeat_response() {
        mark_start();
        let state = Arc::new(composite_state());
        let Json(response) = heartbeat_handler(State(state.clone())).await;

        assert_eq!(response.status, "healthy");
        assert_eq!(response.server_id, *SERVER_ID);
        assert_eq!(response.product.profile, "daily_avhrr");
        assert_eq!(response.product.grid, (3, 3));
        assert_eq!(
            response.product.data_memory_bytes,
            state.product.data_memory_bytes()
        );
        assert!(chrono::DateTime::parse_from_rfc3339(&response.timestamp).is_ok());

        #[cfg(target_os = "linux")]
        assert!(response.memory_usage_bytes.is_some());
    }
}
