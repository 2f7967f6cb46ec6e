//! HTTP point service tests against a server on an ephemeral port.

mod common;

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use reqwest::StatusCode;

use coldpix::data_loader::load_product;
use coldpix::handlers::router;
use coldpix::{AppState, Config, ProductProfile};

use common::http_client::PointClient;
use common::test_data::create_template_nc;

/// Serve a template whose `sst` is filled in with known values
async fn start_test_server(dir: &Path) -> SocketAddr {
    let path = dir.join("template.nc");
    create_template_nc(&path, Some(&[0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1])).unwrap();

    let mut product = load_product(&path).unwrap();
    let sst = product.data.get_mut("sst").unwrap();
    for (k, v) in sst.iter_mut().enumerate() {
        *v = 10.0 + k as f32;
    }

    let state = AppState::new(Config::default(), path, product, ProductProfile::daily_avhrr());
    state.validate().unwrap();
    let app = router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn test_point_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let client = PointClient::new(start_test_server(dir.path()).await);

    let (status, json) = client.point(-74.02, 38.52, Some("closest")).await;
    assert_eq!(status, StatusCode::OK);
    // Row 1, column 2
    assert_eq!(json["value"], serde_json::json!(16.0));
    assert_eq!(json["variable"], "sst");
    assert_eq!(json["policy"], "closest");
    assert!(json["request_id"].is_string());

    // Default policy closestwithin5
    let (_, json) = client.point(-75.0, 38.0, None).await;
    assert_eq!(json["value"], serde_json::json!(10.0));
    assert_eq!(json["policy"], "closestwithin5");

    // Land cell
    let (status, json) = client.point(-73.5, 39.0, Some("closest")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["value"].is_null());
}

#[tokio::test]
async fn test_point_bad_requests() {
    let dir = tempfile::tempdir().unwrap();
    let client = PointClient::new(start_test_server(dir.path()).await);

    let (status, json) = client.point(-74.5, 38.5, Some("somewhere")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["value"].is_null());
    assert!(json["warning"].is_string());

    let (status, json) = client.point(-74.5, -91.0, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());

    let (status, _) = client.get("/point?lat=38.5").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_metadata_and_heartbeat() {
    let dir = tempfile::tempdir().unwrap();
    let client = PointClient::new(start_test_server(dir.path()).await);

    let metadata = client.metadata().await;
    assert_eq!(metadata["profile"], "daily_avhrr");
    assert_eq!(
        metadata["global_attributes"]["title"],
        "AVHRR coldest pixel composite"
    );
    assert_eq!(metadata["dimensions"]["lon"]["size"], 4);

    let heartbeat = client.heartbeat().await;
    assert_eq!(heartbeat["status"], "healthy");
    assert_eq!(heartbeat["product"]["grid"], serde_json::json!([3, 4]));
}
