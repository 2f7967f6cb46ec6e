//! Client for a point service started by a test.

use reqwest::{Client, StatusCode, Url};
use serde_json::Value;
use std::net::SocketAddr;
use std::time::Duration;

/// Talks to one running point service
pub struct PointClient {
    base: Url,
    client: Client,
}

impl PointClient {
    pub fn new(addr: SocketAddr) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .expect("test HTTP client");
        let base = Url::parse(&format!("http://{}/", addr)).expect("service base URL");
        Self { base, client }
    }

    /// GET any path; a body that is not JSON comes back as `Value::Null`
    pub async fn get(&self, path: &str) -> (StatusCode, Value) {
        let url = self.base.join(path).expect("request URL");
        let response = self.client.get(url).send().await.expect("request sent");
        let status = response.status();
        (status, response.json().await.unwrap_or(Value::Null))
    }

    /// GET /point with the given query
    pub async fn point(&self, lon: f64, lat: f64, policy: Option<&str>) -> (StatusCode, Value) {
        let mut query = vec![("lon", lon.to_string()), ("lat", lat.to_string())];
        if let Some(policy) = policy {
            query.push(("policy", policy.to_string()));
        }
        let url = self.base.join("point").expect("point URL");
        let response = self
            .client
            .get(url)
            .query(&query)
            .send()
            .await
            .expect("point request sent");
        let status = response.status();
        (status, response.json().await.unwrap_or(Value::Null))
    }

    /// GET /metadata, which must succeed
    pub async fn metadata(&self) -> Value {
        let (status, json) = self.get("/metadata").await;
        assert_eq!(status, StatusCode::OK, "metadata: {}", json);
        json
    }

    /// GET /heartbeat, which must succeed
    pub async fn heartbeat(&self) -> Value {
        let (status, json) = self.get("/heartbeat").await;
        assert_eq!(status, StatusCode::OK, "heartbeat: {}", json);
        json
    }
}
