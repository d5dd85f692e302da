//! Test helpers and utilities

use std::sync::Arc;
use std::time::Duration;

use gateway_health::health::{HealthChecker, HealthConfig};
use gateway_health::observability::Metrics;
use gateway_health::session::{Endpoint, Instrument, SimulatedController, SimulatedSession};
use gateway_health::{AppState, HealthServer};
use reqwest::{Client, Response};
use tokio::net::TcpListener;

/// In-process server with a scriptable session
pub struct TestServer {
    pub base_url: String,
    pub client: Client,
    pub session: SimulatedController,
}

#[allow(dead_code)]
impl TestServer {
    /// Server on a paper-port endpoint with a healthy session
    pub async fn start() -> Self {
        Self::start_with(SimulatedSession::healthy(), 7497).await
    }

    /// Server for `session`, reporting the endpoint at `port`
    pub async fn start_with(session: SimulatedSession, port: u16) -> Self {
        let controller = session.controller();
        let config = HealthConfig {
            connect_timeout: Duration::from_millis(500),
            rpc_timeout: Duration::from_millis(300),
            settle_delay: Duration::ZERO,
            account: None,
            instrument: Instrument::forex("EUR", "USD"),
        };
        let metrics = Arc::new(Metrics::new().expect("Failed to create metrics"));
        let checker = HealthChecker::new(session, Endpoint::new("127.0.0.1", port, 17), config)
            .with_metrics(Arc::clone(&metrics));
        let state = Arc::new(AppState::new(checker, metrics).with_service("gateway-health-test"));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let server = HealthServer::from_listener(listener, state);
        let addr = server.local_addr().expect("No local address");
        tokio::spawn(server.run());

        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: format!("http://{}", addr),
            client,
            session: controller,
        }
    }

    /// Make a GET request to the server
    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .expect("GET request failed")
    }

    /// Make a POST request without a body
    pub async fn post(&self, path: &str) -> Response {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .send()
            .await
            .expect("POST request failed")
    }

    /// Make a request with an arbitrary method
    pub async fn request(&self, method: reqwest::Method, path: &str) -> Response {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .send()
            .await
            .expect("Request failed")
    }
}

/// Parse a response body as JSON
pub async fn json(resp: Response) -> serde_json::Value {
    resp.json().await.expect("Response is not JSON")
}

/// Assert a response carries the headers every route sets
#[allow(dead_code)]
pub fn assert_common_headers(resp: &Response) {
    let headers = resp.headers();
    assert_eq!(
        headers.get("cache-control").and_then(|v| v.to_str().ok()),
        Some("no-cache, no-store, must-revalidate")
    );
    assert_eq!(
        headers
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
}
