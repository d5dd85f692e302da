//! Ping, metrics, config and routing edge cases

use reqwest::{Method, StatusCode};

use crate::helpers::{assert_common_headers, json, TestServer};

#[tokio::test]
async fn test_ping() {
    let server = TestServer::start().await;

    let resp = server.get("/health/ping").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_common_headers(&resp);

    let body = json(resp).await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["pong"], true);
    assert_eq!(body["service"], "gateway-health-test");
    assert!(body["version"].as_str().unwrap().starts_with(env!("CARGO_PKG_VERSION")));
    assert_eq!(server.session.connects(), 0);
}

#[tokio::test]
async fn test_metrics_after_probe() {
    let server = TestServer::start().await;
    server.get("/health").await;

    let resp = server.get("/metrics").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let text = resp.text().await.unwrap();

    assert!(text.contains("gateway_health_probes_total{status=\"healthy\"} 1"));
    assert!(text.contains("gateway_health_stage_results_total"));
    assert!(text.contains("gateway_health_http_requests_total"));
}

#[tokio::test]
async fn test_config_is_json() {
    let server = TestServer::start().await;

    let resp = server.get("/config").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(json(resp).await.is_object());
}

#[tokio::test]
async fn test_unknown_path_404() {
    let server = TestServer::start().await;

    let resp = server.get("/nonexistent").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_common_headers(&resp);
    assert_eq!(json(resp).await["error"], "Not Found");
}

#[tokio::test]
async fn test_wrong_method_405() {
    let server = TestServer::start().await;

    assert_eq!(
        server.post("/health").await.status(),
        StatusCode::METHOD_NOT_ALLOWED
    );
    assert_eq!(
        server.get("/health/reconnect").await.status(),
        StatusCode::METHOD_NOT_ALLOWED
    );
    assert_eq!(server.session.connects(), 0);
}

#[tokio::test]
async fn test_options_preflight() {
    let server = TestServer::start().await;

    let resp = server.request(Method::OPTIONS, "/health").await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_common_headers(&resp);
    assert!(resp
        .headers()
        .get("access-control-allow-methods")
        .is_some());
}

#[tokio::test]
async fn test_extension_method_counted_as_other() {
    let server = TestServer::start().await;

    let method = Method::from_bytes(b"PROPFIND").unwrap();
    let resp = server.request(method, "/health").await;
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);

    let text = server.get("/metrics").await.text().await.unwrap();
    assert!(text.contains("method=\"OTHER\""));
    assert!(!text.contains("PROPFIND"));
}
