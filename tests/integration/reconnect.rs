//! POST /health/reconnect

use gateway_health::session::Reply;
use reqwest::StatusCode;

use crate::helpers::{json, TestServer};

#[tokio::test]
async fn test_reconnect_while_connected() {
    let server = TestServer::start().await;
    assert_eq!(server.get("/health").await.status(), StatusCode::OK);

    let resp = server.post("/health/reconnect").await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = json(resp).await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["host"], "127.0.0.1");
    assert_eq!(body["port"], 7497);
    assert!(body["message"].is_string());

    assert_eq!(server.session.disconnects(), 1);
    assert_eq!(server.session.connects(), 2);
    assert!(server.session.is_connected());
}

#[tokio::test]
async fn test_reconnect_does_not_probe() {
    let server = TestServer::start().await;

    let resp = server.post("/health/reconnect").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(server.session.calls().is_empty());
    assert_eq!(server.session.last_readonly(), Some(true));
}

#[tokio::test]
async fn test_reconnect_failure_returns_503() {
    let server = TestServer::start().await;
    server
        .session
        .update(|b| b.connect = Reply::Fail("connection refused".into()));

    let resp = server.post("/health/reconnect").await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body = json(resp).await;
    assert_eq!(body["ok"], false);
    assert!(body["error"].as_str().unwrap().contains("connection refused"));
}

#[tokio::test]
async fn test_reconnect_swallows_disconnect_error() {
    let server = TestServer::start().await;
    assert_eq!(server.get("/health").await.status(), StatusCode::OK);
    server
        .session
        .update(|b| b.disconnect_error = Some("already closed".into()));

    let resp = server.post("/health/reconnect").await;
    assert_eq!(resp.status(), StatusCode::OK);
}
