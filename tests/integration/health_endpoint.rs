//! GET /health

use gateway_health::session::{QuoteSnapshot, Reply, SimulatedSession};
use reqwest::StatusCode;

use crate::helpers::{assert_common_headers, json, TestServer};

#[tokio::test]
async fn test_healthy_returns_200_with_all_stages() {
    let server = TestServer::start().await;

    let resp = server.get("/health").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_common_headers(&resp);
    assert_eq!(
        resp.headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok()),
        Some("application/json; charset=utf-8")
    );

    let body = json(resp).await;
    for stage in ["gateway", "auth", "account", "marketData"] {
        assert_eq!(body[stage]["ok"], true, "{} should pass", stage);
    }
    assert_eq!(body["auth"]["accounts"][0], "DU0000001");
    assert_eq!(body["account"]["summary"]["NetLiquidation"]["value"], "100000.00");
    assert!(body["account"]["summary"].get("Cushion").is_none());
    assert_eq!(body["marketData"]["data"]["symbol"], "EURUSD");
    assert_eq!(body["marketData"]["data"]["bid"], 1.0841);
    assert_eq!(body["meta"]["mode"], "paper");
    assert_eq!(body["meta"]["port"], 7497);
    assert!(body["meta"]["probeId"].is_string());
}

#[tokio::test]
async fn test_unreachable_returns_503_with_hint() {
    let session = SimulatedSession::healthy();
    session
        .controller()
        .update(|b| b.connect = Reply::Fail("connection refused".into()));
    let server = TestServer::start_with(session, 4001).await;

    let resp = server.get("/health").await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_common_headers(&resp);

    let body = json(resp).await;
    assert_eq!(body["ok"], false);
    assert!(body["error"].as_str().unwrap().contains("connection refused"));
    assert!(body["hint"].as_str().unwrap().contains("127.0.0.1:4001"));
    assert_eq!(body["meta"]["mode"], "live");
    for stage in ["gateway", "auth", "account", "marketData"] {
        assert!(body.get(stage).is_none(), "{} must not be reported", stage);
    }
}

#[tokio::test]
async fn test_connect_timeout_returns_503() {
    let session = SimulatedSession::healthy();
    session.controller().update(|b| b.connect = Reply::Hang);
    let server = TestServer::start_with(session, 7497).await;

    let resp = server.get("/health").await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json(resp).await;
    assert!(body["error"].as_str().unwrap().contains("timed out after 500ms"));
}

#[tokio::test]
async fn test_zero_accounts_returns_207() {
    let server = TestServer::start().await;
    server.session.update(|b| b.accounts = Reply::Ok(Vec::new()));

    let resp = server.get("/health").await;
    assert_eq!(resp.status(), StatusCode::MULTI_STATUS);

    let body = json(resp).await;
    assert_eq!(body["gateway"]["ok"], true);
    assert_eq!(body["auth"]["ok"], false);
    assert_eq!(body["auth"]["message"], "no managed accounts");
    assert_eq!(body["account"]["ok"], false);
    assert_eq!(body["account"]["skipped"], true);
}

#[tokio::test]
async fn test_gateway_rpc_timeout_returns_207() {
    let server = TestServer::start().await;
    server.session.update(|b| b.server_time = Reply::Hang);

    let resp = server.get("/health").await;
    assert_eq!(resp.status(), StatusCode::MULTI_STATUS);

    let body = json(resp).await;
    assert_eq!(body["gateway"]["message"], "reqCurrentTime timed out after 300ms");
    assert_eq!(body["marketData"]["message"], "skipped: upstream gateway failed");
}

#[tokio::test]
async fn test_no_market_data_still_200() {
    let server = TestServer::start().await;
    server
        .session
        .update(|b| b.quote = Reply::Ok(QuoteSnapshot::default()));

    let resp = server.get("/health").await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = json(resp).await;
    assert_eq!(body["account"]["ok"], true);
    assert_eq!(body["marketData"]["ok"], false);
    assert!(body["marketData"]["message"]
        .as_str()
        .unwrap()
        .contains("no market data"));
    assert!(body["marketData"].get("data").is_none());
}

#[tokio::test]
async fn test_session_reused_across_probes() {
    let server = TestServer::start().await;

    for _ in 0..3 {
        assert_eq!(server.get("/health").await.status(), StatusCode::OK);
    }
    assert_eq!(server.session.connects(), 1);
    assert_eq!(server.session.active_subscriptions(), 0);
}

#[tokio::test]
async fn test_dropped_session_reconnects_on_next_probe() {
    let server = TestServer::start().await;
    assert_eq!(server.get("/health").await.status(), StatusCode::OK);

    server.session.drop_connection();
    assert_eq!(server.get("/health").await.status(), StatusCode::OK);
    assert_eq!(server.session.connects(), 2);
}

#[tokio::test]
async fn test_concurrent_probes_never_overlap() {
    let server = TestServer::start().await;
    server
        .session
        .update(|b| b.latency = std::time::Duration::from_millis(5));

    let probes = (0..5).map(|_| server.get("/health"));
    let responses = futures_util::future::join_all(probes).await;

    assert!(responses.iter().all(|r| r.status() == StatusCode::OK));
    assert_eq!(server.session.max_in_flight(), 1);
    assert_eq!(server.session.connects(), 1);
}
