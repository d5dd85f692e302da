//! Request routing.

use std::collections::BTreeMap;
use std::sync::Arc;

use hyper::{Method, StatusCode};
use serde::Serialize;
use serde_json::json;

use super::response::{self, HttpResponse};
use crate::health::{HealthChecker, HealthError};
use crate::observability::Metrics;
use crate::session::{Endpoint, Session};
use crate::timestamp;

/// Shared state of the HTTP boundary.
pub struct AppState<S> {
    pub checker: HealthChecker<S>,
    pub metrics: Arc<Metrics>,
    /// Effective configuration served on `/config`.
    pub config: BTreeMap<&'static str, String>,
    /// Service name reported by `/health/ping`.
    pub service: String,
}

impl<S: Session> AppState<S> {
    pub fn new(checker: HealthChecker<S>, metrics: Arc<Metrics>) -> Self {
        Self {
            checker,
            metrics,
            config: BTreeMap::new(),
            service: "gateway-health".to_string(),
        }
    }

    pub fn with_config(mut self, config: BTreeMap<&'static str, String>) -> Self {
        self.config = config;
        self
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }
}

/// Route a request to its handler.
pub async fn route<S: Session>(method: &Method, path: &str, state: &AppState<S>) -> HttpResponse {
    if *method == Method::OPTIONS {
        return match path {
            "/health" | "/health/reconnect" | "/health/ping" | "/metrics" | "/config" => {
                response::preflight()
            }
            _ => response::not_found(),
        };
    }

    match (path, method) {
        ("/health", &Method::GET) => health(state).await,
        ("/health/reconnect", &Method::POST) => reconnect(state).await,
        ("/health/ping", &Method::GET) => ping(state),
        ("/metrics", &Method::GET) => response::metrics(state.metrics.export()),
        ("/config", &Method::GET) => response::json(StatusCode::OK, &state.config),
        ("/health" | "/health/ping" | "/metrics" | "/config", _) => {
            response::method_not_allowed("GET, OPTIONS")
        }
        ("/health/reconnect", _) => response::method_not_allowed("POST, OPTIONS"),
        _ => response::not_found(),
    }
}

/// Body of a 503 from `/health`.
#[derive(Serialize)]
struct Unavailable<'a> {
    ok: bool,
    error: String,
    hint: String,
    meta: UnavailableMeta<'a>,
}

#[derive(Serialize)]
struct UnavailableMeta<'a> {
    host: &'a str,
    port: u16,
    mode: crate::session::TradingMode,
    ts: u64,
}

async fn health<S: Session>(state: &AppState<S>) -> HttpResponse {
    match state.checker.check().await {
        Ok(report) => response::json(report.composite().status_code(), &report),
        Err(e) => {
            let endpoint = state.checker.endpoint();
            let body = Unavailable {
                ok: false,
                error: e.to_string(),
                hint: hint(endpoint),
                meta: UnavailableMeta {
                    host: &endpoint.host,
                    port: endpoint.port,
                    mode: endpoint.mode(),
                    ts: timestamp::unix_now(),
                },
            };
            response::json(StatusCode::SERVICE_UNAVAILABLE, &body)
        }
    }
}

fn hint(endpoint: &Endpoint) -> String {
    format!(
        "Is TWS/IB Gateway running and listening on {}? Enable API access \
         (Configure > API > Settings) and allow connections from this host.",
        endpoint
    )
}

async fn reconnect<S: Session>(state: &AppState<S>) -> HttpResponse {
    let endpoint = state.checker.endpoint();
    match state.checker.reconnect().await {
        Ok(()) => response::json(
            StatusCode::OK,
            &json!({
                "ok": true,
                "message": "reconnected",
                "host": endpoint.host,
                "port": endpoint.port,
            }),
        ),
        Err(e) => response::json(
            StatusCode::SERVICE_UNAVAILABLE,
            &json!({
                "ok": false,
                "error": reconnect_error(&e),
            }),
        ),
    }
}

fn reconnect_error(e: &HealthError) -> String {
    match e {
        HealthError::Connection(message) => message.clone(),
        other => other.to_string(),
    }
}

fn ping<S>(state: &AppState<S>) -> HttpResponse {
    response::json(
        StatusCode::OK,
        &json!({
            "ok": true,
            "pong": true,
            "service": state.service,
            "version": crate::VERSION,
            "timestamp": timestamp::iso8601_now(),
        }),
    )
}
