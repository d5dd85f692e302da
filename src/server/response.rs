//! Response building.

use bytes::Bytes;
use http::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ALLOW, CACHE_CONTROL, CONTENT_TYPE,
};
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;
use tracing::error;

pub type HttpResponse = Response<Full<Bytes>>;

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
pub const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";
pub const NO_STORE: &str = "no-cache, no-store, must-revalidate";

static NOT_FOUND_BODY: Bytes = Bytes::from_static(br#"{"error":"Not Found"}"#);
static METHOD_NOT_ALLOWED_BODY: Bytes = Bytes::from_static(br#"{"error":"Method Not Allowed"}"#);
static SERIALIZE_FAILED_BODY: Bytes =
    Bytes::from_static(br#"{"ok":false,"error":"failed to serialize response"}"#);

/// Response with the headers every route carries.
fn base(status: StatusCode, content_type: &'static str, body: Bytes) -> HttpResponse {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;

    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static(NO_STORE));
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    response
}

/// JSON response. A value that fails to serialize becomes a 500.
pub fn json<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> HttpResponse {
    match serde_json::to_vec(value) {
        Ok(body) => base(status, JSON_CONTENT_TYPE, Bytes::from(body)),
        Err(e) => {
            error!(error = %e, "Failed to serialize response");
            base(
                StatusCode::INTERNAL_SERVER_ERROR,
                JSON_CONTENT_TYPE,
                SERIALIZE_FAILED_BODY.clone(),
            )
        }
    }
}

/// Prometheus text exposition.
pub fn metrics(body: String) -> HttpResponse {
    base(StatusCode::OK, METRICS_CONTENT_TYPE, Bytes::from(body))
}

pub fn not_found() -> HttpResponse {
    base(StatusCode::NOT_FOUND, JSON_CONTENT_TYPE, NOT_FOUND_BODY.clone())
}

pub fn method_not_allowed(allow: &'static str) -> HttpResponse {
    let mut response = base(
        StatusCode::METHOD_NOT_ALLOWED,
        JSON_CONTENT_TYPE,
        METHOD_NOT_ALLOWED_BODY.clone(),
    );
    response
        .headers_mut()
        .insert(ALLOW, HeaderValue::from_static(allow));
    response
}

/// CORS preflight.
pub fn preflight() -> HttpResponse {
    let mut response = base(StatusCode::NO_CONTENT, JSON_CONTENT_TYPE, Bytes::new());
    let headers = response.headers_mut();
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    response
}
