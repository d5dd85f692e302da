//! HTTP boundary.
//!
//! HTTP/1.1 server exposing the probe:
//!
//! | Route | Method | Purpose |
//! |-------|--------|---------|
//! | `/health` | GET | run one probe (200 / 207 / 503) |
//! | `/health/reconnect` | POST | drop and re-establish the session |
//! | `/health/ping` | GET | liveness, never touches the session |
//! | `/metrics` | GET | Prometheus exposition |
//! | `/config` | GET | effective configuration |

mod response;
mod routes;

use std::convert::Infallible;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use hyper::body::Incoming as IncomingBody;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::session::Session;

pub use response::{HttpResponse, JSON_CONTENT_TYPE, NO_STORE};
pub use routes::{route, AppState};

/// HTTP server bound to a listener.
pub struct HealthServer<S> {
    listener: TcpListener,
    state: Arc<AppState<S>>,
}

impl<S: Session> HealthServer<S> {
    /// Bind to `addr`.
    pub async fn bind(addr: SocketAddr, state: Arc<AppState<S>>) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self::from_listener(listener, state))
    }

    /// Serve on an already bound listener.
    pub fn from_listener(listener: TcpListener, state: Arc<AppState<S>>) -> Self {
        Self { listener, state }
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until the listener fails.
    pub async fn run(self) -> io::Result<()> {
        info!(addr = %self.listener.local_addr()?, "HTTP server listening");

        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    // Transient (EMFILE, ECONNABORTED); keep accepting
                    warn!(error = %e, "Accept failed");
                    continue;
                }
            };
            let _ = stream.set_nodelay(true);
            let state = Arc::clone(&self.state);

            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let state = Arc::clone(&state);
                    async move { handle(req, state).await }
                });

                let io = TokioIo::new(stream);
                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                    debug!(peer = %peer, error = %e, "Connection closed with error");
                }
            });
        }
    }
}

/// Route one request and emit its access line.
async fn handle<S: Session>(
    req: Request<IncomingBody>,
    state: Arc<AppState<S>>,
) -> Result<HttpResponse, Infallible> {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = route(&method, &path, &state).await;

    let status = response.status().as_u16();
    state
        .metrics
        .record_http_request(method.as_str(), &path, status);
    info!(
        target: "access",
        method = method.as_str(),
        path = path.as_str(),
        status = status as u64,
        duration_ms = start.elapsed().as_secs_f64() * 1000.0
    );

    Ok(response)
}
