//! Owner of the process-wide gateway session.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::{ConnectionState, Endpoint, Session};
use crate::health::guard::guard;
use crate::health::HealthError;

/// Single owned gateway session plus its lifecycle state.
///
/// The handle is not synchronized itself; the health checker keeps it behind
/// its [`AccessGate`](crate::health::AccessGate), so exactly one task drives a
/// transition at a time.
pub struct SessionHandle<S> {
    session: S,
    endpoint: Endpoint,
    state: ConnectionState,
}

impl<S: Session> SessionHandle<S> {
    /// Create a handle for a not-yet-connected session.
    pub fn new(session: S, endpoint: Endpoint) -> Self {
        Self {
            session,
            endpoint,
            state: ConnectionState::Disconnected,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Lifecycle state, reconciled with the transport.
    ///
    /// A session that dropped on its own reports `Disconnected` even if the
    /// last transition this handle drove was to `Connected`.
    pub fn state(&self) -> ConnectionState {
        match self.state {
            ConnectionState::Connected if !self.session.is_connected() => {
                ConnectionState::Disconnected
            }
            state => state,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Mutable access to the session for remote calls.
    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    /// Make sure the session is connected, connecting if needed.
    ///
    /// Connects read-only to the configured endpoint, bounded by
    /// `deadline`. On timeout a best-effort disconnect is issued before
    /// returning [`HealthError::Connection`].
    pub async fn ensure_connected(&mut self, deadline: Duration) -> Result<(), HealthError> {
        match self.state {
            ConnectionState::Connected if self.session.is_connected() => return Ok(()),
            ConnectionState::Connected => {
                warn!(endpoint = %self.endpoint, "Session dropped by gateway, reconnecting");
            }
            ConnectionState::Connecting => {
                // A previous caller was cancelled mid-connect.
                debug!(endpoint = %self.endpoint, "Discarding stale connect attempt");
                self.force_disconnect().await;
            }
            ConnectionState::Disconnected => {}
        }

        self.state = ConnectionState::Connecting;
        info!(
            endpoint = %self.endpoint,
            client_id = self.endpoint.client_id,
            backend = self.session.name(),
            "Connecting to gateway"
        );

        let endpoint = self.endpoint.clone();
        let result = guard(
            self.session.connect(&endpoint, true),
            "connect",
            deadline,
        )
        .await;

        match result {
            Ok(Ok(())) if self.session.is_connected() => {
                self.state = ConnectionState::Connected;
                info!(endpoint = %self.endpoint, "Gateway session established");
                Ok(())
            }
            Ok(Ok(())) => {
                self.state = ConnectionState::Disconnected;
                Err(HealthError::Connection(format!(
                    "connect to {} returned but session is not connected",
                    self.endpoint
                )))
            }
            Ok(Err(e)) => {
                self.state = ConnectionState::Disconnected;
                warn!(endpoint = %self.endpoint, error = %e, "Gateway connect failed");
                Err(HealthError::Connection(format!(
                    "cannot connect to {}: {}",
                    self.endpoint, e
                )))
            }
            Err(timeout) => {
                warn!(
                    endpoint = %self.endpoint,
                    deadline_ms = timeout.deadline_ms(),
                    "Gateway connect timed out"
                );
                // The abandoned attempt may still complete on the gateway side.
                self.force_disconnect().await;
                Err(HealthError::Connection(format!(
                    "connect to {} timed out after {}ms",
                    self.endpoint,
                    timeout.deadline_ms()
                )))
            }
        }
    }

    /// Disconnect the session. Safe to call when already disconnected.
    pub async fn disconnect(&mut self) {
        if self.state == ConnectionState::Disconnected && !self.session.is_connected() {
            return;
        }
        info!(endpoint = %self.endpoint, "Disconnecting from gateway");
        self.force_disconnect().await;
    }

    /// Disconnect, swallowing errors, and mark the handle disconnected.
    async fn force_disconnect(&mut self) {
        if let Err(e) = self.session.disconnect().await {
            debug!(error = %e, "Ignoring disconnect error");
        }
        self.state = ConnectionState::Disconnected;
    }
}
