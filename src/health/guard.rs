//! Deadline wrapper for remote calls.
//!
//! [`guard`] polls the wrapped future until it resolves or the deadline
//! passes. On expiry the future is dropped, which is the only cancellation
//! available locally: whatever the gateway already started on its side is
//! not recalled. Callers that need the remote side quiesced (the connect
//! path) follow up with a best-effort disconnect.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tracing::debug;

/// A guarded operation did not finish before its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutError {
    /// Operation name (e.g. "reqCurrentTime").
    pub name: &'static str,
    pub deadline: Duration,
}

impl TimeoutError {
    pub fn deadline_ms(&self) -> u64 {
        self.deadline.as_millis() as u64
    }
}

impl fmt::Display for TimeoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} timed out after {}ms", self.name, self.deadline_ms())
    }
}

impl std::error::Error for TimeoutError {}

/// Run `operation` with a deadline.
///
/// Returns the operation's output, or [`TimeoutError`] once `deadline` has
/// elapsed. Never waits longer than `deadline`.
pub async fn guard<F>(
    operation: F,
    name: &'static str,
    deadline: Duration,
) -> Result<F::Output, TimeoutError>
where
    F: Future,
{
    match tokio::time::timeout(deadline, operation).await {
        Ok(output) => Ok(output),
        Err(_) => {
            debug!(
                operation = name,
                deadline_ms = deadline.as_millis() as u64,
                "Deadline expired, abandoning operation"
            );
            Err(TimeoutError { name, deadline })
        }
    }
}
