//! Health check error taxonomy.
//!
//! Only [`HealthError::Connection`] escapes a probe; every other variant is
//! folded into a failed [`StageResult`](super::StageResult).

use std::fmt;

use super::guard::TimeoutError;
use super::status::Stage;
use crate::session::SessionError;

/// Errors raised while probing the gateway session.
#[derive(Debug, Clone, PartialEq)]
pub enum HealthError {
    /// Session could not be established or verified.
    Connection(String),
    /// A single remote call exceeded its deadline.
    Timeout(TimeoutError),
    /// Stage not attempted because a prerequisite stage failed.
    UpstreamDependency { stage: Stage, upstream: Stage },
    /// Call succeeded but returned nothing usable.
    DataUnavailable(String),
    /// Remote call failed.
    Remote(SessionError),
}

impl HealthError {
    /// Short machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            HealthError::Connection(_) => "connection",
            HealthError::Timeout(_) => "timeout",
            HealthError::UpstreamDependency { .. } => "upstream",
            HealthError::DataUnavailable(_) => "data_unavailable",
            HealthError::Remote(_) => "remote",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, HealthError::Timeout(_))
    }
}

impl fmt::Display for HealthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthError::Connection(msg) => write!(f, "connection failed: {}", msg),
            HealthError::Timeout(e) => write!(f, "{}", e),
            HealthError::UpstreamDependency { upstream, .. } => {
                write!(f, "skipped: upstream {} failed", upstream)
            }
            HealthError::DataUnavailable(msg) => f.write_str(msg),
            HealthError::Remote(e) => write!(f, "gateway error: {}", e),
        }
    }
}

impl std::error::Error for HealthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HealthError::Timeout(e) => Some(e),
            HealthError::Remote(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TimeoutError> for HealthError {
    fn from(e: TimeoutError) -> Self {
        HealthError::Timeout(e)
    }
}

impl From<SessionError> for HealthError {
    fn from(e: SessionError) -> Self {
        HealthError::Remote(e)
    }
}
