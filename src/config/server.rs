//! HTTP boundary configuration.

use std::net::{IpAddr, SocketAddr};

use super::parse::{env_or, env_parse};
use super::ConfigError;

/// Default HTTP listen port.
pub const DEFAULT_HEALTH_PORT: u16 = 8081;

/// Which `Session` implementation backs the process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionBackend {
    /// In-process simulated gateway.
    Simulated,
}

impl SessionBackend {
    fn parse(s: &str) -> Result<Self, ConfigError> {
        match s.trim().to_lowercase().as_str() {
            "simulated" | "sim" | "stub" => Ok(Self::Simulated),
            other => Err(ConfigError::invalid(
                "SESSION_BACKEND",
                format!("unknown backend '{}', expected: simulated", other),
            )),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simulated => "simulated",
        }
    }
}

/// Server configuration loaded from environment.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Listen address (default: 0.0.0.0:8081).
    pub listen_addr: SocketAddr,
    /// Session backend (default: simulated).
    pub backend: SessionBackend,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host_str = env_or("HEALTH_HOST", "0.0.0.0");
        let host: IpAddr = host_str.parse().map_err(|e| ConfigError::Parse {
            key: "HEALTH_HOST".into(),
            value: host_str.clone(),
            error: format!("{}", e),
        })?;
        let port: u16 = env_parse("HEALTH_PORT", DEFAULT_HEALTH_PORT)?;

        Ok(Self {
            listen_addr: SocketAddr::new(host, port),
            backend: SessionBackend::parse(&env_or("SESSION_BACKEND", "simulated"))?,
        })
    }
}
