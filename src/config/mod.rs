//! Configuration module for gateway_health.
//!
//! All settings come from environment variables and are loaded once at
//! startup.
//!
//! # Example
//!
//! ```rust,ignore
//! use gateway_health::config::Config;
//!
//! let config = Config::from_env()?;
//! println!("Gateway: {}", config.gateway.endpoint);
//! println!("Listen: {}", config.server.listen_addr);
//! ```

mod error;
mod gateway;
mod logging;
mod parse;
mod server;
mod simulation;

use std::collections::BTreeMap;

pub use error::ConfigError;
pub use gateway::{GatewayConfig, DEFAULT_CLIENT_ID, DEFAULT_PORT, DEFAULT_SYMBOL};
pub use logging::{LogFormat, LoggingConfig};
pub use parse::parse_duration;
pub use server::{ServerConfig, SessionBackend, DEFAULT_HEALTH_PORT};
pub use simulation::SimulationConfig;

/// Complete application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Gateway session configuration.
    pub gateway: GatewayConfig,
    /// HTTP boundary configuration.
    pub server: ServerConfig,
    /// Simulated session behaviour.
    pub simulation: SimulationConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            gateway: GatewayConfig::from_env()?,
            server: ServerConfig::from_env()?,
            simulation: SimulationConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
        })
    }

    /// Effective settings keyed by environment variable name (for /config).
    pub fn summary(&self) -> BTreeMap<&'static str, String> {
        let gw = &self.gateway;
        let mut map = BTreeMap::new();
        map.insert("IBKR_HOST", gw.endpoint.host.clone());
        map.insert("IBKR_PORT", gw.endpoint.port.to_string());
        map.insert("IBKR_CLIENT_ID", gw.endpoint.client_id.to_string());
        map.insert("IBKR_ACCOUNT", gw.account.clone().unwrap_or_default());
        map.insert("IBKR_MD_SYMBOL", gw.instrument.symbol.clone());
        map.insert(
            "IBKR_CONNECT_TIMEOUT",
            format!("{}ms", gw.connect_timeout.as_millis()),
        );
        map.insert("IBKR_RPC_TIMEOUT", format!("{}ms", gw.rpc_timeout.as_millis()));
        map.insert("IBKR_MD_SETTLE", format!("{}ms", gw.settle_delay.as_millis()));
        map.insert("HEALTH_LISTEN", self.server.listen_addr.to_string());
        map.insert("SESSION_BACKEND", self.server.backend.as_str().to_string());
        map.insert("LOG_FILTER", self.logging.filter.clone());
        map.insert("SERVICE_NAME", self.logging.service_name.clone());
        map.insert("TRADING_MODE", gw.endpoint.mode().to_string());
        map
    }

    /// Print configuration summary to log.
    pub fn log_summary(&self) {
        use tracing::info;

        let gw = &self.gateway;
        info!("Configuration loaded:");
        info!("  Gateway: {} ({} mode)", gw.endpoint, gw.endpoint.mode());
        info!("  Client id: {}", gw.endpoint.client_id);
        match gw.account {
            Some(ref account) => info!("  Account filter: {}", account),
            None => info!("  Account filter: all accounts"),
        }
        info!("  Market data instrument: {}", gw.instrument);
        info!(
            "  Timeouts: connect {}ms, rpc {}ms, settle {}ms",
            gw.connect_timeout.as_millis(),
            gw.rpc_timeout.as_millis(),
            gw.settle_delay.as_millis()
        );
        info!("  Listen: {}", self.server.listen_addr);
        info!("  Session backend: {}", self.server.backend.as_str());
    }
}
