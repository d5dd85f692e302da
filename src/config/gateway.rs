//! Gateway session configuration.

use std::time::Duration;

use super::parse::{env_duration, env_opt, env_or, env_parse, env_required_duration};
use super::ConfigError;
use crate::session::{Endpoint, Instrument};

/// Default TWS paper-trading port.
pub const DEFAULT_PORT: u16 = 7497;

/// Default API client id.
pub const DEFAULT_CLIENT_ID: i32 = 17;

/// Default market-data reference instrument (no subscription required).
pub const DEFAULT_SYMBOL: &str = "EURUSD";

/// Gateway session configuration loaded from environment.
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    /// Host, port and client id of the gateway.
    pub endpoint: Endpoint,
    /// Account filter for the account stage (default: all accounts).
    pub account: Option<String>,
    /// Reference instrument for the market-data stage.
    pub instrument: Instrument,
    /// Deadline for establishing the session.
    pub connect_timeout: Duration,
    /// Deadline for each remote call.
    pub rpc_timeout: Duration,
    /// Wait between requesting a quote and reading it.
    pub settle_delay: Duration,
}

impl GatewayConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port: u16 = env_parse("IBKR_PORT", DEFAULT_PORT)?;
        if port == 0 {
            return Err(ConfigError::invalid("IBKR_PORT", "port must be non-zero"));
        }

        let symbol = env_or("IBKR_MD_SYMBOL", DEFAULT_SYMBOL);
        let instrument = Instrument::parse(&symbol)
            .ok_or_else(|| ConfigError::invalid("IBKR_MD_SYMBOL", "symbol must not be empty"))?;

        Ok(Self {
            endpoint: Endpoint::new(
                env_or("IBKR_HOST", "127.0.0.1"),
                port,
                env_parse("IBKR_CLIENT_ID", DEFAULT_CLIENT_ID)?,
            ),
            account: env_opt("IBKR_ACCOUNT"),
            instrument,
            connect_timeout: env_required_duration("IBKR_CONNECT_TIMEOUT", "8")?,
            rpc_timeout: env_required_duration("IBKR_RPC_TIMEOUT", "5")?,
            settle_delay: env_duration("IBKR_MD_SETTLE", "2s")?.unwrap_or(Duration::ZERO),
        })
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::new("127.0.0.1", DEFAULT_PORT, DEFAULT_CLIENT_ID),
            account: None,
            instrument: Instrument::forex("EUR", "USD"),
            connect_timeout: Duration::from_secs(8),
            rpc_timeout: Duration::from_secs(5),
            settle_delay: Duration::from_secs(2),
        }
    }
}
