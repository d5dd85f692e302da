//! Simulated session configuration.

use super::parse::{env_bool, env_or};
use super::ConfigError;

/// Behaviour of the built-in simulated gateway.
#[derive(Clone, Debug)]
pub struct SimulationConfig {
    /// Managed accounts reported by the session.
    pub accounts: Vec<String>,
    /// Whether the reference quote carries prices.
    pub market_data: bool,
    /// Refuse every connection attempt.
    pub unreachable: bool,
}

impl SimulationConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let accounts = env_or("SIM_ACCOUNTS", "DU0000001")
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();

        Ok(Self {
            accounts,
            market_data: env_bool("SIM_MARKET_DATA", true),
            unreachable: env_bool("SIM_UNREACHABLE", false),
        })
    }
}
