//! Gateway session abstraction.
//!
//! The brokerage gateway is an external, stateful collaborator. This module
//! defines the surface the health checker consumes ([`Session`]) and the
//! handle that owns the single process-wide session ([`SessionHandle`]).
//!
//! # Available Sessions
//!
//! | Session | Description |
//! |---------|-------------|
//! | [`SimulatedSession`] | In-process gateway with scriptable replies, used by tests and the `simulated` backend |
//!
//! A real broker adapter implements [`Session`] over its own wire protocol.

mod handle;
mod simulated;

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

pub use handle::SessionHandle;
pub use simulated::{
    Reply, SessionEvent, SimulatedBehavior, SimulatedController, SimulatedSession,
};

/// Ports that identify a paper-trading gateway (TWS paper, IB Gateway paper).
pub const PAPER_PORTS: [u16; 2] = [7497, 4002];

/// Network location and identity of the gateway session.
///
/// Immutable after process start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub client_id: i32,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16, client_id: i32) -> Self {
        Self {
            host: host.into(),
            port,
            client_id,
        }
    }

    /// Trading mode implied by the configured port.
    pub fn mode(&self) -> TradingMode {
        if PAPER_PORTS.contains(&self.port) {
            TradingMode::Paper
        } else {
            TradingMode::Live
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Reporting label derived from the gateway port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TradingMode {
    Paper,
    Live,
}

impl fmt::Display for TradingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Paper => write!(f, "paper"),
            Self::Live => write!(f, "live"),
        }
    }
}

/// Connection lifecycle of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
        }
    }
}

/// Security type of an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityType {
    /// Currency pair (`CASH`).
    Forex,
    /// Common stock (`STK`).
    Stock,
}

impl SecurityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Forex => "CASH",
            Self::Stock => "STK",
        }
    }
}

/// Contract description for a quote request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instrument {
    /// Display symbol as configured (e.g. "EURUSD", "SPY").
    pub symbol: String,
    /// Underlying symbol sent to the gateway (e.g. "EUR", "SPY").
    pub local_symbol: String,
    pub sec_type: SecurityType,
    pub exchange: String,
    pub currency: String,
}

impl Instrument {
    /// Currency pair quoted on IDEALPRO.
    pub fn forex(base: &str, quote: &str) -> Self {
        let base = base.to_uppercase();
        let quote = quote.to_uppercase();
        Self {
            symbol: format!("{}{}", base, quote),
            local_symbol: base,
            sec_type: SecurityType::Forex,
            exchange: "IDEALPRO".to_string(),
            currency: quote,
        }
    }

    /// US stock routed through SMART.
    pub fn stock(symbol: &str) -> Self {
        let symbol = symbol.to_uppercase();
        Self {
            local_symbol: symbol.clone(),
            symbol,
            sec_type: SecurityType::Stock,
            exchange: "SMART".to_string(),
            currency: "USD".to_string(),
        }
    }

    /// Parse a configured symbol. Six ASCII letters are a currency pair,
    /// anything else is a stock. Returns None for an empty symbol.
    pub fn parse(symbol: &str) -> Option<Self> {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return None;
        }
        if symbol.len() == 6 && symbol.chars().all(|c| c.is_ascii_alphabetic()) {
            let (base, quote) = symbol.split_at(3);
            return Some(Self::forex(base, quote));
        }
        Some(Self::stock(symbol))
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} {} {})",
            self.symbol,
            self.sec_type.as_str(),
            self.exchange,
            self.currency
        )
    }
}

/// One account-summary row as reported by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountValue {
    pub account: String,
    pub tag: String,
    pub value: String,
    pub currency: String,
}

impl AccountValue {
    pub fn new(account: &str, tag: &str, value: &str, currency: &str) -> Self {
        Self {
            account: account.to_string(),
            tag: tag.to_string(),
            value: value.to_string(),
            currency: currency.to_string(),
        }
    }
}

/// Quote fields as currently populated by the gateway.
///
/// Brokers mark missing prices with `NaN`, `-1` or `0`; see [`QuoteSnapshot::normalized`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct QuoteSnapshot {
    pub last: Option<f64>,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
}

impl QuoteSnapshot {
    /// Drop sentinel prices (non-finite or non-positive).
    pub fn normalized(self) -> Self {
        let price = |p: Option<f64>| p.filter(|v| v.is_finite() && *v > 0.0);
        Self {
            last: price(self.last),
            bid: price(self.bid),
            ask: price(self.ask),
        }
    }

    /// True if at least one of last, bid, ask is present.
    pub fn has_any(&self) -> bool {
        self.last.is_some() || self.bid.is_some() || self.ask.is_some()
    }
}

/// Error reported by the session collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionError {
    pub message: String,
}

impl SessionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for SessionError {}

impl From<String> for SessionError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for SessionError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Remote gateway session.
///
/// Every async method is a suspension point and may be abandoned by the
/// caller at any await (see [`crate::health::guard`]). Implementations
/// should leave themselves in a state where `disconnect` still works after
/// an abandoned call.
#[async_trait]
pub trait Session: Send + 'static {
    /// Open the session. Fails if the gateway refuses or is unreachable.
    async fn connect(&mut self, endpoint: &Endpoint, readonly: bool) -> Result<(), SessionError>;

    /// Close the session.
    async fn disconnect(&mut self) -> Result<(), SessionError>;

    /// Whether the transport is currently up.
    fn is_connected(&self) -> bool;

    /// Gateway server time (Unix seconds).
    async fn current_time(&mut self) -> Result<u64, SessionError>;

    /// Accounts this login can see.
    async fn managed_accounts(&mut self) -> Result<Vec<String>, SessionError>;

    /// Account summary rows for `tags`, for one account or all (`None`).
    async fn account_summary(
        &mut self,
        account: Option<&str>,
        tags: &[&str],
    ) -> Result<Vec<AccountValue>, SessionError>;

    /// Start streaming quotes for `instrument`.
    async fn subscribe_quote(&mut self, instrument: &Instrument) -> Result<(), SessionError>;

    /// Current quote fields for a subscribed instrument.
    async fn quote_snapshot(&mut self, instrument: &Instrument)
        -> Result<QuoteSnapshot, SessionError>;

    /// Stop streaming quotes for `instrument`.
    async fn unsubscribe_quote(&mut self, instrument: &Instrument) -> Result<(), SessionError>;

    /// Backend name for logs.
    fn name(&self) -> &'static str;
}
