//! gateway_health - read-only health monitor for a brokerage gateway session.
//!
//! Answers "is the gateway session usable right now?" by running four
//! dependent checks against one shared session and reporting a composite
//! status over HTTP.
//!
//! # Architecture
//!
//! - [`session`]: the remote session abstraction and its connection state
//!   machine, plus an in-process simulated gateway
//! - [`health`]: timeout guard, access gate, cascading evaluator and
//!   reconnect controller
//! - [`server`]: HTTP/1.1 boundary (hyper)
//! - [`observability`]: Prometheus metrics
//!
//! # Example
//!
//! ```rust,ignore
//! use gateway_health::config::Config;
//! use gateway_health::health::HealthChecker;
//! use gateway_health::session::SimulatedSession;
//!
//! let config = Config::from_env()?;
//! let checker = HealthChecker::from_config(SimulatedSession::healthy(), &config.gateway);
//! let report = checker.check().await?;
//! println!("{}", report.composite().as_str());
//! ```

/// Package version from Cargo.toml
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Git commit hash (8 chars), empty outside a git checkout
pub const BUILD_VERSION: &str = env!("BUILD_VERSION");

/// Full version string: "0.1.0 (abc12345)"
pub const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUILD_VERSION"), ")");

pub mod config;
pub mod health;
pub mod logging;
pub mod observability;
pub mod server;
pub mod session;
pub mod timestamp;

// Re-exports for convenience
pub use config::Config;
pub use health::{HealthChecker, HealthReport};
pub use server::{AppState, HealthServer};
