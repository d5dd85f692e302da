//! Gateway health probing.
//!
//! A probe runs four dependent stages against one shared gateway session:
//!
//! ```text
//! gateway ──> auth ──> account
//!    └──────> marketData
//! ```
//!
//! A stage whose prerequisite failed is reported as skipped instead of
//! attempted. Every remote call runs under a deadline ([`guard`]) and every
//! session operation runs under the [`AccessGate`], so a probe never
//! interleaves with another probe or a reconnect.
//!
//! The composite status keys only on gateway and auth:
//!
//! | Outcome                         | Status | HTTP |
//! |---------------------------------|--------|------|
//! | gateway and auth ok             | healthy | 200 |
//! | gateway or auth failed          | degraded | 207 |
//! | session could not be established | unavailable | 503 |

mod checker;
mod error;
mod gate;
pub mod guard;
mod status;

pub use checker::{HealthChecker, HealthConfig, BALANCE_TAGS};
pub use error::HealthError;
pub use gate::{AccessGate, GateGuard};
pub use guard::{guard, TimeoutError};
pub use status::{
    AccountInfo, AuthInfo, CompositeStatus, GatewayInfo, HealthReport, MarketDataInfo, QuoteData,
    ReportMeta, Stage, StageResult, SummaryValue,
};
