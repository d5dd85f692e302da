//! Health report types.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use http::StatusCode;
use serde::Serialize;

use super::HealthError;
use crate::session::TradingMode;

/// The four dependent checks of a probe, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    /// Transport reachable, gateway answers.
    Gateway,
    /// Login can see at least one account.
    Auth,
    /// Balances readable.
    Account,
    /// Live quotes flowing.
    MarketData,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Gateway, Stage::Auth, Stage::Account, Stage::MarketData];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Gateway => "gateway",
            Stage::Auth => "auth",
            Stage::Account => "account",
            Stage::MarketData => "marketData",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one stage.
///
/// `payload` is only set when `ok` is true.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageResult<P> {
    pub ok: bool,
    /// Human-readable cause of success or failure.
    pub message: String,
    /// Not attempted because an upstream stage failed.
    #[serde(skip_serializing_if = "is_false")]
    pub skipped: bool,
    pub duration_ms: u64,
    /// Error kind of a failed stage (see [`HealthError::kind`]).
    #[serde(skip)]
    pub error_kind: Option<&'static str>,
    #[serde(flatten)]
    pub payload: Option<P>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl<P> StageResult<P> {
    /// Passing stage with its payload.
    pub fn pass(message: impl Into<String>, payload: P, elapsed: Duration) -> Self {
        Self {
            ok: true,
            message: message.into(),
            skipped: false,
            duration_ms: elapsed.as_millis() as u64,
            error_kind: None,
            payload: Some(payload),
        }
    }

    /// Failed stage.
    pub fn fail(error: &HealthError, elapsed: Duration) -> Self {
        Self {
            ok: false,
            message: error.to_string(),
            skipped: false,
            duration_ms: elapsed.as_millis() as u64,
            error_kind: Some(error.kind()),
            payload: None,
        }
    }

    /// Stage not attempted because `upstream` failed.
    pub fn skipped(stage: Stage, upstream: Stage) -> Self {
        let error = HealthError::UpstreamDependency { stage, upstream };
        Self {
            skipped: true,
            ..Self::fail(&error, Duration::ZERO)
        }
    }

    /// Fold a stage outcome into a result.
    pub fn from_outcome(outcome: Result<(String, P), HealthError>, elapsed: Duration) -> Self {
        match outcome {
            Ok((message, payload)) => Self::pass(message, payload, elapsed),
            Err(e) => Self::fail(&e, elapsed),
        }
    }

    /// "pass", "fail" or "skipped".
    pub fn outcome(&self) -> &'static str {
        if self.ok {
            "pass"
        } else if self.skipped {
            "skipped"
        } else {
            "fail"
        }
    }
}

/// Gateway stage payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayInfo {
    /// Server clock, ISO-8601 UTC.
    pub server_time: String,
    /// Server clock, Unix seconds.
    pub server_epoch: u64,
}

/// Auth stage payload.
#[derive(Debug, Clone, Serialize)]
pub struct AuthInfo {
    pub accounts: Vec<String>,
}

/// One retained balance value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryValue {
    pub value: String,
    pub currency: String,
    pub account: String,
}

/// Account stage payload.
#[derive(Debug, Clone, Serialize)]
pub struct AccountInfo {
    /// Account filter in effect (None = all accounts).
    pub account: Option<String>,
    /// Allow-listed tag -> value.
    pub summary: BTreeMap<String, SummaryValue>,
}

/// Quote fields, `null` when absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteData {
    pub symbol: String,
    pub last: Option<f64>,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
}

/// Market-data stage payload.
#[derive(Debug, Clone, Serialize)]
pub struct MarketDataInfo {
    pub data: QuoteData,
}

/// Probe context.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMeta {
    pub host: String,
    pub port: u16,
    pub client_id: i32,
    pub mode: TradingMode,
    pub account: Option<String>,
    pub symbol: String,
    /// Probe completion time, Unix seconds.
    pub ts: u64,
    pub duration_ms: u64,
    pub probe_id: String,
}

/// Composite result of one probe.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub gateway: StageResult<GatewayInfo>,
    pub auth: StageResult<AuthInfo>,
    pub account: StageResult<AccountInfo>,
    pub market_data: StageResult<MarketDataInfo>,
    pub meta: ReportMeta,
}

impl HealthReport {
    /// Boundary classification of this report.
    ///
    /// Keys only on gateway and auth; account and market data never
    /// downgrade a report on their own.
    pub fn composite(&self) -> CompositeStatus {
        if self.gateway.ok && self.auth.ok {
            CompositeStatus::Healthy
        } else {
            CompositeStatus::Degraded
        }
    }

    /// (stage, outcome) pairs in evaluation order.
    pub fn outcomes(&self) -> [(Stage, &'static str); 4] {
        [
            (Stage::Gateway, self.gateway.outcome()),
            (Stage::Auth, self.auth.outcome()),
            (Stage::Account, self.account.outcome()),
            (Stage::MarketData, self.market_data.outcome()),
        ]
    }
}

/// Boundary-level classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeStatus {
    /// Gateway and auth both ok.
    Healthy,
    /// Probe ran but gateway or auth failed.
    Degraded,
    /// Probe could not run (no session).
    Unavailable,
}

impl CompositeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Unavailable => "unavailable",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Healthy => StatusCode::OK,
            Self::Degraded => StatusCode::MULTI_STATUS,
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}
