//! Cascading health evaluator and reconnect controller.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument as _};
use uuid::Uuid;

use super::gate::{AccessGate, GateGuard};
use super::guard::guard;
use super::{
    AccountInfo, AuthInfo, GatewayInfo, HealthError, HealthReport, MarketDataInfo, QuoteData,
    ReportMeta, Stage, StageResult, SummaryValue,
};
use crate::config::GatewayConfig;
use crate::observability::Metrics;
use crate::session::{ConnectionState, Endpoint, Instrument, Session, SessionHandle};
use crate::timestamp;

/// Balance tags requested by the account stage. Anything else the gateway
/// returns is dropped.
pub const BALANCE_TAGS: [&str; 3] = ["NetLiquidation", "TotalCashValue", "ExcessLiquidity"];

/// Upper bound for cancelling the quote subscription after the stage.
pub const CANCEL_DEADLINE: Duration = Duration::from_millis(250);

/// Health checker configuration.
#[derive(Debug, Clone)]
pub struct HealthConfig {
    /// Deadline for establishing the session.
    pub connect_timeout: Duration,
    /// Deadline for each remote call.
    pub rpc_timeout: Duration,
    /// Wait between requesting a quote and reading it. Heuristic: fields
    /// that populate later than this are reported as missing.
    pub settle_delay: Duration,
    /// Account filter (None = all accounts).
    pub account: Option<String>,
    /// Market-data reference instrument.
    pub instrument: Instrument,
}

impl HealthConfig {
    pub fn from_gateway(config: &GatewayConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout,
            rpc_timeout: config.rpc_timeout,
            settle_delay: config.settle_delay,
            account: config.account.clone(),
            instrument: config.instrument.clone(),
        }
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self::from_gateway(&GatewayConfig::default())
    }
}

/// Probes the gateway session and reconnects it on demand.
///
/// Every operation that touches the session holds the access gate for its
/// whole duration, so probes and reconnects never interleave.
pub struct HealthChecker<S> {
    gate: AccessGate<SessionHandle<S>>,
    endpoint: Endpoint,
    config: HealthConfig,
    metrics: Option<Arc<Metrics>>,
}

impl<S: Session> HealthChecker<S> {
    /// Create a checker owning `session`.
    pub fn new(session: S, endpoint: Endpoint, config: HealthConfig) -> Self {
        Self {
            gate: AccessGate::new(SessionHandle::new(session, endpoint.clone())),
            endpoint,
            config,
            metrics: None,
        }
    }

    /// Create a checker from the gateway configuration.
    pub fn from_config(session: S, config: &GatewayConfig) -> Self {
        Self::new(
            session,
            config.endpoint.clone(),
            HealthConfig::from_gateway(config),
        )
    }

    /// Attach a metrics registry.
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn config(&self) -> &HealthConfig {
        &self.config
    }

    /// Current session state. Waits for the gate.
    pub async fn connection_state(&self) -> ConnectionState {
        self.gate.acquire("state").await.state()
    }

    /// Run one probe.
    ///
    /// Returns `Err` only when the session cannot be established; every
    /// other failure is reported inside the [`HealthReport`].
    pub async fn check(&self) -> Result<HealthReport, HealthError> {
        let probe_id = Uuid::new_v4().to_string();
        let span = info_span!("probe", probe_id = %probe_id);

        async {
            let start = Instant::now();
            let result = {
                let mut handle = self.acquire("probe").await;
                let result = self.evaluate(&mut handle, &probe_id, start).await;
                self.publish_session(handle.is_connected());
                result
            };
            let elapsed = start.elapsed();

            match result {
                Ok(ref report) => {
                    info!(
                        status = report.composite().as_str(),
                        gateway = report.gateway.ok,
                        auth = report.auth.ok,
                        account = report.account.ok,
                        market_data = report.market_data.ok,
                        duration_ms = elapsed.as_millis() as u64,
                        "Probe completed"
                    );
                    if let Some(ref m) = self.metrics {
                        m.record_probe(report, elapsed.as_secs_f64());
                    }
                }
                Err(ref e) => {
                    warn!(error = %e, duration_ms = elapsed.as_millis() as u64, "Probe aborted");
                    if let Some(ref m) = self.metrics {
                        m.record_probe_unavailable(elapsed.as_secs_f64());
                    }
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Drop the session (if connected) and establish it again.
    ///
    /// Does not probe; callers check afterwards if they want a report.
    pub async fn reconnect(&self) -> Result<(), HealthError> {
        let probe_id = Uuid::new_v4().to_string();
        let span = info_span!("reconnect", probe_id = %probe_id);

        async {
            let mut handle = self.acquire("reconnect").await;

            info!(endpoint = %self.endpoint, "Reconnect requested");
            handle.disconnect().await;
            let result = handle.ensure_connected(self.config.connect_timeout).await;
            self.publish_session(handle.is_connected());

            match result {
                Ok(()) => info!(endpoint = %self.endpoint, "Reconnect succeeded"),
                Err(ref e) => warn!(endpoint = %self.endpoint, error = %e, "Reconnect failed"),
            }
            if let Some(ref m) = self.metrics {
                m.record_reconnect(result.is_ok());
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Disconnect for process shutdown.
    pub async fn shutdown(&self) {
        let mut handle = self.acquire("shutdown").await;
        handle.disconnect().await;
        self.publish_session(false);
    }

    async fn acquire(&self, operation: &'static str) -> GateGuard<'_, SessionHandle<S>> {
        if let Some(ref m) = self.metrics {
            m.set_gate_waiting(self.gate.waiting() + 1);
        }
        let handle = self.gate.acquire(operation).await;
        if let Some(ref m) = self.metrics {
            m.set_gate_waiting(self.gate.waiting());
        }
        handle
    }

    fn publish_session(&self, connected: bool) {
        if let Some(ref m) = self.metrics {
            m.set_session_connected(connected);
        }
    }

    /// Stages in order; the caller holds the gate.
    async fn evaluate(
        &self,
        handle: &mut SessionHandle<S>,
        probe_id: &str,
        start: Instant,
    ) -> Result<HealthReport, HealthError> {
        handle.ensure_connected(self.config.connect_timeout).await?;
        let session = handle.session_mut();

        let gateway = timed(Stage::Gateway, self.check_gateway(session)).await;

        let (auth, account, market_data) = if gateway.ok {
            let auth = timed(Stage::Auth, self.check_auth(session)).await;
            let account = match auth.payload {
                Some(ref info) => timed(Stage::Account, self.check_account(session, &info.accounts)).await,
                None => StageResult::skipped(Stage::Account, Stage::Auth),
            };
            let market_data = timed(Stage::MarketData, self.check_market_data(session)).await;
            (auth, account, market_data)
        } else {
            (
                StageResult::skipped(Stage::Auth, Stage::Gateway),
                StageResult::skipped(Stage::Account, Stage::Gateway),
                StageResult::skipped(Stage::MarketData, Stage::Gateway),
            )
        };

        Ok(HealthReport {
            gateway,
            auth,
            account,
            market_data,
            meta: ReportMeta {
                host: self.endpoint.host.clone(),
                port: self.endpoint.port,
                client_id: self.endpoint.client_id,
                mode: self.endpoint.mode(),
                account: self.config.account.clone(),
                symbol: self.config.instrument.symbol.clone(),
                ts: timestamp::unix_now(),
                duration_ms: start.elapsed().as_millis() as u64,
                probe_id: probe_id.to_string(),
            },
        })
    }

    async fn check_gateway(&self, session: &mut S) -> Result<(String, GatewayInfo), HealthError> {
        let epoch = guard(session.current_time(), "reqCurrentTime", self.config.rpc_timeout).await??;
        let server_time = timestamp::iso8601(epoch, 0);

        Ok((
            format!("gateway reachable, server time {}", server_time),
            GatewayInfo {
                server_time,
                server_epoch: epoch,
            },
        ))
    }

    async fn check_auth(&self, session: &mut S) -> Result<(String, AuthInfo), HealthError> {
        let accounts: Vec<String> =
            guard(session.managed_accounts(), "reqManagedAccts", self.config.rpc_timeout)
                .await??
                .into_iter()
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty())
                .collect();

        if accounts.is_empty() {
            return Err(HealthError::DataUnavailable("no managed accounts".to_string()));
        }

        Ok((
            format!("{} managed account(s)", accounts.len()),
            AuthInfo { accounts },
        ))
    }

    async fn check_account(
        &self,
        session: &mut S,
        managed: &[String],
    ) -> Result<(String, AccountInfo), HealthError> {
        let filter = self.config.account.as_deref();

        if let Some(account) = filter {
            if !managed.iter().any(|a| a == account) {
                return Err(HealthError::DataUnavailable(format!(
                    "account {} is not managed by this session",
                    account
                )));
            }
        }

        let rows = guard(
            session.account_summary(filter, &BALANCE_TAGS),
            "reqAccountSummary",
            self.config.rpc_timeout,
        )
        .await??;

        let mut summary = BTreeMap::new();
        for row in rows {
            if !BALANCE_TAGS.contains(&row.tag.as_str()) {
                continue;
            }
            // First report wins when several accounts carry the same tag.
            summary.entry(row.tag).or_insert(SummaryValue {
                value: row.value,
                currency: row.currency,
                account: row.account,
            });
        }

        if summary.is_empty() {
            return Err(HealthError::DataUnavailable(
                "account summary returned none of the requested balance tags".to_string(),
            ));
        }

        Ok((
            format!("{}/{} balance tags available", summary.len(), BALANCE_TAGS.len()),
            AccountInfo {
                account: filter.map(String::from),
                summary,
            },
        ))
    }

    async fn check_market_data(
        &self,
        session: &mut S,
    ) -> Result<(String, MarketDataInfo), HealthError> {
        let instrument = &self.config.instrument;
        let settle = self.config.settle_delay;

        // One deadline covers subscribe, settle and read.
        let fetch = async {
            session.subscribe_quote(instrument).await?;
            if !settle.is_zero() {
                tokio::time::sleep(settle).await;
            }
            session.quote_snapshot(instrument).await
        };
        let snapshot = match guard(fetch, "marketData", self.config.rpc_timeout + settle).await {
            Ok(quote) => quote.map_err(HealthError::from),
            Err(timeout) => Err(timeout.into()),
        };

        // Best-effort: a leaked subscription only costs a market data line.
        let cancel_deadline = self.config.rpc_timeout.min(CANCEL_DEADLINE);
        match guard(session.unsubscribe_quote(instrument), "cancelMktData", cancel_deadline).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!(error = %e, "Ignoring cancelMktData error"),
            Err(timeout) => debug!(error = %timeout, "Ignoring cancelMktData timeout"),
        }

        let quote = snapshot?.normalized();
        if !quote.has_any() {
            return Err(HealthError::DataUnavailable(format!(
                "no market data for {} (no last/bid/ask, subscription missing or market closed)",
                instrument.symbol
            )));
        }

        Ok((
            format!("live quote received for {}", instrument.symbol),
            MarketDataInfo {
                data: QuoteData {
                    symbol: instrument.symbol.clone(),
                    last: quote.last,
                    bid: quote.bid,
                    ask: quote.ask,
                },
            },
        ))
    }
}

/// Run one stage, timing it and logging failures.
async fn timed<P, F>(stage: Stage, check: F) -> StageResult<P>
where
    F: Future<Output = Result<(String, P), HealthError>>,
{
    let start = Instant::now();
    let outcome = check.await;
    let elapsed = start.elapsed();

    match outcome {
        Ok(_) => debug!(
            stage = stage.as_str(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Stage passed"
        ),
        Err(ref e) => warn!(
            stage = stage.as_str(),
            kind = e.kind(),
            error = %e,
            elapsed_ms = elapsed.as_millis() as u64,
            "Stage failed"
        ),
    }
    StageResult::from_outcome(outcome, elapsed)
}
