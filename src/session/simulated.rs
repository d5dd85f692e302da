//! In-process simulated gateway session.
//!
//! Replies are scripted per call (value, failure or hang) with a shared
//! latency, and everything the session sees is recorded so tests can
//! assert on ordering and concurrency. The session deliberately ignores the
//! `tags` argument of [`Session::account_summary`] and returns every row for
//! the requested account, like a gateway that over-reports.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;

use super::{AccountValue, Endpoint, Instrument, QuoteSnapshot, Session, SessionError};
use crate::config::SimulationConfig;

/// Scripted outcome of one simulated call.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply<T> {
    /// Succeed with this value.
    Ok(T),
    /// Fail with this message.
    Fail(String),
    /// Never complete.
    Hang,
}

/// What the simulated gateway answers.
#[derive(Debug, Clone)]
pub struct SimulatedBehavior {
    pub connect: Reply<()>,
    pub server_time: Reply<u64>,
    pub accounts: Reply<Vec<String>>,
    pub summary: Reply<Vec<AccountValue>>,
    pub quote: Reply<QuoteSnapshot>,
    /// Error returned by `disconnect` (the disconnect still happens).
    pub disconnect_error: Option<String>,
    /// Delay applied to every call before it replies.
    pub latency: Duration,
}

impl Default for SimulatedBehavior {
    fn default() -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let account = "DU0000001";

        Self {
            connect: Reply::Ok(()),
            server_time: Reply::Ok(now),
            accounts: Reply::Ok(vec![account.to_string()]),
            summary: Reply::Ok(vec![
                AccountValue::new(account, "NetLiquidation", "100000.00", "USD"),
                AccountValue::new(account, "TotalCashValue", "25000.50", "USD"),
                AccountValue::new(account, "ExcessLiquidity", "95000.00", "USD"),
                AccountValue::new(account, "Cushion", "0.95", ""),
                AccountValue::new(account, "AccountType", "INDIVIDUAL", ""),
            ]),
            quote: Reply::Ok(QuoteSnapshot {
                last: Some(1.0842),
                bid: Some(1.0841),
                ask: Some(1.0843),
            }),
            disconnect_error: None,
            latency: Duration::ZERO,
        }
    }
}

/// Something the simulated session observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    ConnectStarted,
    Connected,
    ConnectFailed,
    Disconnected,
    Call(&'static str),
}

#[derive(Default)]
struct Shared {
    behavior: Mutex<SimulatedBehavior>,
    connected: AtomicBool,
    connects: AtomicUsize,
    disconnects: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    last_readonly: Mutex<Option<bool>>,
    events: Mutex<Vec<SessionEvent>>,
    subscriptions: Mutex<HashSet<String>>,
}

impl Shared {
    fn record(&self, event: SessionEvent) {
        lock(&self.events).push(event);
    }
}

/// Bookkeeping locks are never held across an await, so poisoning can only
/// come from a panicking test thread.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Counts overlapping calls; decrements on drop so abandoned calls are
/// accounted for too.
struct InFlight<'a>(&'a Shared);

impl<'a> InFlight<'a> {
    fn enter(shared: &'a Shared) -> Self {
        let now = shared.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        shared.max_in_flight.fetch_max(now, Ordering::SeqCst);
        Self(shared)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Simulated gateway session.
pub struct SimulatedSession {
    shared: Arc<Shared>,
}

impl SimulatedSession {
    /// Session with the given behaviour.
    pub fn new(behavior: SimulatedBehavior) -> Self {
        let shared = Shared {
            behavior: Mutex::new(behavior),
            ..Default::default()
        };
        Self {
            shared: Arc::new(shared),
        }
    }

    /// Reachable, authenticated, funded, with a live quote.
    pub fn healthy() -> Self {
        Self::new(SimulatedBehavior::default())
    }

    /// Session shaped by the `SIM_*` environment settings.
    pub fn from_config(config: &SimulationConfig) -> Self {
        let mut behavior = SimulatedBehavior::default();
        if config.unreachable {
            behavior.connect = Reply::Fail("connection refused".to_string());
        }
        if let Some(first) = config.accounts.first() {
            behavior.summary = Reply::Ok(vec![
                AccountValue::new(first, "NetLiquidation", "100000.00", "USD"),
                AccountValue::new(first, "TotalCashValue", "25000.50", "USD"),
                AccountValue::new(first, "ExcessLiquidity", "95000.00", "USD"),
            ]);
        }
        behavior.accounts = Reply::Ok(config.accounts.clone());
        if !config.market_data {
            behavior.quote = Reply::Ok(QuoteSnapshot::default());
        }
        Self::new(behavior)
    }

    /// Handle for scripting and inspecting this session from outside.
    pub fn controller(&self) -> SimulatedController {
        SimulatedController {
            shared: Arc::clone(&self.shared),
        }
    }

    async fn reply<T, F>(&self, op: &'static str, pick: F) -> Result<T, SessionError>
    where
        T: Send,
        F: FnOnce(&SimulatedBehavior) -> Reply<T> + Send,
    {
        let _in_flight = InFlight::enter(&self.shared);
        self.shared.record(SessionEvent::Call(op));

        if !self.shared.connected.load(Ordering::SeqCst) {
            return Err(SessionError::new("not connected"));
        }

        let (reply, latency) = {
            let behavior = lock(&self.shared.behavior);
            (pick(&behavior), behavior.latency)
        };
        settle(reply, latency).await
    }
}

async fn settle<T>(reply: Reply<T>, latency: Duration) -> Result<T, SessionError> {
    if !latency.is_zero() {
        tokio::time::sleep(latency).await;
    }
    match reply {
        Reply::Ok(value) => Ok(value),
        Reply::Fail(message) => Err(SessionError::new(message)),
        Reply::Hang => std::future::pending().await,
    }
}

#[async_trait]
impl Session for SimulatedSession {
    async fn connect(&mut self, _endpoint: &Endpoint, readonly: bool) -> Result<(), SessionError> {
        let _in_flight = InFlight::enter(&self.shared);
        self.shared.connects.fetch_add(1, Ordering::SeqCst);
        *lock(&self.shared.last_readonly) = Some(readonly);
        self.shared.record(SessionEvent::ConnectStarted);

        let (reply, latency) = {
            let behavior = lock(&self.shared.behavior);
            (behavior.connect.clone(), behavior.latency)
        };

        match settle(reply, latency).await {
            Ok(()) => {
                self.shared.connected.store(true, Ordering::SeqCst);
                self.shared.record(SessionEvent::Connected);
                Ok(())
            }
            Err(e) => {
                self.shared.record(SessionEvent::ConnectFailed);
                Err(e)
            }
        }
    }

    async fn disconnect(&mut self) -> Result<(), SessionError> {
        self.shared.disconnects.fetch_add(1, Ordering::SeqCst);
        self.shared.connected.store(false, Ordering::SeqCst);
        lock(&self.shared.subscriptions).clear();
        self.shared.record(SessionEvent::Disconnected);

        match lock(&self.shared.behavior).disconnect_error.clone() {
            Some(message) => Err(SessionError::new(message)),
            None => Ok(()),
        }
    }

    fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    async fn current_time(&mut self) -> Result<u64, SessionError> {
        self.reply("reqCurrentTime", |b| b.server_time.clone()).await
    }

    async fn managed_accounts(&mut self) -> Result<Vec<String>, SessionError> {
        self.reply("reqManagedAccts", |b| b.accounts.clone()).await
    }

    async fn account_summary(
        &mut self,
        account: Option<&str>,
        _tags: &[&str],
    ) -> Result<Vec<AccountValue>, SessionError> {
        let rows = self
            .reply("reqAccountSummary", |b| b.summary.clone())
            .await?;
        Ok(rows
            .into_iter()
            .filter(|row| account.map_or(true, |a| row.account == a))
            .collect())
    }

    async fn subscribe_quote(&mut self, instrument: &Instrument) -> Result<(), SessionError> {
        // Subscription failures surface through the quote reply.
        let quote = self.reply("reqMktData", |b| b.quote.clone()).await;
        if quote.is_ok() {
            lock(&self.shared.subscriptions).insert(instrument.symbol.clone());
        }
        quote.map(|_| ())
    }

    async fn quote_snapshot(
        &mut self,
        instrument: &Instrument,
    ) -> Result<QuoteSnapshot, SessionError> {
        if !lock(&self.shared.subscriptions).contains(&instrument.symbol) {
            return Err(SessionError::new(format!(
                "no subscription for {}",
                instrument.symbol
            )));
        }
        self.reply("ticker", |b| b.quote.clone()).await
    }

    async fn unsubscribe_quote(&mut self, instrument: &Instrument) -> Result<(), SessionError> {
        lock(&self.shared.subscriptions).remove(&instrument.symbol);
        self.reply("cancelMktData", |_| Reply::Ok(())).await
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}

/// Scripting and inspection handle for a [`SimulatedSession`].
#[derive(Clone)]
pub struct SimulatedController {
    shared: Arc<Shared>,
}

impl SimulatedController {
    /// Change the scripted behaviour.
    pub fn update(&self, f: impl FnOnce(&mut SimulatedBehavior)) {
        f(&mut lock(&self.shared.behavior));
    }

    /// Simulate the gateway closing the socket.
    pub fn drop_connection(&self) {
        self.shared.connected.store(false, Ordering::SeqCst);
        lock(&self.shared.subscriptions).clear();
    }

    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    pub fn connects(&self) -> usize {
        self.shared.connects.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.shared.disconnects.load(Ordering::SeqCst)
    }

    /// Highest number of calls that were ever in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.shared.max_in_flight.load(Ordering::SeqCst)
    }

    /// `readonly` flag of the most recent connect.
    pub fn last_readonly(&self) -> Option<bool> {
        *lock(&self.shared.last_readonly)
    }

    pub fn active_subscriptions(&self) -> usize {
        lock(&self.shared.subscriptions).len()
    }

    /// Everything observed so far, in order.
    pub fn events(&self) -> Vec<SessionEvent> {
        lock(&self.shared.events).clone()
    }

    /// Names of remote calls observed so far, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SessionEvent::Call(name) => Some(name),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> Endpoint {
        Endpoint::new("127.0.0.1", 7497, 17)
    }

    #[tokio::test]
    async fn test_calls_require_connection() {
        let mut session = SimulatedSession::healthy();
        let err = session.current_time().await.unwrap_err();
        assert_eq!(err.message, "not connected");

        session.connect(&endpoint(), true).await.unwrap();
        assert!(session.current_time().await.is_ok());
    }

    #[tokio::test]
    async fn test_summary_filters_by_account_only() {
        let mut session = SimulatedSession::healthy();
        session.connect(&endpoint(), true).await.unwrap();

        let rows = session
            .account_summary(Some("DU0000001"), &["NetLiquidation"])
            .await
            .unwrap();
        assert_eq!(rows.len(), 5);

        let rows = session
            .account_summary(Some("DU9999999"), &["NetLiquidation"])
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_quote_requires_subscription() {
        let mut session = SimulatedSession::healthy();
        let ctl = session.controller();
        let eurusd = Instrument::forex("EUR", "USD");
        session.connect(&endpoint(), true).await.unwrap();

        assert!(session.quote_snapshot(&eurusd).await.is_err());
        session.subscribe_quote(&eurusd).await.unwrap();
        assert_eq!(ctl.active_subscriptions(), 1);
        assert!(session.quote_snapshot(&eurusd).await.unwrap().has_any());
        session.unsubscribe_quote(&eurusd).await.unwrap();
        assert_eq!(ctl.active_subscriptions(), 0);
    }

    #[test]
    fn test_from_config() {
        let config = SimulationConfig {
            accounts: Vec::new(),
            market_data: false,
            unreachable: true,
        };
        let session = SimulatedSession::from_config(&config);
        let behavior = lock(&session.shared.behavior).clone();
        assert!(matches!(behavior.connect, Reply::Fail(_)));
        assert_eq!(behavior.accounts, Reply::Ok(Vec::new()));
        assert_eq!(behavior.quote, Reply::Ok(QuoteSnapshot::default()));
    }
}
