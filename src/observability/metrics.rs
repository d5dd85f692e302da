//! Prometheus metrics for gateway_health.

use prometheus::{
    CounterVec, Encoder, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder,
};
use tracing::warn;

use crate::health::{CompositeStatus, HealthReport};

/// Prometheus registry with all service metrics.
pub struct Metrics {
    registry: Registry,

    /// Probes by composite status
    pub probes_total: CounterVec,

    /// Stage outcomes (pass, fail, skipped)
    pub stage_results_total: CounterVec,

    /// Probe duration in seconds, gate wait included
    pub probe_duration_seconds: Histogram,

    /// Reconnect attempts by result
    pub reconnects_total: CounterVec,

    /// Tasks queued on the access gate
    pub gate_waiting: Gauge,

    /// 1 while the gateway session is connected
    pub session_connected: Gauge,

    /// HTTP requests by method, path, status
    pub http_requests_total: CounterVec,
}

impl Metrics {
    /// Create a new metrics registry with all metrics.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        // Probe latency buckets (in seconds); bounded by the configured deadlines
        let probe_buckets = vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0];

        let probes_total = CounterVec::new(
            Opts::new("gateway_health_probes_total", "Health probes by composite status"),
            &["status"],
        )?;
        registry.register(Box::new(probes_total.clone()))?;

        let stage_results_total = CounterVec::new(
            Opts::new(
                "gateway_health_stage_results_total",
                "Stage outcomes by stage and result",
            ),
            &["stage", "result"],
        )?;
        registry.register(Box::new(stage_results_total.clone()))?;

        let probe_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "gateway_health_probe_duration_seconds",
                "Health probe duration in seconds",
            )
            .buckets(probe_buckets),
        )?;
        registry.register(Box::new(probe_duration_seconds.clone()))?;

        let reconnects_total = CounterVec::new(
            Opts::new("gateway_health_reconnects_total", "Reconnect attempts by result"),
            &["result"],
        )?;
        registry.register(Box::new(reconnects_total.clone()))?;

        let gate_waiting = Gauge::new(
            "gateway_health_gate_waiting",
            "Operations queued for the session access gate",
        )?;
        registry.register(Box::new(gate_waiting.clone()))?;

        let session_connected = Gauge::new(
            "gateway_health_session_connected",
            "Whether the gateway session is connected (0/1)",
        )?;
        registry.register(Box::new(session_connected.clone()))?;

        let http_requests_total = CounterVec::new(
            Opts::new("gateway_health_http_requests_total", "Total HTTP requests"),
            &["method", "path", "status"],
        )?;
        registry.register(Box::new(http_requests_total.clone()))?;

        Ok(Self {
            registry,
            probes_total,
            stage_results_total,
            probe_duration_seconds,
            reconnects_total,
            gate_waiting,
            session_connected,
            http_requests_total,
        })
    }

    /// Record a completed probe.
    pub fn record_probe(&self, report: &HealthReport, duration_secs: f64) {
        self.probes_total
            .with_label_values(&[report.composite().as_str()])
            .inc();
        for (stage, outcome) in report.outcomes() {
            self.stage_results_total
                .with_label_values(&[stage.as_str(), outcome])
                .inc();
        }
        self.probe_duration_seconds.observe(duration_secs);
    }

    /// Record a probe that could not reach the gateway.
    pub fn record_probe_unavailable(&self, duration_secs: f64) {
        self.probes_total
            .with_label_values(&[CompositeStatus::Unavailable.as_str()])
            .inc();
        self.probe_duration_seconds.observe(duration_secs);
    }

    /// Record a reconnect attempt.
    pub fn record_reconnect(&self, success: bool) {
        let result = if success { "success" } else { "error" };
        self.reconnects_total.with_label_values(&[result]).inc();
    }

    pub fn set_gate_waiting(&self, waiting: usize) {
        self.gate_waiting.set(waiting as f64);
    }

    pub fn set_session_connected(&self, connected: bool) {
        self.session_connected.set(if connected { 1.0 } else { 0.0 });
    }

    /// Record HTTP request metrics.
    pub fn record_http_request(&self, method: &str, path: &str, status: u16) {
        let status = status.to_string();
        self.http_requests_total
            .with_label_values(&[normalize_method(method), normalize_path(path), status.as_str()])
            .inc();
    }

    /// Export metrics in Prometheus text format.
    pub fn export(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            warn!(error = %e, "Failed to encode metrics");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }

    /// Get the Prometheus registry (for custom metrics).
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

/// Extension methods all count as OTHER.
fn normalize_method(method: &str) -> &str {
    match method {
        "GET" | "POST" | "HEAD" | "PUT" | "DELETE" | "OPTIONS" | "PATCH" => method,
        _ => "OTHER",
    }
}

/// Collapse unknown paths so scanners cannot blow up label cardinality.
fn normalize_path(path: &str) -> &str {
    match path {
        "/health" | "/health/reconnect" | "/health/ping" | "/metrics" | "/config" => path,
        _ => "other",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().expect("Should create metrics");
        metrics.set_session_connected(true);
        let output = metrics.export();
        assert!(output.contains("# HELP"));
        assert!(output.contains("gateway_health_session_connected 1"));
    }

    #[test]
    fn test_http_request_recording() {
        let metrics = Metrics::new().expect("Should create metrics");
        metrics.record_http_request("GET", "/health", 207);
        metrics.record_http_request("GET", "/wp-admin/install.php", 404);

        let output = metrics.export();
        assert!(output.contains("gateway_health_http_requests_total"));
        assert!(output.contains("path=\"/health\""));
        assert!(output.contains("path=\"other\""));
        assert!(!output.contains("wp-admin"));
    }

    #[test]
    fn test_extension_methods_collapse_to_other() {
        let metrics = Metrics::new().expect("Should create metrics");
        metrics.record_http_request("PROPFIND", "/health", 405);
        metrics.record_http_request("X-SCAN-1", "/health", 405);
        metrics.record_http_request("OPTIONS", "/health", 204);

        let output = metrics.export();
        assert!(output.contains("method=\"OTHER\""));
        assert!(output.contains("method=\"OPTIONS\""));
        assert!(!output.contains("PROPFIND"));
        assert!(!output.contains("X-SCAN-1"));
    }

    #[test]
    fn test_reconnect_recording() {
        let metrics = Metrics::new().expect("Should create metrics");
        metrics.record_reconnect(true);
        metrics.record_reconnect(false);
        metrics.record_probe_unavailable(0.2);

        let output = metrics.export();
        assert!(output.contains("result=\"success\""));
        assert!(output.contains("result=\"error\""));
        assert!(output.contains("status=\"unavailable\""));
    }
}
