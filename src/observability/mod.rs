//! Observability for the health service.
//!
//! Prometheus metrics for probes, stages, reconnects and the HTTP boundary.
//! Structured logging lives in [`crate::logging`].
//!
//! ```rust,ignore
//! use gateway_health::observability::Metrics;
//!
//! let metrics = Metrics::new()?;
//! metrics.record_reconnect(true);
//! println!("{}", metrics.export());
//! ```

pub mod metrics;

pub use metrics::Metrics;
