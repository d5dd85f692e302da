//! Integration tests for gateway_health
//!
//! Each test starts the HTTP server in-process on an ephemeral port, backed
//! by a simulated gateway session scripted through its controller.
//!
//! Run with: cargo test --test integration

mod helpers;

mod health_endpoint;
mod reconnect;
mod routing;
