use std::sync::Arc;

use tracing::{error, info};

use gateway_health::config::{Config, SessionBackend};
use gateway_health::health::HealthChecker;
use gateway_health::observability::Metrics;
use gateway_health::session::SimulatedSession;
use gateway_health::{logging, AppState, HealthServer, VERSION};

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = Config::from_env()?;
    logging::init(&config.logging)?;

    info!(version = VERSION, "Starting gateway health monitor");
    config.log_summary();

    // Every session operation is serialized through one gate; a single
    // thread is enough.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async_main(config))
}

async fn async_main(config: Config) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let session = match config.server.backend {
        SessionBackend::Simulated => {
            info!(
                accounts = config.simulation.accounts.len(),
                market_data = config.simulation.market_data,
                unreachable = config.simulation.unreachable,
                "Using simulated gateway session"
            );
            SimulatedSession::from_config(&config.simulation)
        }
    };

    let metrics = Arc::new(Metrics::new().map_err(|e| format!("metrics registry: {}", e))?);
    let checker = HealthChecker::from_config(session, &config.gateway).with_metrics(Arc::clone(&metrics));
    let state = Arc::new(
        AppState::new(checker, metrics)
            .with_config(config.summary())
            .with_service(config.logging.service_name.clone()),
    );

    let server = HealthServer::bind(config.server.listen_addr, Arc::clone(&state)).await?;

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!(error = %e, "Server error");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down...");
        }
    }

    state.checker.shutdown().await;
    Ok(())
}
