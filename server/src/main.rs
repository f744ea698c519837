//! Tap Service
//!
//! Serves the tap leaderboard and relays sponsored taps.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::RwLock;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use tap_server::{ApiServer, AppState, HealthServer, HealthState, ServiceConfig, ServiceStats};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tap_server=debug,tower_http=info"));

    let subscriber = fmt().with_env_filter(filter).with_target(true).with_level(true);
    if std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json")) {
        subscriber.json().init();
    } else {
        subscriber.with_ansi(true).init();
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Tap service starting"
    );

    let config = ServiceConfig::from_env()?;

    info!(
        rpc = %config.rpc_url,
        contract = %config.contract_address,
        sponsorship = config.sponsorship_enabled(),
        max_logs = config.max_logs,
        window_blocks = config.log_window_blocks,
        cache = config.leaderboard_cache,
        origins = ?config.origin_allow,
        port = config.port,
        health_port = config.health_port,
        "Configuration loaded"
    );

    let stats = Arc::new(RwLock::new(ServiceStats::default()));

    let state = Arc::new(AppState::from_config(&config, Arc::clone(&stats))?);
    let health_state = Arc::new(HealthState::new(
        state.reader.clone(),
        Arc::clone(&stats),
        state.relay.is_enabled(),
    ));

    let api_server = ApiServer::new(&config, state);
    let health_server = HealthServer::new(health_state, config.health_port);

    tokio::select! {
        result = api_server.run() => {
            if let Err(e) = result {
                error!(error = %e, "API server failed");
                return Err(e);
            }
        }
        result = health_server.run() => {
            if let Err(e) = result {
                error!(error = %e, "Health server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    info!("Tap service stopped");
    Ok(())
}
