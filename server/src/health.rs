//! Operational endpoints, served on their own port
//!
//! - GET /health - process is up
//! - GET /ready - RPC reachable and the tap contract has code
//! - GET /metrics - Prometheus text exposition
//! - GET /stats - request counters as JSON

use std::fmt::Write;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;

use crate::client::TapClient;
use crate::service::serve;
use crate::types::ServiceStats;

/// State behind the operational endpoints
pub struct HealthState {
    pub started: Instant,
    pub stats: Arc<RwLock<ServiceStats>>,
    /// Read client probed by /ready
    pub reader: TapClient,
    pub sponsorship_enabled: bool,
}

impl HealthState {
    pub fn new(reader: TapClient, stats: Arc<RwLock<ServiceStats>>, sponsorship_enabled: bool) -> Self {
        Self {
            started: Instant::now(),
            stats,
            reader,
            sponsorship_enabled,
        }
    }

    fn uptime_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }
}

#[derive(Debug, Serialize)]
pub struct LivenessBody {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
}

#[derive(Debug, Serialize)]
pub struct ReadinessBody {
    pub ready: bool,
    pub chain_connected: bool,
    pub contract_deployed: bool,
    pub latest_block: Option<u64>,
    pub sponsorship_enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct StatsBody {
    pub leaderboard_requests: u64,
    pub leaderboard_failures: u64,
    pub logs_scanned: u64,
    pub logs_skipped: u64,
    pub last_scanned_block: Option<u64>,
    pub sponsored_total: u64,
    pub sponsor_rejected: u64,
    pub sponsor_failures: u64,
    pub last_sponsored_at: Option<String>,
    pub last_tx_hash: Option<String>,
    pub uptime_secs: u64,
}

async fn liveness(State(state): State<Arc<HealthState>>) -> Json<LivenessBody> {
    Json(LivenessBody {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.uptime_secs(),
    })
}

async fn readiness(State(state): State<Arc<HealthState>>) -> Response {
    let latest_block = state
        .reader
        .head()
        .await
        .inspect_err(|e| debug!(error = %e, "Readiness: chain head unavailable"))
        .ok();

    // Skip the code probe when the node is already unreachable
    let contract_deployed = match latest_block {
        Some(_) => state
            .reader
            .is_deployed()
            .await
            .inspect_err(|e| debug!(error = %e, "Readiness: code lookup failed"))
            .unwrap_or(false),
        None => false,
    };

    let body = ReadinessBody {
        ready: latest_block.is_some() && contract_deployed,
        chain_connected: latest_block.is_some(),
        contract_deployed,
        latest_block,
        sponsorship_enabled: state.sponsorship_enabled,
    };
    let status = if body.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(body)).into_response()
}

/// Append one metric family with its samples
fn family(out: &mut String, name: &str, kind: &str, help: &str, samples: &[(&str, u64)]) {
    let _ = writeln!(out, "# HELP tap_server_{name} {help}");
    let _ = writeln!(out, "# TYPE tap_server_{name} {kind}");
    for (labels, value) in samples {
        let _ = writeln!(out, "tap_server_{name}{labels} {value}");
    }
    out.push('\n');
}

async fn metrics(State(state): State<Arc<HealthState>>) -> String {
    let stats = state.stats.read().await;
    let mut out = String::new();

    family(
        &mut out,
        "leaderboard_requests_total",
        "counter",
        "Leaderboard requests served",
        &[
            (
                r#"{status="success"}"#,
                stats.leaderboard_requests.saturating_sub(stats.leaderboard_failures),
            ),
            (r#"{status="failed"}"#, stats.leaderboard_failures),
        ],
    );
    family(
        &mut out,
        "logs_scanned_total",
        "counter",
        "Raw logs processed after the cap",
        &[("", stats.logs_scanned)],
    );
    family(
        &mut out,
        "logs_skipped_total",
        "counter",
        "Logs skipped as undecodable",
        &[("", stats.logs_skipped)],
    );
    family(
        &mut out,
        "sponsored_total",
        "counter",
        "Sponsored taps by outcome",
        &[
            (r#"{status="submitted"}"#, stats.sponsored_total),
            (r#"{status="rejected"}"#, stats.sponsor_rejected),
            (r#"{status="failed"}"#, stats.sponsor_failures),
        ],
    );
    family(
        &mut out,
        "last_scanned_block",
        "gauge",
        "Chain head of the last leaderboard scan",
        &[("", stats.last_scanned_block.unwrap_or(0))],
    );
    family(
        &mut out,
        "sponsorship_enabled",
        "gauge",
        "Whether a sponsor key is configured",
        &[("", u64::from(state.sponsorship_enabled))],
    );
    family(
        &mut out,
        "uptime_seconds",
        "gauge",
        "Service uptime in seconds",
        &[("", state.uptime_secs())],
    );

    out
}

async fn stats(State(state): State<Arc<HealthState>>) -> Json<StatsBody> {
    let stats = state.stats.read().await;

    Json(StatsBody {
        leaderboard_requests: stats.leaderboard_requests,
        leaderboard_failures: stats.leaderboard_failures,
        logs_scanned: stats.logs_scanned,
        logs_skipped: stats.logs_skipped,
        last_scanned_block: stats.last_scanned_block,
        sponsored_total: stats.sponsored_total,
        sponsor_rejected: stats.sponsor_rejected,
        sponsor_failures: stats.sponsor_failures,
        last_sponsored_at: stats.last_sponsored_at.map(|t| t.to_rfc3339()),
        last_tx_hash: stats.last_tx_hash.map(|hash| hash.to_string()),
        uptime_secs: state.uptime_secs(),
    })
}

/// Router for the operational endpoints
pub fn create_router(state: Arc<HealthState>) -> Router {
    Router::new()
        .route("/health", get(liveness))
        .route("/ready", get(readiness))
        .route("/metrics", get(metrics))
        .route("/stats", get(stats))
        .with_state(state)
}

/// Operational server, run next to the API server
pub struct HealthServer {
    state: Arc<HealthState>,
    port: u16,
}

impl HealthServer {
    pub fn new(state: Arc<HealthState>, port: u16) -> Self {
        Self { state, port }
    }

    pub fn state(&self) -> Arc<HealthState> {
        Arc::clone(&self.state)
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        serve("health", create_router(self.state()), self.port).await
    }
}
