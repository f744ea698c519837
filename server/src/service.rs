//! Public HTTP API
//!
//! - GET /api/leaderboard - ranked taps over the configured block window
//! - POST /api/tap-sponsor - submit a tap paid for by the service
//! - GET /api/clicks/{user} - on-chain click count of one address

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::Address;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tokio::sync::RwLock;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{debug, info, warn};

use crate::client::{self, TapClient};
use crate::config::ServiceConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::leaderboard::{AggregatorSettings, LogAggregator};
use crate::sponsor::{parse_participant, SponsorRelay};
use crate::types::{
    ClicksResponse, LeaderboardQuery, LeaderboardResponse, ServiceStats, SponsorRequest,
    SponsorResponse,
};

/// State shared by the API handlers
pub struct AppState {
    pub aggregator: LogAggregator,
    pub relay: SponsorRelay,
    pub reader: TapClient,
    pub default_limit: usize,
    pub stats: Arc<RwLock<ServiceStats>>,
}

impl AppState {
    /// Wire the components from configuration
    pub fn from_config(config: &ServiceConfig, stats: Arc<RwLock<ServiceStats>>) -> anyhow::Result<Self> {
        let contract: Address = config
            .contract_address
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid CONTRACT_ADDRESS: {}", config.contract_address))?;
        let timeout = Duration::from_secs(config.rpc_timeout_secs);

        let reader = TapClient::new(client::connect(&config.rpc_url, timeout)?, contract);

        let relay = match &config.sponsor_private_key {
            Some(key) => {
                let (signing, sponsor) = client::connect_signing(&config.rpc_url, key, timeout)?;
                info!(sponsor = %sponsor, "Sponsorship enabled");
                SponsorRelay::new(Some(TapClient::new(signing, contract)))
            }
            None => {
                warn!("SPONSOR_PRIVATE_KEY not set, sponsorship disabled");
                SponsorRelay::disabled()
            }
        };

        Ok(Self::new(reader, relay, aggregator_settings(config), config.leaderboard_limit, stats))
    }

    /// Assemble state from already-built components
    pub fn new(
        reader: TapClient,
        relay: SponsorRelay,
        settings: AggregatorSettings,
        default_limit: usize,
        stats: Arc<RwLock<ServiceStats>>,
    ) -> Self {
        Self {
            aggregator: LogAggregator::new(reader.clone(), settings),
            relay,
            reader,
            default_limit,
            stats,
        }
    }
}

/// Aggregator settings from configuration
pub fn aggregator_settings(config: &ServiceConfig) -> AggregatorSettings {
    AggregatorSettings {
        window_size: config.log_window_blocks,
        max_logs: config.max_logs,
        max_limit: config.leaderboard_max_limit,
        cache: config.leaderboard_cache,
    }
}

/// Leaderboard handler
async fn leaderboard_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LeaderboardQuery>,
) -> ServiceResult<Json<LeaderboardResponse>> {
    let limit = match query.limit.as_deref() {
        None | Some("") => state.default_limit,
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|_| ServiceError::InvalidArgument(format!("Invalid limit: {raw}")))?,
    };

    match state.aggregator.leaderboard(limit).await {
        Ok(snapshot) => {
            state.stats.write().await.record_leaderboard(&snapshot);
            Ok(Json(snapshot.into()))
        }
        Err(e) => {
            if !matches!(e, ServiceError::InvalidArgument(_)) {
                state.stats.write().await.record_leaderboard_failure();
                warn!(error = %e, code = e.error_code(), "Leaderboard request failed");
            }
            Err(e)
        }
    }
}

/// Sponsored tap handler
async fn tap_sponsor_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SponsorRequest>, JsonRejection>,
) -> ServiceResult<Json<SponsorResponse>> {
    let result = match payload {
        _ if !state.relay.is_enabled() => Err(ServiceError::SponsorshipDisabled),
        Ok(Json(SponsorRequest { user: Some(user) })) if !user.trim().is_empty() => {
            state.relay.sponsor(&user).await
        }
        Ok(_) => Err(ServiceError::InvalidArgument("Missing user".to_string())),
        Err(rejection) => {
            debug!(error = %rejection, "Rejected tap-sponsor payload");
            Err(ServiceError::InvalidArgument("Invalid request body".to_string()))
        }
    };

    let mut stats = state.stats.write().await;
    match result {
        Ok((user, tx_hash)) => {
            stats.record_sponsored(tx_hash);
            Ok(Json(SponsorResponse {
                tx_hash,
                sponsored: true,
                user,
            }))
        }
        Err(e) => {
            match &e {
                ServiceError::InvalidArgument(_) | ServiceError::SponsorshipDisabled => {
                    stats.record_sponsor_rejected()
                }
                _ => stats.record_sponsor_failure(),
            }
            Err(e)
        }
    }
}

/// Click count handler
async fn clicks_handler(
    State(state): State<Arc<AppState>>,
    Path(user): Path<String>,
) -> ServiceResult<Json<ClicksResponse>> {
    let user = parse_participant(&user)?;
    let clicks = state.reader.clicks_of(user).await?;

    Ok(Json(ClicksResponse {
        user,
        clicks: clicks.to_string(),
    }))
}

/// CORS policy from the configured origin list
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::mirror_request()
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %origin, "Ignoring invalid ORIGIN_ALLOW entry");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Create the API router
pub fn create_router(state: Arc<AppState>, origins: &[String], request_timeout: Duration) -> Router {
    let timeout_secs = request_timeout.as_secs();

    Router::new()
        .route("/api/leaderboard", get(leaderboard_handler))
        .route("/api/tap-sponsor", post(tap_sponsor_handler))
        .route("/api/clicks/{user}", get(clicks_handler))
        .with_state(state)
        .layer(TimeoutLayer::with_status_code(StatusCode::GATEWAY_TIMEOUT, request_timeout))
        .layer(middleware::map_response(move |response: Response| async move {
            timeout_body(response, timeout_secs)
        }))
        .layer(cors_layer(origins))
        .layer(TraceLayer::new_for_http())
}

/// Replace the empty body of a timed-out request with the usual `{error}` payload
///
/// Handlers never answer 504, so that status only comes from `TimeoutLayer`.
fn timeout_body(response: Response, timeout_secs: u64) -> Response {
    if response.status() != StatusCode::GATEWAY_TIMEOUT {
        return response;
    }
    warn!(timeout_secs, "Request timed out");
    ServiceError::UpstreamUnavailable(format!("request timed out after {timeout_secs}s")).into_response()
}

/// API server
pub struct ApiServer {
    state: Arc<AppState>,
    origins: Vec<String>,
    request_timeout: Duration,
    port: u16,
}

impl ApiServer {
    pub fn new(config: &ServiceConfig, state: Arc<AppState>) -> Self {
        Self {
            state,
            origins: config.origin_allow.clone(),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            port: config.port,
        }
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        let router = create_router(Arc::clone(&self.state), &self.origins, self.request_timeout);
        serve("api", router, self.port).await
    }
}

/// Bind `0.0.0.0:port` and serve `router` until the listener fails
pub async fn serve(name: &'static str, router: Router, port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(server = name, port, "Listening");
    axum::serve(listener, router).await?;

    Ok(())
}
