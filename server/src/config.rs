//! Configuration for the tap service

use serde::Deserialize;

/// Tap service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Chain JSON-RPC URL
    pub rpc_url: String,

    /// Tap contract address
    pub contract_address: String,

    /// Private key used to pay for sponsored taps (None = relay disabled)
    #[serde(default)]
    pub sponsor_private_key: Option<String>,

    /// Maximum raw logs processed per leaderboard request
    #[serde(default = "default_max_logs")]
    pub max_logs: usize,

    /// Allowed CORS origins (empty = mirror any origin)
    #[serde(default)]
    pub origin_allow: Vec<String>,

    /// Leaderboard lookback window in blocks
    #[serde(default = "default_log_window_blocks")]
    pub log_window_blocks: u64,

    /// Entries returned when the caller gives no limit
    #[serde(default = "default_leaderboard_limit")]
    pub leaderboard_limit: usize,

    /// Upper bound for a caller-provided limit
    #[serde(default = "default_leaderboard_max_limit")]
    pub leaderboard_max_limit: usize,

    /// Reuse the last scan while the chain head has not moved
    #[serde(default)]
    pub leaderboard_cache: bool,

    /// Timeout for a single RPC call in seconds
    #[serde(default = "default_rpc_timeout_secs")]
    pub rpc_timeout_secs: u64,

    /// Timeout for a whole HTTP request in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// API server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Health server port
    #[serde(default = "default_health_port")]
    pub health_port: u16,
}

fn default_max_logs() -> usize {
    10_000
}

fn default_log_window_blocks() -> u64 {
    1_000_000
}

fn default_leaderboard_limit() -> usize {
    20
}

fn default_leaderboard_max_limit() -> usize {
    100
}

fn default_rpc_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_port() -> u16 {
    8787
}

fn default_health_port() -> u16 {
    9090
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

impl ServiceConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        let config = Self {
            rpc_url: std::env::var("RPC_URL")
                .map_err(|_| anyhow::anyhow!("RPC_URL not set"))?,
            contract_address: std::env::var("CONTRACT_ADDRESS")
                .map_err(|_| anyhow::anyhow!("CONTRACT_ADDRESS not set"))?,
            sponsor_private_key: std::env::var("SPONSOR_PRIVATE_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            max_logs: parse_env("MAX_LOGS").unwrap_or_else(default_max_logs),
            origin_allow: std::env::var("ORIGIN_ALLOW")
                .map(|value| parse_origins(&value))
                .unwrap_or_default(),
            log_window_blocks: parse_env("LOG_WINDOW_BLOCKS")
                .unwrap_or_else(default_log_window_blocks),
            leaderboard_limit: parse_env("LEADERBOARD_LIMIT")
                .unwrap_or_else(default_leaderboard_limit),
            leaderboard_max_limit: parse_env("LEADERBOARD_MAX_LIMIT")
                .unwrap_or_else(default_leaderboard_max_limit),
            leaderboard_cache: parse_env("LEADERBOARD_CACHE").unwrap_or(false),
            rpc_timeout_secs: parse_env("RPC_TIMEOUT_SECS")
                .unwrap_or_else(default_rpc_timeout_secs),
            request_timeout_secs: parse_env("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(default_request_timeout_secs),
            port: parse_env("PORT").unwrap_or_else(default_port),
            health_port: parse_env("HEALTH_PORT").unwrap_or_else(default_health_port),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make every request fail
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_logs == 0 {
            anyhow::bail!("MAX_LOGS must be greater than zero");
        }
        if self.log_window_blocks == 0 {
            anyhow::bail!("LOG_WINDOW_BLOCKS must be greater than zero");
        }
        if self.leaderboard_max_limit == 0 {
            anyhow::bail!("LEADERBOARD_MAX_LIMIT must be greater than zero");
        }
        if self.leaderboard_limit == 0 || self.leaderboard_limit > self.leaderboard_max_limit {
            anyhow::bail!(
                "LEADERBOARD_LIMIT must be between 1 and {}",
                self.leaderboard_max_limit
            );
        }
        if self.rpc_timeout_secs == 0 {
            anyhow::bail!("RPC_TIMEOUT_SECS must be greater than zero");
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("REQUEST_TIMEOUT_SECS must be greater than zero");
        }
        // A single RPC call has to fit inside one request
        if self.request_timeout_secs < self.rpc_timeout_secs {
            anyhow::bail!(
                "REQUEST_TIMEOUT_SECS ({}) must be at least RPC_TIMEOUT_SECS ({})",
                self.request_timeout_secs,
                self.rpc_timeout_secs
            );
        }
        Ok(())
    }

    /// Whether a sponsor key is configured
    pub fn sponsorship_enabled(&self) -> bool {
        self.sponsor_private_key.is_some()
    }
}

/// Split a comma-separated origin list, dropping blanks
pub fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}
