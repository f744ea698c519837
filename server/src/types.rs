//! Types for the tap service

use alloy_primitives::{Address, Bytes, B256, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

/// Log as delivered by the chain client, before decoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLog {
    /// Indexed topics, topic0 is the event signature
    pub topics: Vec<B256>,

    /// ABI-encoded non-indexed fields
    pub data: Bytes,

    /// Block the log was emitted in (None while pending)
    pub block_number: Option<u64>,

    /// Position within the block
    pub log_index: Option<u64>,

    /// Set by the provider when the log was dropped by a reorg
    pub removed: bool,
}

/// Decoded `Clicked` event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClickEvent {
    pub participant: Address,

    /// Running total emitted by the contract at this tap
    pub cumulative_count: U256,

    pub block_number: Option<u64>,
    pub log_index: Option<u64>,
}

/// One leaderboard row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    #[serde(serialize_with = "serialize_address")]
    pub user: Address,
    #[serde(serialize_with = "serialize_total")]
    pub total: U256,
}

/// Ranked leaderboard recomputed for a single request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardSnapshot {
    /// Sorted by total descending, then address ascending
    pub entries: Vec<LeaderboardEntry>,

    /// Distinct participants seen in the window, before truncation
    pub total_players: usize,

    /// Chain head the scan ran against
    pub generated_at_block: u64,

    /// First block of the scanned window
    pub from_block: u64,

    /// Raw logs retained after the cap
    pub logs_scanned: usize,

    /// Retained logs that could not be decoded
    pub logs_skipped: usize,
}

/// `GET /api/leaderboard` response body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardResponse {
    pub top: Vec<LeaderboardEntry>,
    pub total_players: usize,
    pub generated_at_block: u64,
}

impl From<LeaderboardSnapshot> for LeaderboardResponse {
    fn from(snapshot: LeaderboardSnapshot) -> Self {
        Self {
            top: snapshot.entries,
            total_players: snapshot.total_players,
            generated_at_block: snapshot.generated_at_block,
        }
    }
}

/// `GET /api/leaderboard` query string
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<String>,
}

/// `POST /api/tap-sponsor` request body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SponsorRequest {
    #[serde(default)]
    pub user: Option<String>,
}

/// `POST /api/tap-sponsor` response body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorResponse {
    pub tx_hash: B256,
    pub sponsored: bool,
    #[serde(serialize_with = "serialize_address")]
    pub user: Address,
}

/// `GET /api/clicks/{user}` response body
#[derive(Debug, Clone, Serialize)]
pub struct ClicksResponse {
    #[serde(serialize_with = "serialize_address")]
    pub user: Address,
    pub clicks: String,
}

/// Request counters shared between the API handlers and the health server
#[derive(Debug, Clone, Default)]
pub struct ServiceStats {
    pub leaderboard_requests: u64,
    pub leaderboard_failures: u64,
    pub logs_scanned: u64,
    pub logs_skipped: u64,
    pub last_scanned_block: Option<u64>,
    pub sponsored_total: u64,
    pub sponsor_rejected: u64,
    pub sponsor_failures: u64,
    pub last_sponsored_at: Option<DateTime<Utc>>,
    pub last_tx_hash: Option<B256>,
}

impl ServiceStats {
    /// Record a served leaderboard
    pub fn record_leaderboard(&mut self, snapshot: &LeaderboardSnapshot) {
        self.leaderboard_requests += 1;
        self.logs_scanned += snapshot.logs_scanned as u64;
        self.logs_skipped += snapshot.logs_skipped as u64;
        self.last_scanned_block = Some(snapshot.generated_at_block);
    }

    /// Record a failed leaderboard request
    pub fn record_leaderboard_failure(&mut self) {
        self.leaderboard_requests += 1;
        self.leaderboard_failures += 1;
    }

    /// Record a submitted sponsored tap
    pub fn record_sponsored(&mut self, tx_hash: B256) {
        self.sponsored_total += 1;
        self.last_sponsored_at = Some(Utc::now());
        self.last_tx_hash = Some(tx_hash);
    }

    /// Record a sponsor request refused before reaching the chain
    pub fn record_sponsor_rejected(&mut self) {
        self.sponsor_rejected += 1;
    }

    /// Record a sponsor submission failure
    pub fn record_sponsor_failure(&mut self) {
        self.sponsor_failures += 1;
    }
}

/// Lowercase 0x-prefixed hex, the form the UI compares against
pub fn serialize_address<S: Serializer>(address: &Address, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{address:#x}"))
}

/// JSON number while it fits in u64, decimal string beyond that
pub fn serialize_total<S: Serializer>(total: &U256, serializer: S) -> Result<S::Ok, S::Error> {
    match u64::try_from(*total) {
        Ok(small) => serializer.serialize_u64(small),
        Err(_) => serializer.serialize_str(&total.to_string()),
    }
}
