//! Leaderboard reconstruction from `Clicked` logs
//!
//! The contract emits the participant's running total on every tap, so the
//! leaderboard is the per-participant maximum over a window of logs. Taking
//! the maximum makes the reduction insensitive to duplicated or reordered
//! delivery.

use std::collections::HashMap;

use alloy_primitives::{Address, U256};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::client::{decode_click, TapClient};
use crate::error::{ServiceError, ServiceResult};
use crate::types::{ClickEvent, LeaderboardEntry, LeaderboardSnapshot, RawLog};

/// Leaderboard scan parameters
#[derive(Debug, Clone, Copy)]
pub struct AggregatorSettings {
    /// Lookback window in blocks
    pub window_size: u64,

    /// Raw logs processed per scan; older ones are dropped
    pub max_logs: usize,

    /// Largest `limit` a caller may ask for
    pub max_limit: usize,

    /// Reuse the last scan while the head has not moved
    pub cache: bool,
}

/// Totals reduced from one scan, before ranking
#[derive(Debug, Clone, Default)]
struct ScanResult {
    totals: HashMap<Address, U256>,
    logs_scanned: usize,
    logs_skipped: usize,
}

#[derive(Debug, Clone)]
struct CachedScan {
    from_block: u64,
    latest: u64,
    scan: ScanResult,
}

/// Builds leaderboard snapshots by scanning the chain
pub struct LogAggregator {
    tap: TapClient,
    settings: AggregatorSettings,
    cache: RwLock<Option<CachedScan>>,
}

impl LogAggregator {
    pub fn new(tap: TapClient, settings: AggregatorSettings) -> Self {
        Self {
            tap,
            settings,
            cache: RwLock::new(None),
        }
    }

    pub fn settings(&self) -> &AggregatorSettings {
        &self.settings
    }

    /// Scan the configured window and rank the top `limit` participants
    pub async fn leaderboard(&self, limit: usize) -> ServiceResult<LeaderboardSnapshot> {
        self.leaderboard_in_window(limit, self.settings.window_size).await
    }

    /// Scan `[latest - window_size, latest]` and rank the top `limit` participants
    pub async fn leaderboard_in_window(
        &self,
        limit: usize,
        window_size: u64,
    ) -> ServiceResult<LeaderboardSnapshot> {
        if limit == 0 || limit > self.settings.max_limit {
            return Err(ServiceError::InvalidArgument(format!(
                "limit must be between 1 and {}",
                self.settings.max_limit
            )));
        }
        if window_size == 0 {
            return Err(ServiceError::InvalidArgument(
                "window size must be positive".to_string(),
            ));
        }

        let latest = self.tap.head().await?;
        let from_block = window_start(latest, window_size);

        let scan = match self.cached(from_block, latest).await {
            Some(scan) => {
                debug!(from_block, latest, "Serving leaderboard from cached scan");
                scan
            }
            None => {
                let logs = self.tap.clicked_logs(from_block, latest).await?;
                let scan = reduce_logs(logs, self.settings.max_logs);
                self.store(from_block, latest, &scan).await;
                scan
            }
        };

        debug!(
            from_block,
            latest,
            players = scan.totals.len(),
            scanned = scan.logs_scanned,
            skipped = scan.logs_skipped,
            "Leaderboard scan complete"
        );

        Ok(LeaderboardSnapshot {
            total_players: scan.totals.len(),
            entries: rank(&scan.totals, limit),
            generated_at_block: latest,
            from_block,
            logs_scanned: scan.logs_scanned,
            logs_skipped: scan.logs_skipped,
        })
    }

    async fn cached(&self, from_block: u64, latest: u64) -> Option<ScanResult> {
        if !self.settings.cache {
            return None;
        }
        let cache = self.cache.read().await;
        cache
            .as_ref()
            .filter(|entry| entry.from_block == from_block && entry.latest == latest)
            .map(|entry| entry.scan.clone())
    }

    async fn store(&self, from_block: u64, latest: u64, scan: &ScanResult) {
        if !self.settings.cache {
            return;
        }
        let mut cache = self.cache.write().await;
        // A slower request may finish after a newer head was cached
        if cache.as_ref().is_some_and(|entry| entry.latest > latest) {
            return;
        }
        *cache = Some(CachedScan {
            from_block,
            latest,
            scan: scan.clone(),
        });
    }
}

/// First block of a window ending at `latest`, clamped at genesis
pub fn window_start(latest: u64, window_size: u64) -> u64 {
    latest.saturating_sub(window_size)
}

/// Keep the most recent `max_logs` entries by position
pub fn cap_logs(mut logs: Vec<RawLog>, max_logs: usize) -> Vec<RawLog> {
    if logs.len() > max_logs {
        let dropped = logs.len() - max_logs;
        warn!(
            total = logs.len(),
            max_logs,
            dropped,
            "Log window exceeds cap, keeping most recent entries"
        );
        logs.drain(..dropped);
    }
    logs
}

/// Fold click events into per-participant maximum totals
pub fn reduce_events<I>(events: I) -> HashMap<Address, U256>
where
    I: IntoIterator<Item = ClickEvent>,
{
    let mut totals: HashMap<Address, U256> = HashMap::new();
    for event in events {
        let total = totals.entry(event.participant).or_insert(U256::ZERO);
        *total = (*total).max(event.cumulative_count);
    }
    totals
}

/// Sort by total descending, address ascending, and keep `limit` rows
pub fn rank(totals: &HashMap<Address, U256>, limit: usize) -> Vec<LeaderboardEntry> {
    let mut entries: Vec<LeaderboardEntry> = totals
        .iter()
        .map(|(user, total)| LeaderboardEntry {
            user: *user,
            total: *total,
        })
        .collect();

    entries.sort_unstable_by(|a, b| b.total.cmp(&a.total).then_with(|| a.user.cmp(&b.user)));
    entries.truncate(limit);
    entries
}

fn reduce_logs(logs: Vec<RawLog>, max_logs: usize) -> ScanResult {
    let retained = cap_logs(logs, max_logs);
    let logs_scanned = retained.len();
    let mut logs_skipped = 0;

    let events: Vec<ClickEvent> = retained
        .iter()
        .filter_map(|log| match decode_click(log) {
            Ok(event) => Some(event),
            Err(e) => {
                logs_skipped += 1;
                warn!(
                    block_number = ?log.block_number,
                    log_index = ?log.log_index,
                    error = %e,
                    "Skipping undecodable log"
                );
                None
            }
        })
        .collect();

    ScanResult {
        totals: reduce_events(events),
        logs_scanned,
        logs_skipped,
    }
}
