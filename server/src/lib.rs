//! Tap Service
//!
//! Rebuilds the tap leaderboard from on-chain `Clicked` logs and relays
//! sponsored taps signed by a service-held key.

pub mod client;
pub mod config;
pub mod error;
pub mod health;
pub mod leaderboard;
pub mod service;
pub mod sponsor;
pub mod types;


pub use client::{ChainClient, TapClient};
pub use config::ServiceConfig;
pub use error::{ServiceError, ServiceResult};
pub use health::{HealthServer, HealthState};
pub use leaderboard::{AggregatorSettings, LogAggregator};
pub use service::{ApiServer, AppState};
pub use sponsor::SponsorRelay;
pub use types::*;
