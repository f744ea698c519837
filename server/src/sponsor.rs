//! Sponsored tap relay
//!
//! Submits `tapFor(user)` signed by the service key and hands back the
//! transaction hash without waiting for inclusion. Failed submissions are
//! reported as-is and never retried, so a caller never has to guess whether
//! a tap went out twice.

use alloy_primitives::{Address, B256};
use tracing::{info, warn};

use crate::client::TapClient;
use crate::error::{ServiceError, ServiceResult};

/// Relays taps paid for by the sponsor key
pub struct SponsorRelay {
    /// Contract bound to the signing client; None when no key is configured
    signer: Option<TapClient>,
}

impl SponsorRelay {
    pub fn new(signer: Option<TapClient>) -> Self {
        Self { signer }
    }

    /// Relay that rejects every request
    pub fn disabled() -> Self {
        Self { signer: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.signer.is_some()
    }

    /// Submit a sponsored tap for `participant`
    ///
    /// Without a signing key every call fails with `SponsorshipDisabled`,
    /// whatever the input.
    pub async fn sponsor(&self, participant: &str) -> ServiceResult<(Address, B256)> {
        let Some(tap) = &self.signer else {
            return Err(ServiceError::SponsorshipDisabled);
        };

        let user = parse_participant(participant)?;

        match tap.tap_for(user).await {
            Ok(tx_hash) => {
                info!(user = %user, tx_hash = %tx_hash, "Sponsored tap submitted");
                Ok((user, tx_hash))
            }
            Err(e) => {
                warn!(user = %user, error = %e, "Sponsored tap submission failed");
                Err(e.into())
            }
        }
    }
}

/// Parse a participant address
///
/// Accepts 40 hex digits with an optional lowercase `0x` prefix and no
/// surrounding whitespace. All-lowercase and all-uppercase input is taken as
/// is; mixed case must carry a valid EIP-55 checksum.
pub fn parse_participant(input: &str) -> ServiceResult<Address> {
    let invalid = || ServiceError::InvalidArgument("Invalid user".to_string());

    let digits = input.strip_prefix("0x").unwrap_or(input);

    if digits.len() != 40 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());

    if has_lower && has_upper {
        Address::parse_checksummed(format!("0x{digits}"), None).map_err(|_| invalid())
    } else {
        digits.parse::<Address>().map_err(|_| invalid())
    }
}
