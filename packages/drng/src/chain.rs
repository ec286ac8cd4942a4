use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{DrngError, Result};

/// Round number meaning "most recently published round".
pub const LATEST_ROUND: u64 = 0;

/// Parameters of a drand chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainInfo {
    /// Time between two rounds
    pub period: Duration,
    /// Unix time (seconds) of round 1
    pub genesis_time: i64,
    /// Chain hash, the trust root
    pub hash: Vec<u8>,
    pub public_key: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme_id: Option<String>,
}

impl ChainInfo {
    /// Reject info that does not belong to the chain identified by `trust_hash`.
    pub fn verify(&self, trust_hash: &[u8]) -> Result<()> {
        if self.hash != trust_hash {
            return Err(DrngError::Resolution(format!(
                "chain hash mismatch: expected {}, endpoint serves {}",
                hex::encode(trust_hash),
                hex::encode(&self.hash)
            )));
        }
        if self.period.as_secs() == 0 {
            return Err(DrngError::Resolution("chain period is zero".to_string()));
        }
        Ok(())
    }

    /// Round whose time window contains `at`.
    ///
    /// Round 1 covers `[genesis, genesis + period)`; anything before genesis
    /// maps to round 1.
    // https://docs.drand.love/docs/specification/#randomness-generation-period
    pub fn round_at(&self, at: DateTime<Utc>) -> u64 {
        let timestamp = at.timestamp();
        let period = self.period.as_secs();
        if timestamp < self.genesis_time || period == 0 {
            return 1;
        }

        let since_genesis = (timestamp - self.genesis_time) as u64;
        since_genesis / period + 1
    }

    /// Publication time of `round`. Round 0 maps to genesis.
    pub fn time_of_round(&self, round: u64) -> Option<DateTime<Utc>> {
        let offset = round
            .saturating_sub(1)
            .checked_mul(self.period.as_secs())
            .and_then(|secs| i64::try_from(secs).ok())?;
        let secs = self.genesis_time.checked_add(offset)?;
        DateTime::from_timestamp(secs, 0)
    }
}

/// Pick the round to fetch.
///
/// An explicit nonzero round wins, then a target time, and otherwise the
/// latest round is requested.
pub fn select_round(round: u64, round_at: Option<DateTime<Utc>>, info: &ChainInfo) -> u64 {
    if round != LATEST_ROUND {
        return round;
    }
    match round_at {
        Some(at) => info.round_at(at),
        None => LATEST_ROUND,
    }
}
