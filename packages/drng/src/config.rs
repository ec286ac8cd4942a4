use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{DrngError, Result};

/// Chain hash of the drand quicknet chain.
const DEFAULT_CHAIN_HASH: [u8; 32] = [
    0x52, 0xdb, 0x9b, 0xa7, 0x0e, 0x0c, 0xc0, 0xf6, 0xea, 0xf7, 0x80, 0x3d, 0xd0, 0x74, 0x47, 0xa1,
    0xf5, 0x47, 0x77, 0x35, 0xfd, 0x3f, 0x66, 0x17, 0x92, 0xba, 0x94, 0x60, 0x0c, 0x84, 0xe9, 0x71,
];

const DEFAULT_URLS: [&str; 2] = ["https://api.drand.sh", "https://drand.cloudflare.com"];

const DEFAULT_HKDF_INFO: &[u8] = b"drng seed v1";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// What to do when the randomness fetch on the first resolved client fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchPolicy {
    /// Fetch from the first resolved client only; its failure is final
    #[default]
    FirstClient,
    /// Move on to the next resolved client until one succeeds
    Fallback,
}

/// Values used for every option a [`Config`] leaves unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Defaults {
    pub urls: Vec<String>,
    pub chain_hash: Vec<u8>,
    pub hkdf_info: Vec<u8>,
    pub timeout: Duration,
}

impl Defaults {
    pub fn standard() -> Self {
        Self {
            urls: DEFAULT_URLS.iter().map(|u| u.to_string()).collect(),
            chain_hash: DEFAULT_CHAIN_HASH.to_vec(),
            hkdf_info: DEFAULT_HKDF_INFO.to_vec(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl Default for Defaults {
    fn default() -> Self {
        Self::standard()
    }
}

/// Options for initializing an RNG from the drand beacon.
///
/// Every field may be left unset; [`Config::populate`] fills the gaps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Specific round to use. `None` and `Some(0)` both mean "not set"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round: Option<u64>,

    /// Use the round published at this time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round_at: Option<DateTime<Utc>>,

    /// drand HTTP API endpoints, in order of preference
    #[serde(default)]
    pub urls: Vec<String>,

    /// Trust root of the chain
    #[serde(default, with = "hex_bytes", skip_serializing_if = "Option::is_none")]
    pub chain_hash: Option<Vec<u8>>,

    /// Domain separation label handed to the KDF
    #[serde(default, with = "hex_bytes", skip_serializing_if = "Option::is_none")]
    pub hkdf_info: Option<Vec<u8>>,

    /// Deadline for the whole network phase
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,

    #[serde(default)]
    pub fetch_policy: FetchPolicy,
}

/// A [`Config`] with every option set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub round: u64,
    pub round_at: Option<DateTime<Utc>>,
    pub urls: Vec<String>,
    pub chain_hash: Vec<u8>,
    pub hkdf_info: Vec<u8>,
    pub timeout: Duration,
    pub fetch_policy: FetchPolicy,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_round(mut self, round: u64) -> Self {
        self.round = Some(round);
        self
    }

    pub fn with_round_at(mut self, at: DateTime<Utc>) -> Self {
        self.round_at = Some(at);
        self
    }

    pub fn with_urls<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.urls = urls.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_chain_hash(mut self, chain_hash: impl Into<Vec<u8>>) -> Self {
        self.chain_hash = Some(chain_hash.into());
        self
    }

    pub fn with_hkdf_info(mut self, info: impl Into<Vec<u8>>) -> Self {
        self.hkdf_info = Some(info.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_fetch_policy(mut self, policy: FetchPolicy) -> Self {
        self.fetch_policy = policy;
        self
    }

    /// Load Config from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| DrngError::Config(format!("Failed to parse Config JSON: {}", e)))
    }

    /// Produce a fully populated copy, taking unset options from `defaults`.
    pub fn populate(&self, defaults: &Defaults) -> ResolvedConfig {
        let urls = if self.urls.is_empty() {
            defaults.urls.clone()
        } else {
            self.urls.clone()
        };

        ResolvedConfig {
            round: self.round.unwrap_or(0),
            round_at: self.round_at,
            urls,
            chain_hash: self
                .chain_hash
                .clone()
                .unwrap_or_else(|| defaults.chain_hash.clone()),
            hkdf_info: self
                .hkdf_info
                .clone()
                .unwrap_or_else(|| defaults.hkdf_info.clone()),
            timeout: self.timeout.unwrap_or(defaults.timeout),
            fetch_policy: self.fetch_policy,
        }
    }
}

impl ResolvedConfig {
    /// Check the populated options for logical consistency.
    pub fn validate(&self) -> Result<()> {
        if let Some(i) = self.urls.iter().position(|u| u.trim().is_empty()) {
            return Err(DrngError::Config(format!("URL at index {} is empty", i)));
        }
        if self.chain_hash.is_empty() {
            return Err(DrngError::Config("chain hash is empty".to_string()));
        }
        if self.timeout.is_zero() {
            return Err(DrngError::Config("timeout must be positive".to_string()));
        }
        Ok(())
    }
}

/// Hex (de)serialization for optional byte strings.
mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => s.serialize_str(&hex::encode(bytes)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
        Option::<String>::deserialize(d)?
            .map(|s| {
                hex::decode(s.trim_start_matches("0x"))
                    .map_err(<D::Error as serde::de::Error>::custom)
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_chain_hash() {
        assert_eq!(
            hex::encode(Defaults::standard().chain_hash),
            "52db9ba70e0cc0f6eaf7803dd07447a1f5477735fd3f661792ba94600c84e971"
        );
    }

    #[test]
    fn test_populate_fills_unset_fields() {
        let config = Config::new();
        let resolved = config.populate(&Defaults::standard());

        assert_eq!(resolved.round, 0);
        assert_eq!(resolved.round_at, None);
        assert_eq!(
            resolved.urls,
            vec!["https://api.drand.sh", "https://drand.cloudflare.com"]
        );
        assert_eq!(resolved.hkdf_info, b"drng seed v1".to_vec());
        assert_eq!(resolved.timeout, Duration::from_secs(10));
        assert_eq!(resolved.fetch_policy, FetchPolicy::FirstClient);
        assert!(resolved.validate().is_ok());
    }

    #[test]
    fn test_populate_does_not_mutate_caller_config() {
        let config = Config::new().with_round(42);
        let before = config.clone();
        let resolved = config.populate(&Defaults::standard());

        assert_eq!(config, before);
        assert!(config.urls.is_empty());
        assert_eq!(config.chain_hash, None);
        assert_eq!(resolved.round, 42);
    }

    #[test]
    fn test_populate_keeps_explicit_values() {
        let config = Config::new()
            .with_urls(["http://localhost:8080"])
            .with_chain_hash(vec![1, 2, 3])
            .with_hkdf_info(Vec::new())
            .with_timeout(Duration::from_secs(3))
            .with_fetch_policy(FetchPolicy::Fallback);
        let resolved = config.populate(&Defaults::standard());

        assert_eq!(resolved.urls, vec!["http://localhost:8080"]);
        assert_eq!(resolved.chain_hash, vec![1, 2, 3]);
        // an explicitly empty label is not replaced
        assert!(resolved.hkdf_info.is_empty());
        assert_eq!(resolved.timeout, Duration::from_secs(3));
        assert_eq!(resolved.fetch_policy, FetchPolicy::Fallback);
    }

    #[test]
    fn test_validation() {
        let defaults = Defaults::standard();

        let empty_url = Config::new().with_urls(["https://api.drand.sh", " "]);
        assert!(empty_url.populate(&defaults).validate().is_err());

        let empty_hash = Config::new().with_chain_hash(Vec::new());
        assert!(empty_hash.populate(&defaults).validate().is_err());

        let zero_timeout = Config::new().with_timeout(Duration::ZERO);
        assert!(zero_timeout.populate(&defaults).validate().is_err());
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "round": 1000,
            "urls": ["https://api.drand.sh"],
            "chain_hash": "8990e7a9aaed2ffed73dbd7092123d6f289930540d7651336225dc172e51b2ce",
            "hkdf_info": "0x6162",
            "fetch_policy": "fallback"
        }"#;

        let config = Config::from_json(json).unwrap();
        assert_eq!(config.round, Some(1000));
        assert_eq!(config.urls, vec!["https://api.drand.sh"]);
        assert_eq!(config.chain_hash.as_ref().map(Vec::len), Some(32));
        assert_eq!(config.hkdf_info, Some(b"ab".to_vec()));
        assert_eq!(config.fetch_policy, FetchPolicy::Fallback);

        assert!(Config::from_json(r#"{"chain_hash": "zz"}"#).is_err());
    }
}
