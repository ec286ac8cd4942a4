//! Deterministic random number generation seeded from the drand beacon.
//!
//! Randomness of a drand round (or caller-supplied entropy) is expanded with
//! HKDF-SHA256 into a fixed [`Seed`], which drives a reproducible
//! [`DeterministicRng`]. Every run reports a [`ResultInfo`] describing where
//! its seed came from, so the same stream can be produced again later.

pub mod chain;
pub mod client;
pub mod config;
pub mod errors;
pub mod resolver;
pub mod rng;
pub mod seed;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub use chain::{select_round, ChainInfo, LATEST_ROUND};
pub use client::{Beacon, BeaconClient, Connector, HttpBeaconClient, HttpConnector};
pub use config::{Config, Defaults, FetchPolicy, ResolvedConfig};
pub use errors::{DrngError, Result};
pub use resolver::{resolve, Resolution};
pub use rng::DeterministicRng;
pub use seed::{derive, Seed, SeedOverride};

/// Provenance of a generator's seed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultInfo {
    /// drand round the entropy came from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round: Option<u64>,
    /// Publication time of `round`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at: Option<DateTime<Utc>>,
    /// Entropy fed into the KDF
    #[serde(with = "hex::serde")]
    pub seed: Vec<u8>,
    /// Seed derived from the entropy
    pub derived: Seed,
}

impl ResultInfo {
    /// Human readable `(key, value)` pairs, in display order.
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(3);
        if let Some(round) = self.round {
            pairs.push(("Round", round.to_string()));
        }
        if let Some(at) = self.at {
            pairs.push(("Round time", at.to_rfc3339()));
        }
        pairs.push(("Seed", hex::encode(&self.seed)));
        pairs
    }
}

/// Build an RNG from the drand beacon over HTTP.
pub async fn new(config: &Config) -> Result<(DeterministicRng, ResultInfo)> {
    let connector = HttpConnector::new()?;
    new_with_connector(&connector, config).await
}

/// Build an RNG from the drand beacon using `connector` to reach endpoints.
///
/// The whole network phase runs under the configured timeout.
pub async fn new_with_connector<C>(
    connector: &C,
    config: &Config,
) -> Result<(DeterministicRng, ResultInfo)>
where
    C: Connector + ?Sized,
{
    let config = config.populate(&Defaults::standard());
    config.validate()?;

    let deadline = config.timeout;
    tokio::time::timeout(deadline, initialize(connector, &config))
        .await
        .map_err(|_| DrngError::Timeout(deadline))?
}

async fn initialize<C>(
    connector: &C,
    config: &ResolvedConfig,
) -> Result<(DeterministicRng, ResultInfo)>
where
    C: Connector + ?Sized,
{
    let resolution = resolve(connector, &config.urls, &config.chain_hash).await;
    let chain_info = resolution.info().ok_or_else(|| {
        DrngError::Resolution(
            "unable to construct client: no endpoint served valid chain info".to_string(),
        )
    })?;

    let round = select_round(config.round, config.round_at, &chain_info);
    debug!(round, round_at = ?config.round_at, "round selected");
    let beacon = resolution.fetch(round, config.fetch_policy).await?;

    let seed = derive(&beacon.randomness, &config.hkdf_info)?;
    let at = chain_info.time_of_round(beacon.round).ok_or_else(|| {
        DrngError::Fetch(format!("round {} is out of the time range", beacon.round))
    })?;
    info!(round = beacon.round, %at, "RNG seeded from drand");

    Ok((
        DeterministicRng::from_seed(seed),
        ResultInfo {
            round: Some(beacon.round),
            at: Some(at),
            seed: beacon.randomness,
            derived: seed,
        },
    ))
}

/// Build an RNG from caller-supplied entropy, bypassing the beacon.
pub fn from_seed(entropy: &[u8], hkdf_info: &[u8]) -> Result<(DeterministicRng, ResultInfo)> {
    let seed = derive(entropy, hkdf_info)?;
    Ok((
        DeterministicRng::from_seed(seed),
        ResultInfo {
            round: None,
            at: None,
            seed: entropy.to_vec(),
            derived: seed,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::tests::{mainnet_info, MAINNET_GENESIS};
    use crate::client::MockConnector;
    use crate::resolver::tests::FakeClient;
    use std::sync::Arc;
    use std::time::Duration;

    fn connector_serving(info: Arc<ChainInfo>) -> MockConnector {
        let mut connector = MockConnector::new();
        let connect_info = info.clone();
        connector.expect_connect().returning(move |url, _| {
            Ok(Box::new(FakeClient::new(url, connect_info.clone())) as Box<dyn BeaconClient>)
        });
        connector
            .expect_with_info()
            .returning(|url, info| {
                Ok(Box::new(FakeClient::new(url, info)) as Box<dyn BeaconClient>)
            });
        connector
    }

    fn config(info: &ChainInfo) -> Config {
        Config::new()
            .with_urls(["A", "B"])
            .with_chain_hash(info.hash.clone())
    }

    #[tokio::test]
    async fn test_new_with_explicit_round() {
        let info = Arc::new(mainnet_info());
        let connector = connector_serving(info.clone());

        let (mut rng, result) = new_with_connector(&connector, &config(&info).with_round(3))
            .await
            .unwrap();

        assert_eq!(result.round, Some(3));
        assert_eq!(
            result.at,
            DateTime::from_timestamp(MAINNET_GENESIS + 60, 0)
        );
        // FakeClient answers with its url as randomness
        assert_eq!(result.seed, b"A".to_vec());
        assert_eq!(result.derived, derive(b"A", b"drng seed v1").unwrap());

        let (mut expected, _) = from_seed(b"A", b"drng seed v1").unwrap();
        assert_eq!(rng.random_float(), expected.random_float());
    }

    #[tokio::test]
    async fn test_new_latest_round_is_captured() {
        let info = Arc::new(mainnet_info());
        let connector = connector_serving(info.clone());

        let (_, result) = new_with_connector(&connector, &config(&info)).await.unwrap();

        assert_eq!(result.round, Some(1000));
        assert_eq!(result.at, info.time_of_round(1000));
    }

    #[tokio::test]
    async fn test_new_with_round_at() {
        let info = Arc::new(mainnet_info());
        let connector = connector_serving(info.clone());
        let target = DateTime::from_timestamp(MAINNET_GENESIS + 30, 0).unwrap();

        let (_, result) = new_with_connector(&connector, &config(&info).with_round_at(target))
            .await
            .unwrap();

        assert_eq!(result.round, Some(2));
    }

    #[tokio::test]
    async fn test_new_fails_when_no_endpoint_resolves() {
        let mut connector = MockConnector::new();
        connector
            .expect_connect()
            .returning(|url, _| Err(DrngError::Http(format!("{} unreachable", url))));

        let err = new_with_connector(&connector, &Config::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DrngError::Resolution(_)));
    }

    #[tokio::test]
    async fn test_new_rejects_invalid_config_before_network() {
        let mut connector = MockConnector::new();
        connector.expect_connect().times(0);

        let config = Config::new().with_timeout(Duration::ZERO);
        let err = new_with_connector(&connector, &config).await.unwrap_err();
        assert!(err.is_config());
    }

    struct StalledConnector;

    #[async_trait::async_trait]
    impl Connector for StalledConnector {
        async fn connect(&self, _url: &str, _trust_hash: &[u8]) -> Result<Box<dyn BeaconClient>> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(DrngError::Http("unreachable".to_string()))
        }

        async fn with_info(
            &self,
            _url: &str,
            _info: Arc<ChainInfo>,
        ) -> Result<Box<dyn BeaconClient>> {
            Err(DrngError::Http("unreachable".to_string()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_covers_whole_initialization() {
        let config = Config::new().with_timeout(Duration::from_secs(5));
        let err = new_with_connector(&StalledConnector, &config)
            .await
            .unwrap_err();
        assert!(matches!(err, DrngError::Timeout(d) if d == Duration::from_secs(5)));
    }

    #[test]
    fn test_from_seed_result_info() {
        let (_, result) = from_seed(b"passphrase", b"drng seed v1").unwrap();
        assert_eq!(result.round, None);
        assert_eq!(result.at, None);
        assert_eq!(
            result.pairs(),
            vec![("Seed", hex::encode(b"passphrase"))]
        );
    }

    #[test]
    fn test_result_info_pairs() {
        let result = ResultInfo {
            round: Some(2),
            at: DateTime::from_timestamp(MAINNET_GENESIS + 30, 0),
            seed: vec![0xab, 0xcd],
            derived: Seed::from_words([1, 2, 3]),
        };
        assert_eq!(
            result.pairs(),
            vec![
                ("Round", "2".to_string()),
                ("Round time", "2020-07-22T15:18:00+00:00".to_string()),
                ("Seed", "abcd".to_string()),
            ]
        );
    }
}
