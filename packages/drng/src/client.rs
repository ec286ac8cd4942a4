use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::chain::{ChainInfo, LATEST_ROUND};
use crate::errors::{DrngError, Result};

/// Randomness published for one round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Beacon {
    pub round: u64,
    pub randomness: Vec<u8>,
}

/// A drand endpoint whose chain info has been validated.
#[async_trait]
pub trait BeaconClient: Send + Sync {
    /// Base URL of the endpoint
    fn url(&self) -> &str;

    /// Chain parameters this client works with
    fn info(&self) -> Arc<ChainInfo>;

    /// Randomness of `round`, or of the latest round for [`LATEST_ROUND`]
    async fn get(&self, round: u64) -> Result<Beacon>;

    /// Round published at `at` on this client's chain
    fn round_at(&self, at: DateTime<Utc>) -> u64 {
        self.info().round_at(at)
    }
}

/// Builds [`BeaconClient`]s for endpoint URLs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Connector: Send + Sync {
    /// Fetch chain info from `url` and check it against `trust_hash`.
    async fn connect(&self, url: &str, trust_hash: &[u8]) -> Result<Box<dyn BeaconClient>>;

    /// Build a client for `url` that reuses already validated chain info.
    async fn with_info(&self, url: &str, info: Arc<ChainInfo>) -> Result<Box<dyn BeaconClient>>;
}

/// Chain info as served by `GET /{hash}/info`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainInfoResponse {
    pub public_key: String,
    pub period: u64,
    pub genesis_time: i64,
    pub hash: String,
    #[serde(rename = "groupHash", default, skip_serializing_if = "Option::is_none")]
    pub group_hash: Option<String>,
    #[serde(rename = "schemeID", default, skip_serializing_if = "Option::is_none")]
    pub scheme_id: Option<String>,
}

impl TryFrom<ChainInfoResponse> for ChainInfo {
    type Error = DrngError;

    fn try_from(response: ChainInfoResponse) -> Result<Self> {
        Ok(ChainInfo {
            period: Duration::from_secs(response.period),
            genesis_time: response.genesis_time,
            hash: hex::decode(&response.hash)
                .map_err(|e| DrngError::Parse(format!("Failed to decode chain hash: {}", e)))?,
            public_key: hex::decode(&response.public_key)
                .map_err(|e| DrngError::Parse(format!("Failed to decode public key: {}", e)))?,
            scheme_id: response.scheme_id,
        })
    }
}

/// A round as served by `GET /{hash}/public/{round}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrandRound {
    pub round: u64,
    pub randomness: String,
    pub signature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_signature: Option<String>,
}

impl DrandRound {
    /// Decode the round, checking it answers a request for `requested`.
    pub fn into_beacon(self, requested: u64) -> Result<Beacon> {
        if requested != LATEST_ROUND && self.round != requested {
            return Err(DrngError::Fetch(format!(
                "requested round {} but endpoint returned round {}",
                requested, self.round
            )));
        }

        let randomness = hex::decode(&self.randomness).map_err(|e| {
            DrngError::Parse(format!("Failed to decode drand randomness hex: {}", e))
        })?;
        if randomness.is_empty() {
            return Err(DrngError::Fetch(format!(
                "round {} has empty randomness",
                self.round
            )));
        }

        Ok(Beacon {
            round: self.round,
            randomness,
        })
    }
}

/// Parse an endpoint URL, dropping trailing slashes.
pub fn normalize_url(url: &str) -> Result<String> {
    let trimmed = url.trim().trim_end_matches('/');
    let parsed = Url::parse(trimmed)?;
    match parsed.scheme() {
        "http" | "https" => Ok(trimmed.to_string()),
        scheme => Err(DrngError::InvalidInput(format!(
            "Unsupported URL scheme '{}' in {}",
            scheme, url
        ))),
    }
}

/// drand HTTP API client
#[derive(Debug, Clone)]
pub struct HttpBeaconClient {
    http: reqwest::Client,
    url: String,
    info: Arc<ChainInfo>,
}

impl HttpBeaconClient {
    fn round_url(&self, round: u64) -> String {
        let chain_hash = hex::encode(&self.info.hash);
        if round == LATEST_ROUND {
            format!("{}/{}/public/latest", self.url, chain_hash)
        } else {
            format!("{}/{}/public/{}", self.url, chain_hash, round)
        }
    }
}

#[async_trait]
impl BeaconClient for HttpBeaconClient {
    fn url(&self) -> &str {
        &self.url
    }

    fn info(&self) -> Arc<ChainInfo> {
        self.info.clone()
    }

    async fn get(&self, round: u64) -> Result<Beacon> {
        let url = self.round_url(round);
        debug!(%url, round, "fetching drand round");

        let drand_round: DrandRound = self
            .http
            .get(&url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| DrngError::Fetch(format!("Failed to fetch drand round {}: {}", round, e)))?
            .json()
            .await
            .map_err(|e| DrngError::Parse(format!("Failed to parse drand response: {}", e)))?;

        drand_round.into_beacon(round)
    }
}

/// Builds [`HttpBeaconClient`]s sharing one connection pool.
#[derive(Debug, Clone, Default)]
pub struct HttpConnector {
    http: reqwest::Client,
}

impl HttpConnector {
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("drng/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http })
    }

    async fn fetch_info(&self, url: &str, trust_hash: &[u8]) -> Result<ChainInfo> {
        let info_url = format!("{}/{}/info", url, hex::encode(trust_hash));
        debug!(url = %info_url, "fetching chain info");

        let response: ChainInfoResponse = self
            .http
            .get(&info_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .map_err(|e| DrngError::Parse(format!("Failed to parse chain info: {}", e)))?;

        ChainInfo::try_from(response)
    }
}

#[async_trait]
impl Connector for HttpConnector {
    async fn connect(&self, url: &str, trust_hash: &[u8]) -> Result<Box<dyn BeaconClient>> {
        let url = normalize_url(url)?;
        let info = self.fetch_info(&url, trust_hash).await?;
        info.verify(trust_hash)?;

        Ok(Box::new(HttpBeaconClient {
            http: self.http.clone(),
            url,
            info: Arc::new(info),
        }))
    }

    async fn with_info(&self, url: &str, info: Arc<ChainInfo>) -> Result<Box<dyn BeaconClient>> {
        let url = normalize_url(url)?;
        Ok(Box::new(HttpBeaconClient {
            http: self.http.clone(),
            url,
            info,
        }))
    }
}
