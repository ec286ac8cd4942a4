//! Endpoint fallback resolution
//!
//! Walks the configured endpoints in order. Until one of them serves valid
//! chain info, every endpoint is asked to fetch and validate the info itself;
//! endpoints that fail at that point are set aside. Once info is known it is
//! cached and every later endpoint, followed by the set-aside ones, is built
//! from the cached info without another fetch.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::chain::ChainInfo;
use crate::client::{Beacon, BeaconClient, Connector};
use crate::config::FetchPolicy;
use crate::errors::{DrngError, Result};

enum Phase {
    /// No endpoint has produced valid chain info yet
    Probing { skipped: Vec<String> },
    /// Chain info is cached; `skipped` still waits for a retry
    InfoAvailable {
        info: Arc<ChainInfo>,
        skipped: Vec<String>,
    },
}

/// Usable clients, in preference order.
pub struct Resolution {
    clients: Vec<Box<dyn BeaconClient>>,
    info: Option<Arc<ChainInfo>>,
}

/// Build clients for `urls`, validated against `trust_hash`.
///
/// A failing endpoint never aborts resolution; the result is empty only if
/// no endpoint served valid chain info.
pub async fn resolve<C>(connector: &C, urls: &[String], trust_hash: &[u8]) -> Resolution
where
    C: Connector + ?Sized,
{
    let mut clients: Vec<Box<dyn BeaconClient>> = Vec::with_capacity(urls.len());
    let mut phase = Phase::Probing {
        skipped: Vec::new(),
    };

    for url in urls {
        phase = match phase {
            Phase::Probing { mut skipped } => match connector.connect(url, trust_hash).await {
                Ok(client) => {
                    info!(%url, "chain info fetched and validated");
                    let info = client.info();
                    clients.push(client);
                    Phase::InfoAvailable { info, skipped }
                }
                Err(e) => {
                    warn!(%url, error = %e, "endpoint failed, deferring it");
                    skipped.push(url.clone());
                    Phase::Probing { skipped }
                }
            },
            Phase::InfoAvailable { info, skipped } => {
                push_with_info(connector, url, &info, &mut clients).await;
                Phase::InfoAvailable { info, skipped }
            }
        };
    }

    match phase {
        Phase::Probing { skipped } => {
            warn!(
                endpoints = skipped.len(),
                "no endpoint served valid chain info"
            );
            Resolution {
                clients,
                info: None,
            }
        }
        Phase::InfoAvailable { info, skipped } => {
            for url in &skipped {
                push_with_info(connector, url, &info, &mut clients).await;
            }
            debug!(clients = clients.len(), "endpoint resolution finished");
            Resolution {
                clients,
                info: Some(info),
            }
        }
    }
}

async fn push_with_info<C>(
    connector: &C,
    url: &str,
    info: &Arc<ChainInfo>,
    clients: &mut Vec<Box<dyn BeaconClient>>,
) where
    C: Connector + ?Sized,
{
    match connector.with_info(url, info.clone()).await {
        Ok(client) => clients.push(client),
        Err(e) => warn!(%url, error = %e, "dropping endpoint"),
    }
}

impl Resolution {
    pub fn clients(&self) -> &[Box<dyn BeaconClient>] {
        &self.clients
    }

    /// Chain info shared by every resolved client.
    pub fn info(&self) -> Option<Arc<ChainInfo>> {
        self.info.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Urls of the resolved clients, in order.
    pub fn urls(&self) -> Vec<&str> {
        self.clients.iter().map(|c| c.url()).collect()
    }

    /// Fetch the randomness of `round`.
    ///
    /// With [`FetchPolicy::FirstClient`] only the first client is asked; with
    /// [`FetchPolicy::Fallback`] the remaining clients are tried in order.
    pub async fn fetch(&self, round: u64, policy: FetchPolicy) -> Result<Beacon> {
        let mut clients = self.clients.iter();
        let first = clients.next().ok_or_else(|| {
            DrngError::Resolution("unable to construct client: no usable endpoint".to_string())
        })?;

        let mut last_error = match first.get(round).await {
            Ok(beacon) => return Ok(beacon),
            Err(e) => e,
        };

        if policy == FetchPolicy::Fallback {
            for client in clients {
                warn!(url = client.url(), error = %last_error, "retrying fetch on next endpoint");
                match client.get(round).await {
                    Ok(beacon) => return Ok(beacon),
                    Err(e) => last_error = e,
                }
            }
        }

        Err(DrngError::Fetch(format!("drand request failed: {}", last_error)))
    }
}
