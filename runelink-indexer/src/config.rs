use std::{fmt, time::Duration};

use crate::network::RuneNetwork;

pub const DEFAULT_PAGE_SIZE: u32 = 100;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for [`crate::IndexerClient`].
#[derive(Clone)]
pub struct IndexerConfig {
    pub network: RuneNetwork,
    pub base_url: String,
    /// Sent as a bearer token on every request.
    pub api_key: Option<String>,
    /// Per-request timeout. A timed-out call is treated like an unreachable indexer.
    pub timeout: Duration,
    pub page_size: u32,
}

impl IndexerConfig {
    pub fn new(network: RuneNetwork) -> Self {
        Self {
            network,
            base_url: network.indexer_url().to_string(),
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn mainnet() -> Self {
        Self::new(RuneNetwork::Mainnet)
    }

    pub fn testnet() -> Self {
        Self::new(RuneNetwork::Testnet)
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Points the client at a self-hosted or mocked indexer.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self::mainnet()
    }
}

impl fmt::Debug for IndexerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexerConfig")
            .field("network", &self.network)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("page_size", &self.page_size)
            .finish()
    }
}
