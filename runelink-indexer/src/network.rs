use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bitcoin network a call is made against.
///
/// The network picks both the indexer base URL and the address rules used when
/// turning caller-supplied addresses into output scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuneNetwork {
    #[default]
    Mainnet,
    Testnet,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown network: {0}")]
pub struct UnknownNetwork(pub String);

impl RuneNetwork {
    /// Default UniSat open-api endpoint for this network.
    pub fn indexer_url(&self) -> &'static str {
        match self {
            RuneNetwork::Mainnet => "https://open-api.unisat.io",
            RuneNetwork::Testnet => "https://open-api-testnet.unisat.io",
        }
    }

    pub fn to_bitcoin_network(&self) -> bitcoin::Network {
        match self {
            RuneNetwork::Mainnet => bitcoin::Network::Bitcoin,
            RuneNetwork::Testnet => bitcoin::Network::Testnet,
        }
    }
}

impl FromStr for RuneNetwork {
    type Err = UnknownNetwork;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" | "main" | "bitcoin" => Ok(RuneNetwork::Mainnet),
            "testnet" | "test" => Ok(RuneNetwork::Testnet),
            _ => Err(UnknownNetwork(s.to_string())),
        }
    }
}

impl fmt::Display for RuneNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuneNetwork::Mainnet => write!(f, "mainnet"),
            RuneNetwork::Testnet => write!(f, "testnet"),
        }
    }
}
