use runelink_indexer::{RuneNetwork, UtxoFilter};

use crate::constants::DUST_LIMIT;

/// Settings shared by every builder call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuilderConfig {
    /// Addresses must belong to this network.
    pub network: RuneNetwork,
    /// Value of each rune-carrying output of a transfer.
    pub postage: u64,
    /// Which flagged outputs may fund fees.
    pub utxo_filter: UtxoFilter,
}

impl BuilderConfig {
    pub fn new(network: RuneNetwork) -> Self {
        Self {
            network,
            postage: DUST_LIMIT,
            utxo_filter: UtxoFilter::default(),
        }
    }

    pub fn with_postage(mut self, postage: u64) -> Self {
        self.postage = postage;
        self
    }

    pub fn with_utxo_filter(mut self, utxo_filter: UtxoFilter) -> Self {
        self.utxo_filter = utxo_filter;
        self
    }
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self::new(RuneNetwork::default())
    }
}
