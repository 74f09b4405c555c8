//! Rune/UTXO indexer integration.
//!
//! This crate provides:
//! - [`IndexerClient`], an async client for UniSat-compatible indexers that follows the
//!   `start/limit` and `cursor/size` pagination of each endpoint to the end
//! - the typed data model shared with the transaction builder ([`Utxo`], [`RuneId`],
//!   [`RuneBalance`], [`UtxoWithRunes`], [`AvailableUtxo`])
//! - [`UtxoProvider`], the seam the builder fetches through, so it can run against an
//!   in-memory source in tests
//!
//! Lookups degrade to empty results on indexer failure. An empty candidate set makes
//! coin selection fail with a visible funding shortfall rather than silently building
//! from partial data.

pub mod client;
pub mod config;
pub mod error;
pub mod network;
pub mod pagination;
pub mod types;
mod wire;

use async_trait::async_trait;

pub use client::{merge_rune_utxos, IndexerClient};
pub use config::{IndexerConfig, DEFAULT_PAGE_SIZE, DEFAULT_TIMEOUT};
pub use error::IndexerError;
pub use network::{RuneNetwork, UnknownNetwork};
pub use pagination::{collect_pages, Page};
pub use types::{
    AvailableUtxo, ParseRuneIdError, RuneBalance, RuneId, RuneSummary, Utxo, UtxoFilter,
    UtxoWithRunes,
};

/// Source of candidate UTXOs for transaction building.
#[async_trait]
pub trait UtxoProvider: Send + Sync {
    /// All outputs of `address` carrying `rune_id`. Empty when unknown or unreachable.
    async fn rune_utxos(&self, address: &str, rune_id: &RuneId) -> Vec<UtxoWithRunes>;

    /// Plain outputs of `address` usable for fee funding.
    async fn available_utxos(&self, address: &str, include_low_fee: bool) -> Vec<AvailableUtxo>;
}

#[async_trait]
impl UtxoProvider for IndexerClient {
    async fn rune_utxos(&self, address: &str, rune_id: &RuneId) -> Vec<UtxoWithRunes> {
        self.get_rune_utxos(address, rune_id).await
    }

    async fn available_utxos(&self, address: &str, include_low_fee: bool) -> Vec<AvailableUtxo> {
        self.get_available_utxos(address, include_low_fee).await
    }
}
