//! Async client for a UniSat-compatible rune/UTXO indexer.
//!
//! Every lookup comes in two flavours:
//! - `try_*` returns the [`IndexerError`] so the caller can inspect it;
//! - the plain variant logs the failure and returns an empty list. Downstream coin
//!   selection then fails with a funding shortfall instead of working from partial data.

use std::collections::HashMap;

use bitcoin::OutPoint;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::{
    config::IndexerConfig,
    error::IndexerError,
    pagination::{collect_pages, Page},
    types::{AvailableUtxo, RuneId, RuneSummary, UtxoWithRunes},
    wire::{AvailableUtxoPage, Envelope, RuneBalanceList, RuneUtxoPage},
};

/// IndexerClient turns the indexer REST API into typed, fully paginated result sets.
#[derive(Clone)]
pub struct IndexerClient {
    config: IndexerConfig,
    client: reqwest::Client,
}

impl IndexerClient {
    /// Create a client for the given configuration.
    pub fn new(config: IndexerConfig) -> Result<Self, IndexerError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| IndexerError::Configuration(e.to_string()))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    /// Distinct runes held by `address`, in a single request.
    pub async fn try_get_rune_balances(
        &self,
        address: &str,
    ) -> Result<Vec<RuneSummary>, IndexerError> {
        let path = format!("/v1/indexer/address/{}/runes/balance-list", address);
        let list: RuneBalanceList = self
            .get(
                &path,
                &[
                    ("start", "0".to_string()),
                    ("limit", self.config.page_size.to_string()),
                ],
            )
            .await?;

        if list.total > list.detail.len() as u64 {
            warn!(
                address,
                total = list.total,
                received = list.detail.len(),
                "rune balance list truncated"
            );
        }

        Ok(list.detail.into_iter().map(RuneSummary::from).collect())
    }

    pub async fn get_rune_balances(&self, address: &str) -> Vec<RuneSummary> {
        self.try_get_rune_balances(address)
            .await
            .unwrap_or_else(|err| degrade("rune balances", address, err))
    }

    /// Every UTXO of `address` holding `rune_id`, across all pages.
    pub async fn try_get_rune_utxos(
        &self,
        address: &str,
        rune_id: &RuneId,
    ) -> Result<Vec<UtxoWithRunes>, IndexerError> {
        let path = format!("/v1/indexer/address/{}/runes/{}/utxo", address, rune_id);

        let wire = collect_pages(self.config.page_size, |offset, limit| {
            let path = path.clone();
            async move {
                let page: RuneUtxoPage = self
                    .get(
                        &path,
                        &[("start", offset.to_string()), ("limit", limit.to_string())],
                    )
                    .await?;

                Ok::<_, IndexerError>(Page {
                    items: page.utxo,
                    total: page.total,
                })
            }
        })
        .await?;

        wire.into_iter().map(UtxoWithRunes::try_from).collect()
    }

    pub async fn get_rune_utxos(&self, address: &str, rune_id: &RuneId) -> Vec<UtxoWithRunes> {
        self.try_get_rune_utxos(address, rune_id)
            .await
            .unwrap_or_else(|err| degrade("rune utxos", address, err))
    }

    /// Every rune-bearing UTXO of `address`, one entry per outpoint.
    ///
    /// A UTXO holding several runes is returned by each per-rune query; here it appears
    /// once with all of its balances. Order follows first appearance.
    pub async fn try_get_all_rune_utxos(
        &self,
        address: &str,
    ) -> Result<Vec<UtxoWithRunes>, IndexerError> {
        let balances = self.try_get_rune_balances(address).await?;

        let mut per_rune = Vec::with_capacity(balances.len());
        for balance in &balances {
            per_rune.push(self.try_get_rune_utxos(address, &balance.rune_id).await?);
        }

        Ok(merge_rune_utxos(per_rune))
    }

    pub async fn get_all_rune_utxos(&self, address: &str) -> Vec<UtxoWithRunes> {
        self.try_get_all_rune_utxos(address)
            .await
            .unwrap_or_else(|err| degrade("all rune utxos", address, err))
    }

    /// Plain spendable outputs of `address`, across all pages.
    pub async fn try_get_available_utxos(
        &self,
        address: &str,
        include_low_fee: bool,
    ) -> Result<Vec<AvailableUtxo>, IndexerError> {
        let path = format!("/v1/indexer/address/{}/available-utxo-data", address);

        let wire = collect_pages(self.config.page_size, |cursor, size| {
            let path = path.clone();
            async move {
                let page: AvailableUtxoPage = self
                    .get(
                        &path,
                        &[
                            ("cursor", cursor.to_string()),
                            ("size", size.to_string()),
                            ("withLowFee", include_low_fee.to_string()),
                        ],
                    )
                    .await?;

                Ok::<_, IndexerError>(Page {
                    items: page.utxo,
                    total: page.total,
                })
            }
        })
        .await?;

        wire.into_iter().map(AvailableUtxo::try_from).collect()
    }

    pub async fn get_available_utxos(
        &self,
        address: &str,
        include_low_fee: bool,
    ) -> Vec<AvailableUtxo> {
        self.try_get_available_utxos(address, include_low_fee)
            .await
            .unwrap_or_else(|err| degrade("available utxos", address, err))
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, IndexerError> {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);
        debug!(%url, ?query, "indexer request");

        let mut request = self.client.get(&url).query(query);
        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(IndexerError::HttpStatus { status, body });
        }

        let body = response.text().await?;

        let envelope: Envelope<T> = serde_json::from_str(&body)?;
        envelope.into_data()
    }
}

fn degrade<T>(what: &str, address: &str, err: IndexerError) -> Vec<T> {
    warn!(
        address,
        error = %err,
        unavailable = err.is_unavailable(),
        "indexer lookup for {} failed, treating as empty",
        what
    );
    Vec::new()
}

/// Merges per-rune result sets by outpoint, keeping first-seen order.
pub fn merge_rune_utxos(per_rune: Vec<Vec<UtxoWithRunes>>) -> Vec<UtxoWithRunes> {
    let mut merged: Vec<UtxoWithRunes> = Vec::new();
    let mut positions: HashMap<OutPoint, usize> = HashMap::new();

    for utxo in per_rune.into_iter().flatten() {
        match positions.get(&utxo.utxo.outpoint()) {
            Some(&index) => merged[index].merge_runes(utxo.runes),
            None => {
                positions.insert(utxo.utxo.outpoint(), merged.len());
                merged.push(utxo);
            }
        }
    }

    merged
}
