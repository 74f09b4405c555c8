//! Rune transaction construction.
//!
//! This crate turns a description of an etch, mint or transfer into an unsigned PSBT:
//! it selects coins, estimates fees with a fixed size model, encodes the runestone through a
//! pluggable [`RunestoneCodec`], and lays out outputs so that no non-`OP_RETURN` output is
//! dust. [`TransactionBuilder`] ties these together with a [`UtxoProvider`] for the
//! transfer flow, which needs to look up the sender's outputs.
//!
//! Signing and broadcasting are left to the caller's wallet.
#![doc = include_str!("../README.md")]

use runelink_indexer::{AvailableUtxo, Utxo, UtxoProvider, UtxoWithRunes};

pub mod address;
pub mod coin_select;
pub mod config;
pub mod constants;
pub mod error;
pub mod etching;
pub mod fee;
pub mod fee_rate;
pub mod mint;
pub mod psbt;
pub mod runestone;
pub mod transfer;

pub use config::BuilderConfig;
pub use error::{CoinSelectError, EncodingError, OutputRole, RuneTxError};
pub use etching::{EtchingRequest, MintTerms};
pub use fee_rate::FeeRate;
pub use mint::MintRequest;
pub use psbt::{TransactionSummary, UnsignedRuneTransaction};
pub use runestone::{EncodedRunestone, OrdinalsCodec, RunestoneCodec, RunestoneMessage};
pub use transfer::{PreparedTransferPlan, TransferRequest};

/// Builds unsigned rune transactions against a UTXO source.
pub struct TransactionBuilder<P, C = OrdinalsCodec> {
    provider: P,
    codec: C,
    config: BuilderConfig,
}

impl<P: UtxoProvider> TransactionBuilder<P, OrdinalsCodec> {
    pub fn new(provider: P, config: BuilderConfig) -> Self {
        Self::with_codec(provider, OrdinalsCodec, config)
    }
}

impl<P: UtxoProvider, C: RunestoneCodec> TransactionBuilder<P, C> {
    pub fn with_codec(provider: P, codec: C, config: BuilderConfig) -> Self {
        Self {
            provider,
            codec,
            config,
        }
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Plain outputs of `address` that the configured filter allows to fund a transaction.
    pub async fn spendable_utxos(&self, address: &str) -> Vec<AvailableUtxo> {
        let filter = self.config.utxo_filter;

        self.provider
            .available_utxos(address, filter.include_low_fee)
            .await
            .into_iter()
            .filter(|utxo| utxo.is_spendable(&filter))
            .collect()
    }

    /// Builds an etching funded by all of `utxos`.
    pub fn create_etching_psbt<T: AsRef<Utxo>>(
        &self,
        utxos: &[T],
        request: &EtchingRequest,
    ) -> Result<UnsignedRuneTransaction, RuneTxError> {
        etching::build_etching(&self.codec, &self.config, utxos, request)
    }

    /// Builds a mint funded by all of `utxos`.
    pub fn create_mint_psbt<T: AsRef<Utxo>>(
        &self,
        utxos: &[T],
        request: &MintRequest,
    ) -> Result<UnsignedRuneTransaction, RuneTxError> {
        mint::build_mint(&self.codec, &self.config, utxos, request)
    }

    /// Selection phase of a transfer over caller-supplied candidates.
    pub fn prepare_transfer(
        &self,
        request: &TransferRequest,
        rune_utxos: &[UtxoWithRunes],
        available: &[AvailableUtxo],
    ) -> Result<PreparedTransferPlan, RuneTxError> {
        transfer::prepare_transfer(&self.codec, &self.config, request, rune_utxos, available)
    }

    pub fn build_transfer(
        &self,
        plan: &PreparedTransferPlan,
    ) -> Result<UnsignedRuneTransaction, RuneTxError> {
        transfer::build_transfer(plan)
    }

    /// Fetches the sender's rune and plain outputs, then runs both transfer phases.
    ///
    /// Indexer failures surface as empty candidate sets, so an unreachable indexer reports
    /// [`RuneTxError::InsufficientRuneBalance`] rather than a partial transaction.
    pub async fn create_transfer_psbt(
        &self,
        request: &TransferRequest,
    ) -> Result<UnsignedRuneTransaction, RuneTxError> {
        let rune_utxos = self
            .provider
            .rune_utxos(&request.sender_address, &request.rune_id)
            .await;
        let available = self
            .provider
            .available_utxos(
                &request.sender_address,
                self.config.utxo_filter.include_low_fee,
            )
            .await;

        let plan = self.prepare_transfer(request, &rune_utxos, &available)?;
        self.build_transfer(&plan)
    }
}
