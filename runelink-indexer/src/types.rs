//! Typed view of what the indexer reports about an address.

use std::{fmt, str::FromStr};

use bitcoin::{OutPoint, ScriptBuf, Txid};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use thiserror::Error;

/// Two-part rune identifier, rendered as `"block:tx"`.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    SerializeDisplay,
    DeserializeFromStr,
)]
pub struct RuneId {
    pub block: u64,
    pub tx: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseRuneIdError {
    #[error("Rune id must be formatted as `block:tx`, got `{0}`")]
    MissingSeparator(String),

    #[error("Invalid rune id block `{0}`")]
    Block(String),

    #[error("Invalid rune id tx `{0}`")]
    Tx(String),
}

impl RuneId {
    pub fn new(block: u64, tx: u32) -> Self {
        Self { block, tx }
    }
}

impl fmt::Display for RuneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.block, self.tx)
    }
}

impl FromStr for RuneId {
    type Err = ParseRuneIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (block, tx) = s
            .split_once(':')
            .ok_or_else(|| ParseRuneIdError::MissingSeparator(s.to_string()))?;

        Ok(Self {
            block: block
                .parse()
                .map_err(|_| ParseRuneIdError::Block(block.to_string()))?,
            tx: tx.parse().map_err(|_| ParseRuneIdError::Tx(tx.to_string()))?,
        })
    }
}

/// A spendable output as last seen by the indexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utxo {
    pub txid: Txid,
    pub vout: u32,
    /// Value in satoshis.
    pub value: u64,
    pub script_pubkey: Option<ScriptBuf>,
}

impl Utxo {
    pub fn new(txid: Txid, vout: u32, value: u64) -> Self {
        Self {
            txid,
            vout,
            value,
            script_pubkey: None,
        }
    }

    pub fn outpoint(&self) -> OutPoint {
        OutPoint {
            txid: self.txid,
            vout: self.vout,
        }
    }
}

impl fmt::Display for Utxo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.vout)
    }
}

impl AsRef<Utxo> for Utxo {
    fn as_ref(&self) -> &Utxo {
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuneBalance {
    pub rune_id: RuneId,
    pub rune_name: String,
    pub spaced_rune_name: String,
    pub symbol: String,
    pub divisibility: u8,
    pub amount: u128,
}

/// One entry of an address's rune balance list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuneSummary {
    pub rune_id: RuneId,
    pub rune_name: String,
    pub spaced_rune_name: String,
    pub symbol: String,
    pub divisibility: u8,
    pub amount: u128,
}

/// A UTXO together with every rune balance it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UtxoWithRunes {
    pub utxo: Utxo,
    pub runes: Vec<RuneBalance>,
    pub height: u64,
    pub confirmations: u64,
    pub address: String,
}

impl UtxoWithRunes {
    /// Total amount of `rune_id` held by this output.
    pub fn rune_amount(&self, rune_id: &RuneId) -> u128 {
        self.runes
            .iter()
            .filter(|balance| balance.rune_id == *rune_id)
            .fold(0u128, |acc, balance| acc.saturating_add(balance.amount))
    }

    pub fn holds_rune(&self, rune_id: &RuneId) -> bool {
        self.runes.iter().any(|balance| balance.rune_id == *rune_id)
    }

    /// `true` when the output carries any rune besides `rune_id`.
    pub fn carries_other_runes(&self, rune_id: &RuneId) -> bool {
        self.runes.iter().any(|balance| balance.rune_id != *rune_id)
    }

    /// Adds the balances from `other` that this entry does not already list.
    pub fn merge_runes(&mut self, other: Vec<RuneBalance>) {
        for balance in other {
            if !self.holds_rune(&balance.rune_id) {
                self.runes.push(balance);
            }
        }
    }
}

impl AsRef<Utxo> for UtxoWithRunes {
    fn as_ref(&self) -> &Utxo {
        &self.utxo
    }
}

impl AsRef<UtxoWithRunes> for UtxoWithRunes {
    fn as_ref(&self) -> &UtxoWithRunes {
        self
    }
}

/// Plain output returned by the available-UTXO endpoint, with spend-safety flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailableUtxo {
    pub utxo: Utxo,
    pub address: String,
    pub height: u64,
    pub is_spent: bool,
    pub is_low_fee: bool,
    pub inscriptions_count: u32,
}

impl AvailableUtxo {
    pub fn is_spendable(&self, filter: &UtxoFilter) -> bool {
        (filter.include_spent || !self.is_spent)
            && (filter.include_low_fee || !self.is_low_fee)
            && (filter.include_inscribed || self.inscriptions_count == 0)
    }
}

impl AsRef<Utxo> for AvailableUtxo {
    fn as_ref(&self) -> &Utxo {
        &self.utxo
    }
}

/// Which flagged outputs may still be used to fund fees.
///
/// The default excludes everything flagged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UtxoFilter {
    pub include_spent: bool,
    pub include_low_fee: bool,
    pub include_inscribed: bool,
}

impl UtxoFilter {
    pub fn with_low_fee(mut self, include_low_fee: bool) -> Self {
        self.include_low_fee = include_low_fee;
        self
    }
}
