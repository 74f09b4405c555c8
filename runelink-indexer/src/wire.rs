//! Response payloads of the UniSat-compatible indexer API.

use std::str::FromStr;

use bitcoin::{ScriptBuf, Txid};
use serde::Deserialize;
use serde_with::{serde_as, DisplayFromStr};

use crate::{
    error::IndexerError,
    types::{AvailableUtxo, RuneBalance, RuneId, RuneSummary, Utxo, UtxoWithRunes},
};

/// Every endpoint wraps its payload as `{code, msg, data}`; `code != 0` is an API-level error.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn into_data(self) -> Result<T, IndexerError> {
        if self.code != 0 {
            return Err(IndexerError::Logical {
                code: self.code,
                message: self.msg,
            });
        }

        self.data
            .ok_or_else(|| IndexerError::Parse("response is missing `data`".to_string()))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RuneBalanceList {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub detail: Vec<WireRuneBalance>,
}

#[serde_as]
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireRuneBalance {
    #[serde_as(as = "DisplayFromStr")]
    pub amount: u128,
    pub runeid: RuneId,
    pub rune: String,
    #[serde(default)]
    pub spaced_rune: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub divisibility: u8,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RuneUtxoPage {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub utxo: Vec<WireRuneUtxo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireRuneUtxo {
    pub txid: String,
    pub vout: u32,
    pub satoshi: u64,
    #[serde(default)]
    pub script_pk: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub height: u64,
    #[serde(default)]
    pub confirmations: u64,
    #[serde(default)]
    pub runes: Vec<WireRuneBalance>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AvailableUtxoPage {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub utxo: Vec<WireAvailableUtxo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireAvailableUtxo {
    pub txid: String,
    pub vout: u32,
    pub satoshi: u64,
    #[serde(default)]
    pub script_pk: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub height: u64,
    #[serde(default)]
    pub is_spent: bool,
    #[serde(default)]
    pub is_low_fee: bool,
    #[serde(default)]
    pub inscriptions_count: u32,
    #[serde(default)]
    pub inscriptions: Vec<serde_json::Value>,
}

fn parse_utxo(txid: &str, vout: u32, value: u64, script_pk: &str) -> Result<Utxo, IndexerError> {
    let txid = Txid::from_str(txid)
        .map_err(|e| IndexerError::Parse(format!("invalid txid `{}`: {}", txid, e)))?;

    let script_pubkey = if script_pk.is_empty() {
        None
    } else {
        Some(
            ScriptBuf::from_hex(script_pk)
                .map_err(|e| IndexerError::Parse(format!("invalid scriptPk: {}", e)))?,
        )
    };

    Ok(Utxo {
        txid,
        vout,
        value,
        script_pubkey,
    })
}

impl From<WireRuneBalance> for RuneBalance {
    fn from(wire: WireRuneBalance) -> Self {
        RuneBalance {
            rune_id: wire.runeid,
            rune_name: wire.rune,
            spaced_rune_name: wire.spaced_rune,
            symbol: wire.symbol,
            divisibility: wire.divisibility,
            amount: wire.amount,
        }
    }
}

impl From<WireRuneBalance> for RuneSummary {
    fn from(wire: WireRuneBalance) -> Self {
        RuneSummary {
            rune_id: wire.runeid,
            rune_name: wire.rune,
            spaced_rune_name: wire.spaced_rune,
            symbol: wire.symbol,
            divisibility: wire.divisibility,
            amount: wire.amount,
        }
    }
}

impl TryFrom<WireRuneUtxo> for UtxoWithRunes {
    type Error = IndexerError;

    fn try_from(wire: WireRuneUtxo) -> Result<Self, Self::Error> {
        Ok(UtxoWithRunes {
            utxo: parse_utxo(&wire.txid, wire.vout, wire.satoshi, &wire.script_pk)?,
            runes: wire.runes.into_iter().map(RuneBalance::from).collect(),
            height: wire.height,
            confirmations: wire.confirmations,
            address: wire.address,
        })
    }
}

impl TryFrom<WireAvailableUtxo> for AvailableUtxo {
    type Error = IndexerError;

    fn try_from(wire: WireAvailableUtxo) -> Result<Self, Self::Error> {
        let inscriptions_count = wire
            .inscriptions_count
            .max(wire.inscriptions.len() as u32);

        Ok(AvailableUtxo {
            utxo: parse_utxo(&wire.txid, wire.vout, wire.satoshi, &wire.script_pk)?,
            address: wire.address,
            height: wire.height,
            is_spent: wire.is_spent,
            is_low_fee: wire.is_low_fee,
            inscriptions_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_with_nonzero_code_is_logical_error() {
        let envelope: Envelope<RuneBalanceList> =
            serde_json::from_value(json!({"code": -1, "msg": "address invalid", "data": null}))
                .unwrap();

        assert_eq!(
            envelope.into_data().unwrap_err(),
            IndexerError::Logical {
                code: -1,
                message: "address invalid".to_string()
            }
        );
    }

    #[test]
    fn envelope_without_data_is_parse_error() {
        let envelope: Envelope<RuneBalanceList> =
            serde_json::from_value(json!({"code": 0, "msg": "ok"})).unwrap();

        assert!(matches!(
            envelope.into_data(),
            Err(IndexerError::Parse(_))
        ));
    }

    #[test]
    fn rune_utxo_parses_string_amounts() {
        let wire: WireRuneUtxo = serde_json::from_value(json!({
            "txid": "11".repeat(32),
            "vout": 2,
            "satoshi": 546,
            "scriptPk": "0014751e76e8199196d454941c45d1b3a323f1433bd6",
            "address": "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4",
            "height": 840001,
            "confirmations": 12,
            "runes": [{
                "rune": "UNCOMMONGOODS",
                "runeid": "1:0",
                "spacedRune": "UNCOMMON•GOODS",
                "amount": "340282366920938463463374607431768211455",
                "symbol": "⧉",
                "divisibility": 0
            }]
        }))
        .unwrap();

        let utxo = UtxoWithRunes::try_from(wire).unwrap();
        assert_eq!(utxo.utxo.vout, 2);
        assert_eq!(utxo.utxo.value, 546);
        assert!(utxo.utxo.script_pubkey.is_some());
        assert_eq!(utxo.runes[0].rune_id, RuneId::new(1, 0));
        assert_eq!(utxo.runes[0].amount, u128::MAX);
        assert_eq!(utxo.runes[0].spaced_rune_name, "UNCOMMON•GOODS");
    }

    #[test]
    fn invalid_txid_is_parse_error() {
        let wire: WireAvailableUtxo = serde_json::from_value(json!({
            "txid": "not-a-txid",
            "vout": 0,
            "satoshi": 1000
        }))
        .unwrap();

        assert!(matches!(
            AvailableUtxo::try_from(wire),
            Err(IndexerError::Parse(_))
        ));
    }

    #[test]
    fn inscription_list_counts_as_inscribed() {
        let wire: WireAvailableUtxo = serde_json::from_value(json!({
            "txid": "22".repeat(32),
            "vout": 0,
            "satoshi": 10000,
            "inscriptions": [{"inscriptionId": "abc"}]
        }))
        .unwrap();

        let utxo = AvailableUtxo::try_from(wire).unwrap();
        assert_eq!(utxo.inscriptions_count, 1);
        assert!(utxo.utxo.script_pubkey.is_none());
    }
}
