//! Assembly of the unsigned transaction and its PSBT wrapper.

use base64::{engine::general_purpose::STANDARD, Engine};
use bitcoin::{
    absolute::LockTime, transaction::Version, Amount, Psbt, ScriptBuf, Sequence, Transaction,
    TxIn, TxOut, Witness,
};
use runelink_indexer::Utxo;
use runelink_safe_math::{safe_add, safe_sub, safe_sum};
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    constants::{DUST_LIMIT, SINGLE_CHANGE_OUTPUT_COUNT},
    error::{OutputRole, RuneTxError},
    fee::{estimate_fee, estimate_virtual_size},
    fee_rate::FeeRate,
    runestone::EncodedMessage,
};

/// An input to spend, with the script recorded as its `witness_utxo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PlannedInput {
    pub utxo: Utxo,
    pub script_pubkey: ScriptBuf,
}

impl PlannedInput {
    /// Uses the indexer-reported script when known, the owner's otherwise.
    pub fn from_owned(utxo: &Utxo, owner_script: &ScriptBuf) -> Self {
        Self {
            utxo: utxo.clone(),
            script_pubkey: utxo
                .script_pubkey
                .clone()
                .unwrap_or_else(|| owner_script.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PlannedOutput {
    pub role: OutputRole,
    pub script_pubkey: ScriptBuf,
    pub value: u64,
}

/// A built, unsigned transaction ready to be handed to a wallet for signing.
#[derive(Debug, Clone, PartialEq)]
pub struct UnsignedRuneTransaction {
    pub psbt: Psbt,
    pub fee: u64,
    /// Size the fee was computed for.
    pub vsize: u64,
    /// Length of the runestone payload.
    pub message_len: usize,
    /// Role of each output, index-aligned with `psbt.unsigned_tx.output`.
    pub output_roles: Vec<OutputRole>,
}

impl UnsignedRuneTransaction {
    pub fn unsigned_tx(&self) -> &Transaction {
        &self.psbt.unsigned_tx
    }

    /// Standard base64 of the serialized PSBT, the format wallets accept for signing.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.psbt.serialize())
    }

    pub fn total_input(&self) -> u64 {
        self.psbt
            .inputs
            .iter()
            .filter_map(|input| input.witness_utxo.as_ref())
            .fold(0u64, |acc, txout| acc.saturating_add(txout.value.to_sat()))
    }

    pub fn total_output(&self) -> u64 {
        self.unsigned_tx()
            .output
            .iter()
            .fold(0u64, |acc, txout| acc.saturating_add(txout.value.to_sat()))
    }

    pub fn summary(&self) -> TransactionSummary {
        let tx = self.unsigned_tx();

        TransactionSummary {
            psbt_base64: self.to_base64(),
            fee: self.fee,
            vsize: self.vsize,
            inputs: tx
                .input
                .iter()
                .map(|input| input.previous_output.to_string())
                .collect(),
            outputs: tx
                .output
                .iter()
                .zip(&self.output_roles)
                .map(|(txout, role)| OutputSummary {
                    role: role.to_string(),
                    value: txout.value.to_sat(),
                    script_pubkey: txout.script_pubkey.to_hex_string(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionSummary {
    pub psbt_base64: String,
    pub fee: u64,
    pub vsize: u64,
    pub inputs: Vec<String>,
    pub outputs: Vec<OutputSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputSummary {
    pub role: String,
    pub value: u64,
    pub script_pubkey: String,
}

/// Builds the PSBT from planned inputs and outputs.
///
/// Refuses any non-`OP_RETURN` output below [`DUST_LIMIT`].
pub(crate) fn assemble(
    inputs: &[PlannedInput],
    outputs: &[PlannedOutput],
    fee: u64,
    vsize: u64,
    message_len: usize,
) -> Result<UnsignedRuneTransaction, RuneTxError> {
    if let Some(dust) = outputs
        .iter()
        .find(|output| output.role != OutputRole::OpReturn && output.value < DUST_LIMIT)
    {
        return Err(RuneTxError::DustOutputRejected {
            role: dust.role,
            value: dust.value,
        });
    }

    let transaction = Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: inputs
            .iter()
            .map(|input| TxIn {
                previous_output: input.utxo.outpoint(),
                script_sig: ScriptBuf::new(),
                sequence: Sequence::MAX,
                witness: Witness::new(),
            })
            .collect(),
        output: outputs
            .iter()
            .map(|output| TxOut {
                value: Amount::from_sat(output.value),
                script_pubkey: output.script_pubkey.clone(),
            })
            .collect(),
    };

    let mut psbt =
        Psbt::from_unsigned_tx(transaction).map_err(|e| RuneTxError::Psbt(e.to_string()))?;

    for (psbt_input, planned) in psbt.inputs.iter_mut().zip(inputs) {
        psbt_input.witness_utxo = Some(TxOut {
            value: Amount::from_sat(planned.utxo.value),
            script_pubkey: planned.script_pubkey.clone(),
        });
    }

    info!(
        txid = %psbt.unsigned_tx.compute_txid(),
        inputs = inputs.len(),
        outputs = outputs.len(),
        fee,
        vsize,
        "built unsigned rune transaction"
    );

    Ok(UnsignedRuneTransaction {
        psbt,
        fee,
        vsize,
        message_len,
        output_roles: outputs.iter().map(|output| output.role).collect(),
    })
}

/// Shape shared by etchings and mints: every input goes to one change output after the fee,
/// with the runestone in output 0.
pub(crate) fn build_single_change(
    inputs: Vec<PlannedInput>,
    message: &EncodedMessage,
    change_script: ScriptBuf,
    fee_rate: &FeeRate,
) -> Result<UnsignedRuneTransaction, RuneTxError> {
    let total_input = safe_sum(inputs.iter().map(|input| input.utxo.value))?;

    let vsize = estimate_virtual_size(inputs.len(), SINGLE_CHANGE_OUTPUT_COUNT, message.len());
    let fee = estimate_fee(vsize, fee_rate)?;
    let required = safe_add(fee, DUST_LIMIT)?;

    if inputs.is_empty() || total_input < required {
        return Err(RuneTxError::InsufficientFunds {
            required,
            available: total_input,
        });
    }

    let change = safe_sub(total_input, fee)?;
    debug!(total_input, fee, change, "single change output");

    let outputs = [
        PlannedOutput {
            role: OutputRole::OpReturn,
            script_pubkey: message.script.clone(),
            value: 0,
        },
        PlannedOutput {
            role: OutputRole::Change,
            script_pubkey: change_script,
            value: change,
        },
    ];

    assemble(&inputs, &outputs, fee, vsize, message.len())
}
