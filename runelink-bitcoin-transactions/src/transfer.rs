//! Rune transfers, built in two phases.
//!
//! [`prepare_transfer`] selects the rune inputs, encodes the edicts and, when the rune
//! outputs alone cannot pay for the fee, both postage outputs and a non-dust BTC change, adds
//! plain fee inputs. [`build_transfer`] costs the transaction for its final input count and
//! lays out:
//!
//! | index | content                         |
//! |-------|---------------------------------|
//! | 0     | `OP_RETURN` runestone, 0 sats   |
//! | 1     | recipient, `postage`            |
//! | 2     | rune change, `postage`          |
//! | 3     | BTC change                      |
//!
//! Every selected input is spent, so the edicts must account for all of the requested
//! rune: `amount` goes to output 1 and the remainder to output 2.

use std::collections::HashSet;

use bitcoin::{OutPoint, ScriptBuf};
use runelink_indexer::{AvailableUtxo, RuneId, UtxoWithRunes};
use runelink_safe_math::{safe_add, safe_mul, safe_sub, safe_sum};
use tracing::{debug, info};

use crate::{
    address::script_for_address,
    coin_select::{fee_candidates, select_for_bitcoin_amount, select_for_rune_amount},
    config::BuilderConfig,
    constants::{DUST_LIMIT, RECIPIENT_OUTPUT, RUNE_CHANGE_OUTPUT, TRANSFER_OUTPUT_COUNT},
    error::{CoinSelectError, OutputRole, RuneTxError},
    fee::{estimate_fee, estimate_fee_for, estimate_virtual_size},
    fee_rate::FeeRate,
    psbt::{assemble, PlannedInput, PlannedOutput, UnsignedRuneTransaction},
    runestone::{encode_message, Edict, EncodedMessage, RunestoneCodec, RunestoneMessage},
};

#[derive(Debug, Clone, PartialEq)]
pub struct TransferRequest {
    /// Owner of the rune and fee inputs.
    pub sender_address: String,
    pub recipient_address: String,
    /// Defaults to the sender.
    pub rune_change_address: Option<String>,
    /// Defaults to the sender.
    pub btc_change_address: Option<String>,
    pub rune_id: RuneId,
    pub amount: u128,
    pub fee_rate: FeeRate,
}

impl TransferRequest {
    pub fn new(
        sender_address: impl Into<String>,
        recipient_address: impl Into<String>,
        rune_id: RuneId,
        amount: u128,
        fee_rate: FeeRate,
    ) -> Self {
        Self {
            sender_address: sender_address.into(),
            recipient_address: recipient_address.into(),
            rune_change_address: None,
            btc_change_address: None,
            rune_id,
            amount,
            fee_rate,
        }
    }
}

/// Output scripts of a transfer, resolved and network-checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferScripts {
    pub sender: ScriptBuf,
    pub recipient: ScriptBuf,
    pub rune_change: ScriptBuf,
    pub btc_change: ScriptBuf,
}

impl TransferScripts {
    fn resolve(request: &TransferRequest, config: &BuilderConfig) -> Result<Self, RuneTxError> {
        let sender = script_for_address(&request.sender_address, config.network)?;
        let recipient = script_for_address(&request.recipient_address, config.network)?;
        let or_sender = |address: &Option<String>| match address {
            Some(address) => script_for_address(address, config.network),
            None => Ok(sender.clone()),
        };

        Ok(Self {
            rune_change: or_sender(&request.rune_change_address)?,
            btc_change: or_sender(&request.btc_change_address)?,
            recipient,
            sender,
        })
    }
}

/// Sats a transfer with `input_count` inputs must bring in: the fee, both postage outputs and
/// a BTC change output at the dust limit.
fn required_sats(
    input_count: usize,
    message_len: usize,
    postage: u64,
    fee_rate: &FeeRate,
) -> Result<(u64, u64), RuneTxError> {
    let fee = estimate_fee_for(input_count, TRANSFER_OUTPUT_COUNT, message_len, fee_rate)?;
    let required = safe_add(safe_add(fee, safe_mul(postage, 2)?)?, DUST_LIMIT)?;
    Ok((fee, required))
}

/// Picks fee inputs until the rune inputs plus the picks pay for the transaction they form.
///
/// Each pick grows the fee, so the target is recomputed for the new input count and the
/// selection redone. Greedy selection over a growing target only ever extends its previous
/// pick, so the loop ends once the count stops changing or the candidates run out.
fn fund_transfer(
    rune_input_count: usize,
    rune_input_sats: u64,
    candidates: &[AvailableUtxo],
    message_len: usize,
    postage: u64,
    fee_rate: &FeeRate,
) -> Result<(Vec<AvailableUtxo>, u64), RuneTxError> {
    let mut fee_input_count = 0;

    loop {
        let (fee, required) = required_sats(
            rune_input_count + fee_input_count,
            message_len,
            postage,
            fee_rate,
        )?;
        let shortfall = required.saturating_sub(rune_input_sats);

        match select_for_bitcoin_amount(candidates, shortfall) {
            Ok(selection) if selection.selected.len() == fee_input_count => {
                return Ok((selection.selected, fee));
            }
            Ok(selection) => fee_input_count = selection.selected.len(),
            Err(CoinSelectError::InsufficientFunds {
                available: candidate_sats,
                ..
            }) => {
                // Every candidate was taken and still fell short; report against that shape.
                let (_, required) = required_sats(
                    rune_input_count + candidates.len(),
                    message_len,
                    postage,
                    fee_rate,
                )?;
                return Err(RuneTxError::InsufficientFunds {
                    required,
                    available: rune_input_sats.saturating_add(candidate_sats),
                });
            }
            Err(error) => return Err(error.into()),
        }
    }
}

/// Output of the selection phase.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedTransferPlan {
    pub rune_id: RuneId,
    pub amount: u128,
    pub rune_inputs: Vec<UtxoWithRunes>,
    /// Plain inputs added to cover the fee. Empty when the rune inputs suffice.
    pub fee_inputs: Vec<AvailableUtxo>,
    /// Balance of `rune_id` across `rune_inputs`.
    pub total_rune_amount: u128,
    pub rune_change: u128,
    pub rune_input_sats: u64,
    pub fee_input_sats: u64,
    pub message: RunestoneMessage,
    pub encoded: EncodedMessage,
    /// Fee for the final input count.
    pub estimated_fee: u64,
    pub postage: u64,
    pub fee_rate: FeeRate,
    pub scripts: TransferScripts,
}

impl PreparedTransferPlan {
    pub fn edicts(&self) -> &[Edict] {
        match &self.message {
            RunestoneMessage::Transfer { edicts, .. } => edicts,
            _ => &[],
        }
    }

    pub fn input_count(&self) -> usize {
        self.rune_inputs.len() + self.fee_inputs.len()
    }

    pub fn total_input_sats(&self) -> Result<u64, RuneTxError> {
        Ok(safe_add(self.rune_input_sats, self.fee_input_sats)?)
    }
}

/// Phase A: select rune inputs, encode the edicts, and top up with fee inputs if needed.
///
/// Fee inputs are drawn from `available` after dropping outputs already selected as rune
/// inputs and those excluded by the configured filter. The inputs must cover
/// `fee + 2 * postage + 546` for the transaction they end up forming, so the plan always
/// builds.
///
/// # Errors
/// * [`RuneTxError::InvalidAmount`] for a zero amount.
/// * [`RuneTxError::DustOutputRejected`] when the configured postage is below dust.
/// * [`RuneTxError::InsufficientRuneBalance`] when the rune outputs hold too little.
/// * [`RuneTxError::InsufficientFunds`] when rune and candidate sats together fall short.
///   `required` is costed as if every candidate were spent.
pub fn prepare_transfer<C: RunestoneCodec + ?Sized>(
    codec: &C,
    config: &BuilderConfig,
    request: &TransferRequest,
    rune_utxos: &[UtxoWithRunes],
    available: &[AvailableUtxo],
) -> Result<PreparedTransferPlan, RuneTxError> {
    if request.amount == 0 {
        return Err(RuneTxError::InvalidAmount);
    }

    let postage = config.postage;
    if postage < DUST_LIMIT {
        return Err(RuneTxError::DustOutputRejected {
            role: OutputRole::Recipient,
            value: postage,
        });
    }

    let scripts = TransferScripts::resolve(request, config)?;
    let rune_id = request.rune_id;

    let rune_selection = select_for_rune_amount(rune_utxos, &rune_id, request.amount)?;
    let rune_inputs = rune_selection.selected;
    let rune_change = safe_sub(rune_selection.total_amount, request.amount)?;

    // Runes other than `rune_id` on the inputs would otherwise land in output 1.
    let pointer = rune_inputs
        .iter()
        .any(|utxo| utxo.carries_other_runes(&rune_id))
        .then_some(RUNE_CHANGE_OUTPUT);

    let message = RunestoneMessage::Transfer {
        edicts: vec![
            Edict {
                id: rune_id,
                amount: request.amount,
                output: RECIPIENT_OUTPUT,
            },
            Edict {
                id: rune_id,
                amount: rune_change,
                output: RUNE_CHANGE_OUTPUT,
            },
        ],
        pointer,
    };
    let encoded = encode_message(codec, &message)?;

    let rune_input_sats = rune_selection.total_sats;
    let exclude: HashSet<OutPoint> = rune_inputs
        .iter()
        .map(|utxo| utxo.utxo.outpoint())
        .collect();
    let candidates = fee_candidates(available, &config.utxo_filter, &exclude);

    let (fee_inputs, estimated_fee) = fund_transfer(
        rune_inputs.len(),
        rune_input_sats,
        &candidates,
        encoded.len(),
        postage,
        &request.fee_rate,
    )?;
    let fee_input_sats = safe_sum(fee_inputs.iter().map(|utxo| utxo.utxo.value))?;

    debug!(
        %rune_id,
        rune_inputs = rune_inputs.len(),
        fee_inputs = fee_inputs.len(),
        rune_change = %rune_change,
        estimated_fee,
        "prepared transfer plan"
    );

    Ok(PreparedTransferPlan {
        rune_id,
        amount: request.amount,
        rune_inputs,
        fee_inputs,
        total_rune_amount: rune_selection.total_amount,
        rune_change,
        rune_input_sats,
        fee_input_sats,
        message,
        encoded,
        estimated_fee,
        postage,
        fee_rate: request.fee_rate,
        scripts,
    })
}

/// Phase B: cost the transaction for its final inputs and assemble the PSBT.
///
/// Inputs are ordered rune inputs first, then fee inputs.
///
/// # Errors
/// * [`RuneTxError::InsufficientFunds`] when the inputs cannot pay the fee, both postage
///   outputs and a non-dust BTC change output. `required` is `fee + 2 * postage + 546`. A plan
///   from [`prepare_transfer`] never fails this way.
pub fn build_transfer(plan: &PreparedTransferPlan) -> Result<UnsignedRuneTransaction, RuneTxError> {
    let input_count = plan.input_count();
    let message_len = plan.encoded.len();

    let vsize = estimate_virtual_size(input_count, TRANSFER_OUTPUT_COUNT, message_len);
    let fee = estimate_fee(vsize, &plan.fee_rate)?;

    let total_input = plan.total_input_sats()?;
    let postage_total = safe_mul(plan.postage, 2)?;
    let required = safe_add(safe_add(fee, postage_total)?, DUST_LIMIT)?;

    if total_input < required {
        return Err(RuneTxError::InsufficientFunds {
            required,
            available: total_input,
        });
    }

    let btc_change = safe_sub(safe_sub(total_input, fee)?, postage_total)?;

    let inputs: Vec<PlannedInput> = plan
        .rune_inputs
        .iter()
        .map(|utxo| &utxo.utxo)
        .chain(plan.fee_inputs.iter().map(|utxo| &utxo.utxo))
        .map(|utxo| PlannedInput::from_owned(utxo, &plan.scripts.sender))
        .collect();

    let outputs = [
        PlannedOutput {
            role: OutputRole::OpReturn,
            script_pubkey: plan.encoded.script.clone(),
            value: 0,
        },
        PlannedOutput {
            role: OutputRole::Recipient,
            script_pubkey: plan.scripts.recipient.clone(),
            value: plan.postage,
        },
        PlannedOutput {
            role: OutputRole::RuneChange,
            script_pubkey: plan.scripts.rune_change.clone(),
            value: plan.postage,
        },
        PlannedOutput {
            role: OutputRole::BtcChange,
            script_pubkey: plan.scripts.btc_change.clone(),
            value: btc_change,
        },
    ];

    let transaction = assemble(&inputs, &outputs, fee, vsize, message_len)?;

    info!(
        rune_id = %plan.rune_id,
        amount = %plan.amount,
        rune_change = %plan.rune_change,
        fee,
        btc_change,
        "prepared rune transfer"
    );

    Ok(transaction)
}
