//! Minting against an existing rune's open terms.

use runelink_indexer::{RuneId, Utxo};
use tracing::info;

use crate::{
    address::script_for_address,
    config::BuilderConfig,
    error::RuneTxError,
    fee_rate::FeeRate,
    psbt::{build_single_change, PlannedInput, UnsignedRuneTransaction},
    runestone::{encode_message, RunestoneCodec, RunestoneMessage},
};

#[derive(Debug, Clone, PartialEq)]
pub struct MintRequest {
    /// Receives the minted runes and the change.
    pub address: String,
    pub rune_id: RuneId,
    pub fee_rate: FeeRate,
}

/// Builds a mint funded by every entry of `utxos`.
///
/// Minted units follow the runestone's default allocation to the first non-`OP_RETURN`
/// output, which is the change output.
pub fn build_mint<T: AsRef<Utxo>, C: RunestoneCodec + ?Sized>(
    codec: &C,
    config: &BuilderConfig,
    utxos: &[T],
    request: &MintRequest,
) -> Result<UnsignedRuneTransaction, RuneTxError> {
    let owner_script = script_for_address(&request.address, config.network)?;
    let encoded = encode_message(codec, &RunestoneMessage::Mint(request.rune_id))?;

    let inputs = utxos
        .iter()
        .map(|utxo| PlannedInput::from_owned(utxo.as_ref(), &owner_script))
        .collect();

    let transaction = build_single_change(inputs, &encoded, owner_script, &request.fee_rate)?;

    info!(rune_id = %request.rune_id, fee = transaction.fee, "prepared mint");

    Ok(transaction)
}
