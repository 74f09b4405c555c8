//! Rune etching: a single transaction whose runestone declares a new rune.
//!
//! The whole funding set is spent and everything but the fee returns to the etcher. No
//! commit/reveal pair is produced, so the name is not committed to beforehand.

use ordinals::SpacedRune;
use runelink_indexer::Utxo;
use runelink_safe_math::{safe_add, safe_mul};
use tracing::info;

use crate::{
    address::script_for_address,
    config::BuilderConfig,
    constants::MAX_DIVISIBILITY,
    error::RuneTxError,
    fee_rate::FeeRate,
    psbt::{build_single_change, PlannedInput, UnsignedRuneTransaction},
    runestone::{encode_message, EtchingMessage, RunestoneCodec, RunestoneMessage, Terms},
};

/// Open-mint parameters. Only kept when `amount` or `cap` is set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MintTerms {
    /// Units minted per mint transaction.
    pub amount: Option<u128>,
    /// Maximum number of mints.
    pub cap: Option<u128>,
    pub height_start: Option<u64>,
    pub height_end: Option<u64>,
    pub offset_start: Option<u64>,
    pub offset_end: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EtchingRequest {
    /// Receives the change and funds the inputs.
    pub address: String,
    pub rune_name: String,
    pub symbol: Option<char>,
    pub divisibility: u8,
    /// Zero means no premine.
    pub premine: u128,
    pub terms: Option<MintTerms>,
    pub turbo: bool,
    pub fee_rate: FeeRate,
}

fn validate_rune_name(name: &str) -> Result<SpacedRune, RuneTxError> {
    let invalid = |reason: String| RuneTxError::InvalidRuneName {
        name: name.to_string(),
        reason,
    };

    let spaced_rune = name
        .parse::<SpacedRune>()
        .map_err(|e| invalid(e.to_string()))?;

    if spaced_rune.rune.is_reserved() {
        return Err(invalid("name is in the reserved range".to_string()));
    }

    Ok(spaced_rune)
}

/// Validates the request and turns it into the runestone message.
pub fn etching_message(request: &EtchingRequest) -> Result<EtchingMessage, RuneTxError> {
    let spaced_rune = validate_rune_name(&request.rune_name)?;

    if request.divisibility > MAX_DIVISIBILITY {
        return Err(RuneTxError::InvalidEtching(format!(
            "divisibility {} exceeds {}",
            request.divisibility, MAX_DIVISIBILITY
        )));
    }

    let terms = request
        .terms
        .filter(|terms| terms.amount.is_some() || terms.cap.is_some())
        .map(|terms| Terms {
            amount: terms.amount,
            cap: terms.cap,
            height: (terms.height_start, terms.height_end),
            offset: (terms.offset_start, terms.offset_end),
        });

    let mintable = terms
        .map(|terms| safe_mul(terms.cap.unwrap_or(0), terms.amount.unwrap_or(0)))
        .transpose()
        .and_then(|mintable| safe_add(mintable.unwrap_or(0), request.premine))
        .map_err(|_| RuneTxError::InvalidEtching("total supply overflows".to_string()))?;

    if mintable == 0 {
        return Err(RuneTxError::InvalidEtching(
            "zero-supply etchings are valid on chain but refused by this builder: set a premine or mint terms"
                .to_string(),
        ));
    }

    Ok(EtchingMessage {
        rune_name: spaced_rune.to_string(),
        symbol: request.symbol,
        divisibility: (request.divisibility > 0).then_some(request.divisibility),
        premine: (request.premine > 0).then_some(request.premine),
        terms,
        turbo: request.turbo,
    })
}

/// Builds an etching funded by every entry of `utxos`.
///
/// # Errors
/// * [`RuneTxError::InvalidRuneName`] or [`RuneTxError::InvalidEtching`] for bad parameters.
/// * [`RuneTxError::InsufficientFunds`] when the inputs cannot pay the fee and leave a
///   non-dust change output.
pub fn build_etching<T: AsRef<Utxo>, C: RunestoneCodec + ?Sized>(
    codec: &C,
    config: &BuilderConfig,
    utxos: &[T],
    request: &EtchingRequest,
) -> Result<UnsignedRuneTransaction, RuneTxError> {
    let owner_script = script_for_address(&request.address, config.network)?;
    let message = RunestoneMessage::Etching(etching_message(request)?);
    let encoded = encode_message(codec, &message)?;

    let inputs = utxos
        .iter()
        .map(|utxo| PlannedInput::from_owned(utxo.as_ref(), &owner_script))
        .collect();

    let transaction = build_single_change(inputs, &encoded, owner_script, &request.fee_rate)?;

    info!(
        rune = %request.rune_name,
        fee = transaction.fee,
        "prepared etching"
    );

    Ok(transaction)
}
