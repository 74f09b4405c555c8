//! Greedy largest-first coin selection.
//!
//! Bitcoin candidates are ordered by descending value, rune candidates by descending balance
//! of the requested rune. Ties are broken by outpoint so the same candidate set always yields
//! the same selection. Accumulation stops as soon as the target
//! is reached, so no selected entry is redundant under this ordering.

use std::{cmp::Ordering, collections::HashSet};

use bitcoin::OutPoint;
use runelink_indexer::{AvailableUtxo, RuneId, Utxo, UtxoFilter, UtxoWithRunes};
use tracing::debug;

use crate::error::CoinSelectError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitcoinSelection<T> {
    pub selected: Vec<T>,
    pub total_sats: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuneSelection<T> {
    pub selected: Vec<T>,
    /// Amount of the requested rune across `selected`.
    pub total_amount: u128,
    pub total_sats: u64,
}

fn largest_first(a: &Utxo, b: &Utxo) -> Ordering {
    b.value
        .cmp(&a.value)
        .then_with(|| a.outpoint().cmp(&b.outpoint()))
}

fn most_runes_first(a: &UtxoWithRunes, b: &UtxoWithRunes, rune_id: &RuneId) -> Ordering {
    b.rune_amount(rune_id)
        .cmp(&a.rune_amount(rune_id))
        .then_with(|| a.utxo.outpoint().cmp(&b.utxo.outpoint()))
}

/// Selects plain outputs until at least `target_sats` are gathered.
///
/// A target of zero selects nothing.
///
/// # Errors
/// * [`CoinSelectError::InsufficientFunds`] with the sum of every candidate as `available`.
pub fn select_for_bitcoin_amount<T: AsRef<Utxo> + Clone>(
    utxos: &[T],
    target_sats: u64,
) -> Result<BitcoinSelection<T>, CoinSelectError> {
    let mut utxo_indices: Vec<usize> = (0..utxos.len()).collect();
    utxo_indices.sort_by(|&a, &b| largest_first(utxos[a].as_ref(), utxos[b].as_ref()));

    let mut selected = Vec::new();
    let mut total_sats: u64 = 0;

    for index in utxo_indices {
        if total_sats >= target_sats {
            break;
        }

        let utxo = &utxos[index];
        total_sats = total_sats.saturating_add(utxo.as_ref().value);
        selected.push(utxo.clone());
    }

    if total_sats < target_sats {
        return Err(CoinSelectError::InsufficientFunds {
            required: target_sats,
            available: total_sats,
        });
    }

    debug!(
        target_sats,
        total_sats,
        selected = selected.len(),
        "selected bitcoin inputs"
    );

    Ok(BitcoinSelection {
        selected,
        total_sats,
    })
}

/// Selects outputs holding `rune_id` until at least `target_amount` of it is gathered.
///
/// Outputs that hold none of the rune are never selected. Outputs holding the most of
/// `rune_id` are taken first, whatever their sat value.
///
/// # Errors
/// * [`CoinSelectError::InsufficientRuneBalance`] with the total balance across all candidates.
pub fn select_for_rune_amount<T: AsRef<UtxoWithRunes> + Clone>(
    utxos: &[T],
    rune_id: &RuneId,
    target_amount: u128,
) -> Result<RuneSelection<T>, CoinSelectError> {
    let mut utxo_indices: Vec<usize> = (0..utxos.len())
        .filter(|&i| utxos[i].as_ref().rune_amount(rune_id) > 0)
        .collect();
    utxo_indices.sort_by(|&a, &b| most_runes_first(utxos[a].as_ref(), utxos[b].as_ref(), rune_id));

    let mut selected = Vec::new();
    let mut total_amount: u128 = 0;
    let mut total_sats: u64 = 0;

    for index in utxo_indices {
        if total_amount >= target_amount {
            break;
        }

        let utxo = utxos[index].as_ref();
        total_amount = total_amount.saturating_add(utxo.rune_amount(rune_id));
        total_sats = total_sats.saturating_add(utxo.utxo.value);
        selected.push(utxos[index].clone());
    }

    if total_amount < target_amount {
        return Err(CoinSelectError::InsufficientRuneBalance {
            rune_id: *rune_id,
            required: target_amount,
            available: total_amount,
        });
    }

    debug!(
        %rune_id,
        target_amount = %target_amount,
        total_amount = %total_amount,
        selected = selected.len(),
        "selected rune inputs"
    );

    Ok(RuneSelection {
        selected,
        total_amount,
        total_sats,
    })
}

/// Outputs from `available` that the filter allows and that are not already in `exclude`.
pub fn fee_candidates(
    available: &[AvailableUtxo],
    filter: &UtxoFilter,
    exclude: &HashSet<OutPoint>,
) -> Vec<AvailableUtxo> {
    available
        .iter()
        .filter(|utxo| utxo.is_spendable(filter))
        .filter(|utxo| !exclude.contains(&utxo.utxo.outpoint()))
        .cloned()
        .collect()
}
