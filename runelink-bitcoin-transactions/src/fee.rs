//! Size and fee model.
//!
//! Every input is costed as a legacy P2PKH spend and every output as a P2PKH output,
//! regardless of the scripts actually involved. The model overestimates segwit and taproot
//! spends, which errs towards overpaying.

use runelink_safe_math::MathError;

use crate::{
    constants::{INPUT_VBYTES, OUTPUT_VBYTES, TX_OVERHEAD_VBYTES},
    fee_rate::FeeRate,
};

/// `10 + 148 * inputs + 34 * outputs + message_len`.
pub fn estimate_virtual_size(input_count: usize, output_count: usize, message_len: usize) -> u64 {
    TX_OVERHEAD_VBYTES
        .saturating_add(INPUT_VBYTES.saturating_mul(input_count as u64))
        .saturating_add(OUTPUT_VBYTES.saturating_mul(output_count as u64))
        .saturating_add(message_len as u64)
}

/// `ceil(virtual_size * fee_rate)` in sats.
pub fn estimate_fee(virtual_size: u64, fee_rate: &FeeRate) -> Result<u64, MathError> {
    fee_rate
        .checked_fee(virtual_size)
        .map(|amount| amount.to_sat())
        .ok_or(MathError::MultiplicationOverflow)
}

/// Fee in sats for a transaction of the given shape.
pub fn estimate_fee_for(
    input_count: usize,
    output_count: usize,
    message_len: usize,
    fee_rate: &FeeRate,
) -> Result<u64, MathError> {
    estimate_fee(
        estimate_virtual_size(input_count, output_count, message_len),
        fee_rate,
    )
}
