use std::fmt;

use runelink_indexer::RuneId;
use runelink_safe_math::MathError;
use thiserror::Error;

/// Position an output plays in a rune transaction. Used to report which output was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputRole {
    OpReturn,
    Recipient,
    RuneChange,
    BtcChange,
    /// The single change output of an etching or mint.
    Change,
}

impl fmt::Display for OutputRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputRole::OpReturn => "op_return",
            OutputRole::Recipient => "recipient",
            OutputRole::RuneChange => "rune_change",
            OutputRole::BtcChange => "btc_change",
            OutputRole::Change => "change",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoinSelectError {
    #[error("Insufficient funds: required {required} sats, available {available} sats")]
    InsufficientFunds { required: u64, available: u64 },

    #[error("Insufficient balance of rune {rune_id}: required {required}, available {available}")]
    InsufficientRuneBalance {
        rune_id: RuneId,
        required: u128,
        available: u128,
    },
}

/// Failures turning a runestone message into `OP_RETURN` bytes.
///
/// These are internal faults: the call is aborted rather than emitting a malformed
/// transaction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("Runestone codec returned no bytes")]
    Empty,

    #[error("Unrecognised runestone encoding: {0}")]
    UnrecognisedShape(String),

    #[error("Byte value at index {index} is out of range: {value}")]
    ByteOutOfRange { index: usize, value: String },

    #[error("Script is not an OP_RETURN OP_13 runestone")]
    NotARunestoneScript,

    #[error("Malformed runestone script: {0}")]
    MalformedScript(String),

    #[error("Runestone message rejected by codec: {0}")]
    InvalidMessage(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuneTxError {
    #[error("Insufficient balance of rune {rune_id}: required {required}, available {available}")]
    InsufficientRuneBalance {
        rune_id: RuneId,
        required: u128,
        available: u128,
    },

    #[error("Insufficient funds: required {required} sats, available {available} sats")]
    InsufficientFunds { required: u64, available: u64 },

    #[error("The {role} output would carry {value} sats, below the dust limit")]
    DustOutputRejected { role: OutputRole, value: u64 },

    #[error("Runestone encoding failed: {0}")]
    Encoding(#[from] EncodingError),

    #[error("Invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Invalid rune name {name}: {reason}")]
    InvalidRuneName { name: String, reason: String },

    #[error("Invalid etching: {0}")]
    InvalidEtching(String),

    #[error("The transfer amount must be greater than zero")]
    InvalidAmount,

    #[error("The fee rate must be a positive, finite number of sat/vB")]
    InvalidFeeRate,

    #[error("Failed to create PSBT: {0}")]
    Psbt(String),

    #[error("An arithmetic error ocurred")]
    MathError(#[from] MathError),
}

impl RuneTxError {
    /// Satoshis missing for an [`RuneTxError::InsufficientFunds`] failure.
    pub fn shortfall_sats(&self) -> Option<u64> {
        match self {
            RuneTxError::InsufficientFunds {
                required,
                available,
            } => Some(required.saturating_sub(*available)),
            _ => None,
        }
    }
}

impl From<CoinSelectError> for RuneTxError {
    fn from(error: CoinSelectError) -> Self {
        match error {
            CoinSelectError::InsufficientFunds {
                required,
                available,
            } => RuneTxError::InsufficientFunds {
                required,
                available,
            },
            CoinSelectError::InsufficientRuneBalance {
                rune_id,
                required,
                available,
            } => RuneTxError::InsufficientRuneBalance {
                rune_id,
                required,
                available,
            },
        }
    }
}

impl From<RuneTxError> for u32 {
    fn from(error: RuneTxError) -> u32 {
        match error {
            RuneTxError::InsufficientRuneBalance { .. } => 800,
            RuneTxError::InsufficientFunds { .. } => 801,
            RuneTxError::DustOutputRejected { .. } => 802,
            RuneTxError::Encoding(_) => 803,
            RuneTxError::InvalidAddress { .. } => 804,
            RuneTxError::InvalidRuneName { .. } => 805,
            RuneTxError::InvalidEtching(_) => 806,
            RuneTxError::InvalidAmount => 807,
            RuneTxError::InvalidFeeRate => 808,
            RuneTxError::Psbt(_) => 809,
            RuneTxError::MathError(_) => 810,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shortfall_is_required_minus_available() {
        let error = RuneTxError::InsufficientFunds {
            required: 2252,
            available: 2000,
        };
        assert_eq!(error.shortfall_sats(), Some(252));
        assert_eq!(RuneTxError::InvalidAmount.shortfall_sats(), None);
    }

    #[test]
    fn coin_select_errors_keep_their_figures() {
        let error: RuneTxError = CoinSelectError::InsufficientRuneBalance {
            rune_id: RuneId::new(840_000, 3),
            required: 1000,
            available: 900,
        }
        .into();

        assert_eq!(
            error,
            RuneTxError::InsufficientRuneBalance {
                rune_id: RuneId::new(840_000, 3),
                required: 1000,
                available: 900,
            }
        );
    }

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(
            u32::from(RuneTxError::InsufficientFunds {
                required: 1,
                available: 0
            }),
            801
        );
        assert_eq!(u32::from(RuneTxError::Encoding(EncodingError::Empty)), 803);
        assert_eq!(
            u32::from(RuneTxError::MathError(MathError::AdditionOverflow)),
            810
        );
    }

    #[test]
    fn dust_error_names_the_role() {
        let error = RuneTxError::DustOutputRejected {
            role: OutputRole::Recipient,
            value: 330,
        };
        assert_eq!(
            error.to_string(),
            "The recipient output would carry 330 sats, below the dust limit"
        );
    }
}
