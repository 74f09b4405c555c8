/// Smallest value a non-`OP_RETURN` output may carry.
pub const DUST_LIMIT: u64 = 546;

/// Fixed transaction overhead used by the size model.
pub const TX_OVERHEAD_VBYTES: u64 = 10;

/// Size model cost of one input.
pub const INPUT_VBYTES: u64 = 148;

/// Size model cost of one output.
pub const OUTPUT_VBYTES: u64 = 34;

/// Largest divisibility the runes protocol accepts.
pub const MAX_DIVISIBILITY: u8 = 38;

/// Largest data push allowed by standardness; longer runestone payloads are split.
pub const MAX_PUSH_SIZE: usize = 520;

/// Etchings and mints produce an `OP_RETURN` plus one change output.
pub const SINGLE_CHANGE_OUTPUT_COUNT: usize = 2;

/// Transfers produce `OP_RETURN`, recipient, rune change and BTC change.
pub const TRANSFER_OUTPUT_COUNT: usize = 4;

pub const RECIPIENT_OUTPUT: u32 = 1;
pub const RUNE_CHANGE_OUTPUT: u32 = 2;
