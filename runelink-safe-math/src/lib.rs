//! Checked arithmetic for satoshi and rune amounts.
//!
//! Every helper returns [`MathError`] instead of wrapping or panicking, so fee and change
//! computations can be chained with `?`.

use num_traits::{CheckedAdd, CheckedMul, CheckedSub};
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathError {
    #[error("Addition overflow")]
    AdditionOverflow,

    #[error("Subtraction underflow")]
    SubtractionUnderflow,

    #[error("Multiplication overflow")]
    MultiplicationOverflow,
}

#[inline]
pub fn safe_add<T: CheckedAdd>(a: T, b: T) -> Result<T, MathError> {
    a.checked_add(&b).ok_or(MathError::AdditionOverflow)
}

#[inline]
pub fn safe_sub<T: CheckedSub>(a: T, b: T) -> Result<T, MathError> {
    a.checked_sub(&b).ok_or(MathError::SubtractionUnderflow)
}

#[inline]
pub fn safe_mul<T: CheckedMul>(a: T, b: T) -> Result<T, MathError> {
    a.checked_mul(&b).ok_or(MathError::MultiplicationOverflow)
}

/// Sums an iterator, failing on the first overflow.
pub fn safe_sum<T, I>(values: I) -> Result<T, MathError>
where
    T: CheckedAdd + Default,
    I: IntoIterator<Item = T>,
{
    values
        .into_iter()
        .try_fold(T::default(), |acc, value| safe_add(acc, value))
}
