use std::fmt;

use bitcoin::Amount;

use crate::error::RuneTxError;

const MILLI: u64 = 1_000;

/// Fee rate in sat/vB.
///
/// Stored with milli-satoshi precision so `checked_fee` can round up in integer arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeeRate {
    msat_per_vb: u64,
}

impl FeeRate {
    pub fn from_sat_per_vb(sat_per_vb: u64) -> Result<Self, RuneTxError> {
        let msat_per_vb = sat_per_vb
            .checked_mul(MILLI)
            .ok_or(RuneTxError::InvalidFeeRate)?;

        if msat_per_vb == 0 {
            return Err(RuneTxError::InvalidFeeRate);
        }

        Ok(Self { msat_per_vb })
    }

    /// The rate in sat/vB.
    pub fn n(&self) -> f64 {
        self.msat_per_vb as f64 / MILLI as f64
    }

    /// `ceil(vsize * rate)`, or `None` on overflow.
    pub fn checked_fee(&self, vsize: u64) -> Option<Amount> {
        let msat = vsize.checked_mul(self.msat_per_vb)?;
        Some(Amount::from_sat(msat.div_ceil(MILLI)))
    }
}

impl TryFrom<f64> for FeeRate {
    type Error = RuneTxError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() || value <= 0.0 {
            return Err(RuneTxError::InvalidFeeRate);
        }

        let msat = (value * MILLI as f64).round();
        if msat < 1.0 || msat >= u64::MAX as f64 {
            return Err(RuneTxError::InvalidFeeRate);
        }

        Ok(Self {
            msat_per_vb: msat as u64,
        })
    }
}

impl fmt::Display for FeeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} sat/vB", self.n())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_rates() {
        assert_eq!(FeeRate::try_from(0.0), Err(RuneTxError::InvalidFeeRate));
        assert_eq!(FeeRate::try_from(-1.0), Err(RuneTxError::InvalidFeeRate));
        assert_eq!(FeeRate::try_from(f64::NAN), Err(RuneTxError::InvalidFeeRate));
        assert_eq!(
            FeeRate::try_from(f64::INFINITY),
            Err(RuneTxError::InvalidFeeRate)
        );
        assert_eq!(FeeRate::from_sat_per_vb(0), Err(RuneTxError::InvalidFeeRate));
    }

    #[test]
    fn fee_rounds_up() {
        let fee_rate = FeeRate::try_from(1.5).unwrap();
        assert_eq!(fee_rate.checked_fee(3), Some(Amount::from_sat(5)));
        assert_eq!(fee_rate.checked_fee(4), Some(Amount::from_sat(6)));
    }

    #[test]
    fn fractional_rates_are_exact() {
        let fee_rate = FeeRate::try_from(1.1).unwrap();
        assert_eq!(fee_rate.checked_fee(100), Some(Amount::from_sat(110)));
    }

    #[test]
    fn whole_rates_match_constructor() {
        assert_eq!(
            FeeRate::try_from(2.0).unwrap(),
            FeeRate::from_sat_per_vb(2).unwrap()
        );
        assert_eq!(FeeRate::from_sat_per_vb(2).unwrap().n(), 2.0);
    }

    #[test]
    fn overflow_is_reported() {
        let fee_rate = FeeRate::from_sat_per_vb(1_000).unwrap();
        assert_eq!(fee_rate.checked_fee(u64::MAX), None);
    }
}
