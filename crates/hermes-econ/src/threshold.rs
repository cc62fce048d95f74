//! Exact fractional-threshold arithmetic.
//!
//! `threshold` arrives as an `f64` in `[0, 1]`. Rather than multiplying into
//! a big-float approximation, we decompose the `f64` into its exact IEEE-754
//! rational value `mantissa * 2^exponent` (every finite `f64` has one) and
//! compute `floor(threshold * available)` with plain `BigUint` shifts. This
//! is exact - no mantissa-width tradeoff - and agrees bit-for-bit with a
//! rational `floor(num * available / den)` computation for any threshold
//! that is itself exactly representable as an `f64`.

use num_bigint::BigUint;
use thiserror::Error;

/// A validated settlement threshold in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Threshold(f64);

/// The threshold fraction was outside `[0, 1]`.
#[derive(Debug, Error)]
#[error("threshold must be within [0, 1], got {0}")]
pub struct ThresholdError(f64);

impl Threshold {
    /// Validate and wrap a threshold fraction.
    pub fn new(value: f64) -> Result<Self, ThresholdError> {
        if !(0.0..=1.0).contains(&value) || value.is_nan() {
            return Err(ThresholdError(value));
        }
        Ok(Self(value))
    }

    /// The underlying fraction.
    pub fn value(&self) -> f64 {
        self.0
    }

    /// `floor(self * available)`, computed exactly.
    pub fn cutoff(&self, available: &BigUint) -> BigUint {
        let (mantissa, exponent) = decompose(self.0);
        let product = mantissa * available;
        if exponent >= 0 {
            product << (exponent as u32)
        } else {
            product >> ((-exponent) as u32)
        }
    }
}

/// Decompose a non-negative finite `f64` into `mantissa * 2^exponent` with
/// `mantissa` an exact integer (53 bits or fewer).
fn decompose(x: f64) -> (BigUint, i32) {
    let bits = x.to_bits();
    let exponent_bits = ((bits >> 52) & 0x7FF) as i32;
    let mantissa_bits = bits & 0x000F_FFFF_FFFF_FFFF;

    if exponent_bits == 0 {
        // Zero or subnormal.
        (BigUint::from(mantissa_bits), -1074)
    } else {
        // Normalized: restore the implicit leading bit.
        let mantissa = mantissa_bits | (1u64 << 52);
        (BigUint::from(mantissa), exponent_bits - 1075)
    }
}
