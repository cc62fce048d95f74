//! Pure channel-balance and settlement-threshold arithmetic.
//!
//! Every function here is a deterministic, side-effect-free computation over
//! [`hermes_types`] values. Nothing in this crate touches the network, a
//! lock, or the clock - that is the job of `hermes-settle`.

mod arithmetic;
mod threshold;

pub use arithmetic::{available, balance, earnings, lifetime, needs_settling, unsettled};
pub use threshold::{Threshold, ThresholdError};
