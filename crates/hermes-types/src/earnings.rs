//! Aggregated earnings for an identity.

use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

/// Earnings aggregated across all of an identity's hermes channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Earnings {
    /// Sum of `lifetime` (last promised amount) across all hermeses.
    pub lifetime_balance: BigUint,
    /// Sum of `unsettled` (promised but not yet settled) across all hermeses.
    pub unsettled_balance: BigUint,
}

impl Default for Earnings {
    fn default() -> Self {
        Self {
            lifetime_balance: BigUint::zero(),
            unsettled_balance: BigUint::zero(),
        }
    }
}
