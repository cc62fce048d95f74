//! Provider channel state and channel identifiers.

use hermes_crypto::{Hash, HermesId, Identity};
use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

/// Deterministic identifier for the on-chain channel between a provider and
/// a hermes, derived as `H(provider || hermes)`.
///
/// Stable for a given `(provider, hermes)` pair; used as the key into the
/// promise store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelId(pub Hash);

impl ChannelId {
    /// Derive the channel id for a `(provider, hermes)` pair.
    pub fn generate(provider: Identity, hermes: HermesId) -> Self {
        let mut buf = Vec::with_capacity(40);
        buf.extend_from_slice(provider.as_bytes());
        buf.extend_from_slice(hermes.as_bytes());
        Self(Hash::of(&buf))
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// On-chain channel state as read from the chain client.
///
/// Every amount field is optional: absence means the chain client had
/// nothing on record yet (a freshly opened or never-funded channel) and is
/// always treated as zero by [`hermes-econ`](https://docs.rs/hermes-econ).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderChannel {
    /// Funds available to settle, not yet moved to `settled`.
    pub balance: Option<BigUint>,
    /// Cumulative amount already settled on-chain.
    pub settled: Option<BigUint>,
    /// Amount currently staked by the provider.
    pub stake: Option<BigUint>,
    /// Target stake the provider is working towards.
    pub stake_goal: Option<BigUint>,
    /// Address that receives settled funds, if different from the provider.
    pub beneficiary: Identity,
}

impl ProviderChannel {
    /// Build a channel with all amounts at zero, e.g. for a never-funded
    /// provider.
    pub fn zero(beneficiary: Identity) -> Self {
        Self {
            balance: None,
            settled: None,
            stake: None,
            stake_goal: None,
            beneficiary,
        }
    }

    /// `balance`, coercing an absent value to zero.
    pub fn balance(&self) -> BigUint {
        self.balance.clone().unwrap_or_else(BigUint::zero)
    }

    /// `settled`, coercing an absent value to zero.
    pub fn settled(&self) -> BigUint {
        self.settled.clone().unwrap_or_else(BigUint::zero)
    }

    /// `stake`, coercing an absent value to zero.
    pub fn stake(&self) -> BigUint {
        self.stake.clone().unwrap_or_else(BigUint::zero)
    }

    /// `stake_goal`, coercing an absent value to zero.
    pub fn stake_goal(&self) -> BigUint {
        self.stake_goal.clone().unwrap_or_else(BigUint::zero)
    }
}
