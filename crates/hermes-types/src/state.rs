//! Per-identity and per-hermes settlement state.

use std::collections::HashMap;

use hermes_crypto::HermesId;

use crate::channel::ProviderChannel;
use crate::promise::Promise;

/// The provider channel and last-seen promise for one `(provider, hermes)`
/// pair.
///
/// Derived quantities (`available`, `unsettled`, `balance`, `lifetime`) are
/// intentionally kept out of this type - they are pure functions over it,
/// implemented in `hermes-econ`, so this crate stays free of arithmetic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HermesState {
    /// Channel state as last read from the chain.
    pub channel: ProviderChannel,
    /// Most recent promise seen for this channel.
    pub last_promise: Promise,
}

/// Settlement bookkeeping for a single provider identity.
#[derive(Debug, Clone, Default)]
pub struct SettlementState {
    /// Whether the registration-status provider has confirmed registration.
    pub registered: bool,
    /// Whether a settlement is currently in flight for this identity.
    ///
    /// At most one task may observe this as `true` across all settle call
    /// sites; the settler enforces that under its state lock.
    pub settle_in_progress: bool,
    /// Per-hermes channel state. Entries are added as hermeses are
    /// discovered and are never removed.
    pub hermeses: HashMap<HermesId, HermesState>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_unregistered_and_empty() {
        let state = SettlementState::default();
        assert!(!state.registered);
        assert!(!state.settle_in_progress);
        assert!(state.hermeses.is_empty());
    }
}
