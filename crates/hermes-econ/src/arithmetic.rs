//! `available` / `unsettled` / `balance` / `lifetime` and the settlement
//! threshold predicate.

use hermes_crypto::HermesId;
use hermes_types::{Earnings, HermesState, SettlementState, MYST};
use num_bigint::BigUint;
use num_traits::Zero;

use crate::threshold::Threshold;

fn safe_sub(a: &BigUint, b: &BigUint) -> BigUint {
    if a >= b {
        a - b
    } else {
        BigUint::zero()
    }
}

/// `channel.balance + channel.settled`.
pub fn available(state: &HermesState) -> BigUint {
    state.channel.balance() + state.channel.settled()
}

/// `max(0, lastPromise.amount - channel.settled)`.
pub fn unsettled(state: &HermesState) -> BigUint {
    safe_sub(&state.last_promise.amount, &state.channel.settled())
}

/// `available - lastPromise.amount`, clamped at zero.
pub fn balance(state: &HermesState) -> BigUint {
    safe_sub(&available(state), &state.last_promise.amount)
}

/// `lastPromise.amount`.
pub fn lifetime(state: &HermesState) -> BigUint {
    state.last_promise.amount.clone()
}

/// Sum `lifetime` and `unsettled` across every hermes of an identity.
pub fn earnings(state: &SettlementState) -> Earnings {
    let mut out = Earnings::default();
    for hermes in state.hermeses.values() {
        out.lifetime_balance += lifetime(hermes);
        out.unsettled_balance += unsettled(hermes);
    }
    out
}

/// Whether a provider's position on `hermes_id` has crossed the settlement
/// threshold.
///
/// See the module-level docs in `hermes-settle` for the full decision
/// table; this function implements it verbatim:
///
/// 1. Not registered, or a settlement is already in flight: never settle.
/// 2. Unknown hermes: never settle.
/// 3. Zero stake and less than 1 MYST unsettled: suppress (dust guard).
/// 4. `unsettled < floor(threshold * available)`: not yet due.
/// 5. Otherwise due if `balance <= floor(threshold * available)`.
pub fn needs_settling(state: &SettlementState, threshold: Threshold, hermes_id: HermesId) -> bool {
    if !state.registered || state.settle_in_progress {
        return false;
    }

    let Some(hermes) = state.hermeses.get(&hermes_id) else {
        return false;
    };

    if hermes.channel.stake().is_zero() && unsettled(hermes) < BigUint::from(MYST) {
        return false;
    }

    let cutoff = threshold.cutoff(&available(hermes));
    if unsettled(hermes) < cutoff {
        return false;
    }

    balance(hermes) <= cutoff
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_types::{ChannelId, HermesId, Identity, Promise, ProviderChannel};
    use std::collections::HashMap;

    fn channel_id() -> ChannelId {
        ChannelId::generate(Identity::from_bytes([1; 20]), HermesId::from_bytes([2; 20]))
    }

    fn hermes_state(balance: u64, settled: u64, stake: u64, promised: u64) -> HermesState {
        HermesState {
            channel: ProviderChannel {
                balance: Some(BigUint::from(balance)),
                settled: Some(BigUint::from(settled)),
                stake: Some(BigUint::from(stake)),
                stake_goal: None,
                beneficiary: Identity::from_bytes([9; 20]),
            },
            last_promise: Promise {
                amount: BigUint::from(promised),
                r: vec![],
                signature: vec![],
                channel_id: channel_id(),
            },
        }
    }

    #[test]
    fn derived_quantities_match_the_laws() {
        // balance=10^12, settled=9*10^6, promised=7*10^6
        let hs = hermes_state(1_000_000_000_000, 9_000_000, 0, 7_000_000);
        assert_eq!(available(&hs), BigUint::from(1_000_009_000_000u64));
        assert_eq!(unsettled(&hs), BigUint::from(0u64)); // 7e6 - 9e6 clamps to 0
        assert_eq!(
            balance(&hs),
            BigUint::from(1_000_009_000_000u64 - 7_000_000u64)
        );
    }

    #[test]
    fn unsettled_clamps_at_zero_when_settled_exceeds_promised() {
        let hs = hermes_state(0, 100, 0, 50);
        assert_eq!(unsettled(&hs), BigUint::zero());
    }

    #[test]
    fn dust_guard_blocks_sub_myst_unsettled_with_zero_stake() {
        let mut state = SettlementState {
            registered: true,
            settle_in_progress: false,
            hermeses: HashMap::new(),
        };
        let hermes_id = HermesId::from_bytes([2; 20]);
        // unsettled = MYST - 1
        state.hermeses.insert(
            hermes_id,
            hermes_state(MYST as u64 - 1, 0, 0, MYST as u64 - 1),
        );
        assert!(!needs_settling(&state, Threshold::new(0.1).unwrap(), hermes_id));
    }

    #[test]
    fn dust_guard_allows_exactly_one_myst() {
        let mut state = SettlementState {
            registered: true,
            settle_in_progress: false,
            hermeses: HashMap::new(),
        };
        let hermes_id = HermesId::from_bytes([2; 20]);
        state
            .hermeses
            .insert(hermes_id, hermes_state(0, 0, 0, MYST as u64));
        // balance = available(MYST) - promised(MYST) = 0 <= cutoff(0.1*MYST) -> settle
        assert!(needs_settling(&state, Threshold::new(0.1).unwrap(), hermes_id));
    }

    #[test]
    fn zero_threshold_triggers_on_any_unsettled_amount() {
        let mut state = SettlementState {
            registered: true,
            settle_in_progress: false,
            hermeses: HashMap::new(),
        };
        let hermes_id = HermesId::from_bytes([2; 20]);
        state
            .hermeses
            .insert(hermes_id, hermes_state(0, 0, 1, 10));
        assert!(needs_settling(&state, Threshold::new(0.0).unwrap(), hermes_id));
    }

    #[test]
    fn unregistered_never_settles() {
        let mut state = SettlementState {
            registered: false,
            settle_in_progress: false,
            hermeses: HashMap::new(),
        };
        let hermes_id = HermesId::from_bytes([2; 20]);
        state
            .hermeses
            .insert(hermes_id, hermes_state(0, 0, 1, 10));
        assert!(!needs_settling(&state, Threshold::new(0.0).unwrap(), hermes_id));
    }

    #[test]
    fn settle_in_progress_blocks() {
        let mut state = SettlementState {
            registered: true,
            settle_in_progress: true,
            hermeses: HashMap::new(),
        };
        let hermes_id = HermesId::from_bytes([2; 20]);
        state
            .hermeses
            .insert(hermes_id, hermes_state(0, 0, 1, 10));
        assert!(!needs_settling(&state, Threshold::new(0.0).unwrap(), hermes_id));
    }

    #[test]
    fn unknown_hermes_never_settles() {
        let state = SettlementState {
            registered: true,
            settle_in_progress: false,
            hermeses: HashMap::new(),
        };
        assert!(!needs_settling(
            &state,
            Threshold::new(0.5).unwrap(),
            HermesId::from_bytes([7; 20])
        ));
    }

    #[test]
    fn earnings_sums_across_hermeses() {
        let mut state = SettlementState {
            registered: true,
            settle_in_progress: false,
            hermeses: HashMap::new(),
        };
        state
            .hermeses
            .insert(HermesId::from_bytes([1; 20]), hermes_state(100, 10, 0, 50));
        state
            .hermeses
            .insert(HermesId::from_bytes([2; 20]), hermes_state(100, 20, 0, 60));
        let e = earnings(&state);
        assert_eq!(e.lifetime_balance, BigUint::from(110u64));
        assert_eq!(e.unsettled_balance, BigUint::from(80u64)); // (50-10) + (60-20)
    }

    #[test]
    fn scenario_s3_threshold_crossed_with_stake() {
        // balance=10000, stake=1000, lastPromise=8900 -> promise event amount=9000, threshold=0.1
        let hs = hermes_state(10_000, 0, 1_000, 9_000);
        // available = 10000, cutoff = floor(0.1*10000) = 1000
        // unsettled = 9000, balance = 10000-9000 = 1000 <= 1000 -> settle
        assert_eq!(balance(&hs), BigUint::from(1_000u64));
        let mut state = SettlementState {
            registered: true,
            settle_in_progress: false,
            hermeses: HashMap::new(),
        };
        let hermes_id = HermesId::from_bytes([2; 20]);
        state.hermeses.insert(hermes_id, hs);
        assert!(needs_settling(&state, Threshold::new(0.1).unwrap(), hermes_id));
    }

    #[test]
    fn scenario_s4_dust_guard_with_zero_stake() {
        // balance=10000, stake=0, lastPromise=8999, threshold=0.1 -> unsettled below 1 MYST but
        // also below the dust guard regardless of threshold crossing.
        let hs = hermes_state(10_000, 0, 0, 8_999);
        let mut state = SettlementState {
            registered: true,
            settle_in_progress: false,
            hermeses: HashMap::new(),
        };
        let hermes_id = HermesId::from_bytes([2; 20]);
        state.hermeses.insert(hermes_id, hs);
        assert!(!needs_settling(&state, Threshold::new(0.1).unwrap(), hermes_id));
    }
}
