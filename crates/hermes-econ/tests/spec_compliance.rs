//! End-to-end checks against the worked examples and boundary cases for
//! the settlement decision.

use hermes_econ::{available, balance, earnings, needs_settling, unsettled, Threshold};
use hermes_types::{ChannelId, HermesId, Identity, Promise, ProviderChannel};
use hermes_types::{HermesState, SettlementState, MYST};
use num_bigint::BigUint;
use std::collections::HashMap;

fn provider() -> Identity {
    Identity::from_bytes([0xAA; 20])
}

fn hermes_id() -> HermesId {
    HermesId::from_bytes([0xBB; 20])
}

fn state_with(
    balance: u128,
    settled: u128,
    stake: u128,
    promised: u128,
) -> (SettlementState, HermesId) {
    let hid = hermes_id();
    let channel_id = ChannelId::generate(provider(), hid);
    let hermes = HermesState {
        channel: ProviderChannel {
            balance: Some(BigUint::from(balance)),
            settled: Some(BigUint::from(settled)),
            stake: Some(BigUint::from(stake)),
            stake_goal: None,
            beneficiary: provider(),
        },
        last_promise: Promise {
            amount: BigUint::from(promised),
            r: vec![0xAB; 32],
            signature: vec![0xCD; 65],
            channel_id,
        },
    };
    let mut state = SettlementState {
        registered: true,
        settle_in_progress: false,
        hermeses: HashMap::new(),
    };
    state.hermeses.insert(hid, hermes);
    (state, hid)
}

/// A channel with 10 MYST available and nothing promised yet never settles,
/// no matter how low the threshold.
#[test]
fn never_settles_with_nothing_owed() {
    let (state, hid) = state_with(10 * MYST as u128, 0, 0, 0);
    assert!(!needs_settling(&state, Threshold::new(0.0).unwrap(), hid));
}

/// A provider who has crossed a 10% threshold with real stake settles.
#[test]
fn settles_once_balance_falls_to_the_cutoff() {
    let (state, hid) = state_with(10_000, 0, 1_000, 9_000);
    assert!(needs_settling(&state, Threshold::new(0.1).unwrap(), hid));
}

/// The same position one unit short of the cutoff does not settle yet.
#[test]
fn does_not_settle_one_unit_before_the_cutoff() {
    let (state, hid) = state_with(10_000, 0, 1_000, 8_999);
    assert!(!needs_settling(&state, Threshold::new(0.1).unwrap(), hid));
}

/// Dust guard: with no stake, unsettled earnings below 1 MYST are
/// suppressed even past the threshold.
#[test]
fn dust_guard_suppresses_sub_myst_unsettled_with_no_stake() {
    let (state, hid) = state_with(0, 0, 0, MYST as u128 - 1);
    assert!(!needs_settling(&state, Threshold::new(0.0).unwrap(), hid));
}

/// The dust guard does not apply once any stake is posted.
#[test]
fn dust_guard_does_not_apply_with_nonzero_stake() {
    let (state, hid) = state_with(0, 0, 1, MYST as u128 - 1);
    assert!(needs_settling(&state, Threshold::new(0.0).unwrap(), hid));
}

/// A settlement already in flight suppresses further settlement checks
/// for every hermes, regardless of balances.
#[test]
fn in_flight_settlement_suppresses_all_hermeses() {
    let (mut state, hid) = state_with(10_000, 0, 1_000, 9_000);
    state.settle_in_progress = true;
    assert!(!needs_settling(&state, Threshold::new(0.1).unwrap(), hid));
}

/// An unregistered identity never settles even with an eligible balance.
#[test]
fn unregistered_identity_never_settles() {
    let (mut state, hid) = state_with(10_000, 0, 1_000, 9_000);
    state.registered = false;
    assert!(!needs_settling(&state, Threshold::new(0.1).unwrap(), hid));
}

/// `available`, `unsettled`, and `balance` satisfy
/// `available == balance + settled` and `balance == available - promised`.
#[test]
fn derived_quantities_are_internally_consistent() {
    let (state, hid) = state_with(50_000, 5_000, 0, 20_000);
    let hermes = &state.hermeses[&hid];
    assert_eq!(available(hermes), BigUint::from(55_000u64));
    assert_eq!(unsettled(hermes), BigUint::from(15_000u64));
    assert_eq!(balance(hermes), BigUint::from(35_000u64));
}

/// `ProviderChannel` fields left absent (a never-funded channel) behave as
/// zero rather than panicking on subtraction.
#[test]
fn absent_channel_fields_behave_as_zero() {
    let hid = hermes_id();
    let channel_id = ChannelId::generate(provider(), hid);
    let hermes = HermesState {
        channel: ProviderChannel::zero(provider()),
        last_promise: Promise::zero(channel_id),
    };
    assert_eq!(available(&hermes), BigUint::from(0u64));
    assert_eq!(unsettled(&hermes), BigUint::from(0u64));
    assert_eq!(balance(&hermes), BigUint::from(0u64));
}

/// Aggregate earnings across hermeses sum lifetime and unsettled balances
/// independently per hermes before combining.
#[test]
fn earnings_aggregate_across_multiple_hermeses() {
    let (mut state, _) = state_with(50_000, 5_000, 0, 20_000);
    let second_hermes = HermesId::from_bytes([0xCC; 20]);
    let channel_id = ChannelId::generate(provider(), second_hermes);
    state.hermeses.insert(
        second_hermes,
        HermesState {
            channel: ProviderChannel {
                balance: Some(BigUint::from(10_000u64)),
                settled: Some(BigUint::from(1_000u64)),
                stake: None,
                stake_goal: None,
                beneficiary: provider(),
            },
            last_promise: Promise {
                amount: BigUint::from(4_000u64),
                r: vec![],
                signature: vec![],
                channel_id,
            },
        },
    );

    let totals = earnings(&state);
    // lifetime = 20_000 + 4_000, unsettled = (20_000-5_000) + (4_000-1_000)
    assert_eq!(totals.lifetime_balance, BigUint::from(24_000u64));
    assert_eq!(totals.unsettled_balance, BigUint::from(18_000u64));
}
