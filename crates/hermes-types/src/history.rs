//! Settlement requests and write-once history entries.

use chrono::{DateTime, Utc};
use hermes_crypto::{HermesId, Identity};
use num_bigint::BigUint;

use crate::channel::ChannelId;
use crate::promise::Promise;

/// A promise received from a consumer, queued for settlement.
#[derive(Debug, Clone)]
pub struct ReceivedPromise {
    /// Provider the promise was issued to.
    pub provider: Identity,
    /// Hermes operator for the channel.
    pub hermes_id: HermesId,
    /// The decoded promise.
    pub promise: Promise,
    /// Beneficiary to receive settled funds.
    pub beneficiary: Identity,
}

/// A record of a completed on-chain settlement.
///
/// Write-once: appended to the history store after on-chain confirmation,
/// never mutated afterwards.
#[derive(Debug, Clone)]
pub struct SettlementHistoryEntry {
    /// On-chain transaction hash of the settlement.
    pub tx_hash: String,
    /// Provider that was settled.
    pub provider_id: Identity,
    /// Hermes operator that processed the settlement.
    pub hermes_id: HermesId,
    /// Channel address that was settled.
    pub channel_address: ChannelId,
    /// Wall-clock time the confirmation was observed, UTC.
    pub time: DateTime<Utc>,
    /// The promise that was settled.
    pub promise: Promise,
    /// Beneficiary that received the funds.
    pub beneficiary: Identity,
    /// Amount settled in this transaction.
    pub amount: BigUint,
    /// Cumulative settled amount on the channel after this transaction.
    pub total_settled: BigUint,
}
