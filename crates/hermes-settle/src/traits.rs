//! Collaborator trait contracts the settler is built against.
//!
//! None of these talk to a real blockchain or transactor from this crate -
//! that transport lives outside the settler entirely. `hermes-test-utils`
//! provides mock implementations for every trait here.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use num_bigint::BigUint;
use thiserror::Error;
use tokio::sync::mpsc;

use hermes_types::{HermesId, Identity, Promise, ProviderChannel};

/// A chain-client call failed.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ChainError(pub String);

impl ChainError {
    /// Wrap any displayable cause.
    pub fn new(cause: impl std::fmt::Display) -> Self {
        Self(cause.to_string())
    }
}

/// A transactor call failed.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransactorError(pub String);

impl TransactorError {
    /// Wrap any displayable cause.
    pub fn new(cause: impl std::fmt::Display) -> Self {
        Self(cause.to_string())
    }
}

/// A `PromiseSettled` event observed on-chain.
#[derive(Debug, Clone)]
pub struct PromiseSettledEvent {
    /// Transaction hash of the settlement.
    pub tx_hash: String,
    /// Amount settled in this transaction.
    pub amount: BigUint,
    /// Cumulative settled amount on the channel after this transaction.
    pub total_settled: BigUint,
}

/// A cancellation callback that can be shared and is safe to invoke more
/// than once - only the first call runs the underlying closure.
///
/// The settler needs this, rather than a plain `FnOnce` consumed by value,
/// because a subscription's cancel path can be reached from two independent
/// places: the waiter task that drains `events`, and the `settle` call that
/// owns the subscription and must cancel it immediately if the transactor
/// call fails.
#[derive(Clone)]
pub struct CancelHandle(Arc<Mutex<Option<Box<dyn FnOnce() + Send>>>>);

impl CancelHandle {
    /// Wrap a one-shot cancellation closure.
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self(Arc::new(Mutex::new(Some(Box::new(cancel)))))
    }

    /// Run the closure if it has not already run.
    pub fn cancel(&self) {
        if let Some(f) = self.0.lock().unwrap().take() {
            f();
        }
    }
}

/// A live subscription to `PromiseSettled` events for one `(provider,
/// hermes)` pair.
///
/// Dropping this without calling `cancel` is safe but the caller should
/// prefer an explicit cancel so the chain client can release the
/// subscription promptly.
pub struct PromiseSettledSubscription {
    /// Yields at most the events this channel was settled by.
    pub events: mpsc::Receiver<PromiseSettledEvent>,
    /// Releases the subscription. Safe to call from more than one place.
    pub cancel: CancelHandle,
}

impl PromiseSettledSubscription {
    /// Bundle a receiving end with its cancellation callback.
    pub fn new(
        events: mpsc::Receiver<PromiseSettledEvent>,
        cancel: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            events,
            cancel: CancelHandle::new(cancel),
        }
    }
}

/// Reads provider-channel state and subscribes to on-chain settlement
/// confirmations.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Fetch the current provider channel for `(hermes_id, provider)`.
    /// `pending` requests the pending (not yet mined) view when the chain
    /// client supports it.
    async fn get_provider_channel(
        &self,
        hermes_id: HermesId,
        provider: Identity,
        pending: bool,
    ) -> Result<ProviderChannel, ChainError>;

    /// Subscribe to `PromiseSettled` events for `(provider, hermes_id)`.
    async fn subscribe_promise_settled(
        &self,
        provider: Identity,
        hermes_id: HermesId,
    ) -> Result<PromiseSettledSubscription, ChainError>;

    /// Fetch the hermes operator's fee, in basis points.
    async fn get_hermes_fee(&self, hermes_id: HermesId) -> Result<u16, ChainError>;
}

/// Submits settlement transactions.
#[async_trait]
pub trait Transactor: Send + Sync {
    /// Settle `promise` and rebalance the channel to its stake goal.
    async fn settle_and_rebalance(
        &self,
        hermes_id: HermesId,
        provider: Identity,
        promise: Promise,
    ) -> Result<(), TransactorError>;

    /// Settle `promise`, paying out to `beneficiary` instead of the
    /// provider's own account.
    async fn settle_with_beneficiary(
        &self,
        provider: Identity,
        beneficiary: Identity,
        hermes_id: HermesId,
        promise: Promise,
    ) -> Result<(), TransactorError>;

    /// Settle `promise` into the provider's stake rather than paying out.
    async fn settle_into_stake(
        &self,
        hermes_id: HermesId,
        provider: Identity,
        promise: Promise,
    ) -> Result<(), TransactorError>;
}

/// Exposes the locally held identities the settler should track.
pub trait Keystore: Send + Sync {
    /// Every identity this node holds a key for.
    fn accounts(&self) -> Vec<Identity>;
}
