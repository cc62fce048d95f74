//! Mock implementation of the `ChainClient` trait for testing.
//!
//! Tracks configured channel state and fee per `(provider, hermes)` pair
//! in memory, and lets a test directly push `PromiseSettled` events to
//! whichever subscription is currently live for a pair.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tokio::sync::mpsc;

use hermes_settle::{ChainClient, ChainError, PromiseSettledEvent, PromiseSettledSubscription};
use hermes_types::{HermesId, Identity, ProviderChannel};

struct Inner {
    channels: HashMap<(Identity, HermesId), ProviderChannel>,
    fee_bps: u16,
    should_fail: bool,
    subscribers: HashMap<(Identity, HermesId), mpsc::Sender<PromiseSettledEvent>>,
}

/// A mock implementation of [`ChainClient`] for testing.
///
/// Uses `Arc<RwLock<...>>` internally, so it is cheap to clone and all
/// clones share the same state.
#[derive(Clone)]
pub struct MockChainClient {
    inner: Arc<RwLock<Inner>>,
}

impl Default for MockChainClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockChainClient {
    /// A chain with no configured channels and a zero fee.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                channels: HashMap::new(),
                fee_bps: 0,
                should_fail: false,
                subscribers: HashMap::new(),
            })),
        }
    }

    /// Configure the channel state returned for `(provider, hermes_id)`.
    pub fn with_channel(self, provider: Identity, hermes_id: HermesId, channel: ProviderChannel) -> Self {
        self.inner
            .write()
            .unwrap()
            .channels
            .insert((provider, hermes_id), channel);
        self
    }

    /// Configure the hermes operator fee, in basis points.
    pub fn with_fee(self, fee_bps: u16) -> Self {
        self.inner.write().unwrap().fee_bps = fee_bps;
        self
    }

    /// Make every call fail with [`ChainError`].
    pub fn with_failure(self) -> Self {
        self.inner.write().unwrap().should_fail = true;
        self
    }

    /// Replace the channel state for `(provider, hermes_id)` at runtime.
    pub fn set_channel(&self, provider: Identity, hermes_id: HermesId, channel: ProviderChannel) {
        self.inner
            .write()
            .unwrap()
            .channels
            .insert((provider, hermes_id), channel);
    }

    /// Toggle failure mode at runtime.
    pub fn set_should_fail(&self, should_fail: bool) {
        self.inner.write().unwrap().should_fail = should_fail;
    }

    /// Whether a subscription is currently live for `(provider, hermes_id)`.
    pub fn has_subscriber(&self, provider: Identity, hermes_id: HermesId) -> bool {
        self.inner
            .read()
            .unwrap()
            .subscribers
            .contains_key(&(provider, hermes_id))
    }

    /// Push a `PromiseSettled` event to the live subscription for
    /// `(provider, hermes_id)`, if any. Returns whether there was a
    /// subscriber to deliver to.
    pub async fn emit_promise_settled(
        &self,
        provider: Identity,
        hermes_id: HermesId,
        event: PromiseSettledEvent,
    ) -> bool {
        let sender = self
            .inner
            .read()
            .unwrap()
            .subscribers
            .get(&(provider, hermes_id))
            .cloned();
        match sender {
            Some(tx) => tx.send(event).await.is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    async fn get_provider_channel(
        &self,
        hermes_id: HermesId,
        provider: Identity,
        _pending: bool,
    ) -> Result<ProviderChannel, ChainError> {
        let inner = self.inner.read().unwrap();
        if inner.should_fail {
            return Err(ChainError::new("mock chain client configured to fail"));
        }
        Ok(inner
            .channels
            .get(&(provider, hermes_id))
            .cloned()
            .unwrap_or_else(|| ProviderChannel::zero(provider)))
    }

    async fn subscribe_promise_settled(
        &self,
        provider: Identity,
        hermes_id: HermesId,
    ) -> Result<PromiseSettledSubscription, ChainError> {
        if self.inner.read().unwrap().should_fail {
            return Err(ChainError::new("mock chain client configured to fail"));
        }
        let (tx, rx) = mpsc::channel(4);
        self.inner
            .write()
            .unwrap()
            .subscribers
            .insert((provider, hermes_id), tx);

        let inner = self.inner.clone();
        Ok(PromiseSettledSubscription::new(rx, move || {
            inner.write().unwrap().subscribers.remove(&(provider, hermes_id));
        }))
    }

    async fn get_hermes_fee(&self, _hermes_id: HermesId) -> Result<u16, ChainError> {
        let inner = self.inner.read().unwrap();
        if inner.should_fail {
            return Err(ChainError::new("mock chain client configured to fail"));
        }
        Ok(inner.fee_bps)
    }
}
