//! Mock implementation of the `Transactor` trait for testing.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use hermes_settle::{Transactor, TransactorError};
use hermes_types::{HermesId, Identity, Promise};

/// One recorded call into a [`MockTransactor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactorCall {
    /// `settle_and_rebalance(hermes_id, provider, promise)`.
    SettleAndRebalance {
        hermes_id: HermesId,
        provider: Identity,
        promise: Promise,
    },
    /// `settle_with_beneficiary(provider, beneficiary, hermes_id, promise)`.
    SettleWithBeneficiary {
        provider: Identity,
        beneficiary: Identity,
        hermes_id: HermesId,
        promise: Promise,
    },
    /// `settle_into_stake(hermes_id, provider, promise)`.
    SettleIntoStake {
        hermes_id: HermesId,
        provider: Identity,
        promise: Promise,
    },
}

struct Inner {
    calls: Vec<TransactorCall>,
    should_fail: bool,
}

/// A mock implementation of [`Transactor`] for testing.
///
/// Records every call it receives instead of submitting anything, and can
/// be configured to reject every call with [`TransactorError`].
#[derive(Clone)]
pub struct MockTransactor {
    inner: Arc<Mutex<Inner>>,
}

impl Default for MockTransactor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransactor {
    /// A transactor that accepts every call.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                calls: Vec::new(),
                should_fail: false,
            })),
        }
    }

    /// Make every call fail with [`TransactorError`].
    pub fn with_failure(self) -> Self {
        self.inner.lock().unwrap().should_fail = true;
        self
    }

    /// Toggle failure mode at runtime.
    pub fn set_should_fail(&self, should_fail: bool) {
        self.inner.lock().unwrap().should_fail = should_fail;
    }

    /// Every call received so far, oldest first.
    pub fn calls(&self) -> Vec<TransactorCall> {
        self.inner.lock().unwrap().calls.clone()
    }

    /// Number of calls received so far.
    pub fn call_count(&self) -> usize {
        self.inner.lock().unwrap().calls.len()
    }

    fn record(&self, call: TransactorCall) -> Result<(), TransactorError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(call);
        if inner.should_fail {
            return Err(TransactorError::new("mock transactor configured to fail"));
        }
        Ok(())
    }
}

#[async_trait]
impl Transactor for MockTransactor {
    async fn settle_and_rebalance(
        &self,
        hermes_id: HermesId,
        provider: Identity,
        promise: Promise,
    ) -> Result<(), TransactorError> {
        self.record(TransactorCall::SettleAndRebalance {
            hermes_id,
            provider,
            promise,
        })
    }

    async fn settle_with_beneficiary(
        &self,
        provider: Identity,
        beneficiary: Identity,
        hermes_id: HermesId,
        promise: Promise,
    ) -> Result<(), TransactorError> {
        self.record(TransactorCall::SettleWithBeneficiary {
            provider,
            beneficiary,
            hermes_id,
            promise,
        })
    }

    async fn settle_into_stake(
        &self,
        hermes_id: HermesId,
        provider: Identity,
        promise: Promise,
    ) -> Result<(), TransactorError> {
        self.record(TransactorCall::SettleIntoStake {
            hermes_id,
            provider,
            promise,
        })
    }
}
