//! The settler itself: per-provider settlement state, the event handlers
//! that keep it in sync, and the settlement critical section.
//!
//! # Concurrency
//!
//! All mutable state lives behind one [`std::sync::RwLock`] keyed by
//! provider [`Identity`]. No collaborator call (chain, transactor,
//! storage, event bus) ever happens while that lock is held - every method
//! below takes it only for the plain in-memory read or write, and releases
//! it before awaiting anything. `settle_in_progress` is checked and set in
//! a single write-lock acquisition, which is what makes concurrent settle
//! requests for the same provider serialize correctly instead of racing.
//!
//! Settlement requests that come off the event bus never block their
//! handler: they are handed to a bounded channel, and when that channel is
//! full the handler spawns a task to wait for a free slot rather than
//! stalling the topic's dispatch worker.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;
use tokio::sync::{mpsc, oneshot, watch, Mutex as AsyncMutex};
use tracing::{debug, error, info, warn};

use hermes_econ::{earnings as aggregate_earnings, needs_settling};
use hermes_store::{HistoryStore, PromiseStore, RegistrationStatusProvider};
use hermes_types::{
    ChannelId, Earnings, HermesId, HermesState, Identity, Promise, ReceivedPromise,
    SettlementHistoryEntry, SettlementState,
};

use crate::config::SettlerConfig;
use crate::error::{SettleError, SettleResult};
use crate::event::{
    EarningsChangedEvent, EventBus, Handler, HermesPromiseEvent, NodeLifecycleEvent,
    NodeLifecycleStatus, RegistrationEvent, ServiceRunStatus, ServiceStatusEvent,
    SettlementRequestEvent,
};
use crate::traits::{ChainClient, Keystore, PromiseSettledEvent, PromiseSettledSubscription, Transactor};
use hermes_store::RegistrationStatus;

/// How many settlement requests may be queued waiting for the dispatcher.
/// Deliberately small: a provider with a backlog this deep has a bigger
/// problem than queue depth.
const SETTLE_QUEUE_CAPACITY: usize = 5;

/// Which transactor entry point a `settle` call should use.
#[derive(Clone)]
enum SettleVariant {
    AndRebalance,
    WithBeneficiary(Identity),
    IntoStake,
}

enum WaiterOutcome {
    Stopped,
    Closed,
    Settled(PromiseSettledEvent),
    TimedOut,
}

async fn wait_for_stop(rx: &mut watch::Receiver<bool>) {
    if *rx.borrow() {
        return;
    }
    let _ = rx.changed().await;
}

/// Per-provider settlement state, synced with the chain and driven by the
/// node's event bus.
///
/// Construct with [`Settler::new`], call [`Settler::subscribe`] once to
/// wire up the event handlers, then publish `node.lifecycle::Started` to
/// start the settlement dispatcher and the initial per-account state load.
pub struct Settler {
    config: SettlerConfig,
    chain: Arc<dyn ChainClient>,
    transactor: Arc<dyn Transactor>,
    promises: Arc<dyn PromiseStore>,
    history: Arc<dyn HistoryStore>,
    registrations: Arc<dyn RegistrationStatusProvider>,
    keystore: Arc<dyn Keystore>,
    bus: Arc<dyn EventBus>,
    state: RwLock<HashMap<Identity, SettlementState>>,
    settle_tx: mpsc::Sender<ReceivedPromise>,
    settle_rx: AsyncMutex<Option<mpsc::Receiver<ReceivedPromise>>>,
    stop_tx: watch::Sender<bool>,
    // Kept alive purely so `stop_tx.send` can never fail for lack of a
    // receiver; every other receiver is obtained by `.clone()`ing it.
    _stop_rx: watch::Receiver<bool>,
}

impl Settler {
    /// Build a settler around its collaborators. Returns an `Arc` because
    /// every handler spawned by `subscribe` needs to outlive the call that
    /// registered it.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: SettlerConfig,
        chain: Arc<dyn ChainClient>,
        transactor: Arc<dyn Transactor>,
        promises: Arc<dyn PromiseStore>,
        history: Arc<dyn HistoryStore>,
        registrations: Arc<dyn RegistrationStatusProvider>,
        keystore: Arc<dyn Keystore>,
        bus: Arc<dyn EventBus>,
    ) -> Arc<Self> {
        let (settle_tx, settle_rx) = mpsc::channel(SETTLE_QUEUE_CAPACITY);
        let (stop_tx, stop_rx) = watch::channel(false);
        Arc::new(Self {
            config,
            chain,
            transactor,
            promises,
            history,
            registrations,
            keystore,
            bus,
            state: RwLock::new(HashMap::new()),
            settle_tx,
            settle_rx: AsyncMutex::new(Some(settle_rx)),
            stop_tx,
            _stop_rx: stop_rx,
        })
    }

    /// Register handlers on every topic the settler consumes: node
    /// lifecycle, identity registration, service status, settlement
    /// request, and hermes promise, in that order. Each handler holds only
    /// a weak reference back to the settler, so the bus subscription does
    /// not keep it alive past the last strong `Arc`.
    pub async fn subscribe(self: &Arc<Self>) -> Result<(), crate::event::EventBusError> {
        let weak = Arc::downgrade(self);
        let handler = weak.clone();
        self.bus
            .subscribe_node_lifecycle(Arc::new(move |event: NodeLifecycleEvent| {
                let handler = handler.clone();
                Box::pin(async move {
                    if let Some(settler) = handler.upgrade() {
                        settler.handle_node_lifecycle(event);
                    }
                })
            }) as Handler<NodeLifecycleEvent>)
            .await?;

        let handler = weak.clone();
        self.bus
            .subscribe_registration(Arc::new(move |event: RegistrationEvent| {
                let handler = handler.clone();
                Box::pin(async move {
                    if let Some(settler) = handler.upgrade() {
                        settler.handle_registration(event).await;
                    }
                })
            }) as Handler<RegistrationEvent>)
            .await?;

        let handler = weak.clone();
        self.bus
            .subscribe_service_status(Arc::new(move |event: ServiceStatusEvent| {
                let handler = handler.clone();
                Box::pin(async move {
                    if let Some(settler) = handler.upgrade() {
                        settler.handle_service_status(event).await;
                    }
                })
            }) as Handler<ServiceStatusEvent>)
            .await?;

        let handler = weak.clone();
        self.bus
            .subscribe_settlement_request(Arc::new(move |event: SettlementRequestEvent| {
                let handler = handler.clone();
                Box::pin(async move {
                    if let Some(settler) = handler.upgrade() {
                        settler.handle_settlement_request(event).await;
                    }
                })
            }) as Handler<SettlementRequestEvent>)
            .await?;

        let handler = weak;
        self.bus
            .subscribe_hermes_promise(Arc::new(move |event: HermesPromiseEvent| {
                let handler = handler.clone();
                Box::pin(async move {
                    if let Some(settler) = handler.upgrade() {
                        settler.handle_hermes_promise(event).await;
                    }
                })
            }) as Handler<HermesPromiseEvent>)
            .await?;

        Ok(())
    }

    // ---- lifecycle -----------------------------------------------------

    fn handle_node_lifecycle(self: Arc<Self>, event: NodeLifecycleEvent) {
        match event.status {
            NodeLifecycleStatus::Started => self.handle_node_start(),
            NodeLifecycleStatus::Stopped => self.handle_node_stop(),
        }
    }

    fn handle_node_start(self: Arc<Self>) {
        tokio::spawn(self.clone().run_dispatcher());
        for id in self.keystore.accounts() {
            let settler = self.clone();
            tokio::spawn(async move {
                if let Err(e) = settler.load_initial_state(id).await {
                    error!(provider = %id, error = %e, "could not load initial state");
                }
            });
        }
    }

    fn handle_node_stop(&self) {
        // `watch::Sender::send` only errs if every receiver was dropped;
        // `_stop_rx` guarantees that never happens. Sending `true` twice,
        // e.g. from a duplicate Stopped event, is harmless.
        let _ = self.stop_tx.send(true);
    }

    async fn run_dispatcher(self: Arc<Self>) {
        let Some(mut rx) = self.settle_rx.lock().await.take() else {
            warn!("settlement dispatcher already running, ignoring duplicate start");
            return;
        };
        let mut stop_rx = self.stop_tx.subscribe();
        info!("listening for settlement requests");
        loop {
            tokio::select! {
                _ = wait_for_stop(&mut stop_rx) => break,
                item = rx.recv() => {
                    match item {
                        Some(item) => {
                            let settler = self.clone();
                            tokio::spawn(async move { settler.run_settle_and_rebalance(item).await; });
                        }
                        None => break,
                    }
                }
            }
        }
        info!("stopped listening for settlement requests");
    }

    async fn run_settle_and_rebalance(self: Arc<Self>, item: ReceivedPromise) {
        let provider = item.provider;
        let hermes_id = item.hermes_id;
        let result = self
            .settle(
                item.provider,
                item.hermes_id,
                item.promise,
                item.beneficiary,
                SettleVariant::AndRebalance,
            )
            .await;
        if let Err(e) = result {
            error!(provider = %provider, hermes = %hermes_id, error = %e, "could not settle promise");
        }
    }

    // ---- state loading ---------------------------------------------------

    /// Idempotent: a provider already in `currentState` is left untouched.
    ///
    /// The idempotency check and the registration-status query are two
    /// separate steps rather than one held lock, so the external call
    /// never happens with the state lock taken; a racing second call for
    /// the same `id` can redundantly resync, which is harmless because
    /// `resync_state` itself is idempotent.
    pub async fn load_initial_state(&self, id: Identity) -> SettleResult<()> {
        {
            let state = self.state.read().unwrap();
            if state.contains_key(&id) {
                return Ok(());
            }
        }

        let status = self
            .registrations
            .get_registration_status(id)
            .await
            .map_err(SettleError::storage_unavailable)?;
        if !status.is_registered() {
            return Ok(());
        }

        self.resync_state(id, self.config.hermes_address).await
    }

    /// Re-read `(id, hermes_id)` from the chain, fold it into
    /// `currentState`, and publish `earnings.changed` with the before/after
    /// aggregate snapshot.
    pub async fn resync_state(&self, id: Identity, hermes_id: HermesId) -> SettleResult<()> {
        let channel = self
            .chain
            .get_provider_channel(hermes_id, id, true)
            .await
            .map_err(SettleError::chain_unavailable)?;

        let channel_id = ChannelId::generate(id, hermes_id);
        let last_promise = match self
            .promises
            .get(channel_id)
            .await
            .map_err(SettleError::storage_unavailable)?
        {
            Some(stored) => stored.decode().map_err(SettleError::storage_unavailable)?,
            None => Promise::zero(channel_id),
        };

        let (previous, current) = {
            let mut state = self.state.write().unwrap();
            let entry = state.entry(id).or_default();
            let previous = aggregate_earnings(entry);
            entry.registered = true;
            entry.hermeses.insert(hermes_id, HermesState { channel, last_promise });
            let current = aggregate_earnings(entry);
            (previous, current)
        };

        self.publish_earnings_changed(id, previous, current);
        Ok(())
    }

    fn publish_earnings_changed(&self, identity: Identity, previous: Earnings, current: Earnings) {
        let bus = self.bus.clone();
        tokio::spawn(async move {
            bus.publish_earnings_changed(EarningsChangedEvent { identity, previous, current })
                .await;
        });
    }

    // ---- event handlers -------------------------------------------------

    async fn handle_registration(&self, event: RegistrationEvent) {
        if event.status != RegistrationStatus::Registered {
            debug!(id = %event.id, status = ?event.status, "ignoring non-Registered status");
            return;
        }
        if let Err(e) = self.resync_state(event.id, self.config.hermes_address).await {
            error!(id = %event.id, error = %e, "could not resync state after registration");
        }
    }

    async fn handle_service_status(&self, event: ServiceStatusEvent) {
        if event.status != ServiceRunStatus::Running {
            debug!(provider = %event.provider_id, "ignoring non-Running service status");
            return;
        }
        if let Err(e) = self.load_initial_state(event.provider_id).await {
            error!(provider = %event.provider_id, error = %e, "could not load initial state");
        }
    }

    async fn handle_settlement_request(self: Arc<Self>, event: SettlementRequestEvent) {
        if let Err(e) = self.force_settle(event.provider_id, event.hermes_id).await {
            error!(provider = %event.provider_id, hermes = %event.hermes_id, error = %e, "could not settle promise");
        }
    }

    async fn handle_hermes_promise(self: Arc<Self>, event: HermesPromiseEvent) {
        let HermesPromiseEvent {
            provider_id,
            hermes_id,
            promise,
        } = event;

        let needs_resync = {
            let state = self.state.read().unwrap();
            match state.get(&provider_id) {
                None => {
                    error!(provider = %provider_id, "have no info on provider, skipping promise");
                    return;
                }
                Some(s) if !s.registered => {
                    error!(provider = %provider_id, "provider is not registered, skipping promise");
                    return;
                }
                Some(s) => !s.hermeses.contains_key(&hermes_id),
            }
        };

        if needs_resync {
            if let Err(e) = self.resync_state(provider_id, hermes_id).await {
                error!(provider = %provider_id, hermes = %hermes_id, error = %e, "could not sync state");
                return;
            }
        }

        let (previous, current, hermes_after) = {
            let mut state = self.state.write().unwrap();
            let Some(entry) = state.get_mut(&provider_id) else {
                return;
            };
            let previous = aggregate_earnings(entry);
            let Some(hermes) = entry.hermeses.get_mut(&hermes_id) else {
                return;
            };
            hermes.last_promise = promise;
            let current = aggregate_earnings(entry);
            let hermes_after = entry.hermeses.get(&hermes_id).cloned();
            (previous, current, hermes_after)
        };
        let Some(hermes_after) = hermes_after else {
            return;
        };

        self.publish_earnings_changed(provider_id, previous, current);

        let should_settle = {
            let state = self.state.read().unwrap();
            state
                .get(&provider_id)
                .map(|s| needs_settling(s, self.config.threshold, hermes_id))
                .unwrap_or(false)
        };
        if !should_settle {
            return;
        }

        let stake = hermes_after.channel.stake();
        let stake_goal = hermes_after.channel.stake_goal();
        let wants_stake_topup = hermes_after.channel.stake.is_some()
            && hermes_after.channel.stake_goal.is_some()
            && stake < stake_goal;

        if wants_stake_topup {
            let settler = self.clone();
            tokio::spawn(async move {
                if let Err(e) = settler.settle_into_stake(provider_id, hermes_id).await {
                    error!(provider = %provider_id, hermes = %hermes_id, error = %e, "could not settle into stake");
                }
            });
        } else {
            self.initiate_settling(provider_id, hermes_id, hermes_after.channel.beneficiary).await;
        }
    }

    /// Fetch the latest stored promise and hand it to the dispatcher.
    /// Enqueuing never blocks the caller: if the queue is momentarily
    /// full, the send is handed to its own task instead of stalling
    /// whichever event handler got here.
    async fn initiate_settling(&self, provider: Identity, hermes_id: HermesId, beneficiary: Identity) {
        let channel_id = ChannelId::generate(provider, hermes_id);
        let stored = match self.promises.get(channel_id).await {
            Ok(Some(p)) => p,
            Ok(None) => {
                debug!(provider = %provider, hermes = %hermes_id, "no stored promise to settle");
                return;
            }
            Err(e) => {
                error!(provider = %provider, error = %e, "could not read promise from storage");
                return;
            }
        };
        let promise = match stored.decode() {
            Ok(p) => p,
            Err(e) => {
                error!(provider = %provider, error = %e, "could not decode promise r");
                return;
            }
        };

        let item = ReceivedPromise {
            provider,
            hermes_id,
            promise,
            beneficiary,
        };
        let tx = self.settle_tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(item).await;
        });
    }

    // ---- settlement critical section -------------------------------------

    /// Serializes concurrent settle requests for one provider, drives the
    /// transactor, and waits for on-chain confirmation.
    ///
    /// The in-progress flag is checked and set in a single write-lock
    /// acquisition; a second caller arriving between the check and the set
    /// is impossible by construction, unlike a check-then-act pair of
    /// separately locked calls.
    async fn settle(
        self: &Arc<Self>,
        provider: Identity,
        hermes_id: HermesId,
        promise: Promise,
        beneficiary: Identity,
        variant: SettleVariant,
    ) -> SettleResult<()> {
        {
            let mut state = self.state.write().unwrap();
            let entry = state.entry(provider).or_default();
            if entry.settle_in_progress {
                return Err(SettleError::AlreadySettling);
            }
            entry.settle_in_progress = true;
        }

        let subscription = match self.chain.subscribe_promise_settled(provider, hermes_id).await {
            Ok(sub) => sub,
            Err(e) => {
                self.clear_settling(provider);
                return Err(SettleError::chain_unavailable(e));
            }
        };
        let PromiseSettledSubscription { mut events, cancel } = subscription;

        let (result_tx, result_rx) = oneshot::channel();
        let waiter_self = Arc::clone(self);
        let mut stop_rx = self.stop_tx.subscribe();
        let max_wait = self.config.max_wait_for_settlement;
        let waiter_cancel = cancel.clone();
        let channel_id = ChannelId::generate(provider, hermes_id);
        let promise_for_history = promise.clone();

        tokio::spawn(async move {
            let outcome = tokio::select! {
                _ = wait_for_stop(&mut stop_rx) => WaiterOutcome::Stopped,
                maybe_event = events.recv() => match maybe_event {
                    Some(settled) => WaiterOutcome::Settled(settled),
                    None => WaiterOutcome::Closed,
                },
                _ = tokio::time::sleep(max_wait) => WaiterOutcome::TimedOut,
            };

            waiter_cancel.cancel();
            waiter_self.clear_settling(provider);

            match outcome {
                WaiterOutcome::Stopped => {
                    // Node is shutting down; return silently without
                    // resolving the caller's result channel, matching a
                    // cancelled-in-flight settlement rather than a failure.
                }
                WaiterOutcome::Closed => {
                    let _ = result_tx.send(Ok(()));
                }
                WaiterOutcome::Settled(settled) => {
                    let entry = SettlementHistoryEntry {
                        tx_hash: settled.tx_hash,
                        provider_id: provider,
                        hermes_id,
                        channel_address: channel_id,
                        time: Utc::now(),
                        promise: promise_for_history,
                        beneficiary,
                        amount: settled.amount,
                        total_settled: settled.total_settled,
                    };
                    if let Err(e) = waiter_self.history.store(entry).await {
                        error!(provider = %provider, error = %e, "could not store settlement history");
                    }
                    if let Err(e) = waiter_self.resync_state(provider, hermes_id).await {
                        error!(provider = %provider, hermes = %hermes_id, error = %e, "could not resync state after settlement");
                    }
                    let _ = result_tx.send(Ok(()));
                }
                WaiterOutcome::TimedOut => {
                    let _ = result_tx.send(Err(SettleError::SettleTimeout));
                }
            }
        });

        let transactor_result = match variant {
            SettleVariant::AndRebalance => {
                self.transactor.settle_and_rebalance(hermes_id, provider, promise).await
            }
            SettleVariant::WithBeneficiary(b) => {
                self.transactor.settle_with_beneficiary(provider, b, hermes_id, promise).await
            }
            SettleVariant::IntoStake => {
                self.transactor.settle_into_stake(hermes_id, provider, promise).await
            }
        };

        if let Err(e) = transactor_result {
            cancel.cancel();
            self.clear_settling(provider);
            return Err(SettleError::transactor_rejected(e));
        }

        match result_rx.await {
            Ok(result) => result,
            // Waiter exited without answering, i.e. the node stopped while
            // we were waiting for confirmation. Treat it as a graceful
            // no-op rather than surfacing a spurious error.
            Err(_) => Ok(()),
        }
    }

    fn clear_settling(&self, provider: Identity) {
        if let Some(entry) = self.state.write().unwrap().get_mut(&provider) {
            entry.settle_in_progress = false;
        }
    }

    async fn fetch_promise_and_beneficiary(
        &self,
        provider: Identity,
        hermes_id: HermesId,
    ) -> SettleResult<(Promise, Identity)> {
        let channel_id = ChannelId::generate(provider, hermes_id);
        let stored = self
            .promises
            .get(channel_id)
            .await
            .map_err(SettleError::storage_unavailable)?;
        let Some(stored) = stored else {
            return Err(SettleError::NothingToSettle);
        };
        let promise = stored.decode().map_err(SettleError::storage_unavailable)?;

        let beneficiary = self
            .state
            .read()
            .unwrap()
            .get(&provider)
            .and_then(|s| s.hermeses.get(&hermes_id))
            .map(|h| h.channel.beneficiary)
            .unwrap_or(provider);

        Ok((promise, beneficiary))
    }

    // ---- public operations ------------------------------------------------

    /// Aggregated earnings across every hermes known for `id`. An identity
    /// the settler has no state for reports zero earnings rather than an
    /// error.
    pub fn get_earnings(&self, id: Identity) -> Earnings {
        self.state
            .read()
            .unwrap()
            .get(&id)
            .map(aggregate_earnings)
            .unwrap_or_default()
    }

    /// The hermes operator's current fee, in basis points.
    pub async fn get_hermes_fee(&self, hermes_id: HermesId) -> SettleResult<u16> {
        self.chain.get_hermes_fee(hermes_id).await.map_err(SettleError::chain_unavailable)
    }

    /// Settle `(provider, hermes_id)` immediately, bypassing the threshold
    /// check, and rebalance the channel to its stake goal.
    pub async fn force_settle(self: &Arc<Self>, provider: Identity, hermes_id: HermesId) -> SettleResult<()> {
        let (promise, beneficiary) = self.fetch_promise_and_beneficiary(provider, hermes_id).await?;
        self.settle(provider, hermes_id, promise, beneficiary, SettleVariant::AndRebalance).await
    }

    /// Settle `(provider, hermes_id)`, paying out to `beneficiary` instead
    /// of whatever beneficiary is on record.
    pub async fn settle_with_beneficiary(
        self: &Arc<Self>,
        provider: Identity,
        hermes_id: HermesId,
        beneficiary: Identity,
    ) -> SettleResult<()> {
        let (promise, _) = self.fetch_promise_and_beneficiary(provider, hermes_id).await?;
        self.settle(provider, hermes_id, promise, beneficiary, SettleVariant::WithBeneficiary(beneficiary))
            .await
    }

    /// Settle `(provider, hermes_id)` into the provider's stake rather than
    /// paying it out.
    pub async fn settle_into_stake(self: &Arc<Self>, provider: Identity, hermes_id: HermesId) -> SettleResult<()> {
        let (promise, beneficiary) = self.fetch_promise_and_beneficiary(provider, hermes_id).await?;
        self.settle(provider, hermes_id, promise, beneficiary, SettleVariant::IntoStake).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::TokioEventBus;
    use crate::traits::{CancelHandle, TransactorError};
    use async_trait::async_trait;
    use hermes_store::{InMemoryHistoryStore, InMemoryPromiseStore, InMemoryRegistrationStatusProvider};
    use hermes_types::{ProviderChannel, StoredPromise};
    use num_bigint::BigUint;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct StubChain {
        channel: ProviderChannel,
        fee: u16,
        // Keeps every subscription's sender alive for as long as the chain
        // itself lives, so `events.recv()` blocks instead of immediately
        // observing a closed channel.
        senders: std::sync::Mutex<Vec<mpsc::Sender<PromiseSettledEvent>>>,
    }

    impl StubChain {
        fn new(channel: ProviderChannel, fee: u16) -> Self {
            Self {
                channel,
                fee,
                senders: std::sync::Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChainClient for StubChain {
        async fn get_provider_channel(
            &self,
            _hermes_id: HermesId,
            _provider: Identity,
            _pending: bool,
        ) -> Result<ProviderChannel, crate::traits::ChainError> {
            Ok(self.channel.clone())
        }

        async fn subscribe_promise_settled(
            &self,
            _provider: Identity,
            _hermes_id: HermesId,
        ) -> Result<PromiseSettledSubscription, crate::traits::ChainError> {
            let (tx, rx) = mpsc::channel(1);
            self.senders.lock().unwrap().push(tx);
            Ok(PromiseSettledSubscription {
                events: rx,
                cancel: CancelHandle::new(|| {}),
            })
        }

        async fn get_hermes_fee(&self, _hermes_id: HermesId) -> Result<u16, crate::traits::ChainError> {
            Ok(self.fee)
        }
    }

    struct CountingTransactor {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Transactor for CountingTransactor {
        async fn settle_and_rebalance(&self, _: HermesId, _: Identity, _: Promise) -> Result<(), TransactorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn settle_with_beneficiary(
            &self,
            _: Identity,
            _: Identity,
            _: HermesId,
            _: Promise,
        ) -> Result<(), TransactorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn settle_into_stake(&self, _: HermesId, _: Identity, _: Promise) -> Result<(), TransactorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct NoKeys;
    impl Keystore for NoKeys {
        fn accounts(&self) -> Vec<Identity> {
            Vec::new()
        }
    }

    fn provider() -> Identity {
        Identity::from_bytes([1; 20])
    }

    fn hermes() -> HermesId {
        HermesId::from_bytes([2; 20])
    }

    fn make_settler(
        channel: ProviderChannel,
        fee: u16,
    ) -> (Arc<Settler>, Arc<InMemoryPromiseStore>, Arc<InMemoryHistoryStore>, Arc<InMemoryRegistrationStatusProvider>) {
        let config = SettlerConfig::new(hermes(), 0.1, Duration::from_millis(200)).unwrap();
        let promises = Arc::new(InMemoryPromiseStore::new());
        let history = Arc::new(InMemoryHistoryStore::new());
        let registrations = Arc::new(InMemoryRegistrationStatusProvider::new());
        let chain = Arc::new(StubChain::new(channel, fee));
        let transactor = Arc::new(CountingTransactor {
            calls: AtomicUsize::new(0),
        });
        let bus = Arc::new(TokioEventBus::new());
        let settler = Settler::new(
            config,
            chain,
            transactor,
            promises.clone(),
            history.clone(),
            registrations.clone(),
            Arc::new(NoKeys),
            bus,
        );
        (settler, promises, history, registrations)
    }

    #[tokio::test]
    async fn load_initial_state_skips_unregistered_identities() {
        let (settler, _promises, _history, _registrations) =
            make_settler(ProviderChannel::zero(provider()), 0);
        settler.load_initial_state(provider()).await.unwrap();
        assert_eq!(settler.get_earnings(provider()), Earnings::default());
    }

    #[tokio::test]
    async fn load_initial_state_is_idempotent() {
        let (settler, _promises, _history, registrations) =
            make_settler(ProviderChannel::zero(provider()), 0);
        registrations.set_status(provider(), RegistrationStatus::Registered);
        settler.load_initial_state(provider()).await.unwrap();
        // Second call must not error or re-resync in a way that changes
        // anything observable.
        settler.load_initial_state(provider()).await.unwrap();
        let earnings = settler.get_earnings(provider());
        assert_eq!(earnings, Earnings::default());
    }

    #[tokio::test]
    async fn resync_state_publishes_earnings_changed() {
        let (settler, _promises, _history, _registrations) =
            make_settler(ProviderChannel::zero(provider()), 0);
        settler.resync_state(provider(), hermes()).await.unwrap();
        let earnings = settler.get_earnings(provider());
        assert_eq!(earnings, Earnings::default());
    }

    #[tokio::test]
    async fn force_settle_without_a_stored_promise_errors() {
        let (settler, _promises, _history, _registrations) =
            make_settler(ProviderChannel::zero(provider()), 0);
        let err = settler.force_settle(provider(), hermes()).await.unwrap_err();
        assert!(matches!(err, SettleError::NothingToSettle));
    }

    #[tokio::test]
    async fn force_settle_times_out_without_a_settled_confirmation() {
        let (settler, promises, _history, _registrations) =
            make_settler(ProviderChannel::zero(provider()), 0);
        let channel_id = ChannelId::generate(provider(), hermes());
        promises.put(
            channel_id,
            StoredPromise {
                amount: BigUint::from(10u32),
                r_hex: "ab".into(),
                signature: vec![],
                channel_id,
            },
        );
        let err = settler.force_settle(provider(), hermes()).await.unwrap_err();
        assert!(matches!(err, SettleError::SettleTimeout));
    }

    #[tokio::test]
    async fn concurrent_settle_calls_for_the_same_provider_serialize() {
        let (settler, promises, _history, _registrations) =
            make_settler(ProviderChannel::zero(provider()), 0);
        let channel_id = ChannelId::generate(provider(), hermes());
        promises.put(
            channel_id,
            StoredPromise {
                amount: BigUint::from(10u32),
                r_hex: "ab".into(),
                signature: vec![],
                channel_id,
            },
        );

        let a = settler.clone();
        let b = settler.clone();
        let (r1, r2) = tokio::join!(
            async move { a.force_settle(provider(), hermes()).await },
            async move { b.force_settle(provider(), hermes()).await },
        );

        // Exactly one of the two concurrent calls must observe
        // `AlreadySettling`; the other proceeds (and then times out, since
        // the stub chain never emits a confirmation).
        let already_settling_count = [&r1, &r2]
            .iter()
            .filter(|r| matches!(r, Err(SettleError::AlreadySettling)))
            .count();
        assert_eq!(already_settling_count, 1);
    }
}
