//! The settler's event bus: topics consumed and published, and a
//! concurrent, per-topic-FIFO in-process implementation.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, RwLock};

use hermes_store::RegistrationStatus;
use hermes_types::{Earnings, HermesId, Identity, Promise};

/// `node.lifecycle` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeLifecycleStatus {
    /// The node has finished starting up.
    Started,
    /// The node is shutting down.
    Stopped,
}

/// `node.lifecycle` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeLifecycleEvent {
    /// The lifecycle transition.
    pub status: NodeLifecycleStatus,
}

/// `identity.registration` event. Reuses [`hermes_store::RegistrationStatus`]
/// rather than a second copy of the same four states - the store's
/// `RegistrationStatusProvider` and the bus must agree on one vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationEvent {
    /// The identity whose registration status changed.
    pub id: Identity,
    /// Its new status.
    pub status: RegistrationStatus,
}

/// `service.status` payload status. Only `Running` drives settler behavior;
/// the rest are carried through for completeness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceRunStatus {
    /// The service is not running.
    NotRunning,
    /// The service is starting up.
    Starting,
    /// The service is running.
    Running,
}

/// `service.status` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceStatusEvent {
    /// The provider identity the service belongs to.
    pub provider_id: Identity,
    /// Its current run status.
    pub status: ServiceRunStatus,
}

/// `settlement.request` event - a direct request to force-settle a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlementRequestEvent {
    /// Provider to settle.
    pub provider_id: Identity,
    /// Hermes operator to settle against.
    pub hermes_id: HermesId,
}

/// `hermes.promise` event - a promise received from a consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HermesPromiseEvent {
    /// Provider the promise was issued to.
    pub provider_id: Identity,
    /// Hermes operator for the channel.
    pub hermes_id: HermesId,
    /// The decoded promise.
    pub promise: Promise,
}

/// `earnings.changed` event, published by the settler after every resync
/// or promise update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EarningsChangedEvent {
    /// Identity whose earnings changed.
    pub identity: Identity,
    /// Aggregated earnings before the change.
    pub previous: Earnings,
    /// Aggregated earnings after the change.
    pub current: Earnings,
}

/// A subscription failed to register.
#[derive(Debug, Error)]
#[error("could not subscribe to topic {topic}: {cause}")]
pub struct EventBusError {
    /// The canonical topic name, for error messages.
    pub topic: &'static str,
    /// The underlying cause.
    pub cause: String,
}

type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// An async handler for events on a topic.
pub type Handler<T> = Arc<dyn Fn(T) -> BoxFuture + Send + Sync>;

/// Publish/subscribe on the five topics the settler consumes and the one
/// it publishes.
///
/// Delivery is per-topic FIFO: events on the same topic are dispatched to
/// subscribers in publish order. Across topics there is no ordering
/// guarantee, and a single event's subscribers all run concurrently with
/// each other.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Subscribe to `node.lifecycle`.
    async fn subscribe_node_lifecycle(
        &self,
        handler: Handler<NodeLifecycleEvent>,
    ) -> Result<(), EventBusError>;

    /// Subscribe to `identity.registration`.
    async fn subscribe_registration(
        &self,
        handler: Handler<RegistrationEvent>,
    ) -> Result<(), EventBusError>;

    /// Subscribe to `service.status`.
    async fn subscribe_service_status(
        &self,
        handler: Handler<ServiceStatusEvent>,
    ) -> Result<(), EventBusError>;

    /// Subscribe to `settlement.request`.
    async fn subscribe_settlement_request(
        &self,
        handler: Handler<SettlementRequestEvent>,
    ) -> Result<(), EventBusError>;

    /// Subscribe to `hermes.promise`.
    async fn subscribe_hermes_promise(
        &self,
        handler: Handler<HermesPromiseEvent>,
    ) -> Result<(), EventBusError>;

    /// Publish `earnings.changed`.
    async fn publish_earnings_changed(&self, event: EarningsChangedEvent);
}

/// One topic's subscriber list plus the worker task that drains its queue.
struct Topic<T> {
    tx: mpsc::UnboundedSender<T>,
    subscribers: Arc<RwLock<Vec<Handler<T>>>>,
}

impl<T> Topic<T>
where
    T: Clone + Send + 'static,
{
    fn spawn() -> Self {
        let subscribers: Arc<RwLock<Vec<Handler<T>>>> = Arc::new(RwLock::new(Vec::new()));
        let (tx, mut rx) = mpsc::unbounded_channel::<T>();
        let worker_subscribers = subscribers.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let handlers = worker_subscribers.read().await.clone();
                let mut tasks = Vec::with_capacity(handlers.len());
                for handler in handlers {
                    let event = event.clone();
                    tasks.push(tokio::spawn(handler(event)));
                }
                for task in tasks {
                    let _ = task.await;
                }
            }
        });
        Self { tx, subscribers }
    }

    async fn subscribe(&self, handler: Handler<T>) {
        self.subscribers.write().await.push(handler);
    }

    fn publish(&self, event: T) {
        // The worker never exits while `self` is alive, so this cannot fail.
        let _ = self.tx.send(event);
    }
}

/// A [`EventBus`] backed by one dispatch task per topic.
pub struct TokioEventBus {
    node_lifecycle: Topic<NodeLifecycleEvent>,
    registration: Topic<RegistrationEvent>,
    service_status: Topic<ServiceStatusEvent>,
    settlement_request: Topic<SettlementRequestEvent>,
    hermes_promise: Topic<HermesPromiseEvent>,
    earnings_changed: Topic<EarningsChangedEvent>,
}

impl Default for TokioEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl TokioEventBus {
    /// Spawn a fresh bus with no subscribers.
    pub fn new() -> Self {
        Self {
            node_lifecycle: Topic::spawn(),
            registration: Topic::spawn(),
            service_status: Topic::spawn(),
            settlement_request: Topic::spawn(),
            hermes_promise: Topic::spawn(),
            earnings_changed: Topic::spawn(),
        }
    }

    /// Publish to `node.lifecycle`. Exposed for lifecycle drivers outside
    /// the settler (node start/stop is not the settler's own concern).
    pub fn publish_node_lifecycle(&self, event: NodeLifecycleEvent) {
        self.node_lifecycle.publish(event);
    }

    /// Publish to `identity.registration`.
    pub fn publish_registration(&self, event: RegistrationEvent) {
        self.registration.publish(event);
    }

    /// Publish to `service.status`.
    pub fn publish_service_status(&self, event: ServiceStatusEvent) {
        self.service_status.publish(event);
    }

    /// Publish to `settlement.request`.
    pub fn publish_settlement_request(&self, event: SettlementRequestEvent) {
        self.settlement_request.publish(event);
    }

    /// Publish to `hermes.promise`.
    pub fn publish_hermes_promise(&self, event: HermesPromiseEvent) {
        self.hermes_promise.publish(event);
    }
}

#[async_trait]
impl EventBus for TokioEventBus {
    async fn subscribe_node_lifecycle(
        &self,
        handler: Handler<NodeLifecycleEvent>,
    ) -> Result<(), EventBusError> {
        self.node_lifecycle.subscribe(handler).await;
        Ok(())
    }

    async fn subscribe_registration(
        &self,
        handler: Handler<RegistrationEvent>,
    ) -> Result<(), EventBusError> {
        self.registration.subscribe(handler).await;
        Ok(())
    }

    async fn subscribe_service_status(
        &self,
        handler: Handler<ServiceStatusEvent>,
    ) -> Result<(), EventBusError> {
        self.service_status.subscribe(handler).await;
        Ok(())
    }

    async fn subscribe_settlement_request(
        &self,
        handler: Handler<SettlementRequestEvent>,
    ) -> Result<(), EventBusError> {
        self.settlement_request.subscribe(handler).await;
        Ok(())
    }

    async fn subscribe_hermes_promise(
        &self,
        handler: Handler<HermesPromiseEvent>,
    ) -> Result<(), EventBusError> {
        self.hermes_promise.subscribe(handler).await;
        Ok(())
    }

    async fn publish_earnings_changed(&self, event: EarningsChangedEvent) {
        self.earnings_changed.publish(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn delivers_to_every_subscriber() {
        let bus = TokioEventBus::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let calls = calls.clone();
            bus.subscribe_node_lifecycle(Arc::new(move |_event| {
                let calls = calls.clone();
                Box::pin(async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                })
            }))
            .await
            .unwrap();
        }

        bus.publish_node_lifecycle(NodeLifecycleEvent {
            status: NodeLifecycleStatus::Started,
        });

        // Give the dispatch task a chance to run.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn topics_are_independent() {
        let bus = TokioEventBus::new();
        let lifecycle_calls = Arc::new(AtomicUsize::new(0));
        let registration_calls = Arc::new(AtomicUsize::new(0));

        let lifecycle_calls_clone = lifecycle_calls.clone();
        bus.subscribe_node_lifecycle(Arc::new(move |_event| {
            let calls = lifecycle_calls_clone.clone();
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
            })
        }))
        .await
        .unwrap();

        let registration_calls_clone = registration_calls.clone();
        bus.subscribe_registration(Arc::new(move |_event| {
            let calls = registration_calls_clone.clone();
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
            })
        }))
        .await
        .unwrap();

        bus.publish_registration(RegistrationEvent {
            id: Identity::from_bytes([1; 20]),
            status: RegistrationStatus::Registered,
        });

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(lifecycle_calls.load(Ordering::SeqCst), 0);
        assert_eq!(registration_calls.load(Ordering::SeqCst), 1);
    }
}
