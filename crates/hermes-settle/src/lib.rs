//! The Hermes promise settler.
//!
//! A provider node accepts off-chain payment promises from consumers
//! faster than it can settle them on-chain - every settlement costs gas
//! and contends for the same block space as every other provider's. This
//! crate is the accounting layer that decides *when* a provider's
//! unsettled balance with a given hermes operator has crossed the point
//! where settling is worth it, and drives that settlement through to
//! on-chain confirmation.
//!
//! # Layout
//!
//! - [`config`] - static settler configuration (threshold, timeouts).
//! - [`error`] - the error type returned by every public operation.
//! - [`event`] - the event-bus contract the settler consumes and
//!   publishes, plus an in-process implementation.
//! - [`traits`] - the chain, transactor, and keystore collaborators the
//!   settler is built against.
//! - [`settler`] - [`Settler`] itself.
//!
//! The arithmetic that decides whether a channel needs settling lives in
//! [`hermes-econ`](https://docs.rs/hermes-econ), not here - this crate
//! only wires that decision into the event-driven lifecycle around it.

mod config;
mod error;
mod event;
mod settler;
mod traits;

pub use config::SettlerConfig;
pub use error::{SettleError, SettleResult};
pub use event::{
    EarningsChangedEvent, EventBus, EventBusError, Handler, HermesPromiseEvent, NodeLifecycleEvent,
    NodeLifecycleStatus, RegistrationEvent, ServiceRunStatus, ServiceStatusEvent,
    SettlementRequestEvent, TokioEventBus,
};
pub use settler::Settler;
pub use traits::{
    CancelHandle, ChainClient, ChainError, Keystore, PromiseSettledEvent, PromiseSettledSubscription,
    Transactor, TransactorError,
};
