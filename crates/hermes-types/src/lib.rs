//! Data structures for the Hermes promise settler.
//!
//! This crate contains no business logic, only the types shared between
//! [`hermes-econ`](https://docs.rs/hermes-econ) (pure arithmetic) and
//! [`hermes-settle`](https://docs.rs/hermes-settle) (the settler itself):
//! channel and promise state read from the chain, the per-identity
//! settlement state the settler maintains, and the events/history entries
//! that flow out of it.

mod channel;
mod earnings;
mod history;
mod promise;
mod state;

pub use channel::{ChannelId, ProviderChannel};
pub use earnings::Earnings;
pub use history::{ReceivedPromise, SettlementHistoryEntry};
pub use promise::{Promise, PromiseDecodeError, StoredPromise};
pub use state::{HermesState, SettlementState};

pub use hermes_crypto::{HermesId, Identity};

/// 1 MYST expressed in base units (`10^18`), used by the dust-settlement
/// guard in [`hermes-econ`](https://docs.rs/hermes-econ).
pub const MYST: u64 = 1_000_000_000_000_000_000;
