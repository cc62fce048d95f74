//! Storage and registration collaborator traits for the Hermes promise
//! settler.
//!
//! Persistence itself - the key-value engine, the registry RPC client - is
//! out of scope; this crate only fixes the contract `hermes-settle` talks
//! to, plus in-memory implementations good enough to test against.

mod error;
mod memory;
mod registration;
mod traits;

pub use error::{Result, StoreError};
pub use memory::{InMemoryHistoryStore, InMemoryPromiseStore, InMemoryRegistrationStatusProvider};
pub use registration::RegistrationStatus;
pub use traits::{HistoryStore, PromiseStore, RegistrationStatusProvider};
