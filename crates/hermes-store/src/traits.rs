//! Trait contracts for the settler's storage and registration collaborators.
//!
//! These crates persist nothing in-process: they are the interface the
//! settler talks to, backed by whatever key-value store or remote registry
//! the surrounding node wires up. `hermes-store` only defines the contract
//! and the in-memory reference implementations used in tests; production
//! backends live outside this crate.

use async_trait::async_trait;

use hermes_types::{ChannelId, Identity, SettlementHistoryEntry, StoredPromise};

use crate::error::Result;
use crate::registration::RegistrationStatus;

/// Returns the most recently stored promise for a channel.
///
/// The settler never writes through this trait - promises are written by
/// whatever component receives them over the wire. The settler only reads
/// the latest one.
#[async_trait]
pub trait PromiseStore: Send + Sync {
    /// Fetch the latest promise for `channel_id`. `Ok(None)` means no
    /// promise has been recorded yet, which is not an error condition.
    async fn get(&self, channel_id: ChannelId) -> Result<Option<StoredPromise>>;
}

/// Appends write-once settlement history entries.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Persist a completed settlement. Failures here are logged by the
    /// caller and never abort an already-committed on-chain settlement.
    async fn store(&self, entry: SettlementHistoryEntry) -> Result<()>;
}

/// Reports the on-chain registration status of an identity.
#[async_trait]
pub trait RegistrationStatusProvider: Send + Sync {
    /// Current registration status for `id`.
    async fn get_registration_status(&self, id: Identity) -> Result<RegistrationStatus>;
}
