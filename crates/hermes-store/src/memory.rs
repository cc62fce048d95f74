//! In-memory reference implementations of the storage traits.
//!
//! Useful for tests and for wiring up a settler without a real backend
//! yet. Production deployments back these traits with whatever key-value
//! store or registry client the surrounding node already uses.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use hermes_types::{ChannelId, Identity, SettlementHistoryEntry, StoredPromise};

use crate::error::Result;
use crate::registration::RegistrationStatus;
use crate::traits::{HistoryStore, PromiseStore, RegistrationStatusProvider};

/// A [`PromiseStore`] backed by a plain in-memory map.
#[derive(Default)]
pub struct InMemoryPromiseStore {
    promises: Mutex<HashMap<ChannelId, StoredPromise>>,
}

impl InMemoryPromiseStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the promise on record for `channel_id`.
    pub fn put(&self, channel_id: ChannelId, promise: StoredPromise) {
        self.promises.lock().unwrap().insert(channel_id, promise);
    }
}

#[async_trait]
impl PromiseStore for InMemoryPromiseStore {
    async fn get(&self, channel_id: ChannelId) -> Result<Option<StoredPromise>> {
        Ok(self.promises.lock().unwrap().get(&channel_id).cloned())
    }
}

/// A [`HistoryStore`] backed by an append-only in-memory vector.
#[derive(Default)]
pub struct InMemoryHistoryStore {
    entries: Mutex<Vec<SettlementHistoryEntry>>,
}

impl InMemoryHistoryStore {
    /// An empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot every entry recorded so far, oldest first.
    pub fn entries(&self) -> Vec<SettlementHistoryEntry> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn store(&self, entry: SettlementHistoryEntry) -> Result<()> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }
}

/// A [`RegistrationStatusProvider`] whose answers are set by the caller.
#[derive(Default)]
pub struct InMemoryRegistrationStatusProvider {
    statuses: Mutex<HashMap<Identity, RegistrationStatus>>,
}

impl InMemoryRegistrationStatusProvider {
    /// A provider where every identity starts `Unregistered`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the status reported for `id`.
    pub fn set_status(&self, id: Identity, status: RegistrationStatus) {
        self.statuses.lock().unwrap().insert(id, status);
    }
}

#[async_trait]
impl RegistrationStatusProvider for InMemoryRegistrationStatusProvider {
    async fn get_registration_status(&self, id: Identity) -> Result<RegistrationStatus> {
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .get(&id)
            .copied()
            .unwrap_or(RegistrationStatus::Unregistered))
    }
}
