//! Mock implementation of the `Keystore` trait for testing.

use std::sync::{Arc, RwLock};

use hermes_settle::Keystore;
use hermes_types::Identity;

/// A [`Keystore`] whose accounts are whatever the test configured.
#[derive(Clone, Default)]
pub struct MockKeystore {
    accounts: Arc<RwLock<Vec<Identity>>>,
}

impl MockKeystore {
    /// A keystore holding exactly `accounts`.
    pub fn new(accounts: Vec<Identity>) -> Self {
        Self {
            accounts: Arc::new(RwLock::new(accounts)),
        }
    }

    /// Add an identity to the keystore at runtime.
    pub fn add(&self, id: Identity) {
        self.accounts.write().unwrap().push(id);
    }
}

impl Keystore for MockKeystore {
    fn accounts(&self) -> Vec<Identity> {
        self.accounts.read().unwrap().clone()
    }
}
