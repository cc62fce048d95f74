//! Helper functions for creating test fixtures.

use std::sync::Arc;
use std::time::Duration;

use hermes_econ::Threshold;
use hermes_settle::{EventBus, Settler, SettlerConfig, TokioEventBus};
use hermes_store::{InMemoryHistoryStore, InMemoryPromiseStore, InMemoryRegistrationStatusProvider};
use hermes_types::{HermesId, Identity};

use crate::{MockChainClient, MockKeystore, MockTransactor};

/// Every collaborator a freshly built [`Settler`] needs, handed back
/// alongside it so tests can drive and assert against them directly.
pub struct SettlerFixture {
    pub settler: Arc<Settler>,
    pub chain: MockChainClient,
    pub transactor: MockTransactor,
    pub promises: Arc<InMemoryPromiseStore>,
    pub history: Arc<InMemoryHistoryStore>,
    pub registrations: Arc<InMemoryRegistrationStatusProvider>,
    pub keystore: MockKeystore,
    pub bus: Arc<TokioEventBus>,
}

/// Build a [`Settler`] wired to fresh in-memory/mock collaborators, with
/// event handlers already registered via [`Settler::subscribe`].
///
/// `threshold` and `max_wait_for_settlement` are the two knobs most tests
/// care about; everything else defaults to an empty, accepting mock.
pub async fn settler_fixture(hermes_address: HermesId, threshold: f64, max_wait_for_settlement: Duration) -> SettlerFixture {
    let config = SettlerConfig::new(hermes_address, threshold, max_wait_for_settlement)
        .expect("test threshold must be within [0, 1]");
    let chain = MockChainClient::new();
    let transactor = MockTransactor::new();
    let promises = Arc::new(InMemoryPromiseStore::new());
    let history = Arc::new(InMemoryHistoryStore::new());
    let registrations = Arc::new(InMemoryRegistrationStatusProvider::new());
    let keystore = MockKeystore::default();
    let bus = Arc::new(TokioEventBus::new());

    let settler = Settler::new(
        config,
        Arc::new(chain.clone()),
        Arc::new(transactor.clone()),
        promises.clone(),
        history.clone(),
        registrations.clone(),
        Arc::new(keystore.clone()),
        bus.clone() as Arc<dyn EventBus>,
    );
    settler.subscribe().await.expect("subscribing to a fresh bus cannot fail");

    SettlerFixture {
        settler,
        chain,
        transactor,
        promises,
        history,
        registrations,
        keystore,
        bus,
    }
}

/// A throwaway, never-reused provider identity for test fixtures.
pub fn test_identity(byte: u8) -> Identity {
    Identity::from_bytes([byte; 20])
}

/// A throwaway, never-reused hermes identity for test fixtures.
pub fn test_hermes_id(byte: u8) -> HermesId {
    HermesId::from_bytes([byte; 20])
}

/// The fraction a threshold of `percent` (0-100) represents, for tests that
/// would rather write `threshold_percent(10)` than `0.1`.
pub fn threshold_percent(percent: u8) -> f64 {
    Threshold::new(f64::from(percent) / 100.0)
        .expect("percent in 0..=100 is always a valid threshold")
        .value()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixture_wires_a_settler_with_no_earnings_yet() {
        let fixture = settler_fixture(test_hermes_id(9), 0.1, Duration::from_millis(50)).await;
        assert_eq!(
            fixture.settler.get_earnings(test_identity(1)),
            hermes_types::Earnings::default()
        );
    }

    #[test]
    fn threshold_percent_matches_the_fraction() {
        assert_eq!(threshold_percent(10), 0.1);
        assert_eq!(threshold_percent(0), 0.0);
        assert_eq!(threshold_percent(100), 1.0);
    }
}
