//! Shared test utilities for the Hermes promise settler: mock
//! collaborators plus fixture builders that wire a [`Settler`](hermes_settle::Settler)
//! up to them.
//!
//! This crate dev-depends on `hermes-settle` only through its tests, but
//! is a regular dependency of `hermes-settle`'s own test code - the cycle
//! exists entirely inside `[dev-dependencies]`, which Cargo supports.

pub mod helpers;
pub mod mock_chain;
pub mod mock_keystore;
pub mod mock_transactor;

pub use helpers::{settler_fixture, test_hermes_id, test_identity, threshold_percent, SettlerFixture};
pub use mock_chain::MockChainClient;
pub use mock_keystore::MockKeystore;
pub use mock_transactor::{MockTransactor, TransactorCall};
