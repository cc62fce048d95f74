//! Error types for the settler.

use thiserror::Error;

/// Result type alias for settler operations.
pub type SettleResult<T> = Result<T, SettleError>;

/// Errors returned by the settler's public operations.
#[derive(Debug, Error)]
pub enum SettleError {
    /// No stored promise exists for the requested channel.
    #[error("nothing to settle for the given provider")]
    NothingToSettle,

    /// The provider already has a settlement in flight.
    #[error("provider already has a settlement in progress")]
    AlreadySettling,

    /// The on-chain confirmation did not arrive within the configured wait.
    #[error("settle timeout")]
    SettleTimeout,

    /// A channel fetch or event subscription against the chain failed.
    #[error("chain unavailable: {0}")]
    ChainUnavailable(String),

    /// A promise fetch or hex decode failed.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// The transactor rejected the settlement request.
    #[error("transactor rejected settlement: {0}")]
    TransactorRejected(String),
}

impl SettleError {
    /// Wrap a chain-client failure.
    pub fn chain_unavailable(cause: impl std::fmt::Display) -> Self {
        Self::ChainUnavailable(cause.to_string())
    }

    /// Wrap a promise-store failure.
    pub fn storage_unavailable(cause: impl std::fmt::Display) -> Self {
        Self::StorageUnavailable(cause.to_string())
    }

    /// Wrap a transactor failure.
    pub fn transactor_rejected(cause: impl std::fmt::Display) -> Self {
        Self::TransactorRejected(cause.to_string())
    }
}
