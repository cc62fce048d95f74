//! Error types for the storage and registration collaborators.

use thiserror::Error;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors surfaced by a [`crate::PromiseStore`], [`crate::HistoryStore`], or
/// [`crate::RegistrationStatusProvider`] implementation.
///
/// Absence of a record is not an error - see
/// [`PromiseStore::get`](crate::PromiseStore::get), which returns
/// `Ok(None)` for "no promise yet".
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying storage backend failed (database, filesystem, RPC
    /// transport to a remote registry, etc).
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Build a [`StoreError::Backend`] from any displayable cause.
    pub fn backend(cause: impl std::fmt::Display) -> Self {
        Self::Backend(cause.to_string())
    }
}
