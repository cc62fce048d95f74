//! Error types for address and hash parsing.

use thiserror::Error;

/// Errors produced while parsing addresses or hex-encoded byte strings.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The input was not valid hex.
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// The decoded bytes did not have the expected length.
    #[error("expected {expected} bytes, got {got}")]
    WrongLength {
        /// Expected byte length.
        expected: usize,
        /// Actual decoded byte length.
        got: usize,
    },
}
