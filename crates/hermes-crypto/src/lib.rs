//! Address and hashing primitives shared by the Hermes promise settler.
//!
//! This crate provides the small set of cryptographic building blocks the
//! settler needs: 20-byte Ethereum-style addresses (canonicalized to
//! lowercase `0x`-prefixed hex) and 32-byte content hashes. Promise signing
//! and verification are treated as an external library concern and are not
//! implemented here - the settler only ever handles already-signed promises.

mod error;
mod hash;
mod identity;

pub use error::CryptoError;
pub use hash::Hash;
pub use identity::{HermesId, Identity};
