//! Off-chain payment promises.

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::channel::ChannelId;

/// A signed promise exactly as the promise store returns it: `r` is hex
/// text, not yet decoded to bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredPromise {
    /// Cumulative amount promised on this channel.
    pub amount: BigUint,
    /// The promise's `r` value, hex-encoded.
    pub r_hex: String,
    /// Signature bytes over the promise.
    pub signature: Vec<u8>,
    /// Channel this promise belongs to.
    pub channel_id: ChannelId,
}

/// A promise with `r` decoded to raw bytes, ready for the transactor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Promise {
    /// Cumulative amount promised on this channel.
    pub amount: BigUint,
    /// The promise's `r` value, as raw bytes.
    pub r: Vec<u8>,
    /// Signature bytes over the promise.
    pub signature: Vec<u8>,
    /// Channel this promise belongs to.
    pub channel_id: ChannelId,
}

/// `r` was not valid hex and could not be decoded to bytes.
#[derive(Debug, Error)]
#[error("could not decode promise r as hex: {0}")]
pub struct PromiseDecodeError(#[from] hex::FromHexError);

impl StoredPromise {
    /// Decode `r` from hex to bytes, producing a [`Promise`] ready to hand
    /// to the transactor.
    pub fn decode(self) -> Result<Promise, PromiseDecodeError> {
        let trimmed = self.r_hex.strip_prefix("0x").unwrap_or(&self.r_hex);
        let r = hex::decode(trimmed)?;
        Ok(Promise {
            amount: self.amount,
            r,
            signature: self.signature,
            channel_id: self.channel_id,
        })
    }

    /// A promise with zero amount for a channel that has not received one
    /// yet.
    pub fn zero(channel_id: ChannelId) -> Self {
        Self {
            amount: BigUint::default(),
            r_hex: String::new(),
            signature: Vec::new(),
            channel_id,
        }
    }
}

impl Promise {
    /// A promise with zero amount for a channel that has not received one
    /// yet.
    pub fn zero(channel_id: ChannelId) -> Self {
        Self {
            amount: BigUint::default(),
            r: Vec::new(),
            signature: Vec::new(),
            channel_id,
        }
    }
}
