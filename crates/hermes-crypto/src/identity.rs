//! 20-byte Ethereum-style addresses.
//!
//! [`Identity`] and [`HermesId`] have the same byte representation but are
//! kept as distinct types so a provider address can never be passed where a
//! hermes address is expected, and vice versa.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::CryptoError;

fn parse_address(s: &str) -> Result<[u8; 20], CryptoError> {
    let trimmed = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    let bytes = hex::decode(trimmed)?;
    if bytes.len() != 20 {
        return Err(CryptoError::WrongLength {
            expected: 20,
            got: bytes.len(),
        });
    }
    let mut out = [0u8; 20];
    out.copy_from_slice(&bytes);
    Ok(out)
}

fn format_address(bytes: &[u8; 20]) -> String {
    format!("0x{}", hex::encode(bytes))
}

macro_rules! address_type {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name([u8; 20]);

        impl $name {
            /// Build from raw bytes, no validation needed - any 20 bytes are a valid address.
            pub fn from_bytes(bytes: [u8; 20]) -> Self {
                Self(bytes)
            }

            /// Raw bytes of the address.
            pub fn as_bytes(&self) -> &[u8; 20] {
                &self.0
            }

            /// Canonical lowercase `0x`-prefixed hex representation.
            pub fn to_hex(&self) -> String {
                format_address(&self.0)
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.to_hex())
            }
        }

        impl FromStr for $name {
            type Err = CryptoError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(parse_address(s)?))
            }
        }

        impl TryFrom<String> for $name {
            type Error = CryptoError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                s.parse()
            }
        }

        impl From<$name> for String {
            fn from(addr: $name) -> String {
                addr.to_hex()
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }
    };
}

address_type!(Identity, "A provider's 20-byte Ethereum-style address.");
address_type!(HermesId, "A hermes operator's 20-byte Ethereum-style address.");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_with_and_without_prefix() {
        let a: Identity = "0x1111111111111111111111111111111111111111"[..42]
            .parse()
            .unwrap();
        let b: Identity = "1111111111111111111111111111111111111111".parse().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn display_is_lowercase_with_prefix() {
        let id = Identity::from_bytes([0xABu8; 20]);
        assert_eq!(id.to_string(), format!("0x{}", "ab".repeat(20)));
    }

    #[test]
    fn rejects_malformed_hex() {
        assert!("0xzz".parse::<HermesId>().is_err());
    }

    #[test]
    fn serde_roundtrip() {
        let id = Identity::from_bytes([0x42u8; 20]);
        let json = serde_json::to_string(&id).unwrap();
        let back: Identity = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
