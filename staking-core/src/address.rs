//! Bech32 addresses and consensus public keys
//!
//! Accounts and validator operators are raw byte strings rendered with
//! different human-readable prefixes. The empty address renders as `""`.
//! Consensus keys are Ed25519 keys, rendered as bech32 over the amino
//! prefixed key bytes.

use crate::error::{Error, Result};
use bech32::{FromBase32, ToBase32, Variant};
use ed25519_dalek::VerifyingKey;
use serde::{de, ser, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Prefix for account addresses
pub const ACC_ADDRESS_PREFIX: &str = "cosmos";

/// Prefix for validator operator addresses
pub const VAL_ADDRESS_PREFIX: &str = "cosmosvaloper";

/// Prefix for validator consensus public keys
pub const CONS_PUBKEY_PREFIX: &str = "cosmosvalconspub";

/// Amino registration prefix of `tendermint/PubKeyEd25519`, followed by the
/// length byte of a 32 byte key
const ED25519_AMINO_PREFIX: [u8; 5] = [0x16, 0x24, 0xDE, 0x64, 0x20];

fn encode(hrp: &str, data: &[u8]) -> Result<String> {
    Ok(bech32::encode(hrp, data.to_base32(), Variant::Bech32)?)
}

fn decode(expected_hrp: &str, s: &str) -> Result<Vec<u8>> {
    let (hrp, data, variant) = bech32::decode(s)?;
    if hrp != expected_hrp {
        return Err(Error::InvalidAddress(format!(
            "invalid bech32 prefix: expected {}, got {}",
            expected_hrp, hrp
        )));
    }
    if variant != Variant::Bech32 {
        return Err(Error::InvalidAddress("expected bech32 variant".into()));
    }
    Ok(Vec::<u8>::from_base32(&data)?)
}

macro_rules! bech32_address {
    ($(#[$meta:meta])* $name:ident, $prefix:expr) => {
        $(#[$meta])*
        #[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(Vec<u8>);

        impl $name {
            /// Human-readable bech32 prefix
            pub const PREFIX: &'static str = $prefix;

            /// Wrap raw address bytes
            pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
                Self(bytes.into())
            }

            /// Raw address bytes
            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }

            /// True for the empty (unset) address
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }

            /// Bech32 form; the empty address renders as `""`
            pub fn to_bech32(&self) -> Result<String> {
                if self.0.is_empty() {
                    return Ok(String::new());
                }
                encode(Self::PREFIX, &self.0)
            }

            /// Parse the bech32 form; `""` parses as the empty address
            pub fn from_bech32(s: &str) -> Result<Self> {
                if s.is_empty() {
                    return Ok(Self::default());
                }
                decode(Self::PREFIX, s).map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let s = self.to_bech32().map_err(|_| fmt::Error)?;
                f.write_str(&s)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                Self::from_bech32(s)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                let s = self.to_bech32().map_err(ser::Error::custom)?;
                serializer.serialize_str(&s)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::from_bech32(&s).map_err(de::Error::custom)
            }
        }
    };
}

bech32_address!(
    /// Account address
    AccAddress,
    ACC_ADDRESS_PREFIX
);

bech32_address!(
    /// Validator operator address
    ValAddress,
    VAL_ADDRESS_PREFIX
);

impl From<&ValAddress> for AccAddress {
    fn from(addr: &ValAddress) -> Self {
        AccAddress::new(addr.as_bytes())
    }
}

impl From<&AccAddress> for ValAddress {
    fn from(addr: &AccAddress) -> Self {
        ValAddress::new(addr.as_bytes())
    }
}

/// Ed25519 consensus public key of a validator
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConsPubKey([u8; 32]);

impl ConsPubKey {
    /// Accept 32 bytes that decode to a valid Ed25519 point
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self> {
        VerifyingKey::from_bytes(&bytes)
            .map_err(|e| Error::InvalidAddress(format!("invalid consensus pubkey: {}", e)))?;
        Ok(Self(bytes))
    }

    /// Raw key bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Bech32 form over the amino-prefixed key bytes
    pub fn to_bech32(&self) -> Result<String> {
        let mut data = Vec::with_capacity(ED25519_AMINO_PREFIX.len() + self.0.len());
        data.extend_from_slice(&ED25519_AMINO_PREFIX);
        data.extend_from_slice(&self.0);
        encode(CONS_PUBKEY_PREFIX, &data)
    }

    /// Parse the bech32 form
    pub fn from_bech32(s: &str) -> Result<Self> {
        let data = decode(CONS_PUBKEY_PREFIX, s)?;
        let key = data
            .strip_prefix(&ED25519_AMINO_PREFIX[..])
            .ok_or_else(|| Error::InvalidAddress("unsupported consensus pubkey type".into()))?;
        let bytes: [u8; 32] = key
            .try_into()
            .map_err(|_| Error::InvalidAddress("consensus pubkey must be 32 bytes".into()))?;
        Self::from_bytes(bytes)
    }
}

impl From<VerifyingKey> for ConsPubKey {
    fn from(key: VerifyingKey) -> Self {
        Self(key.to_bytes())
    }
}

impl fmt::Display for ConsPubKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.to_bech32().map_err(|_| fmt::Error)?;
        f.write_str(&s)
    }
}

impl fmt::Debug for ConsPubKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConsPubKey({})", self)
    }
}

impl FromStr for ConsPubKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_bech32(s)
    }
}

impl Serialize for ConsPubKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let s = self.to_bech32().map_err(ser::Error::custom)?;
        serializer.serialize_str(&s)
    }
}

impl<'de> Deserialize<'de> for ConsPubKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_bech32(&s).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::SigningKey;

    fn pubkey(seed: u8) -> ConsPubKey {
        SigningKey::from_bytes(&[seed; 32]).verifying_key().into()
    }

    #[test]
    fn test_acc_address_bech32() {
        let addr = AccAddress::new(vec![1u8; 20]);
        let s = addr.to_bech32().unwrap();
        assert!(s.starts_with("cosmos1"));
        assert_eq!(AccAddress::from_bech32(&s).unwrap(), addr);
    }

    #[test]
    fn test_val_address_prefix_mismatch() {
        let acc = AccAddress::new(vec![7u8; 20]).to_bech32().unwrap();
        assert!(ValAddress::from_bech32(&acc).is_err());

        let val = ValAddress::from(&AccAddress::new(vec![7u8; 20]));
        assert!(val.to_string().starts_with("cosmosvaloper1"));
    }

    #[test]
    fn test_empty_address_json() {
        let addr = AccAddress::default();
        assert_eq!(serde_json::to_string(&addr).unwrap(), "\"\"");
        let back: AccAddress = serde_json::from_str("\"\"").unwrap();
        assert!(back.is_empty());
    }

    #[test]
    fn test_cons_pubkey_roundtrip() {
        let pk = pubkey(3);
        let s = pk.to_bech32().unwrap();
        assert!(s.starts_with("cosmosvalconspub1"));
        assert_eq!(ConsPubKey::from_bech32(&s).unwrap(), pk);
    }

    #[test]
    fn test_cons_pubkey_decode_failure_is_error() {
        let result: std::result::Result<ConsPubKey, _> = serde_json::from_str("\"not-a-key\"");
        assert!(result.is_err());

        // An account address is valid bech32 but not a consensus key
        let acc = AccAddress::new(vec![1u8; 20]).to_bech32().unwrap();
        assert!(ConsPubKey::from_bech32(&acc).is_err());
    }
}
