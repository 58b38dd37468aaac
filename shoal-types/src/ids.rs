//! Identifier types: fids, custody addresses, and signer keys.

use std::fmt;
use std::str::FromStr;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::{HubError, HubResult};

/// Length in bytes of a custody address.
pub const ADDRESS_LENGTH: usize = 20;

/// Length in bytes of an Ed25519 signer key.
pub const SIGNER_KEY_LENGTH: usize = 32;

/// Identifier for a user, anchored on-chain by the id registry.
///
/// Rendered as 8 big-endian bytes wherever it participates in a KV key, so
/// key order matches numeric order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    BorshSerialize,
    BorshDeserialize,
)]
#[serde(transparent)]
pub struct Fid(u64);

impl Fid {
    /// Creates a fid from its numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the numeric value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Big-endian key bytes.
    #[must_use]
    pub const fn to_key_bytes(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    /// Reconstructs a fid from its key bytes.
    pub fn from_key_bytes(bytes: &[u8]) -> HubResult<Self> {
        let arr: [u8; 8] = bytes
            .try_into()
            .map_err(|_| HubError::parse_failure("fid key must be 8 bytes"))?;
        Ok(Self(u64::from_be_bytes(arr)))
    }
}

impl From<u64> for Fid {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Fid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Fid {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// A 20-byte custody address.
///
/// Derived from a custody public key: the last 20 bytes of the 32-byte blake3
/// digest of the key.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    BorshSerialize,
    BorshDeserialize,
)]
#[serde(transparent)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    /// Wraps raw address bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Parses an address from a byte slice.
    pub fn from_slice(bytes: &[u8]) -> HubResult<Self> {
        let arr: [u8; ADDRESS_LENGTH] = bytes
            .try_into()
            .map_err(|_| HubError::parse_failure("address must be 20 bytes"))?;
        Ok(Self(arr))
    }

    /// The raw address bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// A 32-byte Ed25519 public key authorized to sign messages.
///
/// Custody keys and delegate signer keys share this representation; the
/// distinction is carried by the message type, not the key.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    BorshSerialize,
    BorshDeserialize,
)]
#[serde(transparent)]
pub struct SignerKey([u8; SIGNER_KEY_LENGTH]);

impl SignerKey {
    /// Wraps raw public-key bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; SIGNER_KEY_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Parses a signer key from a byte slice.
    pub fn from_slice(bytes: &[u8]) -> HubResult<Self> {
        let arr: [u8; SIGNER_KEY_LENGTH] = bytes
            .try_into()
            .map_err(|_| HubError::parse_failure("signer key must be 32 bytes"))?;
        Ok(Self(arr))
    }

    /// The raw public-key bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; SIGNER_KEY_LENGTH] {
        &self.0
    }

    /// Derives the custody address for this key.
    #[must_use]
    pub fn to_address(&self) -> Address {
        let digest = blake3::hash(&self.0);
        let mut addr = [0u8; ADDRESS_LENGTH];
        addr.copy_from_slice(&digest.as_bytes()[32 - ADDRESS_LENGTH..]);
        Address::from_bytes(addr)
    }
}

impl fmt::Display for SignerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fid_key_bytes_preserve_order() {
        let a = Fid::new(1);
        let b = Fid::new(256);
        let c = Fid::new(u64::MAX);
        assert!(a.to_key_bytes() < b.to_key_bytes());
        assert!(b.to_key_bytes() < c.to_key_bytes());
        assert_eq!(Fid::from_key_bytes(&b.to_key_bytes()).unwrap(), b);
    }

    #[test]
    fn address_derivation_is_stable() {
        let key = SignerKey::from_bytes([7u8; SIGNER_KEY_LENGTH]);
        assert_eq!(key.to_address(), key.to_address());
        let other = SignerKey::from_bytes([8u8; SIGNER_KEY_LENGTH]);
        assert_ne!(key.to_address(), other.to_address());
    }

    #[test]
    fn rejects_wrong_lengths() {
        assert!(Address::from_slice(&[0u8; 19]).is_err());
        assert!(SignerKey::from_slice(&[0u8; 33]).is_err());
        assert!(Fid::from_key_bytes(&[0u8; 4]).is_err());
    }
}
