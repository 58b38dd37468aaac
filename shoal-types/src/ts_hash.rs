//! The timestamp-hash identity of a message.
//!
//! `TsHash` is the 4-byte big-endian timestamp followed by the 20-byte blake3
//! digest of the message data. Because the timestamp leads, byte order is
//! chronological order, with the hash as a deterministic tiebreak.

use std::fmt;
use std::str::FromStr;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::{HubError, HubResult};

/// Length in bytes of a message hash (blake3, 20-byte output).
pub const HASH_LENGTH: usize = 20;

/// Length in bytes of a timestamp-hash.
pub const TS_HASH_LENGTH: usize = 4 + HASH_LENGTH;

/// The total-orderable identity of a message.
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
pub struct TsHash([u8; TS_HASH_LENGTH]);

impl TsHash {
    /// Builds a timestamp-hash from its parts.
    #[must_use]
    pub fn new(timestamp: u32, hash: &[u8; HASH_LENGTH]) -> Self {
        let mut bytes = [0u8; TS_HASH_LENGTH];
        bytes[..4].copy_from_slice(&timestamp.to_be_bytes());
        bytes[4..].copy_from_slice(hash);
        Self(bytes)
    }

    /// Parses a timestamp-hash from a byte slice.
    pub fn from_slice(bytes: &[u8]) -> HubResult<Self> {
        let arr: [u8; TS_HASH_LENGTH] = bytes
            .try_into()
            .map_err(|_| HubError::parse_failure("ts_hash must be 24 bytes"))?;
        Ok(Self(arr))
    }

    /// The embedded timestamp.
    #[must_use]
    pub fn timestamp(&self) -> u32 {
        let mut ts = [0u8; 4];
        ts.copy_from_slice(&self.0[..4]);
        u32::from_be_bytes(ts)
    }

    /// The embedded message hash.
    #[must_use]
    pub fn hash(&self) -> [u8; HASH_LENGTH] {
        let mut hash = [0u8; HASH_LENGTH];
        hash.copy_from_slice(&self.0[4..]);
        hash
    }

    /// The raw 24 bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; TS_HASH_LENGTH] {
        &self.0
    }
}

impl fmt::Display for TsHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for TsHash {
    type Err = HubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)
            .map_err(|e| HubError::parse_failure(format!("invalid ts_hash hex: {e}")))?;
        Self::from_slice(&bytes)
    }
}
