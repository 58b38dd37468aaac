//! Sync-ids: the trie keys messages are summarized under.
//!
//! A sync-id is the message's 10-digit zero-padded decimal timestamp followed
//! by its 24-byte ts_hash in lowercase hex — 58 hex-digit characters in
//! total. The timestamp prefix keeps trie order chronological; the ts_hash
//! suffix makes the key unique per message.

use std::fmt;

use serde::{Deserialize, Serialize};

use shoal_types::time::{self, SYNC_TIMESTAMP_LENGTH};
use shoal_types::{HubError, HubResult, Message, TsHash, TS_HASH_LENGTH};

/// Total character length of a sync-id.
pub const SYNC_ID_LENGTH: usize = SYNC_TIMESTAMP_LENGTH + TS_HASH_LENGTH * 2;

/// A message's key in the sync trie.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncId(String);

impl SyncId {
    /// Builds the sync-id for a message.
    #[must_use]
    pub fn from_message(message: &Message) -> Self {
        Self::new(message.timestamp(), &message.ts_hash())
    }

    /// Builds a sync-id from its parts.
    #[must_use]
    pub fn new(timestamp: u32, ts_hash: &TsHash) -> Self {
        Self(format!(
            "{}{}",
            time::to_sync_timestamp(timestamp),
            hex::encode(ts_hash.as_bytes())
        ))
    }

    /// Parses and validates an encoded sync-id.
    pub fn parse(encoded: &str) -> HubResult<Self> {
        if encoded.len() != SYNC_ID_LENGTH {
            return Err(HubError::parse_failure(format!(
                "sync id must be {SYNC_ID_LENGTH} characters, got {}",
                encoded.len()
            )));
        }
        if time::from_sync_timestamp(&encoded[..SYNC_TIMESTAMP_LENGTH]).is_none() {
            return Err(HubError::parse_failure("sync id has a malformed timestamp"));
        }
        if !encoded[SYNC_TIMESTAMP_LENGTH..]
            .bytes()
            .all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase())
        {
            return Err(HubError::parse_failure("sync id has a malformed ts_hash"));
        }
        Ok(Self(encoded.to_string()))
    }

    /// The encoded form, which is also the trie key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The embedded timestamp.
    pub fn timestamp(&self) -> HubResult<u32> {
        time::from_sync_timestamp(&self.0[..SYNC_TIMESTAMP_LENGTH])
            .ok_or_else(|| HubError::parse_failure("sync id has a malformed timestamp"))
    }

    /// The embedded ts_hash.
    pub fn ts_hash(&self) -> HubResult<TsHash> {
        let bytes = hex::decode(&self.0[SYNC_TIMESTAMP_LENGTH..])
            .map_err(|e| HubError::parse_failure(format!("sync id hex: {e}")))?;
        TsHash::from_slice(&bytes)
    }
}

impl fmt::Display for SyncId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_timestamp_then_hash() {
        let ts_hash = TsHash::new(1_665_182_332, &[0xab; 20]);
        let id = SyncId::new(1_665_182_332, &ts_hash);
        assert_eq!(id.as_str().len(), SYNC_ID_LENGTH);
        assert!(id.as_str().starts_with("1665182332"));
        assert_eq!(id.timestamp().unwrap(), 1_665_182_332);
        assert_eq!(id.ts_hash().unwrap(), ts_hash);
    }

    #[test]
    fn parse_round_trips() {
        let id = SyncId::new(42, &TsHash::new(42, &[0x0f; 20]));
        let parsed = SyncId::parse(id.as_str()).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn parse_rejects_malformed_input() {
        assert!(SyncId::parse("").is_err());
        assert!(SyncId::parse("123").is_err());
        // Right length, bad hex in the suffix.
        let bad = format!("{}{}", "1665182332", "zz".repeat(24));
        assert!(SyncId::parse(&bad).is_err());
        // Uppercase hex is not canonical.
        let upper = format!("{}{}", "1665182332", "AB".repeat(24));
        assert!(SyncId::parse(&upper).is_err());
    }

    #[test]
    fn sync_ids_sort_chronologically() {
        let early = SyncId::new(100, &TsHash::new(100, &[0xff; 20]));
        let late = SyncId::new(200, &TsHash::new(200, &[0x00; 20]));
        assert!(early < late);
    }
}
