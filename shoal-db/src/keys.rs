//! The typed key layout.
//!
//! A single `RootPrefix` byte discriminates top-level tables. Per-user rows
//! live under `User | fid`, further discriminated by a `UserPostfix` byte:
//!
//! ```text
//! IdRegistryEvent                 | fid                                    -> event bytes
//! IdRegistryEventByCustodyAddress | address                                -> event bytes
//! User | fid | <message postfix>  | ts_hash                                -> message bytes
//! User | fid | <set postfix>      | target                                 -> ts_hash
//! User | fid | BySigner | signer  | message postfix | ts_hash              -> (empty)
//! User | parent fid   | CastsByParent  | parent ts_hash | fid | ts_hash    -> (empty)
//! User | mention fid  | CastsByMention | fid | ts_hash                     -> (empty)
//! TsHashIndex                     | ts_hash                                -> fid | message postfix
//! ```
//!
//! Fids are big-endian, so per-table key order is (fid, …) order, and message
//! rows under one fid are ascending ts_hash, which is chronological.

use shoal_types::{Address, Fid, SignerKey, TsHash};

/// Top-level table discriminator. First byte of every key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RootPrefix {
    IdRegistryEvent = 1,
    IdRegistryEventByCustodyAddress = 2,
    User = 3,
    TsHashIndex = 4,
}

impl RootPrefix {
    /// The key byte.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

/// Row discriminator under a user's prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum UserPostfix {
    // Message rows, one table per store.
    CastMessage = 1,
    AmpMessage = 2,
    ReactionMessage = 3,
    VerificationMessage = 4,
    SignerMessage = 5,
    UserDataMessage = 6,

    // Relation from signer key to the messages it signed.
    BySigner = 7,

    // CRDT set entries: target -> ts_hash of the winning message.
    CastAdds = 8,
    CastRemoves = 9,
    ReactionAdds = 10,
    ReactionRemoves = 11,
    AmpAdds = 12,
    AmpRemoves = 13,
    VerificationAdds = 14,
    VerificationRemoves = 15,
    SignerAdds = 16,
    SignerRemoves = 17,
    UserDataAdds = 18,

    // Cast lookup relations.
    CastsByParent = 19,
    CastsByMention = 20,
}

impl UserPostfix {
    /// The key byte.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }

    /// Decodes a postfix byte read back out of a key.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            1 => Self::CastMessage,
            2 => Self::AmpMessage,
            3 => Self::ReactionMessage,
            4 => Self::VerificationMessage,
            5 => Self::SignerMessage,
            6 => Self::UserDataMessage,
            7 => Self::BySigner,
            8 => Self::CastAdds,
            9 => Self::CastRemoves,
            10 => Self::ReactionAdds,
            11 => Self::ReactionRemoves,
            12 => Self::AmpAdds,
            13 => Self::AmpRemoves,
            14 => Self::VerificationAdds,
            15 => Self::VerificationRemoves,
            16 => Self::SignerAdds,
            17 => Self::SignerRemoves,
            18 => Self::UserDataAdds,
            19 => Self::CastsByParent,
            20 => Self::CastsByMention,
            _ => return None,
        })
    }
}

/// `IdRegistryEvent | fid`
#[must_use]
pub fn id_registry_event_key(fid: Fid) -> Vec<u8> {
    let mut key = Vec::with_capacity(9);
    key.push(RootPrefix::IdRegistryEvent.as_byte());
    key.extend_from_slice(&fid.to_key_bytes());
    key
}

/// `IdRegistryEventByCustodyAddress | address`
#[must_use]
pub fn id_registry_by_custody_key(address: &Address) -> Vec<u8> {
    let mut key = Vec::with_capacity(21);
    key.push(RootPrefix::IdRegistryEventByCustodyAddress.as_byte());
    key.extend_from_slice(address.as_bytes());
    key
}

/// `User | fid` — the prefix every per-user row nests under.
#[must_use]
pub fn user_key(fid: Fid) -> Vec<u8> {
    let mut key = Vec::with_capacity(9);
    key.push(RootPrefix::User.as_byte());
    key.extend_from_slice(&fid.to_key_bytes());
    key
}

/// `User | fid | postfix`
#[must_use]
pub fn user_postfix_key(fid: Fid, postfix: UserPostfix) -> Vec<u8> {
    let mut key = user_key(fid);
    key.push(postfix.as_byte());
    key
}

/// `User | fid | postfix | ts_hash` — a message row.
#[must_use]
pub fn message_key(fid: Fid, postfix: UserPostfix, ts_hash: &TsHash) -> Vec<u8> {
    let mut key = user_postfix_key(fid, postfix);
    key.extend_from_slice(ts_hash.as_bytes());
    key
}

/// `User | fid | set postfix | target` — a CRDT set entry.
#[must_use]
pub fn set_entry_key(fid: Fid, postfix: UserPostfix, target: &[u8]) -> Vec<u8> {
    let mut key = user_postfix_key(fid, postfix);
    key.extend_from_slice(target);
    key
}

/// `User | fid | BySigner | signer` — prefix covering everything one signer
/// signed for one fid.
#[must_use]
pub fn by_signer_prefix(fid: Fid, signer: &SignerKey) -> Vec<u8> {
    let mut key = user_postfix_key(fid, UserPostfix::BySigner);
    key.extend_from_slice(signer.as_bytes());
    key
}

/// `User | fid | BySigner | signer | message postfix | ts_hash`
#[must_use]
pub fn by_signer_key(
    fid: Fid,
    signer: &SignerKey,
    message_postfix: UserPostfix,
    ts_hash: &TsHash,
) -> Vec<u8> {
    let mut key = by_signer_prefix(fid, signer);
    key.push(message_postfix.as_byte());
    key.extend_from_slice(ts_hash.as_bytes());
    key
}

/// `TsHashIndex | ts_hash` — resolves a ts_hash to its owning fid and store.
#[must_use]
pub fn ts_hash_index_key(ts_hash: &TsHash) -> Vec<u8> {
    let mut key = Vec::with_capacity(25);
    key.push(RootPrefix::TsHashIndex.as_byte());
    key.extend_from_slice(ts_hash.as_bytes());
    key
}
