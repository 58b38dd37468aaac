//! Core type definitions for the Shoal hub.
//!
//! This crate defines the fundamental types shared by every layer of the hub:
//! - User, custody, and signer identifiers
//! - Hub time (32-bit seconds since the system epoch)
//! - The signed message model and its timestamp-hash identity
//! - On-chain identity-registry events
//! - The `HubError` result type every fallible operation returns
//!
//! Everything transport-specific (gossip envelopes, RPC payloads) belongs to
//! the crates that own those surfaces, not here.

mod error;
mod id_registry;
mod ids;
mod message;
mod ts_hash;

pub mod time;

pub use error::{ErrorCode, HubError, HubResult};
pub use id_registry::{IdRegistryEvent, IdRegistryEventType};
pub use ids::{Address, Fid, SignerKey, ADDRESS_LENGTH, SIGNER_KEY_LENGTH};
pub use message::{
    AmpBody, CastAddBody, CastId, CastRemoveBody, HashScheme, Message, MessageBody, MessageData,
    MessageType, ReactionBody, ReactionType, SignatureScheme, SignerBody, UserDataBody,
    UserDataType, VerificationAddBody, VerificationRemoveBody, SIGNATURE_LENGTH,
};
pub use ts_hash::{TsHash, HASH_LENGTH, TS_HASH_LENGTH};
