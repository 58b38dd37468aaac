//! CRDT message stores, identity store, and engine for the Shoal hub.
//!
//! Each message family (signers, casts, reactions, amps, verifications, user
//! data) is a per-fid two-phase set: an add set and, for families that support
//! removal, a remove set, both keyed by a family-specific target. Conflicts
//! resolve last-writer-wins with remove-beats-add and bytewise-greater-hash
//! tiebreaks, so any permutation of submissions converges to the same state.
//!
//! The `Engine` is the single entry point: it validates a message's integrity
//! and signer chain, routes it to its store, and fans revocations out when
//! custody changes hands. All state transitions commit through one KV batch
//! and are announced on the event bus afterwards, in commit order.

mod amp_store;
mod cast_store;
mod engine;
mod events;
mod id_registry_store;
mod reaction_store;
mod signer_store;
mod store;
mod user_data_store;
mod verification_store;

pub use amp_store::AmpStore;
pub use cast_store::CastStore;
pub use engine::{Engine, StoreLimits};
pub use events::{HubEvent, StoreEventHandler};
pub use id_registry_store::IdRegistryStore;
pub use reaction_store::ReactionStore;
pub use signer_store::SignerStore;
pub use store::{compare_messages, Store, StoreDef};
pub use user_data_store::UserDataStore;
pub use verification_store::VerificationStore;
