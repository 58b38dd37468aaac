//! Merkle-trie replica summary and peer reconciliation for the Shoal hub.
//!
//! Every message persisted by the stores is mirrored as a leaf in a 16-ary
//! merkle trie keyed by sync-id: the message's 10-digit decimal timestamp
//! followed by its ts_hash in hex. Node digests summarize subtrees, so two
//! hubs can find where their replicas diverge in a handful of hash
//! comparisons and pull only the differing range.
//!
//! The `SyncEngine` owns the trie, keeps it in lockstep with the store event
//! stream, and runs the snapshot-exchange / divergence-walk protocol against
//! peers reached through a `PeerSyncClient`.

mod engine;
mod sync_id;
mod trie;

pub mod protocol;

pub use engine::{SyncConfig, SyncEngine};
pub use protocol::{ContactInfo, GossipContent, GossipMessage, PeerSyncClient, NETWORK_TOPIC_PRIMARY};
pub use sync_id::{SyncId, SYNC_ID_LENGTH};
pub use trie::{empty_hash_hex, MerkleTrie, TrieChildMetadata, TrieNodeMetadata, TrieSnapshot};
