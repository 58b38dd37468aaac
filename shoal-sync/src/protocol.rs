//! Gossip-facing types and the peer client contract.
//!
//! The transport itself lives outside the core: something else dials peers,
//! carries `GossipMessage`s, and hands contact info to the sync engine. The
//! engine only needs a `PeerSyncClient` it can ask for snapshots, node
//! metadata, sync-ids, and messages.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use shoal_types::{HubResult, IdRegistryEvent, Message};

use crate::sync_id::SyncId;
use crate::trie::{TrieNodeMetadata, TrieSnapshot};

/// The primary gossip topic every hub subscribes to.
pub const NETWORK_TOPIC_PRIMARY: &str = "shoal_network_primary";

/// A peer's advertised coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    /// The peer's stable identity on the gossip network.
    pub peer_id: String,
    /// RPC endpoint for sync, when the peer serves one.
    pub rpc_address: Option<String>,
}

/// Payload of a gossip envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GossipContent {
    Message(Message),
    IdRegistryEvent(IdRegistryEvent),
    ContactInfo(ContactInfo),
}

/// An envelope on the gossip network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GossipMessage {
    pub content: GossipContent,
    pub topics: Vec<String>,
}

impl GossipMessage {
    /// Wraps content for the primary topic.
    #[must_use]
    pub fn primary(content: GossipContent) -> Self {
        Self {
            content,
            topics: vec![NETWORK_TOPIC_PRIMARY.to_string()],
        }
    }
}

/// What the sync engine needs from a peer. Implementations wrap whatever
/// transport reaches the peer's RPC endpoint; failures surface as
/// `unavailable`.
#[async_trait]
pub trait PeerSyncClient: Send + Sync {
    /// The peer's snapshot at a prefix.
    async fn get_snapshot(&self, prefix: &str) -> HubResult<TrieSnapshot>;

    /// The peer's trie node at a prefix, if present.
    async fn get_trie_node_metadata(&self, prefix: &str) -> HubResult<Option<TrieNodeMetadata>>;

    /// Every sync-id the peer holds under a prefix.
    async fn get_all_sync_ids_by_prefix(&self, prefix: &str) -> HubResult<Vec<SyncId>>;

    /// The full messages for a set of sync-ids. Ids the peer no longer holds
    /// are skipped, not errors.
    async fn get_all_messages_by_sync_ids(&self, ids: &[SyncId]) -> HubResult<Vec<Message>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contact_info_round_trips_as_json() {
        let envelope = GossipMessage::primary(GossipContent::ContactInfo(ContactInfo {
            peer_id: "12D3KooWExample".to_string(),
            rpc_address: Some("203.0.113.7:2283".to_string()),
        }));
        let json = serde_json::to_string(&envelope).unwrap();
        let decoded: GossipMessage = serde_json::from_str(&json).unwrap();

        assert_eq!(decoded.topics, vec![NETWORK_TOPIC_PRIMARY.to_string()]);
        match decoded.content {
            GossipContent::ContactInfo(contact) => {
                assert_eq!(contact.peer_id, "12D3KooWExample");
                assert_eq!(contact.rpc_address.as_deref(), Some("203.0.113.7:2283"));
            }
            other => panic!("wrong content {other:?}"),
        }
    }
}
