//! The sync engine: trie mirror and pairwise reconciliation.
//!
//! The engine subscribes to the store event bus and mirrors every merge,
//! prune, and revoke into the merkle trie, so the trie always summarizes the
//! replica as of the events drained so far. Reconciliation exchanges
//! snapshots with a peer, finds the divergence prefix, walks the differing
//! subtrees breadth-first, and submits fetched messages through the store
//! engine — which re-validates each one, so a misbehaving peer can waste
//! bandwidth but not corrupt state.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use shoal_stores::{Engine, HubEvent, StoreEventHandler};
use shoal_types::{time, HubResult, Message};

use crate::protocol::{ContactInfo, PeerSyncClient};
use crate::sync_id::SyncId;
use crate::trie::{MerkleTrie, TrieNodeMetadata, TrieSnapshot};

/// Tuning for the sync engine.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Hard bound on one reconciliation round.
    pub sync_timeout: Duration,
    /// How many leading digits of the current timestamp anchor the snapshot
    /// exchange.
    pub top_level_prefix_length: usize,
    /// Subtrees at or under this many messages are fetched outright instead
    /// of descended into.
    pub fetch_threshold: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            sync_timeout: Duration::from_secs(30),
            top_level_prefix_length: 2,
            fetch_threshold: 1_024,
        }
    }
}

/// Owns the trie and drives reconciliation with peers.
pub struct SyncEngine {
    engine: Arc<Engine>,
    events: StoreEventHandler,
    trie: RwLock<MerkleTrie>,
    rx: Mutex<broadcast::Receiver<HubEvent>>,
    config: SyncConfig,
}

impl SyncEngine {
    /// Creates a sync engine observing the store engine's event bus.
    #[must_use]
    pub fn new(engine: Arc<Engine>, config: SyncConfig) -> Self {
        let events = engine.events().clone();
        let rx = Mutex::new(events.subscribe());
        Self {
            engine,
            events,
            trie: RwLock::new(MerkleTrie::new()),
            rx,
            config,
        }
    }

    // ── Trie mirror ──────────────────────────────────────────────

    /// Applies every event buffered since the last drain. The trie reflects
    /// the KV state once this returns. A no-op while a `run` observer holds
    /// the receiver; the observer mirrors events as they land.
    pub async fn drain_events(&self) {
        let Ok(mut rx) = self.rx.try_lock() else {
            return;
        };
        loop {
            match rx.try_recv() {
                Ok(event) => self.apply_event(&event).await,
                Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                    // The mirror lost events; the next reconciliation will
                    // repair the difference, but flag it loudly.
                    warn!(missed, "trie mirror lagged behind the event bus");
                }
                Err(_) => break,
            }
        }
    }

    /// Observes the event bus until the sender side is dropped. Run this as
    /// a spawned task on a live hub; tests usually call `drain_events`.
    pub async fn run(&self) {
        loop {
            let event = {
                let mut rx = self.rx.lock().await;
                rx.recv().await
            };
            match event {
                Ok(event) => self.apply_event(&event).await,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "trie mirror lagged behind the event bus");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    async fn apply_event(&self, event: &HubEvent) {
        match event {
            HubEvent::MergeMessage(message) => {
                let id = SyncId::from_message(message);
                self.trie.write().await.insert(id.as_str());
            }
            HubEvent::PruneMessage(message) | HubEvent::RevokeMessage(message) => {
                let id = SyncId::from_message(message);
                self.trie.write().await.delete(id.as_str());
            }
            HubEvent::MergeIdRegistryEvent(_) | HubEvent::SyncComplete(_) => {}
        }
    }

    // ── Local summary, also served to peers over RPC ─────────────

    /// Current root digest, hex.
    pub async fn root_hash(&self) -> String {
        self.trie.read().await.root_hash()
    }

    /// Current leaf count.
    pub async fn items(&self) -> usize {
        self.trie.read().await.items()
    }

    /// Whether a sync-id is present.
    pub async fn exists(&self, id: &SyncId) -> bool {
        self.trie.read().await.exists(id.as_str())
    }

    /// Snapshot at an explicit prefix, or at the current-time anchor.
    pub async fn get_snapshot(&self, prefix: Option<&str>) -> TrieSnapshot {
        let prefix = match prefix {
            Some(prefix) => prefix.to_string(),
            None => self.current_time_prefix(),
        };
        self.trie.read().await.get_snapshot(&prefix)
    }

    /// Node metadata at a prefix.
    pub async fn get_trie_node_metadata(&self, prefix: &str) -> Option<TrieNodeMetadata> {
        self.trie.read().await.get_trie_node_metadata(prefix)
    }

    /// Every local sync-id under a prefix.
    pub async fn get_all_sync_ids_by_prefix(&self, prefix: &str) -> Vec<SyncId> {
        self.trie
            .read()
            .await
            .keys_by_prefix(prefix)
            .iter()
            .filter_map(|key| SyncId::parse(key).ok())
            .collect()
    }

    /// The full messages for a set of sync-ids; ids this hub no longer
    /// holds are skipped.
    pub async fn get_all_messages_by_sync_ids(&self, ids: &[SyncId]) -> HubResult<Vec<Message>> {
        let mut ts_hashes = Vec::with_capacity(ids.len());
        for id in ids {
            ts_hashes.push(id.ts_hash()?);
        }
        self.engine.get_messages_by_ts_hashes(&ts_hashes).await
    }

    // ── Reconciliation ───────────────────────────────────────────

    /// Reacts to a peer's contact info: syncs when it advertises an RPC
    /// endpoint, ignores it otherwise.
    pub async fn handle_contact_info(
        &self,
        contact: &ContactInfo,
        client: &dyn PeerSyncClient,
    ) -> HubResult<bool> {
        if contact.rpc_address.is_none() {
            debug!(peer = %contact.peer_id, "peer advertises no rpc endpoint, skipping sync");
            return Ok(false);
        }
        self.sync_with_peer(client).await
    }

    /// Runs one bounded reconciliation round. Emits `SyncComplete` with the
    /// outcome and returns it.
    pub async fn sync_with_peer(&self, client: &dyn PeerSyncClient) -> HubResult<bool> {
        let result = timeout(self.config.sync_timeout, self.reconcile(client)).await;
        let success = match &result {
            Ok(Ok(())) => true,
            Ok(Err(err)) => {
                warn!(%err, "sync round failed");
                false
            }
            Err(_) => {
                warn!(timeout = ?self.config.sync_timeout, "sync round timed out");
                false
            }
        };
        self.events.emit(HubEvent::SyncComplete(success));
        Ok(success)
    }

    async fn reconcile(&self, client: &dyn PeerSyncClient) -> HubResult<()> {
        self.drain_events().await;

        let anchor = self.current_time_prefix();
        let theirs = client.get_snapshot(&anchor).await?;
        let divergence = {
            let trie = self.trie.read().await;
            if trie.get_snapshot(&anchor).excluded_hashes == theirs.excluded_hashes {
                debug!("replicas agree at the anchor prefix, nothing to pull");
                return Ok(());
            }
            trie.get_divergence_prefix(&anchor, &theirs.excluded_hashes)
        };
        debug!(%divergence, "starting divergence walk");

        let mut fetched = 0usize;
        let mut queue = VecDeque::from([divergence]);
        while let Some(prefix) = queue.pop_front() {
            let Some(remote) = client.get_trie_node_metadata(&prefix).await? else {
                continue;
            };
            let local = self.get_trie_node_metadata(&prefix).await;
            if local.as_ref().is_some_and(|node| node.hash == remote.hash) {
                continue;
            }

            let descend = remote.num_messages > self.config.fetch_threshold
                && !remote.children.is_empty();
            if descend {
                for (digit, remote_child) in &remote.children {
                    let differs = match &local {
                        Some(node) => node
                            .children
                            .get(digit)
                            .is_none_or(|child| child.hash != remote_child.hash),
                        None => true,
                    };
                    if differs {
                        queue.push_back(format!("{prefix}{digit}"));
                    }
                }
                continue;
            }

            fetched += self.pull_prefix(client, &prefix).await?;
        }

        info!(fetched, "sync round finished");
        Ok(())
    }

    /// Fetches every sync-id a peer holds under `prefix` and submits the
    /// messages this replica is missing.
    async fn pull_prefix(&self, client: &dyn PeerSyncClient, prefix: &str) -> HubResult<usize> {
        let ids = client.get_all_sync_ids_by_prefix(prefix).await?;
        let missing: Vec<SyncId> = {
            let trie = self.trie.read().await;
            ids.into_iter()
                .filter(|id| !trie.exists(id.as_str()))
                .collect()
        };
        if missing.is_empty() {
            return Ok(0);
        }

        let messages = client.get_all_messages_by_sync_ids(&missing).await?;
        let mut merged = 0;
        for message in &messages {
            // One bad message never aborts the round.
            match self.engine.merge_message(message).await {
                Ok(true) => merged += 1,
                Ok(false) => {}
                Err(err) => {
                    warn!(%err, ts_hash = %message.ts_hash(), "peer message rejected");
                }
            }
        }
        self.drain_events().await;
        Ok(merged)
    }

    fn current_time_prefix(&self) -> String {
        let encoded = time::to_sync_timestamp(time::now());
        encoded[..self.config.top_level_prefix_length.min(encoded.len())].to_string()
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
