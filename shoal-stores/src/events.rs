//! The hub event bus.
//!
//! Stores emit events after their KV batch commits, in commit order. The bus
//! is a plain broadcast channel: fan-out to any number of listeners, no
//! back-pressure, lagging receivers drop the oldest events. It is a per-engine
//! handle passed explicitly to everything that emits or observes.

use tokio::sync::broadcast;

use shoal_types::{IdRegistryEvent, Message};

/// Default buffer size for the broadcast channel.
const DEFAULT_CAPACITY: usize = 4096;

/// A state transition observable on the event bus.
#[derive(Debug, Clone)]
pub enum HubEvent {
    /// A message won its merge and was persisted.
    MergeMessage(Message),
    /// A message was deleted by conflict displacement or a prune pass.
    PruneMessage(Message),
    /// A message was deleted because its signer lost authorization.
    RevokeMessage(Message),
    /// A custody event became current for its fid.
    MergeIdRegistryEvent(IdRegistryEvent),
    /// A reconciliation round with a peer finished.
    SyncComplete(bool),
}

/// Handle for emitting and subscribing to hub events.
#[derive(Debug, Clone)]
pub struct StoreEventHandler {
    tx: broadcast::Sender<HubEvent>,
}

impl StoreEventHandler {
    /// Creates a bus with the default buffer size.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a bus with an explicit buffer size.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribes a new listener. Only events emitted after this call are
    /// delivered.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<HubEvent> {
        self.tx.subscribe()
    }

    /// Emits an event to all current listeners. A bus with no listeners
    /// drops the event silently.
    pub fn emit(&self, event: HubEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for StoreEventHandler {
    fn default() -> Self {
        Self::new()
    }
}
