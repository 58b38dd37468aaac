//! The identity store: custody events from the id registry.
//!
//! For each fid the event with the highest `(block_number, log_index)` is
//! current. Superseded events stay reachable through the custody-address
//! index for audit, but only the per-fid row answers "who holds this fid".

use std::sync::Arc;

use tracing::{info, warn};

use shoal_db::keys;
use shoal_db::{Batch, Database, RootPrefix};
use shoal_types::{Address, Fid, HubError, HubResult, IdRegistryEvent};

use crate::events::{HubEvent, StoreEventHandler};

/// Custody-event storage and lookups.
#[derive(Debug)]
pub struct IdRegistryStore {
    db: Arc<Database>,
    events: StoreEventHandler,
}

impl IdRegistryStore {
    /// Creates the store.
    #[must_use]
    pub fn new(db: Arc<Database>, events: StoreEventHandler) -> Self {
        Self { db, events }
    }

    /// Merges a custody event.
    ///
    /// Returns `Ok(true)` when the event became current, `Ok(false)` when an
    /// equal-or-later event already is. Two events at the same chain position
    /// with different block or transaction hashes fail with
    /// `bad_request.conflict`.
    pub async fn merge_id_registry_event(&self, event: &IdRegistryEvent) -> HubResult<bool> {
        let key = keys::id_registry_event_key(event.fid);
        let current = match self.db.get(&key).await? {
            Some(bytes) => Some(IdRegistryEvent::from_bytes(&bytes)?),
            None => None,
        };

        if let Some(current) = &current {
            if event.conflicts_with(current) {
                warn!(
                    fid = %event.fid,
                    block = event.block_number,
                    log = event.log_index,
                    "chain-inconsistent id registry event"
                );
                return Err(HubError::conflict(
                    "id registry event disagrees with the stored event at the same chain position",
                ));
            }
            if !event.supersedes(current) {
                return Ok(false);
            }
        }

        let bytes = event.to_bytes()?;
        let mut batch = Batch::new();
        batch.put(key, bytes.clone());
        // The old custody row is kept: the index is an audit trail, the
        // per-fid row is the source of truth for "current".
        batch.put(keys::id_registry_by_custody_key(&event.to), bytes);
        self.db.commit(batch).await?;

        info!(fid = %event.fid, to = %event.to, "merged id registry event");
        self.events.emit(HubEvent::MergeIdRegistryEvent(event.clone()));
        Ok(true)
    }

    /// The current custody event for a fid.
    pub async fn get_id_registry_event(&self, fid: Fid) -> HubResult<IdRegistryEvent> {
        let bytes = self
            .db
            .get(&keys::id_registry_event_key(fid))
            .await?
            .ok_or_else(|| HubError::not_found(format!("no custody event for fid {fid}")))?;
        IdRegistryEvent::from_bytes(&bytes)
    }

    /// The custody event recorded for an address. May be superseded; check
    /// the per-fid row for currency.
    pub async fn get_id_registry_event_by_address(
        &self,
        address: &Address,
    ) -> HubResult<IdRegistryEvent> {
        let bytes = self
            .db
            .get(&keys::id_registry_by_custody_key(address))
            .await?
            .ok_or_else(|| HubError::not_found(format!("no custody event for {address}")))?;
        IdRegistryEvent::from_bytes(&bytes)
    }

    /// Every fid with a current custody event, ascending.
    pub async fn get_fids(&self) -> HubResult<Vec<Fid>> {
        let prefix = [RootPrefix::IdRegistryEvent.as_byte()];
        let rows = self.db.iterate_prefix(&prefix).await?;
        rows.iter()
            .map(|(key, _)| Fid::from_key_bytes(&key[1..]))
            .collect()
    }
}
