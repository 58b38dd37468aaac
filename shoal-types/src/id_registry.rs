//! Identity-registry events.
//!
//! The id registry is the on-chain contract that assigns custody of a fid.
//! The hub ingests its Register and Transfer events in chain order; for each
//! fid the event with the highest `(block_number, log_index)` is current.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::{Address, Fid, HubError, HubResult};

/// The kind of an id-registry event.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    BorshSerialize,
    BorshDeserialize,
)]
pub enum IdRegistryEventType {
    /// Initial custody assignment for a fid.
    Register,
    /// Custody handover to a new address.
    Transfer,
}

/// A custody event observed on-chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct IdRegistryEvent {
    pub event_type: IdRegistryEventType,
    pub block_number: u64,
    pub log_index: u32,
    pub block_hash: [u8; 32],
    pub transaction_hash: [u8; 32],
    pub fid: Fid,
    /// Previous custody address; absent for Register events.
    pub from: Option<Address>,
    /// New custody address.
    pub to: Address,
}

impl IdRegistryEvent {
    /// Position of this event in the chain's total order.
    #[must_use]
    pub const fn chain_position(&self) -> (u64, u32) {
        (self.block_number, self.log_index)
    }

    /// True when this event comes strictly after `other` in chain order.
    #[must_use]
    pub fn supersedes(&self, other: &Self) -> bool {
        self.chain_position() > other.chain_position()
    }

    /// True when the two events claim the same chain position but disagree on
    /// the block or transaction, which indicates a chain inconsistency.
    #[must_use]
    pub fn conflicts_with(&self, other: &Self) -> bool {
        self.chain_position() == other.chain_position()
            && (self.block_hash != other.block_hash
                || self.transaction_hash != other.transaction_hash)
    }

    /// Encodes the event for a KV row.
    pub fn to_bytes(&self) -> HubResult<Vec<u8>> {
        borsh::to_vec(self)
            .map_err(|e| HubError::unknown(format!("id registry event serialization failed: {e}")))
    }

    /// Decodes an event from its row bytes.
    pub fn from_bytes(bytes: &[u8]) -> HubResult<Self> {
        borsh::from_slice(bytes)
            .map_err(|e| HubError::parse_failure(format!("malformed id registry event: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(block: u64, log: u32, block_hash: [u8; 32], tx_hash: [u8; 32]) -> IdRegistryEvent {
        IdRegistryEvent {
            event_type: IdRegistryEventType::Register,
            block_number: block,
            log_index: log,
            block_hash,
            transaction_hash: tx_hash,
            fid: Fid::new(1),
            from: None,
            to: Address::from_bytes([0xaa; 20]),
        }
    }

    #[test]
    fn chain_order_is_block_then_log() {
        let a = event(10, 5, [1; 32], [1; 32]);
        let b = event(10, 6, [1; 32], [1; 32]);
        let c = event(11, 0, [1; 32], [1; 32]);
        assert!(b.supersedes(&a));
        assert!(c.supersedes(&b));
        assert!(!a.supersedes(&a));
    }

    #[test]
    fn same_position_different_hashes_conflict() {
        let a = event(10, 5, [1; 32], [1; 32]);
        let b = event(10, 5, [2; 32], [1; 32]);
        let c = event(10, 5, [1; 32], [2; 32]);
        let d = event(10, 5, [1; 32], [1; 32]);
        assert!(a.conflicts_with(&b));
        assert!(a.conflicts_with(&c));
        assert!(!a.conflicts_with(&d));
        assert!(!a.conflicts_with(&event(10, 6, [2; 32], [2; 32])));
    }

    #[test]
    fn row_bytes_round_trip() {
        let e = event(42, 7, [3; 32], [4; 32]);
        let decoded = IdRegistryEvent::from_bytes(&e.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, e);
    }
}
