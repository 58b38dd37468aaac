//! The ordered map and its write batches.

use std::collections::BTreeMap;

use tokio::sync::RwLock;

use shoal_types::HubResult;

/// A single operation inside a write batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

/// A write transaction.
///
/// Operations are applied in insertion order when the batch commits, so a
/// later put to the same key wins within one batch.
#[derive(Debug, Default)]
pub struct Batch {
    ops: Vec<BatchOp>,
}

impl Batch {
    /// Creates an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a put.
    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.ops.push(BatchOp::Put { key, value });
    }

    /// Queues a delete.
    pub fn delete(&mut self, key: Vec<u8>) {
        self.ops.push(BatchOp::Delete { key });
    }

    /// Number of queued operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// True when nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// The hub's ordered byte-key store.
///
/// Backed by an in-process ordered map behind an async lock. Reads take the
/// shared lock; `commit` takes the exclusive lock, which is what serializes
/// writers. Swapping in an embedded on-disk engine only has to preserve this
/// surface.
#[derive(Debug, Default)]
pub struct Database {
    map: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl Database {
    /// Creates an empty database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Point read.
    pub async fn get(&self, key: &[u8]) -> HubResult<Option<Vec<u8>>> {
        Ok(self.map.read().await.get(key).cloned())
    }

    /// Existence check.
    pub async fn has(&self, key: &[u8]) -> HubResult<bool> {
        Ok(self.map.read().await.contains_key(key))
    }

    /// Applies a batch atomically.
    pub async fn commit(&self, batch: Batch) -> HubResult<()> {
        let mut map = self.map.write().await;
        for op in batch.ops {
            match op {
                BatchOp::Put { key, value } => {
                    map.insert(key, value);
                }
                BatchOp::Delete { key } => {
                    map.remove(&key);
                }
            }
        }
        Ok(())
    }

    /// Convenience single put.
    pub async fn put(&self, key: Vec<u8>, value: Vec<u8>) -> HubResult<()> {
        let mut batch = Batch::new();
        batch.put(key, value);
        self.commit(batch).await
    }

    /// Convenience single delete.
    pub async fn delete(&self, key: Vec<u8>) -> HubResult<()> {
        let mut batch = Batch::new();
        batch.delete(key);
        self.commit(batch).await
    }

    /// All entries whose key starts with `prefix`, in ascending key order.
    ///
    /// Returns a snapshot; callers iterate without holding the lock.
    pub async fn iterate_prefix(&self, prefix: &[u8]) -> HubResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let map = self.map.read().await;
        let entries = map
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(entries)
    }

    /// Number of entries whose key starts with `prefix`.
    pub async fn count_prefix(&self, prefix: &[u8]) -> HubResult<usize> {
        let map = self.map.read().await;
        Ok(map
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .count())
    }
}
