//! The 16-ary merkle trie over sync-ids.
//!
//! One leaf per message. A sync-id is spelled out digit by digit, one trie
//! level per character, with the full id stored at the terminal node. Every
//! node caches a 16-byte blake3 digest: a leaf hashes its sync-id, an
//! internal node hashes the concatenation of its children's digests in
//! ascending digit order. The root digest and item count therefore summarize
//! the whole replica, and because the shape is a pure function of the leaf
//! set, the summary never depends on insertion order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Byte length of a trie digest.
const TRIE_HASH_LENGTH: usize = 16;

type TrieHash = [u8; TRIE_HASH_LENGTH];

fn digest(bytes: &[u8]) -> TrieHash {
    let mut out = [0u8; TRIE_HASH_LENGTH];
    blake3::Hasher::new()
        .update(bytes)
        .finalize_xof()
        .fill(&mut out);
    out
}

/// The digest of empty input, in hex: the root hash of an empty trie and the
/// per-level placeholder for prefixes with no siblings.
#[must_use]
pub fn empty_hash_hex() -> String {
    hex::encode(digest(&[]))
}

/// Summary of one child edge, as exposed in node metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrieChildMetadata {
    /// Digest of the child's subtree, hex.
    pub hash: String,
    /// Leaves under the child.
    pub num_messages: usize,
}

/// Metadata for the node at a prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrieNodeMetadata {
    /// The prefix the node sits at.
    pub prefix: String,
    /// Leaves under the node.
    pub num_messages: usize,
    /// Digest of the node's subtree, hex.
    pub hash: String,
    /// Child digit to child summary.
    pub children: BTreeMap<char, TrieChildMetadata>,
}

/// A replica summary anchored at a prefix.
///
/// `excluded_hashes[i]` digests the siblings passed over at depth `i` while
/// walking the prefix — everything in the replica outside the prefix's path.
/// Two replicas agree above a depth exactly when the entries match. When the
/// walk runs out of trie, the level it stopped at is still recorded (every
/// child there is a sibling of the missing digit), so the summary covers the
/// whole replica even for a prefix anchored at the current time, which
/// usually has no subtree yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrieSnapshot {
    /// The prefix actually reached; shorter than requested when the walk ran
    /// out of trie.
    pub prefix: String,
    /// Per-depth digests of the excluded siblings, hex. One entry per digit
    /// consumed, plus one for the level a failed walk stopped at.
    pub excluded_hashes: Vec<String>,
    /// Leaves under the reached prefix.
    pub num_messages: usize,
}

#[derive(Debug, Clone)]
struct TrieNode {
    hash: TrieHash,
    items: usize,
    children: BTreeMap<u8, TrieNode>,
    /// The full sync-id; present only at terminal nodes.
    value: Option<Vec<u8>>,
}

impl TrieNode {
    fn empty() -> Self {
        Self {
            hash: digest(&[]),
            items: 0,
            children: BTreeMap::new(),
            value: None,
        }
    }

    /// Recomputes this node's digest and item count from its contents.
    fn refresh(&mut self) {
        if let Some(value) = &self.value {
            self.hash = digest(value);
            self.items = 1;
            return;
        }
        let mut hasher = blake3::Hasher::new();
        let mut items = 0;
        for child in self.children.values() {
            hasher.update(&child.hash);
            items += child.items;
        }
        let mut out = [0u8; TRIE_HASH_LENGTH];
        hasher.finalize_xof().fill(&mut out);
        self.hash = out;
        self.items = items;
    }

    fn insert(&mut self, key: &[u8], depth: usize) -> bool {
        if depth == key.len() {
            if self.value.is_some() {
                return false;
            }
            self.value = Some(key.to_vec());
            self.refresh();
            return true;
        }

        let changed = self
            .children
            .entry(key[depth])
            .or_insert_with(TrieNode::empty)
            .insert(key, depth + 1);
        if changed {
            self.refresh();
        }
        changed
    }

    fn delete(&mut self, key: &[u8], depth: usize) -> bool {
        if depth == key.len() {
            if self.value.is_none() {
                return false;
            }
            self.value = None;
            self.refresh();
            return true;
        }

        let Some(child) = self.children.get_mut(&key[depth]) else {
            return false;
        };
        let changed = child.delete(key, depth + 1);
        if changed {
            if child.items == 0 {
                self.children.remove(&key[depth]);
            }
            self.refresh();
        }
        changed
    }

    fn exists(&self, key: &[u8], depth: usize) -> bool {
        if depth == key.len() {
            return self.value.is_some();
        }
        match self.children.get(&key[depth]) {
            Some(child) => child.exists(key, depth + 1),
            None => false,
        }
    }

    /// The node at `prefix`, or `None` when the path is absent.
    fn node_at(&self, prefix: &[u8]) -> Option<&TrieNode> {
        let mut node = self;
        for digit in prefix {
            node = node.children.get(digit)?;
        }
        Some(node)
    }

    /// Digest of every child except `excluded`, concatenated in digit order.
    fn excluded_hash(&self, excluded: u8) -> TrieHash {
        let mut hasher = blake3::Hasher::new();
        for (digit, child) in &self.children {
            if *digit != excluded {
                hasher.update(&child.hash);
            }
        }
        let mut out = [0u8; TRIE_HASH_LENGTH];
        hasher.finalize_xof().fill(&mut out);
        out
    }

    fn collect_values(&self, out: &mut Vec<Vec<u8>>) {
        if let Some(value) = &self.value {
            out.push(value.clone());
        }
        for child in self.children.values() {
            child.collect_values(out);
        }
    }
}

/// The trie itself. Mutated only by the sync engine's event observer.
#[derive(Debug, Clone)]
pub struct MerkleTrie {
    root: TrieNode,
}

impl MerkleTrie {
    /// Creates an empty trie.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: TrieNode::empty(),
        }
    }

    /// Inserts a sync-id. Re-inserting an existing id is a no-op.
    pub fn insert(&mut self, id: &str) -> bool {
        self.root.insert(id.as_bytes(), 0)
    }

    /// Deletes a sync-id. Deleting an absent id is a no-op.
    pub fn delete(&mut self, id: &str) -> bool {
        self.root.delete(id.as_bytes(), 0)
    }

    /// Leaf lookup.
    #[must_use]
    pub fn exists(&self, id: &str) -> bool {
        self.root.exists(id.as_bytes(), 0)
    }

    /// Total number of leaves.
    #[must_use]
    pub fn items(&self) -> usize {
        self.root.items
    }

    /// Root digest, hex. Equals `empty_hash_hex()` exactly when the trie is
    /// empty.
    #[must_use]
    pub fn root_hash(&self) -> String {
        hex::encode(self.root.hash)
    }

    /// Metadata for the node at `prefix`, or `None` when the prefix is not
    /// present.
    #[must_use]
    pub fn get_trie_node_metadata(&self, prefix: &str) -> Option<TrieNodeMetadata> {
        let node = self.root.node_at(prefix.as_bytes())?;
        let children = node
            .children
            .iter()
            .map(|(digit, child)| {
                (
                    *digit as char,
                    TrieChildMetadata {
                        hash: hex::encode(child.hash),
                        num_messages: child.items,
                    },
                )
            })
            .collect();
        Some(TrieNodeMetadata {
            prefix: prefix.to_string(),
            num_messages: node.items,
            hash: hex::encode(node.hash),
            children,
        })
    }

    /// Snapshot of the replica along `prefix`.
    ///
    /// Walks from the root one digit at a time, recording at each depth the
    /// digest of the siblings not taken, then descending. A walk that runs
    /// out of trie stops after recording the level it failed at and returns
    /// the partial prefix it reached.
    #[must_use]
    pub fn get_snapshot(&self, prefix: &str) -> TrieSnapshot {
        let mut node = &self.root;
        let mut reached = String::new();
        let mut excluded_hashes = Vec::with_capacity(prefix.len());

        for digit in prefix.bytes() {
            excluded_hashes.push(hex::encode(node.excluded_hash(digit)));
            let Some(child) = node.children.get(&digit) else {
                break;
            };
            reached.push(digit as char);
            node = child;
        }

        TrieSnapshot {
            prefix: reached,
            excluded_hashes,
            num_messages: node.items,
        }
    }

    /// The longest prefix of `prefix` at which this replica still agrees
    /// with a peer that reported `other_excluded_hashes` for the same
    /// prefix. Capped at the shorter of the two excluded lists.
    #[must_use]
    pub fn get_divergence_prefix(&self, prefix: &str, other_excluded_hashes: &[String]) -> String {
        let ours = self.get_snapshot(prefix);
        let depth = ours.excluded_hashes.len().min(other_excluded_hashes.len());
        for i in 0..depth {
            if ours.excluded_hashes[i] != other_excluded_hashes[i] {
                return prefix[..i].to_string();
            }
        }
        prefix[..depth].to_string()
    }

    /// Every sync-id under `prefix`, ascending (chronological) order.
    #[must_use]
    pub fn keys_by_prefix(&self, prefix: &str) -> Vec<String> {
        let Some(node) = self.root.node_at(prefix.as_bytes()) else {
            return Vec::new();
        };
        let mut values = Vec::with_capacity(node.items);
        node.collect_values(&mut values);
        values
            .into_iter()
            .map(|value| String::from_utf8_lossy(&value).into_owned())
            .collect()
    }
}

impl Default for MerkleTrie {
    fn default() -> Self {
        Self::new()
    }
}
