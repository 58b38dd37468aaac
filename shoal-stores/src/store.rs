//! The generic CRDT store every message family instantiates.
//!
//! State per fid and target is at most one message: either the winning add or
//! the winning remove. `merge` resolves conflicts with `compare_messages`,
//! deletes the displaced loser, and writes the winner's rows — primary row,
//! set entry, by-signer relation, ts_hash index, and any family-specific
//! secondary rows — in a single KV batch.

use std::cmp::Ordering;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::debug;

use shoal_db::keys;
use shoal_db::{Batch, Database, UserPostfix};
use shoal_types::{Fid, HubError, HubResult, Message, MessageType, SignerKey, TsHash};

use crate::events::{HubEvent, StoreEventHandler};

/// Orders two messages for conflict resolution.
///
/// Higher timestamp wins; at equal timestamps a remove beats an add; between
/// messages of the same polarity the bytewise-greater hash wins. `Equal`
/// therefore means the two are the identical message.
#[must_use]
pub fn compare_messages(a: &Message, b: &Message) -> Ordering {
    match a.timestamp().cmp(&b.timestamp()) {
        Ordering::Equal => {}
        ord => return ord,
    }
    match (a.message_type().is_remove(), b.message_type().is_remove()) {
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        _ => a.hash.cmp(&b.hash),
    }
}

/// Static description of one message family's storage shape.
pub trait StoreDef: Send + Sync + 'static {
    /// Store name for logs and error messages.
    const NAME: &'static str;
    /// Table holding this family's message rows.
    const MESSAGE_POSTFIX: UserPostfix;
    /// Table holding the add-set entries.
    const ADD_POSTFIX: UserPostfix;
    /// Table holding the remove-set entries; `None` for add-only families.
    const REMOVE_POSTFIX: Option<UserPostfix>;
    /// Default per-fid prune limit.
    const DEFAULT_PRUNE_LIMIT: usize;

    /// The add message type of this family.
    fn add_type() -> MessageType;

    /// The remove message type, if the family has one.
    fn remove_type() -> Option<MessageType>;

    /// Derives the conflict target for a message of this family.
    fn target_key(message: &Message) -> HubResult<Vec<u8>>;

    /// Family-specific index rows written alongside a winning add.
    fn secondary_puts(_message: &Message, _batch: &mut Batch) -> HubResult<()> {
        Ok(())
    }

    /// Family-specific index rows deleted alongside a deleted add.
    fn secondary_deletes(_message: &Message, _batch: &mut Batch) -> HubResult<()> {
        Ok(())
    }
}

/// Value of a ts_hash index row: owning fid plus the message-row postfix.
fn ts_hash_index_value(fid: Fid, postfix: UserPostfix) -> Vec<u8> {
    let mut value = Vec::with_capacity(9);
    value.extend_from_slice(&fid.to_key_bytes());
    value.push(postfix.as_byte());
    value
}

/// A per-family CRDT store over the shared database.
#[derive(Debug)]
pub struct Store<D: StoreDef> {
    db: Arc<Database>,
    events: StoreEventHandler,
    prune_size_limit: usize,
    _def: PhantomData<D>,
}

impl<D: StoreDef> Store<D> {
    /// Creates a store with the family's default prune limit.
    #[must_use]
    pub fn new(db: Arc<Database>, events: StoreEventHandler) -> Self {
        Self::with_prune_size_limit(db, events, D::DEFAULT_PRUNE_LIMIT)
    }

    /// Creates a store with an explicit prune limit.
    #[must_use]
    pub fn with_prune_size_limit(
        db: Arc<Database>,
        events: StoreEventHandler,
        prune_size_limit: usize,
    ) -> Self {
        Self {
            db,
            events,
            prune_size_limit,
            _def: PhantomData,
        }
    }

    /// The per-fid prune limit in effect.
    #[must_use]
    pub fn prune_size_limit(&self) -> usize {
        self.prune_size_limit
    }

    /// Merges a message into the store.
    ///
    /// Returns `Ok(true)` when state changed, `Ok(false)` when the message
    /// was a duplicate or lost to an existing message. Displaced losers are
    /// deleted in the same batch and announced as `PruneMessage` events after
    /// the winner's `MergeMessage`.
    pub async fn merge(&self, message: &Message) -> HubResult<bool> {
        let message_type = message.message_type();
        let is_add = message_type == D::add_type();
        let is_remove = D::remove_type() == Some(message_type);
        if !is_add && !is_remove {
            return Err(HubError::validation_failure(format!(
                "{} cannot merge message type {message_type:?}",
                D::NAME
            )));
        }

        let fid = message.fid();
        let target = D::target_key(message)?;
        let mut losers: Vec<Message> = Vec::new();

        if let Some(remove_postfix) = D::REMOVE_POSTFIX {
            if let Some(existing) = self.set_entry(fid, remove_postfix, &target).await? {
                let existing_msg = self.message_by_ts_hash(fid, &existing).await?;
                match compare_messages(message, &existing_msg) {
                    Ordering::Greater => losers.push(existing_msg),
                    _ => return Ok(false),
                }
            }
        }
        if let Some(existing) = self.set_entry(fid, D::ADD_POSTFIX, &target).await? {
            let existing_msg = self.message_by_ts_hash(fid, &existing).await?;
            match compare_messages(message, &existing_msg) {
                Ordering::Greater => losers.push(existing_msg),
                _ => return Ok(false),
            }
        }

        let mut batch = Batch::new();
        for loser in &losers {
            self.delete_message_rows(loser, &mut batch)?;
        }
        self.put_message_rows(message, is_add, &target, &mut batch)?;
        self.db.commit(batch).await?;

        debug!(
            store = D::NAME,
            fid = %fid,
            ts_hash = %message.ts_hash(),
            displaced = losers.len(),
            "merged message"
        );
        self.events.emit(HubEvent::MergeMessage(message.clone()));
        for loser in losers {
            self.events.emit(HubEvent::PruneMessage(loser));
        }

        self.prune_messages(fid).await?;
        Ok(true)
    }

    /// Deletes the earliest messages for a fid until the store is within its
    /// prune limit. Returns the pruned messages, oldest first.
    pub async fn prune_messages(&self, fid: Fid) -> HubResult<Vec<Message>> {
        let prefix = keys::user_postfix_key(fid, D::MESSAGE_POSTFIX);
        let rows = self.db.iterate_prefix(&prefix).await?;
        if rows.len() <= self.prune_size_limit {
            return Ok(Vec::new());
        }

        let excess = rows.len() - self.prune_size_limit;
        let mut pruned = Vec::with_capacity(excess);
        let mut batch = Batch::new();
        for (_, value) in rows.into_iter().take(excess) {
            let message = Message::from_bytes(&value)?;
            self.delete_message_rows(&message, &mut batch)?;
            pruned.push(message);
        }
        self.db.commit(batch).await?;

        debug!(store = D::NAME, fid = %fid, count = pruned.len(), "pruned messages");
        for message in &pruned {
            self.events.emit(HubEvent::PruneMessage(message.clone()));
        }
        Ok(pruned)
    }

    /// Deletes every message in this store signed by `signer` for `fid`.
    /// Returns the revoked messages; each is announced as `RevokeMessage`.
    pub async fn revoke_messages_by_signer(
        &self,
        fid: Fid,
        signer: &SignerKey,
    ) -> HubResult<Vec<Message>> {
        let prefix = keys::by_signer_prefix(fid, signer);
        let rows = self.db.iterate_prefix(&prefix).await?;

        let mut revoked = Vec::new();
        let mut batch = Batch::new();
        for (key, _) in rows {
            // Key layout after the prefix: message postfix byte, then ts_hash.
            // The by-signer relation is shared by all stores, so skip rows
            // that belong to a different message table.
            let rest = &key[prefix.len()..];
            if rest.first() != Some(&D::MESSAGE_POSTFIX.as_byte()) {
                continue;
            }
            let ts_hash = TsHash::from_slice(&rest[1..])?;
            let message = self.message_by_ts_hash(fid, &ts_hash).await?;
            self.delete_message_rows(&message, &mut batch)?;
            revoked.push(message);
        }
        if revoked.is_empty() {
            return Ok(Vec::new());
        }
        self.db.commit(batch).await?;

        debug!(store = D::NAME, fid = %fid, signer = %signer, count = revoked.len(), "revoked messages");
        for message in &revoked {
            self.events.emit(HubEvent::RevokeMessage(message.clone()));
        }
        Ok(revoked)
    }

    /// The winning add for a target.
    pub async fn get_add(&self, fid: Fid, target: &[u8]) -> HubResult<Message> {
        let ts_hash = self
            .set_entry(fid, D::ADD_POSTFIX, target)
            .await?
            .ok_or_else(|| HubError::not_found(format!("no {} add for target", D::NAME)))?;
        self.message_by_ts_hash(fid, &ts_hash).await
    }

    /// The winning remove for a target.
    pub async fn get_remove(&self, fid: Fid, target: &[u8]) -> HubResult<Message> {
        let remove_postfix = D::REMOVE_POSTFIX.ok_or_else(|| {
            HubError::invalid_param(format!("{} does not support removes", D::NAME))
        })?;
        let ts_hash = self
            .set_entry(fid, remove_postfix, target)
            .await?
            .ok_or_else(|| HubError::not_found(format!("no {} remove for target", D::NAME)))?;
        self.message_by_ts_hash(fid, &ts_hash).await
    }

    /// All winning adds for a fid, in target order.
    pub async fn get_adds_by_fid(&self, fid: Fid) -> HubResult<Vec<Message>> {
        self.messages_from_set(fid, D::ADD_POSTFIX).await
    }

    /// All winning removes for a fid, in target order.
    pub async fn get_removes_by_fid(&self, fid: Fid) -> HubResult<Vec<Message>> {
        match D::REMOVE_POSTFIX {
            Some(postfix) => self.messages_from_set(fid, postfix).await,
            None => Ok(Vec::new()),
        }
    }

    /// Every message row for a fid, ascending ts_hash.
    pub async fn get_all_messages_by_fid(&self, fid: Fid) -> HubResult<Vec<Message>> {
        let prefix = keys::user_postfix_key(fid, D::MESSAGE_POSTFIX);
        let rows = self.db.iterate_prefix(&prefix).await?;
        rows.into_iter()
            .map(|(_, value)| Message::from_bytes(&value))
            .collect()
    }

    /// Number of message rows for a fid.
    pub async fn message_count(&self, fid: Fid) -> HubResult<usize> {
        let prefix = keys::user_postfix_key(fid, D::MESSAGE_POSTFIX);
        self.db.count_prefix(&prefix).await
    }

    async fn messages_from_set(&self, fid: Fid, postfix: UserPostfix) -> HubResult<Vec<Message>> {
        let prefix = keys::user_postfix_key(fid, postfix);
        let rows = self.db.iterate_prefix(&prefix).await?;
        let mut messages = Vec::with_capacity(rows.len());
        for (_, value) in rows {
            let ts_hash = TsHash::from_slice(&value)?;
            messages.push(self.message_by_ts_hash(fid, &ts_hash).await?);
        }
        Ok(messages)
    }

    async fn set_entry(
        &self,
        fid: Fid,
        postfix: UserPostfix,
        target: &[u8],
    ) -> HubResult<Option<TsHash>> {
        match self.db.get(&keys::set_entry_key(fid, postfix, target)).await? {
            Some(bytes) => Ok(Some(TsHash::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn message_by_ts_hash(&self, fid: Fid, ts_hash: &TsHash) -> HubResult<Message> {
        let key = keys::message_key(fid, D::MESSAGE_POSTFIX, ts_hash);
        let bytes = self.db.get(&key).await?.ok_or_else(|| {
            HubError::unknown(format!("{} index points at a missing message row", D::NAME))
        })?;
        Message::from_bytes(&bytes)
    }

    fn put_message_rows(
        &self,
        message: &Message,
        is_add: bool,
        target: &[u8],
        batch: &mut Batch,
    ) -> HubResult<()> {
        let fid = message.fid();
        let ts_hash = message.ts_hash();
        let set_postfix = if is_add {
            D::ADD_POSTFIX
        } else {
            match D::REMOVE_POSTFIX {
                Some(postfix) => postfix,
                None => {
                    return Err(HubError::unknown(format!(
                        "{} has no remove set",
                        D::NAME
                    )));
                }
            }
        };

        batch.put(
            keys::message_key(fid, D::MESSAGE_POSTFIX, &ts_hash),
            message.to_bytes()?,
        );
        batch.put(
            keys::set_entry_key(fid, set_postfix, target),
            ts_hash.as_bytes().to_vec(),
        );
        batch.put(
            keys::by_signer_key(fid, &message.signer, D::MESSAGE_POSTFIX, &ts_hash),
            Vec::new(),
        );
        batch.put(
            keys::ts_hash_index_key(&ts_hash),
            ts_hash_index_value(fid, D::MESSAGE_POSTFIX),
        );
        if is_add {
            D::secondary_puts(message, batch)?;
        }
        Ok(())
    }

    fn delete_message_rows(&self, message: &Message, batch: &mut Batch) -> HubResult<()> {
        let fid = message.fid();
        let ts_hash = message.ts_hash();
        let is_add = message.message_type() == D::add_type();
        let target = D::target_key(message)?;
        let set_postfix = if is_add {
            D::ADD_POSTFIX
        } else {
            match D::REMOVE_POSTFIX {
                Some(postfix) => postfix,
                None => {
                    return Err(HubError::unknown(format!(
                        "{} has no remove set",
                        D::NAME
                    )));
                }
            }
        };

        batch.delete(keys::message_key(fid, D::MESSAGE_POSTFIX, &ts_hash));
        batch.delete(keys::set_entry_key(fid, set_postfix, &target));
        batch.delete(keys::by_signer_key(
            fid,
            &message.signer,
            D::MESSAGE_POSTFIX,
            &ts_hash,
        ));
        batch.delete(keys::ts_hash_index_key(&ts_hash));
        if is_add {
            D::secondary_deletes(message, batch)?;
        }
        Ok(())
    }
}
