//! The cast store: the user-generated message corpus itself.
//!
//! A CastAdd's conflict target is its own ts_hash; a CastRemove targets the
//! ts_hash of the cast it tombstones. Alongside the standard rows, winning
//! adds maintain two lookup relations: replies indexed under the parent
//! cast's author, and mentions indexed under each mentioned fid.

use std::sync::Arc;

use shoal_db::keys;
use shoal_db::{Batch, Database, UserPostfix};
use shoal_types::{
    CastId, Fid, HubError, HubResult, Message, MessageBody, MessageType, SignerKey, TsHash,
};

use crate::events::StoreEventHandler;
use crate::store::{Store, StoreDef};

/// `User | parent fid | CastsByParent | parent ts_hash | child fid | child ts_hash`
fn by_parent_key(parent: &CastId, child_fid: Fid, child_ts_hash: &TsHash) -> Vec<u8> {
    let mut key = keys::user_postfix_key(parent.fid, UserPostfix::CastsByParent);
    key.extend_from_slice(parent.ts_hash.as_bytes());
    key.extend_from_slice(&child_fid.to_key_bytes());
    key.extend_from_slice(child_ts_hash.as_bytes());
    key
}

/// `User | mentioned fid | CastsByMention | child fid | child ts_hash`
fn by_mention_key(mention: Fid, child_fid: Fid, child_ts_hash: &TsHash) -> Vec<u8> {
    let mut key = keys::user_postfix_key(mention, UserPostfix::CastsByMention);
    key.extend_from_slice(&child_fid.to_key_bytes());
    key.extend_from_slice(child_ts_hash.as_bytes());
    key
}

/// Storage shape of the cast family.
#[derive(Debug)]
pub struct CastStoreDef;

impl StoreDef for CastStoreDef {
    const NAME: &'static str = "cast store";
    const MESSAGE_POSTFIX: UserPostfix = UserPostfix::CastMessage;
    const ADD_POSTFIX: UserPostfix = UserPostfix::CastAdds;
    const REMOVE_POSTFIX: Option<UserPostfix> = Some(UserPostfix::CastRemoves);
    const DEFAULT_PRUNE_LIMIT: usize = 10_000;

    fn add_type() -> MessageType {
        MessageType::CastAdd
    }

    fn remove_type() -> Option<MessageType> {
        Some(MessageType::CastRemove)
    }

    fn target_key(message: &Message) -> HubResult<Vec<u8>> {
        match &message.data.body {
            MessageBody::CastAdd(_) => Ok(message.ts_hash().as_bytes().to_vec()),
            MessageBody::CastRemove(body) => Ok(body.target_ts_hash.as_bytes().to_vec()),
            _ => Err(HubError::validation_failure("cast message without cast body")),
        }
    }

    fn secondary_puts(message: &Message, batch: &mut Batch) -> HubResult<()> {
        if let MessageBody::CastAdd(body) = &message.data.body {
            let ts_hash = message.ts_hash();
            if let Some(parent) = &body.parent {
                batch.put(by_parent_key(parent, message.fid(), &ts_hash), Vec::new());
            }
            for mention in &body.mentions {
                batch.put(by_mention_key(*mention, message.fid(), &ts_hash), Vec::new());
            }
        }
        Ok(())
    }

    fn secondary_deletes(message: &Message, batch: &mut Batch) -> HubResult<()> {
        if let MessageBody::CastAdd(body) = &message.data.body {
            let ts_hash = message.ts_hash();
            if let Some(parent) = &body.parent {
                batch.delete(by_parent_key(parent, message.fid(), &ts_hash));
            }
            for mention in &body.mentions {
                batch.delete(by_mention_key(*mention, message.fid(), &ts_hash));
            }
        }
        Ok(())
    }
}

/// Per-fid add/remove sets of casts, plus reply and mention lookups.
#[derive(Debug)]
pub struct CastStore {
    db: Arc<Database>,
    store: Store<CastStoreDef>,
}

impl CastStore {
    /// Creates the store with the default prune limit.
    #[must_use]
    pub fn new(db: Arc<Database>, events: StoreEventHandler) -> Self {
        Self {
            store: Store::new(Arc::clone(&db), events),
            db,
        }
    }

    /// Creates the store with an explicit prune limit.
    #[must_use]
    pub fn with_prune_size_limit(
        db: Arc<Database>,
        events: StoreEventHandler,
        limit: usize,
    ) -> Self {
        Self {
            store: Store::with_prune_size_limit(Arc::clone(&db), events, limit),
            db,
        }
    }

    /// Merges a CastAdd or CastRemove.
    pub async fn merge(&self, message: &Message) -> HubResult<bool> {
        self.store.merge(message).await
    }

    /// The active CastAdd with the given ts_hash.
    pub async fn get_cast(&self, fid: Fid, ts_hash: &TsHash) -> HubResult<Message> {
        self.store.get_add(fid, ts_hash.as_bytes()).await
    }

    /// The winning CastRemove targeting the given ts_hash.
    pub async fn get_cast_remove(&self, fid: Fid, ts_hash: &TsHash) -> HubResult<Message> {
        self.store.get_remove(fid, ts_hash.as_bytes()).await
    }

    /// All active casts for a fid.
    pub async fn get_casts_by_fid(&self, fid: Fid) -> HubResult<Vec<Message>> {
        self.store.get_adds_by_fid(fid).await
    }

    /// All winning CastRemoves for a fid.
    pub async fn get_cast_removes_by_fid(&self, fid: Fid) -> HubResult<Vec<Message>> {
        self.store.get_removes_by_fid(fid).await
    }

    /// All active replies to a cast, any author.
    pub async fn get_casts_by_parent(&self, parent: &CastId) -> HubResult<Vec<Message>> {
        let mut prefix = keys::user_postfix_key(parent.fid, UserPostfix::CastsByParent);
        prefix.extend_from_slice(parent.ts_hash.as_bytes());
        self.resolve_relation(&prefix).await
    }

    /// All active casts mentioning a fid.
    pub async fn get_casts_by_mention(&self, mention: Fid) -> HubResult<Vec<Message>> {
        let prefix = keys::user_postfix_key(mention, UserPostfix::CastsByMention);
        self.resolve_relation(&prefix).await
    }

    /// Every cast message stored for a fid, ascending ts_hash.
    pub async fn get_all_messages_by_fid(&self, fid: Fid) -> HubResult<Vec<Message>> {
        self.store.get_all_messages_by_fid(fid).await
    }

    /// Deletes everything this signer signed for the fid.
    pub async fn revoke_messages_by_signer(
        &self,
        fid: Fid,
        signer: &SignerKey,
    ) -> HubResult<Vec<Message>> {
        self.store.revoke_messages_by_signer(fid, signer).await
    }

    /// Prunes the fid down to the store's limit.
    pub async fn prune_messages(&self, fid: Fid) -> HubResult<Vec<Message>> {
        self.store.prune_messages(fid).await
    }

    /// Loads the cast rows a relation's keys point at. Relation keys end with
    /// `child fid (8) | child ts_hash (24)`.
    async fn resolve_relation(&self, prefix: &[u8]) -> HubResult<Vec<Message>> {
        let rows = self.db.iterate_prefix(prefix).await?;
        let mut messages = Vec::with_capacity(rows.len());
        for (key, _) in rows {
            let suffix = &key[key.len() - 32..];
            let child_fid = Fid::from_key_bytes(&suffix[..8])?;
            let child_ts_hash = TsHash::from_slice(&suffix[8..])?;
            let row_key = keys::message_key(child_fid, UserPostfix::CastMessage, &child_ts_hash);
            let bytes = self.db.get(&row_key).await?.ok_or_else(|| {
                HubError::unknown("cast relation points at a missing message row")
            })?;
            messages.push(Message::from_bytes(&bytes)?);
        }
        Ok(messages)
    }
}
