//! The signer store: delegate-key authorization per fid.
//!
//! SignerAdd and SignerRemove messages are custody-level: they are signed by
//! the fid's custody key and govern which delegate keys may sign everything
//! else. The store itself only resolves the CRDT set; the custody check and
//! the revocation fan-out on removal live in the engine.

use std::sync::Arc;

use shoal_db::{Database, UserPostfix};
use shoal_types::{Fid, HubError, HubResult, Message, MessageBody, MessageType, SignerKey};

use crate::events::StoreEventHandler;
use crate::store::{Store, StoreDef};

/// Storage shape of the signer family.
#[derive(Debug)]
pub struct SignerStoreDef;

impl StoreDef for SignerStoreDef {
    const NAME: &'static str = "signer store";
    const MESSAGE_POSTFIX: UserPostfix = UserPostfix::SignerMessage;
    const ADD_POSTFIX: UserPostfix = UserPostfix::SignerAdds;
    const REMOVE_POSTFIX: Option<UserPostfix> = Some(UserPostfix::SignerRemoves);
    const DEFAULT_PRUNE_LIMIT: usize = 100;

    fn add_type() -> MessageType {
        MessageType::SignerAdd
    }

    fn remove_type() -> Option<MessageType> {
        Some(MessageType::SignerRemove)
    }

    fn target_key(message: &Message) -> HubResult<Vec<u8>> {
        match &message.data.body {
            MessageBody::Signer(body) => Ok(body.signer.as_bytes().to_vec()),
            _ => Err(HubError::validation_failure(
                "signer message without signer body",
            )),
        }
    }
}

/// Per-fid add/remove sets of delegate signer keys.
#[derive(Debug)]
pub struct SignerStore {
    store: Store<SignerStoreDef>,
}

impl SignerStore {
    /// Creates the store with the default prune limit.
    #[must_use]
    pub fn new(db: Arc<Database>, events: StoreEventHandler) -> Self {
        Self {
            store: Store::new(db, events),
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
            store: Store::with_prune_size_limit(db, events, limit),
        }
    }

    /// Merges a SignerAdd or SignerRemove.
    pub async fn merge(&self, message: &Message) -> HubResult<bool> {
        self.store.merge(message).await
    }

    /// The active SignerAdd for a delegate key.
    pub async fn get_signer_add(&self, fid: Fid, signer: &SignerKey) -> HubResult<Message> {
        self.store.get_add(fid, signer.as_bytes()).await
    }

    /// The winning SignerRemove for a delegate key.
    pub async fn get_signer_remove(&self, fid: Fid, signer: &SignerKey) -> HubResult<Message> {
        self.store.get_remove(fid, signer.as_bytes()).await
    }

    /// All active SignerAdds for a fid.
    pub async fn get_signer_adds_by_fid(&self, fid: Fid) -> HubResult<Vec<Message>> {
        self.store.get_adds_by_fid(fid).await
    }

    /// All winning SignerRemoves for a fid.
    pub async fn get_signer_removes_by_fid(&self, fid: Fid) -> HubResult<Vec<Message>> {
        self.store.get_removes_by_fid(fid).await
    }

    /// Every signer message stored for a fid, ascending ts_hash.
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
}
