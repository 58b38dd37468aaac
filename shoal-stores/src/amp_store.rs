//! The amp store: one user amplifying another.

use std::sync::Arc;

use shoal_db::{Database, UserPostfix};
use shoal_types::{Fid, HubError, HubResult, Message, MessageBody, MessageType, SignerKey};

use crate::events::StoreEventHandler;
use crate::store::{Store, StoreDef};

/// Storage shape of the amp family. Conflict target is the amplified fid.
#[derive(Debug)]
pub struct AmpStoreDef;

impl StoreDef for AmpStoreDef {
    const NAME: &'static str = "amp store";
    const MESSAGE_POSTFIX: UserPostfix = UserPostfix::AmpMessage;
    const ADD_POSTFIX: UserPostfix = UserPostfix::AmpAdds;
    const REMOVE_POSTFIX: Option<UserPostfix> = Some(UserPostfix::AmpRemoves);
    const DEFAULT_PRUNE_LIMIT: usize = 1_000;

    fn add_type() -> MessageType {
        MessageType::AmpAdd
    }

    fn remove_type() -> Option<MessageType> {
        Some(MessageType::AmpRemove)
    }

    fn target_key(message: &Message) -> HubResult<Vec<u8>> {
        match &message.data.body {
            MessageBody::Amp(body) => Ok(body.target_fid.to_key_bytes().to_vec()),
            _ => Err(HubError::validation_failure("amp message without amp body")),
        }
    }
}

/// Per-fid add/remove sets of amplified users.
#[derive(Debug)]
pub struct AmpStore {
    store: Store<AmpStoreDef>,
}

impl AmpStore {
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

    /// Merges an AmpAdd or AmpRemove.
    pub async fn merge(&self, message: &Message) -> HubResult<bool> {
        self.store.merge(message).await
    }

    /// The active amp from `fid` to `target_fid`.
    pub async fn get_amp_add(&self, fid: Fid, target_fid: Fid) -> HubResult<Message> {
        self.store.get_add(fid, &target_fid.to_key_bytes()).await
    }

    /// The winning AmpRemove from `fid` to `target_fid`.
    pub async fn get_amp_remove(&self, fid: Fid, target_fid: Fid) -> HubResult<Message> {
        self.store.get_remove(fid, &target_fid.to_key_bytes()).await
    }

    /// All active amps by a fid.
    pub async fn get_amps_by_fid(&self, fid: Fid) -> HubResult<Vec<Message>> {
        self.store.get_adds_by_fid(fid).await
    }

    /// Every amp message stored for a fid, ascending ts_hash.
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
