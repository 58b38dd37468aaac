//! The verification store: proofs that a fid controls an external address.

use std::sync::Arc;

use shoal_db::{Database, UserPostfix};
use shoal_types::{Address, Fid, HubError, HubResult, Message, MessageBody, MessageType, SignerKey};

use crate::events::StoreEventHandler;
use crate::store::{Store, StoreDef};

/// Storage shape of the verification family. Conflict target is the proven
/// address.
#[derive(Debug)]
pub struct VerificationStoreDef;

impl StoreDef for VerificationStoreDef {
    const NAME: &'static str = "verification store";
    const MESSAGE_POSTFIX: UserPostfix = UserPostfix::VerificationMessage;
    const ADD_POSTFIX: UserPostfix = UserPostfix::VerificationAdds;
    const REMOVE_POSTFIX: Option<UserPostfix> = Some(UserPostfix::VerificationRemoves);
    const DEFAULT_PRUNE_LIMIT: usize = 50;

    fn add_type() -> MessageType {
        MessageType::VerificationAddEthAddress
    }

    fn remove_type() -> Option<MessageType> {
        Some(MessageType::VerificationRemove)
    }

    fn target_key(message: &Message) -> HubResult<Vec<u8>> {
        match &message.data.body {
            MessageBody::VerificationAdd(body) => Ok(body.address.as_bytes().to_vec()),
            MessageBody::VerificationRemove(body) => Ok(body.address.as_bytes().to_vec()),
            _ => Err(HubError::validation_failure(
                "verification message without verification body",
            )),
        }
    }
}

/// Per-fid add/remove sets of verified addresses.
#[derive(Debug)]
pub struct VerificationStore {
    store: Store<VerificationStoreDef>,
}

impl VerificationStore {
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

    /// Merges a VerificationAddEthAddress or VerificationRemove.
    pub async fn merge(&self, message: &Message) -> HubResult<bool> {
        self.store.merge(message).await
    }

    /// The active verification of an address by a fid.
    pub async fn get_verification_add(&self, fid: Fid, address: &Address) -> HubResult<Message> {
        self.store.get_add(fid, address.as_bytes()).await
    }

    /// The winning VerificationRemove of an address by a fid.
    pub async fn get_verification_remove(&self, fid: Fid, address: &Address) -> HubResult<Message> {
        self.store.get_remove(fid, address.as_bytes()).await
    }

    /// All active verifications by a fid.
    pub async fn get_verifications_by_fid(&self, fid: Fid) -> HubResult<Vec<Message>> {
        self.store.get_adds_by_fid(fid).await
    }

    /// Every verification message stored for a fid, ascending ts_hash.
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
