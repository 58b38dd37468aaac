//! The user-data store: profile fields, add-only.
//!
//! There is no UserDataRemove. A later UserDataAdd for the same data type
//! strictly supersedes the earlier one under the standard comparator, so the
//! store holds at most one value per field.

use std::sync::Arc;

use shoal_db::{Database, UserPostfix};
use shoal_types::{
    Fid, HubError, HubResult, Message, MessageBody, MessageType, SignerKey, UserDataType,
};

use crate::events::StoreEventHandler;
use crate::store::{Store, StoreDef};

/// Storage shape of the user-data family. Conflict target is the data type.
#[derive(Debug)]
pub struct UserDataStoreDef;

impl StoreDef for UserDataStoreDef {
    const NAME: &'static str = "user data store";
    const MESSAGE_POSTFIX: UserPostfix = UserPostfix::UserDataMessage;
    const ADD_POSTFIX: UserPostfix = UserPostfix::UserDataAdds;
    const REMOVE_POSTFIX: Option<UserPostfix> = None;
    const DEFAULT_PRUNE_LIMIT: usize = 100;

    fn add_type() -> MessageType {
        MessageType::UserDataAdd
    }

    fn remove_type() -> Option<MessageType> {
        None
    }

    fn target_key(message: &Message) -> HubResult<Vec<u8>> {
        match &message.data.body {
            MessageBody::UserData(body) => Ok(vec![body.data_type.to_key_byte()]),
            _ => Err(HubError::validation_failure(
                "user data message without user data body",
            )),
        }
    }
}

/// Per-fid set of profile fields.
#[derive(Debug)]
pub struct UserDataStore {
    store: Store<UserDataStoreDef>,
}

impl UserDataStore {
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

    /// Merges a UserDataAdd.
    pub async fn merge(&self, message: &Message) -> HubResult<bool> {
        self.store.merge(message).await
    }

    /// The current value of a profile field.
    pub async fn get_user_data(&self, fid: Fid, data_type: UserDataType) -> HubResult<Message> {
        self.store.get_add(fid, &[data_type.to_key_byte()]).await
    }

    /// All current profile fields for a fid.
    pub async fn get_user_data_by_fid(&self, fid: Fid) -> HubResult<Vec<Message>> {
        self.store.get_adds_by_fid(fid).await
    }

    /// Every user-data message stored for a fid, ascending ts_hash.
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
