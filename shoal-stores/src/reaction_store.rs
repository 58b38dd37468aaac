//! The reaction store: likes and recasts targeting casts.

use std::sync::Arc;

use shoal_db::{Database, UserPostfix};
use shoal_types::{
    CastId, Fid, HubError, HubResult, Message, MessageBody, MessageType, ReactionType, SignerKey,
};

use crate::events::StoreEventHandler;
use crate::store::{Store, StoreDef};

/// Conflict target: reaction type byte followed by the target cast id.
fn reaction_target(reaction_type: ReactionType, target: &CastId) -> Vec<u8> {
    let mut key = Vec::with_capacity(33);
    key.push(reaction_type.to_key_byte());
    key.extend_from_slice(&target.to_key_bytes());
    key
}

/// Storage shape of the reaction family.
#[derive(Debug)]
pub struct ReactionStoreDef;

impl StoreDef for ReactionStoreDef {
    const NAME: &'static str = "reaction store";
    const MESSAGE_POSTFIX: UserPostfix = UserPostfix::ReactionMessage;
    const ADD_POSTFIX: UserPostfix = UserPostfix::ReactionAdds;
    const REMOVE_POSTFIX: Option<UserPostfix> = Some(UserPostfix::ReactionRemoves);
    const DEFAULT_PRUNE_LIMIT: usize = 5_000;

    fn add_type() -> MessageType {
        MessageType::ReactionAdd
    }

    fn remove_type() -> Option<MessageType> {
        Some(MessageType::ReactionRemove)
    }

    fn target_key(message: &Message) -> HubResult<Vec<u8>> {
        match &message.data.body {
            MessageBody::Reaction(body) => Ok(reaction_target(body.reaction_type, &body.target)),
            _ => Err(HubError::validation_failure(
                "reaction message without reaction body",
            )),
        }
    }
}

/// Per-fid add/remove sets of reactions.
#[derive(Debug)]
pub struct ReactionStore {
    store: Store<ReactionStoreDef>,
}

impl ReactionStore {
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

    /// Merges a ReactionAdd or ReactionRemove.
    pub async fn merge(&self, message: &Message) -> HubResult<bool> {
        self.store.merge(message).await
    }

    /// The active reaction of a type by a fid on a cast.
    pub async fn get_reaction_add(
        &self,
        fid: Fid,
        reaction_type: ReactionType,
        target: &CastId,
    ) -> HubResult<Message> {
        self.store
            .get_add(fid, &reaction_target(reaction_type, target))
            .await
    }

    /// The winning ReactionRemove of a type by a fid on a cast.
    pub async fn get_reaction_remove(
        &self,
        fid: Fid,
        reaction_type: ReactionType,
        target: &CastId,
    ) -> HubResult<Message> {
        self.store
            .get_remove(fid, &reaction_target(reaction_type, target))
            .await
    }

    /// All active reactions by a fid.
    pub async fn get_reactions_by_fid(&self, fid: Fid) -> HubResult<Vec<Message>> {
        self.store.get_adds_by_fid(fid).await
    }

    /// Every reaction message stored for a fid, ascending ts_hash.
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
