//! The engine: single entry point for messages and custody events.
//!
//! `merge_message` validates a message end to end — structure, hash,
//! signature, registered fid, authorized signer — then routes it to its
//! store. `merge_id_registry_event` ingests custody events and fans out the
//! revocations a transfer implies: every message chain rooted at the
//! superseded custody address is deleted, delegate signers included.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info};

use shoal_db::keys;
use shoal_db::{Database, UserPostfix};
use shoal_types::{
    Address, ErrorCode, Fid, HubError, HubResult, IdRegistryEvent, Message, MessageBody,
    MessageType, SignerKey, TsHash,
};

use crate::amp_store::AmpStore;
use crate::cast_store::CastStore;
use crate::events::StoreEventHandler;
use crate::id_registry_store::IdRegistryStore;
use crate::reaction_store::ReactionStore;
use crate::signer_store::SignerStore;
use crate::user_data_store::UserDataStore;
use crate::verification_store::VerificationStore;

/// Per-store prune limits.
#[derive(Debug, Clone, Copy)]
pub struct StoreLimits {
    pub signers: usize,
    pub casts: usize,
    pub reactions: usize,
    pub amps: usize,
    pub verifications: usize,
    pub user_data: usize,
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self {
            signers: 100,
            casts: 10_000,
            reactions: 5_000,
            amps: 1_000,
            verifications: 50,
            user_data: 100,
        }
    }
}

/// The hub's message and identity engine.
#[derive(Debug)]
pub struct Engine {
    db: Arc<Database>,
    events: StoreEventHandler,
    id_registry: IdRegistryStore,
    signers: SignerStore,
    casts: CastStore,
    reactions: ReactionStore,
    amps: AmpStore,
    verifications: VerificationStore,
    user_data: UserDataStore,
}

impl Engine {
    /// Creates an engine with default store limits.
    #[must_use]
    pub fn new(db: Arc<Database>, events: StoreEventHandler) -> Self {
        Self::with_limits(db, events, StoreLimits::default())
    }

    /// Creates an engine with explicit store limits.
    #[must_use]
    pub fn with_limits(db: Arc<Database>, events: StoreEventHandler, limits: StoreLimits) -> Self {
        Self {
            id_registry: IdRegistryStore::new(Arc::clone(&db), events.clone()),
            signers: SignerStore::with_prune_size_limit(
                Arc::clone(&db),
                events.clone(),
                limits.signers,
            ),
            casts: CastStore::with_prune_size_limit(Arc::clone(&db), events.clone(), limits.casts),
            reactions: ReactionStore::with_prune_size_limit(
                Arc::clone(&db),
                events.clone(),
                limits.reactions,
            ),
            amps: AmpStore::with_prune_size_limit(Arc::clone(&db), events.clone(), limits.amps),
            verifications: VerificationStore::with_prune_size_limit(
                Arc::clone(&db),
                events.clone(),
                limits.verifications,
            ),
            user_data: UserDataStore::with_prune_size_limit(
                Arc::clone(&db),
                events.clone(),
                limits.user_data,
            ),
            db,
            events,
        }
    }

    /// The engine's event bus handle.
    #[must_use]
    pub fn events(&self) -> &StoreEventHandler {
        &self.events
    }

    /// Validates and merges a message.
    ///
    /// Returns `Ok(true)` when the replica changed, `Ok(false)` when the
    /// message was a duplicate or lost its conflict.
    pub async fn merge_message(&self, message: &Message) -> HubResult<bool> {
        message.verify_integrity()?;
        self.validate_signer(message).await?;

        let merged = match message.message_type() {
            MessageType::SignerAdd | MessageType::SignerRemove => {
                self.signers.merge(message).await?
            }
            MessageType::CastAdd | MessageType::CastRemove => self.casts.merge(message).await?,
            MessageType::ReactionAdd | MessageType::ReactionRemove => {
                self.reactions.merge(message).await?
            }
            MessageType::AmpAdd | MessageType::AmpRemove => self.amps.merge(message).await?,
            MessageType::VerificationAddEthAddress | MessageType::VerificationRemove => {
                self.verifications.merge(message).await?
            }
            MessageType::UserDataAdd => self.user_data.merge(message).await?,
        };

        // A winning SignerRemove strips the delegate's authorization, so its
        // messages go with it.
        if merged && message.message_type() == MessageType::SignerRemove {
            if let MessageBody::Signer(body) = &message.data.body {
                self.revoke_messages_by_signer(message.fid(), &body.signer)
                    .await?;
            }
        }
        Ok(merged)
    }

    /// Ingests a custody event. A transfer that becomes current revokes every
    /// message chain rooted at the previous custody address.
    pub async fn merge_id_registry_event(&self, event: &IdRegistryEvent) -> HubResult<bool> {
        let previous = match self.id_registry.get_id_registry_event(event.fid).await {
            Ok(current) => Some(current),
            Err(err) if err.code == ErrorCode::NotFound => None,
            Err(err) => return Err(err),
        };

        let merged = self.id_registry.merge_id_registry_event(event).await?;
        if merged {
            if let Some(previous) = previous {
                if previous.to != event.to {
                    info!(fid = %event.fid, from = %previous.to, to = %event.to, "custody transferred");
                    self.revoke_custody_messages(event.fid, &previous.to).await?;
                }
            }
        }
        Ok(merged)
    }

    /// Deletes every message signed by `signer` for `fid`, across all stores,
    /// cascading through delegate signers whose SignerAdds get revoked.
    pub async fn revoke_messages_by_signer(
        &self,
        fid: Fid,
        signer: &SignerKey,
    ) -> HubResult<()> {
        self.revoke_signer_chain(fid, vec![*signer]).await
    }

    /// Prunes every store for a fid.
    pub async fn prune_messages(&self, fid: Fid) -> HubResult<()> {
        self.signers.prune_messages(fid).await?;
        self.casts.prune_messages(fid).await?;
        self.reactions.prune_messages(fid).await?;
        self.amps.prune_messages(fid).await?;
        self.verifications.prune_messages(fid).await?;
        self.user_data.prune_messages(fid).await?;
        Ok(())
    }

    /// Resolves a ts_hash to its message through the global index.
    pub async fn get_message_by_ts_hash(&self, ts_hash: &TsHash) -> HubResult<Message> {
        let value = self
            .db
            .get(&keys::ts_hash_index_key(ts_hash))
            .await?
            .ok_or_else(|| HubError::not_found(format!("no message with ts_hash {ts_hash}")))?;
        if value.len() != 9 {
            return Err(HubError::unknown("malformed ts_hash index row"));
        }
        let fid = Fid::from_key_bytes(&value[..8])?;
        let postfix = UserPostfix::from_byte(value[8])
            .ok_or_else(|| HubError::unknown("unknown postfix in ts_hash index row"))?;
        let bytes = self
            .db
            .get(&keys::message_key(fid, postfix, ts_hash))
            .await?
            .ok_or_else(|| HubError::unknown("ts_hash index points at a missing message row"))?;
        Message::from_bytes(&bytes)
    }

    /// Batch form of `get_message_by_ts_hash`; unknown hashes are skipped.
    pub async fn get_messages_by_ts_hashes(
        &self,
        ts_hashes: &[TsHash],
    ) -> HubResult<Vec<Message>> {
        let mut messages = Vec::with_capacity(ts_hashes.len());
        for ts_hash in ts_hashes {
            match self.get_message_by_ts_hash(ts_hash).await {
                Ok(message) => messages.push(message),
                Err(err) if err.code == ErrorCode::NotFound => {
                    debug!(%ts_hash, "requested ts_hash not present, skipping");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(messages)
    }

    // ── Lookup surface ───────────────────────────────────────────

    /// The signer store.
    #[must_use]
    pub fn signers(&self) -> &SignerStore {
        &self.signers
    }

    /// The cast store.
    #[must_use]
    pub fn casts(&self) -> &CastStore {
        &self.casts
    }

    /// The reaction store.
    #[must_use]
    pub fn reactions(&self) -> &ReactionStore {
        &self.reactions
    }

    /// The amp store.
    #[must_use]
    pub fn amps(&self) -> &AmpStore {
        &self.amps
    }

    /// The verification store.
    #[must_use]
    pub fn verifications(&self) -> &VerificationStore {
        &self.verifications
    }

    /// The user-data store.
    #[must_use]
    pub fn user_data(&self) -> &UserDataStore {
        &self.user_data
    }

    /// The current custody event for a fid.
    pub async fn get_custody_event(&self, fid: Fid) -> HubResult<IdRegistryEvent> {
        self.id_registry.get_id_registry_event(fid).await
    }

    /// Every registered fid.
    pub async fn get_fids(&self) -> HubResult<Vec<Fid>> {
        self.id_registry.get_fids().await
    }

    // ── Validation ───────────────────────────────────────────────

    async fn validate_signer(&self, message: &Message) -> HubResult<()> {
        let custody = match self.id_registry.get_id_registry_event(message.fid()).await {
            Ok(event) => event,
            Err(err) if err.code == ErrorCode::NotFound => {
                return Err(HubError::validation_failure(format!(
                    "unknown fid {}",
                    message.fid()
                )));
            }
            Err(err) => return Err(err),
        };

        if message.message_type().is_signer_message() {
            if message.signer.to_address() != custody.to {
                return Err(HubError::validation_failure(
                    "signer message not signed by the current custody address",
                ));
            }
            return Ok(());
        }

        match self
            .signers
            .get_signer_add(message.fid(), &message.signer)
            .await
        {
            Ok(_) => Ok(()),
            Err(err) if err.code == ErrorCode::NotFound => Err(HubError::validation_failure(
                format!("unknown signer {}", message.signer),
            )),
            Err(err) => Err(err),
        }
    }

    // ── Revocation ───────────────────────────────────────────────

    /// Revokes everything rooted at custody keys that derive to `address`.
    async fn revoke_custody_messages(&self, fid: Fid, address: &Address) -> HubResult<()> {
        let mut roots = Vec::new();
        for message in self.signers.get_all_messages_by_fid(fid).await? {
            if message.signer.to_address() == *address && !roots.contains(&message.signer) {
                roots.push(message.signer);
            }
        }
        self.revoke_signer_chain(fid, roots).await
    }

    /// Work-queue revocation: deleting a SignerAdd enqueues its delegate.
    async fn revoke_signer_chain(&self, fid: Fid, queue: Vec<SignerKey>) -> HubResult<()> {
        let mut queue = queue;
        let mut seen: HashSet<SignerKey> = HashSet::new();

        while let Some(signer) = queue.pop() {
            if !seen.insert(signer) {
                continue;
            }

            let mut revoked = Vec::new();
            revoked.extend(self.signers.revoke_messages_by_signer(fid, &signer).await?);
            revoked.extend(self.casts.revoke_messages_by_signer(fid, &signer).await?);
            revoked.extend(
                self.reactions
                    .revoke_messages_by_signer(fid, &signer)
                    .await?,
            );
            revoked.extend(self.amps.revoke_messages_by_signer(fid, &signer).await?);
            revoked.extend(
                self.verifications
                    .revoke_messages_by_signer(fid, &signer)
                    .await?,
            );
            revoked.extend(
                self.user_data
                    .revoke_messages_by_signer(fid, &signer)
                    .await?,
            );

            for message in revoked {
                if message.message_type() == MessageType::SignerAdd {
                    if let MessageBody::Signer(body) = &message.data.body {
                        queue.push(body.signer);
                    }
                }
            }
        }
        Ok(())
    }
}
