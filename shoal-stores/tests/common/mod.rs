#![allow(dead_code)]

//! Shared fixtures for store and engine tests.

use std::sync::Arc;

use ed25519_dalek::SigningKey;

use shoal_db::Database;
use shoal_stores::{Engine, StoreEventHandler, StoreLimits};
use shoal_types::{
    AmpBody, CastAddBody, CastId, CastRemoveBody, Fid, HashScheme, IdRegistryEvent,
    IdRegistryEventType, Message, MessageBody, MessageData, MessageType, ReactionBody,
    ReactionType, SignatureScheme, SignerBody, SignerKey, TsHash, UserDataBody, UserDataType,
    VerificationAddBody,
};

pub fn signing_key(seed: u8) -> SigningKey {
    SigningKey::from_bytes(&[seed; 32])
}

pub fn signer_key(key: &SigningKey) -> SignerKey {
    SignerKey::from_bytes(key.verifying_key().to_bytes())
}

pub fn new_engine() -> Engine {
    Engine::new(Arc::new(Database::new()), StoreEventHandler::new())
}

pub fn new_engine_with_limits(limits: StoreLimits) -> Engine {
    Engine::with_limits(Arc::new(Database::new()), StoreEventHandler::new(), limits)
}

pub fn register_event(fid: u64, custody: &SigningKey, block: u64) -> IdRegistryEvent {
    IdRegistryEvent {
        event_type: IdRegistryEventType::Register,
        block_number: block,
        log_index: 0,
        block_hash: [block as u8; 32],
        transaction_hash: [block as u8 + 1; 32],
        fid: Fid::new(fid),
        from: None,
        to: signer_key(custody).to_address(),
    }
}

pub fn transfer_event(
    fid: u64,
    previous: &SigningKey,
    next: &SigningKey,
    block: u64,
) -> IdRegistryEvent {
    IdRegistryEvent {
        event_type: IdRegistryEventType::Transfer,
        block_number: block,
        log_index: 0,
        block_hash: [block as u8; 32],
        transaction_hash: [block as u8 + 1; 32],
        fid: Fid::new(fid),
        from: Some(signer_key(previous).to_address()),
        to: signer_key(next).to_address(),
    }
}

pub fn signer_add(fid: u64, timestamp: u32, custody: &SigningKey, delegate: &SignerKey) -> Message {
    let data = MessageData {
        fid: Fid::new(fid),
        message_type: MessageType::SignerAdd,
        timestamp,
        body: MessageBody::Signer(SignerBody { signer: *delegate }),
    };
    Message::sign(data, custody).unwrap()
}

pub fn signer_remove(
    fid: u64,
    timestamp: u32,
    custody: &SigningKey,
    delegate: &SignerKey,
) -> Message {
    let data = MessageData {
        fid: Fid::new(fid),
        message_type: MessageType::SignerRemove,
        timestamp,
        body: MessageBody::Signer(SignerBody { signer: *delegate }),
    };
    Message::sign(data, custody).unwrap()
}

pub fn cast_add(fid: u64, timestamp: u32, text: &str, delegate: &SigningKey) -> Message {
    cast_add_full(fid, timestamp, text, Vec::new(), None, delegate)
}

pub fn cast_add_full(
    fid: u64,
    timestamp: u32,
    text: &str,
    mentions: Vec<Fid>,
    parent: Option<CastId>,
    delegate: &SigningKey,
) -> Message {
    let data = MessageData {
        fid: Fid::new(fid),
        message_type: MessageType::CastAdd,
        timestamp,
        body: MessageBody::CastAdd(CastAddBody {
            text: text.to_string(),
            mentions,
            parent,
            embeds: Vec::new(),
        }),
    };
    Message::sign(data, delegate).unwrap()
}

pub fn cast_remove(fid: u64, timestamp: u32, target: TsHash, delegate: &SigningKey) -> Message {
    let data = MessageData {
        fid: Fid::new(fid),
        message_type: MessageType::CastRemove,
        timestamp,
        body: MessageBody::CastRemove(CastRemoveBody {
            target_ts_hash: target,
        }),
    };
    Message::sign(data, delegate).unwrap()
}

pub fn reaction_add(
    fid: u64,
    timestamp: u32,
    reaction_type: ReactionType,
    target: CastId,
    delegate: &SigningKey,
) -> Message {
    let data = MessageData {
        fid: Fid::new(fid),
        message_type: MessageType::ReactionAdd,
        timestamp,
        body: MessageBody::Reaction(ReactionBody {
            reaction_type,
            target,
        }),
    };
    Message::sign(data, delegate).unwrap()
}

pub fn amp_add(fid: u64, timestamp: u32, target_fid: u64, delegate: &SigningKey) -> Message {
    let data = MessageData {
        fid: Fid::new(fid),
        message_type: MessageType::AmpAdd,
        timestamp,
        body: MessageBody::Amp(AmpBody {
            target_fid: Fid::new(target_fid),
        }),
    };
    Message::sign(data, delegate).unwrap()
}

pub fn verification_add(
    fid: u64,
    timestamp: u32,
    address: shoal_types::Address,
    delegate: &SigningKey,
) -> Message {
    let data = MessageData {
        fid: Fid::new(fid),
        message_type: MessageType::VerificationAddEthAddress,
        timestamp,
        body: MessageBody::VerificationAdd(VerificationAddBody {
            address,
            claim_signature: vec![1, 2, 3],
            block_hash: [5; 32],
        }),
    };
    Message::sign(data, delegate).unwrap()
}

pub fn user_data_add(
    fid: u64,
    timestamp: u32,
    data_type: UserDataType,
    value: &str,
    delegate: &SigningKey,
) -> Message {
    let data = MessageData {
        fid: Fid::new(fid),
        message_type: MessageType::UserDataAdd,
        timestamp,
        body: MessageBody::UserData(UserDataBody {
            data_type,
            value: value.to_string(),
        }),
    };
    Message::sign(data, delegate).unwrap()
}

/// Builds a message with an explicit hash, bypassing signing. Store-level
/// tests use this to pin comparator inputs; the stores never re-verify.
pub fn raw_message(
    fid: u64,
    message_type: MessageType,
    timestamp: u32,
    body: MessageBody,
    hash: [u8; 20],
    signer: SignerKey,
) -> Message {
    Message {
        data: MessageData {
            fid: Fid::new(fid),
            message_type,
            timestamp,
            body,
        },
        hash,
        hash_scheme: HashScheme::Blake3,
        signature: vec![0; 64],
        signature_scheme: SignatureScheme::Ed25519,
        signer,
    }
}

/// Registers a fid under `custody` and authorizes `delegate`, the setup
/// almost every engine test starts from.
pub async fn bootstrap_fid(engine: &Engine, fid: u64, custody: &SigningKey, delegate: &SigningKey) {
    engine
        .merge_id_registry_event(&register_event(fid, custody, 10))
        .await
        .unwrap();
    engine
        .merge_message(&signer_add(fid, 1, custody, &signer_key(delegate)))
        .await
        .unwrap();
}
