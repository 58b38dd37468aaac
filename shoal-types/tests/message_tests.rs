use ed25519_dalek::SigningKey;
use pretty_assertions::assert_eq;
use shoal_types::{
    CastAddBody, ErrorCode, Fid, Message, MessageBody, MessageData, MessageType, SignerBody,
    SignerKey,
};

fn signing_key(seed: u8) -> SigningKey {
    SigningKey::from_bytes(&[seed; 32])
}

fn cast_add(fid: u64, timestamp: u32, text: &str, key: &SigningKey) -> Message {
    let data = MessageData {
        fid: Fid::new(fid),
        message_type: MessageType::CastAdd,
        timestamp,
        body: MessageBody::CastAdd(CastAddBody {
            text: text.to_string(),
            mentions: Vec::new(),
            parent: None,
            embeds: Vec::new(),
        }),
    };
    Message::sign(data, key).unwrap()
}

#[test]
fn signed_message_verifies() {
    let key = signing_key(1);
    let msg = cast_add(1, 100, "hello", &key);
    msg.verify_integrity().unwrap();
}

#[test]
fn tampered_payload_fails_hash_check() {
    let key = signing_key(1);
    let mut msg = cast_add(1, 100, "hello", &key);
    msg.data.timestamp = 101;
    let err = msg.verify_integrity().unwrap_err();
    assert_eq!(err.code, ErrorCode::BadRequestValidationFailure);
}

#[test]
fn signature_from_wrong_key_fails() {
    let key = signing_key(1);
    let other = signing_key(2);
    let mut msg = cast_add(1, 100, "hello", &key);
    // Claim the message was signed by a different key.
    msg.signer = SignerKey::from_bytes(other.verifying_key().to_bytes());
    let err = msg.verify_integrity().unwrap_err();
    assert_eq!(err.code, ErrorCode::BadRequestValidationFailure);
}

#[test]
fn truncated_signature_fails() {
    let key = signing_key(1);
    let mut msg = cast_add(1, 100, "hello", &key);
    msg.signature.truncate(10);
    assert!(msg.verify_integrity().is_err());
}

#[test]
fn body_must_match_type() {
    let key = signing_key(1);
    let data = MessageData {
        fid: Fid::new(1),
        message_type: MessageType::CastAdd,
        timestamp: 100,
        body: MessageBody::Signer(SignerBody {
            signer: SignerKey::from_bytes([9; 32]),
        }),
    };
    let msg = Message::sign(data, &key).unwrap();
    let err = msg.verify_integrity().unwrap_err();
    assert_eq!(err.code, ErrorCode::BadRequestValidationFailure);
}

#[test]
fn ts_hash_embeds_timestamp_and_hash() {
    let key = signing_key(1);
    let msg = cast_add(7, 1_665_182_332, "hi", &key);
    let ts_hash = msg.ts_hash();
    assert_eq!(ts_hash.timestamp(), 1_665_182_332);
    assert_eq!(ts_hash.hash(), msg.hash);
}

#[test]
fn identical_data_hashes_identically() {
    let msg1 = cast_add(1, 100, "same", &signing_key(1));
    let msg2 = cast_add(1, 100, "same", &signing_key(2));
    // Same payload, same hash, regardless of who signed it.
    assert_eq!(msg1.hash, msg2.hash);

    let msg3 = cast_add(1, 100, "different", &signing_key(1));
    assert_ne!(msg1.hash, msg3.hash);
}

#[test]
fn wire_bytes_round_trip_exactly() {
    let msg = cast_add(1, 100, "hello", &signing_key(1));
    let bytes = msg.to_bytes().unwrap();
    let decoded = Message::from_bytes(&bytes).unwrap();
    assert_eq!(decoded, msg);
    // Round-tripping must reproduce the same bits.
    assert_eq!(decoded.to_bytes().unwrap(), bytes);
}

#[test]
fn garbage_bytes_are_a_parse_failure() {
    let err = Message::from_bytes(&[0xff, 0x00, 0x17]).unwrap_err();
    assert_eq!(err.code, ErrorCode::BadRequestParseFailure);
}

#[test]
fn protocol_json_round_trips() {
    // Gossip and RPC envelopes carry messages as JSON.
    let msg = cast_add(1, 100, "hello", &signing_key(1));
    let json = serde_json::to_string(&msg).unwrap();
    let decoded: Message = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, msg);
    decoded.verify_integrity().unwrap();
}
