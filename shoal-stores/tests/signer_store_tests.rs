mod common;

use std::sync::Arc;

use pretty_assertions::assert_eq;

use common::{raw_message, signer_key, signing_key};
use shoal_db::Database;
use shoal_stores::{compare_messages, HubEvent, SignerStore, StoreEventHandler};
use shoal_types::{ErrorCode, Fid, MessageBody, MessageType, SignerBody, SignerKey};

const FID: u64 = 1;

fn store() -> (SignerStore, StoreEventHandler) {
    let events = StoreEventHandler::new();
    let store = SignerStore::new(Arc::new(Database::new()), events.clone());
    (store, events)
}

fn delegate() -> SignerKey {
    SignerKey::from_bytes([0xd0; 32])
}

fn add(timestamp: u32, hash_byte: u8, target: SignerKey) -> shoal_types::Message {
    raw_message(
        FID,
        MessageType::SignerAdd,
        timestamp,
        MessageBody::Signer(SignerBody { signer: target }),
        [hash_byte; 20],
        signer_key(&signing_key(1)),
    )
}

fn remove(timestamp: u32, hash_byte: u8, target: SignerKey) -> shoal_types::Message {
    raw_message(
        FID,
        MessageType::SignerRemove,
        timestamp,
        MessageBody::Signer(SignerBody { signer: target }),
        [hash_byte; 20],
        signer_key(&signing_key(1)),
    )
}

#[tokio::test]
async fn remove_beats_add_at_equal_timestamp_either_order() {
    // Remove has the smaller hash; the polarity rule must decide, not the
    // hash tiebreak.
    let a = add(100, 0x01, delegate());
    let r = remove(100, 0x00, delegate());

    for submissions in [[&a, &r], [&r, &a]] {
        let (store, _) = store();
        for message in submissions {
            let _ = store.merge(message).await.unwrap();
        }

        let err = store
            .get_signer_add(Fid::new(FID), &delegate())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        let winner = store
            .get_signer_remove(Fid::new(FID), &delegate())
            .await
            .unwrap();
        assert_eq!(winner, r);
    }
}

#[tokio::test]
async fn later_timestamp_wins_across_polarity() {
    let (store, _) = store();
    let r = remove(100, 0xff, delegate());
    let a = add(101, 0x00, delegate());

    assert!(store.merge(&r).await.unwrap());
    assert!(store.merge(&a).await.unwrap());

    store
        .get_signer_add(Fid::new(FID), &delegate())
        .await
        .unwrap();
    assert!(store
        .get_signer_remove(Fid::new(FID), &delegate())
        .await
        .is_err());
}

#[tokio::test]
async fn higher_hash_wins_at_same_polarity_and_timestamp() {
    let low = add(100, 0x01, delegate());
    let high = add(100, 0x02, delegate());

    for submissions in [[&low, &high], [&high, &low]] {
        let (store, _) = store();
        for message in submissions {
            let _ = store.merge(message).await.unwrap();
        }
        let winner = store
            .get_signer_add(Fid::new(FID), &delegate())
            .await
            .unwrap();
        assert_eq!(winner, high);
    }
}

#[tokio::test]
async fn duplicate_merge_is_a_noop() {
    let (store, events) = store();
    let mut rx = events.subscribe();
    let a = add(100, 0x01, delegate());

    assert!(store.merge(&a).await.unwrap());
    assert!(!store.merge(&a).await.unwrap());

    // Exactly one merge event came out.
    assert!(matches!(rx.try_recv().unwrap(), HubEvent::MergeMessage(_)));
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn displaced_loser_is_emitted_as_prune() {
    let (store, events) = store();
    let mut rx = events.subscribe();

    let old = add(100, 0x01, delegate());
    let new = add(200, 0x01, delegate());
    assert!(store.merge(&old).await.unwrap());
    assert!(store.merge(&new).await.unwrap());

    let mut merges = 0;
    let mut prunes = Vec::new();
    while let Ok(event) = rx.try_recv() {
        match event {
            HubEvent::MergeMessage(_) => merges += 1,
            HubEvent::PruneMessage(message) => prunes.push(message),
            other => panic!("unexpected event {other:?}"),
        }
    }
    assert_eq!(merges, 2);
    assert_eq!(prunes, vec![old]);
}

#[tokio::test]
async fn merge_rejects_foreign_message_types() {
    let (store, _) = store();
    let message = raw_message(
        FID,
        MessageType::AmpAdd,
        100,
        MessageBody::Amp(shoal_types::AmpBody {
            target_fid: Fid::new(2),
        }),
        [1; 20],
        delegate(),
    );
    let err = store.merge(&message).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::BadRequestValidationFailure);
}

#[tokio::test]
async fn merge_converges_for_any_permutation() {
    // An add/remove pair at equal time plus a later add: every submission
    // order must land on the same final state.
    let m0 = add(100, 0x01, delegate());
    let m1 = remove(100, 0x00, delegate());
    let m2 = add(101, 0x02, delegate());
    let messages = [&m0, &m1, &m2];

    let orders: [[usize; 3]; 6] = [
        [0, 1, 2],
        [0, 2, 1],
        [1, 0, 2],
        [1, 2, 0],
        [2, 0, 1],
        [2, 1, 0],
    ];

    for order in orders {
        let (store, _) = store();
        for index in order {
            let _ = store.merge(messages[index]).await.unwrap();
        }
        let winner = store
            .get_signer_add(Fid::new(FID), &delegate())
            .await
            .unwrap();
        assert_eq!(winner, m2, "order {order:?} diverged");
        assert!(store
            .get_signer_remove(Fid::new(FID), &delegate())
            .await
            .is_err());
    }
}

#[tokio::test]
async fn prune_deletes_earliest_by_ts_hash() {
    let events = StoreEventHandler::new();
    let store = SignerStore::with_prune_size_limit(Arc::new(Database::new()), events.clone(), 3);
    let mut rx = events.subscribe();

    let targets: Vec<SignerKey> = (0..5).map(|i| SignerKey::from_bytes([i; 32])).collect();
    for (i, target) in targets.iter().enumerate() {
        let message = add(1_000 + i as u32, 0x01, *target);
        assert!(store.merge(&message).await.unwrap());
    }

    // The two earliest adds are gone, the three latest remain.
    for target in &targets[..2] {
        let err = store
            .get_signer_add(Fid::new(FID), target)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
    for target in &targets[2..] {
        store.get_signer_add(Fid::new(FID), target).await.unwrap();
    }

    let mut pruned = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let HubEvent::PruneMessage(message) = event {
            pruned.push(message.timestamp());
        }
    }
    assert_eq!(pruned, vec![1_000, 1_001]);
}

#[tokio::test]
async fn revoke_deletes_everything_one_signer_signed() {
    let (store, events) = store();
    let custody_a = signer_key(&signing_key(1));
    let custody_b = signer_key(&signing_key(2));

    let by_a = raw_message(
        FID,
        MessageType::SignerAdd,
        100,
        MessageBody::Signer(SignerBody {
            signer: SignerKey::from_bytes([1; 32]),
        }),
        [1; 20],
        custody_a,
    );
    let by_b = raw_message(
        FID,
        MessageType::SignerAdd,
        101,
        MessageBody::Signer(SignerBody {
            signer: SignerKey::from_bytes([2; 32]),
        }),
        [2; 20],
        custody_b,
    );

    store.merge(&by_a).await.unwrap();
    store.merge(&by_b).await.unwrap();

    let mut rx = events.subscribe();
    let revoked = store
        .revoke_messages_by_signer(Fid::new(FID), &custody_a)
        .await
        .unwrap();
    assert_eq!(revoked, vec![by_a]);
    assert!(matches!(rx.try_recv().unwrap(), HubEvent::RevokeMessage(_)));

    // The other custody key's message is untouched.
    store
        .get_signer_add(Fid::new(FID), &SignerKey::from_bytes([2; 32]))
        .await
        .unwrap();
}

#[test]
fn comparator_orders_timestamp_then_polarity_then_hash() {
    use std::cmp::Ordering;

    let add_old = add(100, 0x05, delegate());
    let add_new = add(200, 0x00, delegate());
    assert_eq!(compare_messages(&add_new, &add_old), Ordering::Greater);

    let rem = remove(100, 0x00, delegate());
    assert_eq!(compare_messages(&rem, &add_old), Ordering::Greater);
    assert_eq!(compare_messages(&add_old, &rem), Ordering::Less);

    let add_low = add(100, 0x01, delegate());
    let add_high = add(100, 0x02, delegate());
    assert_eq!(compare_messages(&add_high, &add_low), Ordering::Greater);
    assert_eq!(compare_messages(&add_low, &add_low), Ordering::Equal);
}
