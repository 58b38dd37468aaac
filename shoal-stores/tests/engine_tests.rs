mod common;

use pretty_assertions::assert_eq;

use common::{
    amp_add, bootstrap_fid, cast_add, new_engine, new_engine_with_limits, register_event,
    signer_add, signer_key, signer_remove, signing_key, transfer_event, user_data_add,
};
use shoal_stores::{HubEvent, StoreLimits};
use shoal_types::{ErrorCode, Fid, UserDataType};

const FID: u64 = 1;

#[tokio::test]
async fn rejects_messages_for_unregistered_fids() {
    let engine = new_engine();
    let delegate = signing_key(2);
    let err = engine
        .merge_message(&cast_add(FID, 100, "hi", &delegate))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::BadRequestValidationFailure);
    assert!(err.message.contains("unknown fid"));
}

#[tokio::test]
async fn rejects_messages_from_unauthorized_signers() {
    let engine = new_engine();
    let custody = signing_key(1);
    engine
        .merge_id_registry_event(&register_event(FID, &custody, 10))
        .await
        .unwrap();

    let rogue = signing_key(9);
    let err = engine
        .merge_message(&cast_add(FID, 100, "hi", &rogue))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::BadRequestValidationFailure);
    assert!(err.message.contains("unknown signer"));
}

#[tokio::test]
async fn rejects_signer_messages_from_stale_custody() {
    let engine = new_engine();
    let custody_a = signing_key(1);
    let custody_b = signing_key(2);
    let delegate = signing_key(3);

    engine
        .merge_id_registry_event(&register_event(FID, &custody_a, 10))
        .await
        .unwrap();
    engine
        .merge_id_registry_event(&transfer_event(FID, &custody_a, &custody_b, 11))
        .await
        .unwrap();

    // Custody A no longer holds the fid.
    let err = engine
        .merge_message(&signer_add(FID, 100, &custody_a, &signer_key(&delegate)))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::BadRequestValidationFailure);

    // Custody B does.
    assert!(engine
        .merge_message(&signer_add(FID, 100, &custody_b, &signer_key(&delegate)))
        .await
        .unwrap());
}

#[tokio::test]
async fn routes_messages_to_their_stores() {
    let engine = new_engine();
    let custody = signing_key(1);
    let delegate = signing_key(2);
    bootstrap_fid(&engine, FID, &custody, &delegate).await;

    let cast = cast_add(FID, 100, "hello shoal", &delegate);
    let amp = amp_add(FID, 101, 42, &delegate);
    let bio = user_data_add(FID, 102, UserDataType::Bio, "hi", &delegate);

    for message in [&cast, &amp, &bio] {
        assert!(engine.merge_message(message).await.unwrap());
    }

    assert_eq!(
        engine.casts().get_casts_by_fid(Fid::new(FID)).await.unwrap(),
        vec![cast.clone()]
    );
    assert_eq!(
        engine.amps().get_amps_by_fid(Fid::new(FID)).await.unwrap(),
        vec![amp]
    );
    assert_eq!(
        engine
            .user_data()
            .get_user_data(Fid::new(FID), UserDataType::Bio)
            .await
            .unwrap(),
        bio
    );

    // The global ts_hash index resolves any of them.
    assert_eq!(
        engine.get_message_by_ts_hash(&cast.ts_hash()).await.unwrap(),
        cast
    );
}

#[tokio::test]
async fn custody_transfer_revokes_the_previous_chain() {
    let engine = new_engine();
    let custody_a = signing_key(1);
    let custody_b = signing_key(2);
    let delegate = signing_key(3);
    let other_delegate = signer_key(&signing_key(4));

    engine
        .merge_id_registry_event(&register_event(FID, &custody_a, 10))
        .await
        .unwrap();
    engine
        .merge_message(&signer_add(FID, 100, &custody_a, &signer_key(&delegate)))
        .await
        .unwrap();
    engine
        .merge_message(&signer_remove(FID, 100, &custody_a, &other_delegate))
        .await
        .unwrap();
    // A message signed by the delegate custody A authorized.
    let cast = cast_add(FID, 110, "soon to be revoked", &delegate);
    engine.merge_message(&cast).await.unwrap();

    let mut rx = engine.events().subscribe();
    assert!(engine
        .merge_id_registry_event(&transfer_event(FID, &custody_a, &custody_b, 11))
        .await
        .unwrap());

    // Both custody-signed signer messages and the delegate's cast are gone.
    assert!(engine
        .signers()
        .get_all_messages_by_fid(Fid::new(FID))
        .await
        .unwrap()
        .is_empty());
    assert!(engine
        .casts()
        .get_casts_by_fid(Fid::new(FID))
        .await
        .unwrap()
        .is_empty());
    let err = engine.get_message_by_ts_hash(&cast.ts_hash()).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);

    let mut revokes = 0;
    while let Ok(event) = rx.try_recv() {
        match event {
            HubEvent::MergeIdRegistryEvent(_) => {}
            HubEvent::RevokeMessage(_) => revokes += 1,
            other => panic!("unexpected event {other:?}"),
        }
    }
    assert_eq!(revokes, 3);
}

#[tokio::test]
async fn signer_remove_revokes_the_delegates_messages() {
    let engine = new_engine();
    let custody = signing_key(1);
    let delegate = signing_key(2);
    bootstrap_fid(&engine, FID, &custody, &delegate).await;

    let cast = cast_add(FID, 100, "ephemeral", &delegate);
    engine.merge_message(&cast).await.unwrap();

    engine
        .merge_message(&signer_remove(FID, 200, &custody, &signer_key(&delegate)))
        .await
        .unwrap();

    assert!(engine
        .casts()
        .get_casts_by_fid(Fid::new(FID))
        .await
        .unwrap()
        .is_empty());

    // With its SignerAdd gone, the delegate cannot submit again.
    let err = engine
        .merge_message(&cast_add(FID, 300, "rejected", &delegate))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::BadRequestValidationFailure);
}

#[tokio::test]
async fn prune_limit_applies_per_store() {
    let engine = new_engine_with_limits(StoreLimits {
        signers: 3,
        ..StoreLimits::default()
    });
    let custody = signing_key(1);
    engine
        .merge_id_registry_event(&register_event(FID, &custody, 10))
        .await
        .unwrap();

    let mut rx = engine.events().subscribe();
    let delegates: Vec<_> = (0..5).map(|i| signer_key(&signing_key(10 + i))).collect();
    for (i, delegate) in delegates.iter().enumerate() {
        engine
            .merge_message(&signer_add(FID, 1_000 + i as u32, &custody, delegate))
            .await
            .unwrap();
    }

    for delegate in &delegates[..2] {
        let err = engine
            .signers()
            .get_signer_add(Fid::new(FID), delegate)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
    for delegate in &delegates[2..] {
        engine
            .signers()
            .get_signer_add(Fid::new(FID), delegate)
            .await
            .unwrap();
    }

    let mut prunes = 0;
    while let Ok(event) = rx.try_recv() {
        if matches!(event, HubEvent::PruneMessage(_)) {
            prunes += 1;
        }
    }
    assert_eq!(prunes, 2);
}

#[tokio::test]
async fn reactions_and_verifications_round_trip() {
    let engine = new_engine();
    let custody = signing_key(1);
    let delegate = signing_key(2);
    bootstrap_fid(&engine, FID, &custody, &delegate).await;

    let target = shoal_types::CastId {
        fid: Fid::new(42),
        ts_hash: shoal_types::TsHash::new(50, &[9; 20]),
    };
    let like = common::reaction_add(FID, 100, shoal_types::ReactionType::Like, target, &delegate);
    assert!(engine.merge_message(&like).await.unwrap());
    assert_eq!(
        engine
            .reactions()
            .get_reaction_add(Fid::new(FID), shoal_types::ReactionType::Like, &target)
            .await
            .unwrap(),
        like
    );

    let address = shoal_types::Address::from_bytes([0xaa; 20]);
    let proof = common::verification_add(FID, 101, address, &delegate);
    assert!(engine.merge_message(&proof).await.unwrap());
    assert_eq!(
        engine
            .verifications()
            .get_verifications_by_fid(Fid::new(FID))
            .await
            .unwrap(),
        vec![proof]
    );
}

#[tokio::test]
async fn tampered_messages_never_reach_a_store() {
    let engine = new_engine();
    let custody = signing_key(1);
    let delegate = signing_key(2);
    bootstrap_fid(&engine, FID, &custody, &delegate).await;

    let mut cast = cast_add(FID, 100, "original", &delegate);
    cast.data.timestamp = 101;
    let err = engine.merge_message(&cast).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::BadRequestValidationFailure);
    assert!(engine
        .casts()
        .get_casts_by_fid(Fid::new(FID))
        .await
        .unwrap()
        .is_empty());
}
