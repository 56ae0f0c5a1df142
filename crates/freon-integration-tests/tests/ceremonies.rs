//! Full DKG + signing ceremonies against a live in-process coordinator.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use futures::future::join_all;

use freon_client::relay::RelayClient;
use freon_client::{keygen, sign, ClientError};
use freon_crypto::sanity::sanity_hash;
use freon_integration_tests::{TestCoordinator, TestParticipant};
use freon_types::ErrorKind;

/// Run a full DKG for `n` participants, returning the group id, the group
/// key hex, and the participants holding shares.
async fn run_dkg(
    coordinator: &TestCoordinator,
    n: u16,
    t: u16,
) -> (String, String, Vec<TestParticipant>) {
    let relay = RelayClient::new(&coordinator.host).expect("relay client");
    let created = relay.create_keygen(n, t).await.expect("create group");
    let group_id = created.group_id;

    let participants: Vec<TestParticipant> =
        (0..n).map(|_| TestParticipant::new()).collect();

    let joins = participants.iter().map(|p| {
        let relay = RelayClient::new(&coordinator.host).expect("relay client");
        let group_id = group_id.clone();
        let host = coordinator.host.clone();
        async move {
            keygen::join_ceremony(&relay, &p.store, &host, &group_id, &p.recipient).await
        }
    });
    let outcomes = join_all(joins).await;

    let mut group_keys = Vec::new();
    let mut elected = 0;
    for outcome in &outcomes {
        let outcome = outcome.as_ref().expect("keygen completes");
        group_keys.push(outcome.group_public_key.clone());
        if outcome.elected {
            elected += 1;
        }
    }
    assert!(group_keys.windows(2).all(|w| w[0] == w[1]), "all parties agree on the key");
    assert_eq!(elected, 1, "exactly one party reports the key");

    (group_id, group_keys.remove(0), participants)
}

#[actix_web::test]
async fn dkg_then_sign_full_group() {
    let coordinator = TestCoordinator::start().await;
    let (group_id, group_key_hex, participants) = run_dkg(&coordinator, 3, 3).await;

    // Every participant holds a distinct encrypted share of the same key.
    let mut envelopes = Vec::new();
    for participant in &participants {
        let record = participant
            .store
            .lookup_share(&group_id)
            .expect("lookup")
            .expect("share record");
        assert_eq!(record.public_key, group_key_hex);
        assert_eq!(record.public_shares.len(), 3);
        envelopes.push(record.encrypted_share);
    }
    envelopes.sort();
    envelopes.dedup();
    assert_eq!(envelopes.len(), 3, "shares are encrypted per participant");

    // Create a ceremony over "hello" and have all three sign.
    let message = b"hello";
    let relay = RelayClient::new(&coordinator.host).expect("relay client");
    let created = relay
        .create_sign(&group_id, &sanity_hash(message, &group_id), false, "")
        .await
        .expect("create ceremony");
    let ceremony_id = created.ceremony_id;

    let joins = participants.iter().map(|p| {
        let relay = RelayClient::new(&coordinator.host).expect("relay client");
        let ceremony_id = ceremony_id.clone();
        async move {
            sign::join_ceremony(&relay, &p.store, &ceremony_id, &p.identity_file, message).await
        }
    });
    let outcomes = join_all(joins).await;

    let mut signatures = Vec::new();
    let mut elected = 0;
    for outcome in &outcomes {
        let outcome = outcome.as_ref().expect("signing completes");
        signatures.push(outcome.signature.clone());
        if outcome.elected {
            elected += 1;
        }
    }
    assert_eq!(elected, 1, "exactly one party reports the signature");
    assert!(signatures.windows(2).all(|w| w[0] == w[1]));

    // The reported signature is fetchable and verifies under plain Ed25519.
    let stored = relay
        .get_signature(&ceremony_id)
        .await
        .expect("fetch signature");
    assert_eq!(stored.signature, signatures[0]);

    let key_bytes: [u8; 32] = hex::decode(&group_key_hex)
        .expect("key hex")
        .try_into()
        .expect("32 bytes");
    let sig_bytes: [u8; 64] = hex::decode(&signatures[0])
        .expect("signature hex")
        .try_into()
        .expect("64 bytes");
    let verifying_key = VerifyingKey::from_bytes(&key_bytes).expect("ed25519 key");
    verifying_key
        .verify(message, &Signature::from_bytes(&sig_bytes))
        .expect("signature verifies");

    coordinator.stop().await;
}

#[actix_web::test]
async fn threshold_quorum_signs_with_sshsig_output() {
    let coordinator = TestCoordinator::start().await;
    let (group_id, _group_key_hex, participants) = run_dkg(&coordinator, 3, 2).await;

    let message = b"release-artifact.tar.gz";
    let relay = RelayClient::new(&coordinator.host).expect("relay client");
    let created = relay
        .create_sign(&group_id, &sanity_hash(message, &group_id), true, "file")
        .await
        .expect("create ceremony");
    let ceremony_id = created.ceremony_id;

    // Only two of the three participants show up.
    let joins = participants[..2].iter().map(|p| {
        let relay = RelayClient::new(&coordinator.host).expect("relay client");
        let ceremony_id = ceremony_id.clone();
        async move {
            sign::join_ceremony(&relay, &p.store, &ceremony_id, &p.identity_file, message).await
        }
    });
    let outcomes = join_all(joins).await;

    for outcome in &outcomes {
        let outcome = outcome.as_ref().expect("signing completes");
        assert!(outcome.signature.starts_with("-----BEGIN SSH SIGNATURE-----\n"));
        assert!(outcome.signature.ends_with("-----END SSH SIGNATURE-----\n"));
    }

    coordinator.stop().await;
}

#[actix_web::test]
async fn wrong_message_is_rejected_at_join() {
    let coordinator = TestCoordinator::start().await;
    let (group_id, _group_key_hex, participants) = run_dkg(&coordinator, 2, 2).await;

    let relay = RelayClient::new(&coordinator.host).expect("relay client");
    let created = relay
        .create_sign(&group_id, &sanity_hash(b"msg", &group_id), false, "")
        .await
        .expect("create ceremony");

    // A participant holding a different candidate message fails fast.
    let err = sign::join_ceremony(
        &relay,
        &participants[0].store,
        &created.ceremony_id,
        &participants[0].identity_file,
        b"another msg entirely",
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ClientError::Api(ErrorKind::HashMismatch)));

    coordinator.stop().await;
}
