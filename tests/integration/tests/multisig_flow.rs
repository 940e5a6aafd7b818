//! Integration test: members of one multisig account preparing payouts.
//!
//! Every member runs its own adapter against the same ledger and must arrive
//! at byte-identical transactions, each with its own partial signature.

use dexlink_chain::IChainAdapter;
use dexlink_core::{NoncePolicy, PreparedTransaction, SignaturePacket};
use dexlink_integration_tests::{payout, MultisigFixture};

const SOURCE_TS: u64 = 1_609_544_665;

#[tokio::test]
async fn test_members_prepare_identical_transactions() {
    let fixture = MultisigFixture::new(3, 5);
    let mut members = Vec::new();
    for i in 0..3 {
        members.push(fixture.adapter(i, NoncePolicy::RollingCache, fixture.genesis.height).await);
    }

    let mut payments = Vec::new();
    for adapter in members.iter_mut() {
        payments.push(adapter.prepare_transaction(&payout("t1,abc", SOURCE_TS)).await.unwrap());
    }

    let first = &payments[0].transaction;
    assert_eq!(first.nonce, "6");
    assert!(first.signatures.is_empty());
    for payment in &payments[1..] {
        assert_eq!(&payment.transaction, first);
    }
    assert_ne!(payments[0].signature.signature, payments[1].signature.signature);
    assert_ne!(payments[1].signature.signature, payments[2].signature.signature);

    // Everyone accepts everyone's partial signature.
    for verifier in &members {
        for payment in &payments {
            assert!(verifier.verify_transaction_signature(first, &payment.signature));
        }
    }
}

#[tokio::test]
async fn test_consecutive_instructions_stay_in_lockstep() {
    let fixture = MultisigFixture::new(2, 5);
    let mut a = fixture.adapter(0, NoncePolicy::RollingCache, fixture.genesis.height).await;
    let mut b = fixture.adapter(1, NoncePolicy::RollingCache, fixture.genesis.height).await;

    for (i, expected) in [6u64, 7, 8].into_iter().enumerate() {
        let instruction = payout(&format!("t{},swap", i), SOURCE_TS);
        let pa = a.prepare_transaction(&instruction).await.unwrap();
        let pb = b.prepare_transaction(&instruction).await.unwrap();
        assert_eq!(pa.transaction.nonce, expected.to_string());
        assert_eq!(pa.transaction.id, pb.transaction.id);
    }
}

#[tokio::test]
async fn test_signatures_survive_the_wire() {
    let fixture = MultisigFixture::new(2, 5);
    let mut a = fixture.adapter(0, NoncePolicy::RollingCache, fixture.genesis.height).await;
    let b = fixture.adapter(1, NoncePolicy::RollingCache, fixture.genesis.height).await;

    let payment = a.prepare_transaction(&payout("t1,wire", SOURCE_TS)).await.unwrap();
    let tx_json = serde_json::to_string(&payment.transaction).unwrap();
    let packet_json = serde_json::to_string(&payment.signature).unwrap();

    let tx: PreparedTransaction = serde_json::from_str(&tx_json).unwrap();
    let packet: SignaturePacket = serde_json::from_str(&packet_json).unwrap();
    assert!(b.verify_transaction_signature(&tx, &packet));
}

#[tokio::test]
async fn test_forged_packets_are_rejected() {
    let fixture = MultisigFixture::new(2, 5);
    let mut a = fixture.adapter(0, NoncePolicy::RollingCache, fixture.genesis.height).await;
    let mut b = fixture.adapter(1, NoncePolicy::RollingCache, fixture.genesis.height).await;

    let first = a.prepare_transaction(&payout("t1,x", SOURCE_TS)).await.unwrap();
    let from_b = b.prepare_transaction(&payout("t1,x", SOURCE_TS)).await.unwrap();
    let second = a.prepare_transaction(&payout("t2,y", SOURCE_TS)).await.unwrap();

    // Claiming to be another member.
    let mut impostor = first.signature.clone();
    impostor.signer_address = from_b.signature.signer_address.clone();
    assert!(!b.verify_transaction_signature(&first.transaction, &impostor));

    // A valid signature over a different transaction.
    assert!(!b.verify_transaction_signature(&first.transaction, &second.signature));

    // One altered hex digit.
    let mut altered = first.signature.clone();
    let last = altered.signature.pop().unwrap();
    altered.signature.push(if last == 'a' { 'b' } else { 'a' });
    assert!(!b.verify_transaction_signature(&first.transaction, &altered));

    // Altered amount with a stale original id.
    let mut tampered = first.transaction.clone();
    tampered.amount = "1".into();
    assert!(!b.verify_transaction_signature(&tampered, &first.signature));
}
