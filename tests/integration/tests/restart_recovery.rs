//! Integration test: nonce recovery across restarts and ledger drift.

use dexlink_chain::{ChainError, IChainAdapter, MultisigChainAdapter};
use dexlink_core::{NoncePolicy, PreparedPayment};
use dexlink_integration_tests::{payout, MultisigFixture, GENESIS_TIMESTAMP};

const SOURCE_TS: u64 = GENESIS_TIMESTAMP + 100;
const CONFIRM_TS: u64 = GENESIS_TIMESTAMP + 110;

fn nonces(payments: &[PreparedPayment]) -> Vec<String> {
    payments.iter().map(|p| p.transaction.nonce.clone()).collect()
}

async fn restart_replays_broadcast_instructions(policy: NoncePolicy, confirmed_at: u64) {
    let fixture = MultisigFixture::new(2, 5);
    let mut before = fixture.adapter(0, policy, fixture.genesis.height).await;

    let mut original = Vec::new();
    for msg in ["t1,a", "t1,b", "t1,c"] {
        original.push(before.prepare_transaction(&payout(msg, SOURCE_TS)).await.unwrap());
    }
    assert_eq!(nonces(&original), vec!["6", "7", "8"]);

    // a and b made it on chain before the crash, c did not.
    fixture.confirm(&original[..2], confirmed_at);
    drop(before);

    // The other member restarts from the last height the host processed.
    let mut after = fixture.adapter(1, policy, fixture.genesis.height).await;
    let mut replayed = Vec::new();
    for msg in ["t1,a", "t1,b", "t1,c"] {
        replayed.push(after.prepare_transaction(&payout(msg, SOURCE_TS)).await.unwrap());
    }
    for (old, new) in original.iter().zip(&replayed) {
        assert_eq!(old.transaction, new.transaction);
    }

    let next = after.prepare_transaction(&payout("t1,d", SOURCE_TS)).await.unwrap();
    assert_eq!(next.transaction.nonce, "9");
}

#[tokio::test]
async fn test_restart_replays_with_rolling_cache() {
    restart_replays_broadcast_instructions(NoncePolicy::RollingCache, CONFIRM_TS).await;
}

#[tokio::test]
async fn test_restart_replays_with_history_replay() {
    restart_replays_broadcast_instructions(NoncePolicy::HistoryReplay, CONFIRM_TS).await;
}

// Transfers carry the instruction timestamp, so a block can be confirmed at
// the very timestamp the host replays.
#[tokio::test]
async fn test_restart_replays_block_at_instruction_timestamp_with_rolling_cache() {
    restart_replays_broadcast_instructions(NoncePolicy::RollingCache, SOURCE_TS).await;
}

#[tokio::test]
async fn test_restart_replays_block_at_instruction_timestamp_with_history_replay() {
    restart_replays_broadcast_instructions(NoncePolicy::HistoryReplay, SOURCE_TS).await;
}

#[tokio::test]
async fn test_restart_recognises_id_bearing_instruction() {
    for policy in [NoncePolicy::RollingCache, NoncePolicy::HistoryReplay] {
        let fixture = MultisigFixture::new(2, 5);
        let order = payout("t1,order", SOURCE_TS).with_id("order-9");

        let mut before = fixture.adapter(0, policy, fixture.genesis.height).await;
        let original = before.prepare_transaction(&order).await.unwrap();
        assert_eq!(original.transaction.nonce, "6");
        fixture.confirm(std::slice::from_ref(&original), CONFIRM_TS);
        drop(before);

        let mut after = fixture.adapter(1, policy, fixture.genesis.height).await;
        let replayed = after.prepare_transaction(&order).await.unwrap();
        assert_eq!(replayed.transaction, original.transaction);

        let next = after.prepare_transaction(&payout("t1,next", SOURCE_TS)).await.unwrap();
        assert_eq!(next.transaction.nonce, "7");
    }
}

#[tokio::test]
async fn test_reset_after_confirmation_continues_sequence() {
    let fixture = MultisigFixture::new(2, 5);
    let mut adapter = fixture.adapter(0, NoncePolicy::RollingCache, fixture.genesis.height).await;

    let a = adapter.prepare_transaction(&payout("t1,a", SOURCE_TS)).await.unwrap();
    let b = adapter.prepare_transaction(&payout("t1,b", SOURCE_TS)).await.unwrap();
    let block = fixture.confirm(&[a, b], CONFIRM_TS);

    adapter.reset(block.height).await.unwrap();
    let c = adapter
        .prepare_transaction(&payout("t2,c", CONFIRM_TS + 10))
        .await
        .unwrap();
    assert_eq!(c.transaction.nonce, "8");
}

#[tokio::test]
async fn test_foreign_spend_halts_until_resync() {
    let fixture = MultisigFixture::new(2, 5);
    let mut adapter = fixture.adapter(0, NoncePolicy::RollingCache, fixture.genesis.height).await;

    // Nonce 6 was spent without this adapter preparing it.
    let block = fixture.ledger.append_block(GENESIS_TIMESTAMP + 50);
    fixture.ledger.record_outbound(&fixture.address, &block, 6, "elsewhere");

    let err = adapter
        .prepare_transaction(&payout("t1,a", SOURCE_TS))
        .await
        .unwrap_err();
    assert!(matches!(err, ChainError::NonceRegression { nonce: 6, expected_min: 7 }));
    assert!(err.requires_resync());

    let err = adapter
        .prepare_transaction(&payout("t1,a", SOURCE_TS))
        .await
        .unwrap_err();
    assert!(matches!(err, ChainError::Halted));

    adapter.reset(block.height).await.unwrap();
    let payment = adapter.prepare_transaction(&payout("t1,a", SOURCE_TS)).await.unwrap();
    assert_eq!(payment.transaction.nonce, "7");
}

#[tokio::test]
async fn test_lookahead_exhaustion_is_fatal() {
    let fixture = MultisigFixture::new(2, 5);
    for nonce in 6..=15 {
        let block = fixture.ledger.append_block(GENESIS_TIMESTAMP + nonce);
        fixture.ledger.record_outbound(&fixture.address, &block, nonce, "");
    }

    let mut config = fixture.config(0, NoncePolicy::HistoryReplay);
    config.sequencer.lookahead_page_size = 2;
    config.sequencer.max_lookahead_iterations = 3;
    let mut adapter = MultisigChainAdapter::from_config(&config).unwrap();
    adapter
        .load(fixture.ledger.clone(), fixture.genesis.height)
        .await
        .unwrap();

    let late = GENESIS_TIMESTAMP + 1_000;
    let err = adapter.prepare_transaction(&payout("t9,z", late)).await.unwrap_err();
    assert!(matches!(err, ChainError::CalibrationExhausted { iterations: 3 }));
    assert!(matches!(
        adapter.prepare_transaction(&payout("t9,z", late)).await,
        Err(ChainError::Halted)
    ));

    let tip = fixture.ledger.tip().unwrap();
    adapter.reset(tip.height).await.unwrap();
    let payment = adapter.prepare_transaction(&payout("t9,z", late)).await.unwrap();
    assert_eq!(payment.transaction.nonce, "16");
}
