//! Integration test: adapter behaviour while the ledger service misbehaves.

use std::time::Duration;

use dexlink_chain::{ChainError, IChainAdapter, LedgerError, MultisigChainAdapter};
use dexlink_core::NoncePolicy;
use dexlink_integration_tests::{payout, MultisigFixture, GENESIS_TIMESTAMP};

#[tokio::test(start_paused = true)]
async fn test_load_waits_out_transient_outage() {
    let fixture = MultisigFixture::new(2, 5);
    fixture.ledger.inject_failures([
        LedgerError::Transport("connection refused".into()),
        LedgerError::Transport("connection refused".into()),
        LedgerError::Service("502 bad gateway".into()),
    ]);

    let start = tokio::time::Instant::now();
    let adapter = fixture.adapter(0, NoncePolicy::RollingCache, fixture.genesis.height).await;
    assert!(adapter.is_loaded());
    // Three failed attempts, each followed by the configured 50 ms delay.
    assert!(start.elapsed() >= Duration::from_millis(150));
}

#[tokio::test(start_paused = true)]
async fn test_prepare_retries_history_queries() {
    let fixture = MultisigFixture::new(2, 5);
    let mut adapter = fixture.adapter(0, NoncePolicy::RollingCache, fixture.genesis.height).await;

    fixture
        .ledger
        .inject_failures((0..10).map(|_| LedgerError::Service("overloaded".into())));
    let payment = adapter
        .prepare_transaction(&payout("t1,a", GENESIS_TIMESTAMP + 100))
        .await
        .unwrap();
    assert_eq!(payment.transaction.nonce, "6");
}

#[tokio::test]
async fn test_malformed_response_surfaces_without_consuming_nonce() {
    let fixture = MultisigFixture::new(2, 5);
    let mut adapter = fixture.adapter(0, NoncePolicy::RollingCache, fixture.genesis.height).await;

    fixture
        .ledger
        .inject_failures([LedgerError::Malformed("nonce is not a decimal string".into())]);
    let err = adapter
        .prepare_transaction(&payout("t1,a", GENESIS_TIMESTAMP + 100))
        .await
        .unwrap_err();
    assert!(matches!(err, ChainError::Ledger(LedgerError::Malformed(_))));
    assert!(!err.requires_resync());

    let payment = adapter
        .prepare_transaction(&payout("t1,a", GENESIS_TIMESTAMP + 100))
        .await
        .unwrap();
    assert_eq!(payment.transaction.nonce, "6");
}

#[tokio::test]
async fn test_malformed_account_fails_load() {
    let fixture = MultisigFixture::new(2, 5);
    let mut adapter =
        MultisigChainAdapter::from_config(&fixture.config(0, NoncePolicy::RollingCache)).unwrap();
    fixture
        .ledger
        .inject_failures([LedgerError::Malformed("truncated account".into())]);
    assert!(matches!(
        adapter.load(fixture.ledger.clone(), fixture.genesis.height).await,
        Err(ChainError::Ledger(LedgerError::Malformed(_)))
    ));
    assert!(!adapter.is_loaded());
}
