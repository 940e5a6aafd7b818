//! Integration test: adapters built from TOML configuration files.

use std::path::PathBuf;

use dexlink_chain::{CalibrationStatus, IChainAdapter, MultisigChainAdapter};
use dexlink_core::{AdapterConfig, NoncePolicy};
use dexlink_integration_tests::{payout, MultisigFixture, GENESIS_TIMESTAMP};

fn temp_config_path(name: &str) -> PathBuf {
    std::env::temp_dir()
        .join(format!("dexlink-it-{}-{}", name, std::process::id()))
        .join("dexlink.toml")
}

#[tokio::test]
async fn test_adapter_from_toml_file() {
    let fixture = MultisigFixture::new(2, 5);
    let path = temp_config_path("toml");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(
        &path,
        format!(
            r#"
[chain]
module_alias = "ark-devnet"
multisig_public_key = "{}"
member_passphrase = "{}"

[ledger]
retry_delay_ms = 20

[sequencer]
policy = "history_replay"
lookahead_page_size = 10
"#,
            fixture.multisig_public_key, fixture.passphrases[1]
        ),
    )
    .unwrap();

    let config = AdapterConfig::load(&path).unwrap();
    assert_eq!(config.sequencer.policy, NoncePolicy::HistoryReplay);
    assert_eq!(config.chain.network, 30);

    let mut adapter = MultisigChainAdapter::from_config(&config).unwrap();
    assert_eq!(adapter.adapter_id(), "ark-devnet");
    assert_eq!(adapter.multisig_address(), fixture.address);

    adapter
        .load(fixture.ledger.clone(), fixture.genesis.height)
        .await
        .unwrap();
    assert_eq!(adapter.member_index(), Some(1));
    assert_eq!(
        adapter.sequencer_state().unwrap().status,
        CalibrationStatus::Uncalibrated
    );

    let payment = adapter
        .prepare_transaction(&payout("t1,cfg", GENESIS_TIMESTAMP + 5))
        .await
        .unwrap();
    assert_eq!(payment.transaction.nonce, "6");

    std::fs::remove_dir_all(path.parent().unwrap()).ok();
}

#[test]
fn test_invalid_file_is_rejected() {
    let path = temp_config_path("invalid");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "[sequencer]\nidentifier_cache_capacity = 0\n").unwrap();

    assert!(AdapterConfig::load(&path).is_err());

    std::fs::remove_dir_all(path.parent().unwrap()).ok();
}

#[test]
fn test_saved_config_round_trips_into_adapter() {
    let fixture = MultisigFixture::new(1, 0);
    let path = temp_config_path("saved");
    fixture.config(0, NoncePolicy::RollingCache).save(&path).unwrap();

    let config = AdapterConfig::load(&path).unwrap();
    let adapter = MultisigChainAdapter::from_config(&config).unwrap();
    assert_eq!(adapter.multisig_address(), fixture.address);

    std::fs::remove_dir_all(path.parent().unwrap()).ok();
}
