//! Fixtures shared by the integration tests.
//!
//! A [`MultisigFixture`] stands up an in-memory ledger holding a multisig
//! account with a few members, and hands out adapters loaded against it.

use std::sync::Arc;

use dexlink_chain::{IChainAdapter, InMemoryLedger, MultisigChainAdapter};
use dexlink_core::{
    Account, AdapterConfig, Block, Nonce, NoncePolicy, PaymentInstruction, PreparedPayment,
};
use dexlink_crypto::{ChainSdk, Ed25519Sdk, KeyPair};

pub const NETWORK: u8 = 30;

/// Timestamp of the block every fixture starts from.
pub const GENESIS_TIMESTAMP: u64 = 1_609_544_600;

pub struct MultisigFixture {
    pub ledger: Arc<InMemoryLedger>,
    pub passphrases: Vec<String>,
    pub multisig_public_key: String,
    pub address: String,
    /// Block holding the account's settled history (nonces `1..=account_nonce`).
    pub genesis: Block,
}

impl MultisigFixture {
    /// Multisig account with `members` members whose history already holds
    /// nonces `1..=account_nonce`.
    pub fn new(members: usize, account_nonce: Nonce) -> Self {
        let sdk = Ed25519Sdk::new(NETWORK);
        let multisig_public_key = KeyPair::from_seed(&[200u8; 32]).public_key().to_hex();
        let address = sdk
            .address_from_public_key(&multisig_public_key)
            .expect("valid multisig key");
        let passphrases: Vec<String> = (0..members).map(|i| format!("member passphrase {}", i)).collect();
        let member_keys = passphrases
            .iter()
            .map(|p| KeyPair::from_passphrase(p).expect("passphrase").public_key().to_hex())
            .collect();

        let ledger = Arc::new(InMemoryLedger::new());
        ledger.upsert_account(Account {
            address: address.clone(),
            public_key: multisig_public_key.clone(),
            ledger_nonce: 0,
            multisig_public_keys: member_keys,
            multisig_threshold: members as u32,
        });
        let genesis = ledger.append_block(GENESIS_TIMESTAMP);
        for nonce in 1..=account_nonce {
            ledger.record_outbound(&address, &genesis, nonce, "");
        }

        Self {
            ledger,
            passphrases,
            multisig_public_key,
            address,
            genesis,
        }
    }

    pub fn config(&self, member: usize, policy: NoncePolicy) -> AdapterConfig {
        let mut config = AdapterConfig::default();
        config.chain.network = NETWORK;
        config.chain.multisig_public_key = self.multisig_public_key.clone();
        config.chain.member_passphrase = self.passphrases[member].clone();
        config.ledger.retry_delay_ms = 50;
        config.sequencer.policy = policy;
        config
    }

    /// Adapter for `member`, loaded from `height`.
    pub async fn adapter(&self, member: usize, policy: NoncePolicy, height: u64) -> MultisigChainAdapter {
        let mut adapter =
            MultisigChainAdapter::from_config(&self.config(member, policy)).expect("adapter config");
        adapter
            .load(self.ledger.clone(), height)
            .await
            .expect("adapter loads");
        adapter
    }

    /// Include prepared payments in a new block, as the ledger would after
    /// the members broadcast them.
    pub fn confirm(&self, payments: &[PreparedPayment], timestamp: u64) -> Block {
        let block = self.ledger.append_block(timestamp);
        for payment in payments {
            let tx = &payment.transaction;
            let nonce = tx.nonce_value().expect("prepared nonce");
            self.ledger.record_outbound(&self.address, &block, nonce, &tx.message);
        }
        block
    }
}

/// A valid recipient address derived from `seed`.
pub fn recipient(seed: u8) -> String {
    Ed25519Sdk::new(NETWORK)
        .address_from_public_key(&KeyPair::from_seed(&[seed; 32]).public_key().to_hex())
        .expect("valid recipient key")
}

/// A DEX payout instruction carrying `message` as its identifier.
pub fn payout(message: &str, timestamp: u64) -> PaymentInstruction {
    PaymentInstruction::new(recipient(1), 10_000_000_000, 10_000_000, timestamp).with_message(message)
}
