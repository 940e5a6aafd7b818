use async_trait::async_trait;
use std::sync::Arc;

use dexlink_core::{AdapterConfig, CoreError, PaymentInstruction, PreparedPayment, PreparedTransaction, SignaturePacket};
use dexlink_crypto::{ChainSdk, Ed25519Sdk, KeyPair};

use crate::calibrator::{NonceCalibrator, SequencerState};
use crate::error::ChainError;
use crate::ledger::{LedgerQueryClient, LedgerQueryService, RetryPolicy};
use crate::preparer::TransactionPreparer;
use crate::verifier::SignatureVerifier;

/// Chain adapter interface.
///
/// The host drives one adapter per chain: it loads it against a ledger
/// service, feeds it payment instructions in block order, and asks it to
/// check signatures gathered from the other members.
#[async_trait]
pub trait IChainAdapter: Send + Sync {
    /// Connect to the ledger and calibrate from `last_processed_height`.
    async fn load(
        &mut self,
        service: Arc<dyn LedgerQueryService>,
        last_processed_height: u64,
    ) -> Result<(), ChainError>;

    /// Drop the ledger connection and all sequencing state.
    async fn unload(&mut self) -> Result<(), ChainError>;

    /// Resynchronize nonce sequencing from `height`.
    async fn reset(&mut self, height: u64) -> Result<(), ChainError>;

    /// Build and sign the transfer for an instruction.
    async fn prepare_transaction(
        &mut self,
        instruction: &PaymentInstruction,
    ) -> Result<PreparedPayment, ChainError>;

    /// Check another member's partial signature.
    fn verify_transaction_signature(
        &self,
        transaction: &PreparedTransaction,
        packet: &SignaturePacket,
    ) -> bool;

    /// Alias of the chain module this adapter serves (e.g. "ark").
    fn adapter_id(&self) -> &str;
}

/// State that only exists between `load` and `unload`.
struct Session {
    client: LedgerQueryClient,
    calibrator: NonceCalibrator,
    preparer: TransactionPreparer,
    member_index: u8,
}

/// Adapter for one member of a multisig account.
pub struct MultisigChainAdapter {
    config: AdapterConfig,
    sdk: Arc<dyn ChainSdk>,
    verifier: SignatureVerifier,
    multisig_address: String,
    member_public_key: String,
    session: Option<Session>,
}

impl MultisigChainAdapter {
    pub fn new(config: &AdapterConfig, sdk: Arc<dyn ChainSdk>) -> Result<Self, ChainError> {
        config.validate()?;
        if sdk.network() != config.chain.network {
            return Err(CoreError::InvalidConfig(format!(
                "SDK network {} does not match configured network {}",
                sdk.network(),
                config.chain.network
            ))
            .into());
        }

        let member_public_key = KeyPair::from_passphrase(&config.chain.member_passphrase)?
            .public_key()
            .to_hex();
        let multisig_address = sdk.address_from_public_key(&config.chain.multisig_public_key)?;

        Ok(Self {
            config: config.clone(),
            verifier: SignatureVerifier::new(sdk.clone()),
            sdk,
            multisig_address,
            member_public_key,
            session: None,
        })
    }

    /// Adapter backed by the built-in Ed25519 SDK for the configured network.
    pub fn from_config(config: &AdapterConfig) -> Result<Self, ChainError> {
        Self::new(config, Arc::new(Ed25519Sdk::new(config.chain.network)))
    }

    pub fn multisig_address(&self) -> &str {
        &self.multisig_address
    }

    pub fn member_public_key(&self) -> &str {
        &self.member_public_key
    }

    pub fn is_loaded(&self) -> bool {
        self.session.is_some()
    }

    /// This member's position in the multisig key list, once loaded.
    pub fn member_index(&self) -> Option<u8> {
        self.session.as_ref().map(|s| s.member_index)
    }

    pub fn sequencer_state(&self) -> Option<&SequencerState> {
        self.session.as_ref().map(|s| s.calibrator.state())
    }

    fn session_mut(&mut self) -> Result<&mut Session, ChainError> {
        self.session.as_mut().ok_or(ChainError::NotLoaded)
    }
}

#[async_trait]
impl IChainAdapter for MultisigChainAdapter {
    async fn load(
        &mut self,
        service: Arc<dyn LedgerQueryService>,
        last_processed_height: u64,
    ) -> Result<(), ChainError> {
        let client = LedgerQueryClient::new(service, RetryPolicy::from_config(&self.config.ledger));
        let account = client.get_account(&self.multisig_address).await?;

        let member_index = account
            .multisig_public_keys
            .iter()
            .position(|k| k.eq_ignore_ascii_case(&self.member_public_key))
            .and_then(|i| u8::try_from(i).ok())
            .ok_or_else(|| ChainError::NotMultisigMember(self.member_public_key.clone()))?;

        let preparer = TransactionPreparer::new(
            self.sdk.clone(),
            KeyPair::from_passphrase(&self.config.chain.member_passphrase)?,
            member_index,
            self.config.chain.multisig_public_key.clone(),
        )?;
        let mut calibrator = NonceCalibrator::new(
            self.multisig_address.clone(),
            account.ledger_nonce,
            self.config.sequencer.clone(),
        );
        calibrator.reset(&client, last_processed_height).await?;

        tracing::info!(
            adapter = %self.config.chain.module_alias,
            address = %self.multisig_address,
            member_index,
            account_nonce = account.ledger_nonce,
            height = last_processed_height,
            policy = ?self.config.sequencer.policy,
            "chain adapter loaded"
        );

        self.session = Some(Session {
            client,
            calibrator,
            preparer,
            member_index,
        });
        Ok(())
    }

    async fn unload(&mut self) -> Result<(), ChainError> {
        if self.session.take().is_some() {
            tracing::info!(adapter = %self.config.chain.module_alias, "chain adapter unloaded");
        }
        Ok(())
    }

    async fn reset(&mut self, height: u64) -> Result<(), ChainError> {
        let session = self.session_mut()?;
        session.calibrator.reset(&session.client, height).await
    }

    async fn prepare_transaction(
        &mut self,
        instruction: &PaymentInstruction,
    ) -> Result<PreparedPayment, ChainError> {
        let session = self.session_mut()?;
        session.preparer.validate(instruction)?;

        let assignment = session
            .calibrator
            .next_nonce(&session.client, instruction)
            .await?;
        let payment = session.preparer.build(instruction, assignment.nonce)?;

        tracing::info!(
            id = %payment.transaction.id,
            nonce = assignment.nonce,
            replayed = assignment.replayed,
            recipient = %instruction.recipient_address,
            "payment prepared"
        );
        Ok(payment)
    }

    fn verify_transaction_signature(
        &self,
        transaction: &PreparedTransaction,
        packet: &SignaturePacket,
    ) -> bool {
        self.verifier.verify(transaction, packet)
    }

    fn adapter_id(&self) -> &str {
        &self.config.chain.module_alias
    }
}
