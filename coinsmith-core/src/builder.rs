//! End-to-end transaction building
//!
//! [`TransactionBuilder`] runs the coin selector, the finalizer and the signer
//! in sequence. Errors from each stage propagate unchanged.

use crate::context::SigningContext;
use crate::error::BuildError;
use crate::finalizer::Finalizer;
use crate::invariant::TransactionInvariant;
use crate::signer::Signer;
use crate::transaction::{SignedTransaction, UnsignedTransaction};
use bitcoin::sighash::EcdsaSighashType;
use bitcoin::{OutPoint, PrivateKey, ScriptBuf};
use coinsmith_common::config::EngineConfig;
use coinsmith_common::fee::FeeRate;
use coinsmith_common::types::DesiredOutput;
use coinsmith_common::utxo_selection::{SelectionStrategy, Utxo, UtxoSelector};
use rand::RngCore;
use std::sync::Arc;

/// Selector, finalizer and signer wired together
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    strategy: SelectionStrategy,
    selector: UtxoSelector,
    finalizer: Finalizer,
    signer: Signer,
    sighash_type: EcdsaSighashType,
}

impl TransactionBuilder {
    /// Create a builder paying change to `change_script`
    pub fn new(fee_rate: FeeRate, change_script: ScriptBuf) -> Self {
        Self {
            strategy: SelectionStrategy::LargestFirst,
            selector: UtxoSelector::with_fee_rate(fee_rate),
            finalizer: Finalizer::new(fee_rate, change_script),
            signer: Signer::new(),
            sighash_type: EcdsaSighashType::All,
        }
    }

    /// Create a builder from validated engine settings
    pub fn from_config(
        config: &EngineConfig,
        change_script: ScriptBuf,
    ) -> Result<Self, BuildError> {
        config
            .validate()
            .map_err(|e| BuildError::InvalidArgument(e.to_string()))?;
        let fee_rate = config
            .fee_rate()
            .map_err(|e| BuildError::InvalidArgument(e.to_string()))?;
        let sighash_type = config
            .sighash_type()
            .map_err(|e| BuildError::InvalidArgument(e.to_string()))?;

        Ok(Self::new(fee_rate, change_script)
            .with_strategy(config.selection.strategy)
            .with_dust_relay_fee(config.change.dust_relay_fee)
            .with_version(config.transaction.version)
            .with_sighash_type(sighash_type))
    }

    pub fn with_strategy(mut self, strategy: SelectionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_dust_relay_fee(mut self, dust_relay_fee: u64) -> Self {
        self.finalizer = self.finalizer.with_dust_relay_fee(dust_relay_fee);
        self
    }

    pub fn with_version(mut self, version: i32) -> Self {
        self.finalizer = self.finalizer.with_version(version);
        self
    }

    /// Sighash flag used by [`TransactionBuilder::signing_context`]
    pub fn with_sighash_type(mut self, sighash_type: EcdsaSighashType) -> Self {
        self.sighash_type = sighash_type;
        self
    }

    /// Extra invariant checked at finalization and again before signing
    pub fn with_invariant(mut self, invariant: Arc<dyn TransactionInvariant>) -> Self {
        self.finalizer = self.finalizer.with_invariant(Arc::clone(&invariant));
        self.signer = self.signer.with_invariant(invariant);
        self
    }

    pub fn strategy(&self) -> SelectionStrategy {
        self.strategy
    }

    pub fn finalizer(&self) -> &Finalizer {
        &self.finalizer
    }

    /// A signing context using the configured sighash flag
    pub fn signing_context(&self, outpoint: OutPoint, keys: &[PrivateKey]) -> SigningContext {
        SigningContext::new(outpoint, keys).with_sighash_type(self.sighash_type)
    }

    /// Select from `pool` and finalize, without signing
    pub fn build_unsigned(
        &self,
        pool: &[Utxo],
        outputs: &[DesiredOutput],
        rng: &mut dyn RngCore,
    ) -> Result<UnsignedTransaction, BuildError> {
        let selection = self
            .selector
            .select_utxos_with_rng(pool, outputs, self.strategy, rng)?;
        self.finalizer.finalize(&selection.selected, outputs)
    }

    /// Sign a finalized transaction
    pub fn sign(
        &self,
        unsigned: &UnsignedTransaction,
        contexts: &[SigningContext],
    ) -> Result<SignedTransaction, BuildError> {
        self.signer.sign(unsigned, contexts)
    }

    /// Select, finalize and sign in one call
    pub fn build_and_sign(
        &self,
        pool: &[Utxo],
        outputs: &[DesiredOutput],
        contexts: &[SigningContext],
        rng: &mut dyn RngCore,
    ) -> Result<SignedTransaction, BuildError> {
        let unsigned = self.build_unsigned(pool, outputs, rng)?;
        self.sign(&unsigned, contexts)
    }
}
