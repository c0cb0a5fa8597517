//! Transaction signing
//!
//! The signer takes an [`UnsignedTransaction`] and one [`SigningContext`] per
//! input and produces a [`SignedTransaction`]. All checks that can fail
//! without a key (timelocks, invariants, missing contexts) run before the
//! first signature is made.
//!
//! # Security Considerations
//!
//! - Secret keys are rebuilt from zeroizing storage per signature
//! - Logs carry input indices and spend kinds, never keys or signatures
//! - Signatures use RFC 6979 nonces with low-R grinding

use crate::context::SigningContext;
use crate::error::BuildError;
use crate::invariant::{enforce, ConservationOfValue, TransactionInvariant};
use crate::script::{SatisfyError, Satisfier};
use crate::spend::ResolvedSpend;
use crate::timelock;
use crate::transaction::{SignedTransaction, UnsignedTransaction};
use bitcoin::hashes::Hash;
use bitcoin::secp256k1::{All, Message, Secp256k1};
use bitcoin::sighash::{EcdsaSighashType, SighashCache};
use bitcoin::{ecdsa, PubkeyHash, PublicKey, ScriptBuf, Transaction, Witness};
use coinsmith_common::logging::{log_signing, sanitize_outpoint, LogLevel};
use serde_json::json;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Signs finalized transactions
#[derive(Clone)]
pub struct Signer {
    secp: Secp256k1<All>,
    invariant: Arc<dyn TransactionInvariant>,
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("invariant", &self.invariant.name())
            .finish()
    }
}

impl Default for Signer {
    fn default() -> Self {
        Self::new()
    }
}

impl Signer {
    pub fn new() -> Self {
        Self {
            secp: Secp256k1::new(),
            invariant: Arc::new(ConservationOfValue),
        }
    }

    /// Extra invariant run before signing, after the conservation check
    pub fn with_invariant(mut self, invariant: Arc<dyn TransactionInvariant>) -> Self {
        self.invariant = invariant;
        self
    }

    /// Sign every input of `unsigned`
    ///
    /// `contexts` must hold one context per input outpoint; contexts for
    /// other outpoints are ignored.
    ///
    /// # Errors
    /// * `TimelockConflict` - the inputs' locks cannot hold together
    /// * `InvariantViolation` - the transaction fails a check, or the signed
    ///   transaction pays less than its fee rate
    /// * `InvalidArgument` - two contexts for the same outpoint
    /// * `SigningMismatch` - an input has no context or its keys cannot
    ///   satisfy the script
    /// * `Verification` - a signed input fails script verification
    pub fn sign(
        &self,
        unsigned: &UnsignedTransaction,
        contexts: &[SigningContext],
    ) -> Result<SignedTransaction, BuildError> {
        let tx = unsigned.transaction();
        let spent_outputs = unsigned.spent_outputs();

        self.check_timelocks(unsigned)?;
        enforce(&ConservationOfValue, tx, &spent_outputs, unsigned.fee())?;
        enforce(self.invariant.as_ref(), tx, &spent_outputs, unsigned.fee())?;

        let by_outpoint = index_contexts(contexts)?;
        let assigned = tx
            .input
            .iter()
            .enumerate()
            .map(|(index, input)| {
                by_outpoint
                    .get(&input.previous_output)
                    .copied()
                    .ok_or_else(|| BuildError::SigningMismatch {
                        index,
                        reason: format!(
                            "no signing context for {}",
                            sanitize_outpoint(&input.previous_output)
                        ),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut cache = SighashCache::new(tx);
        let mut unlocking = Vec::with_capacity(tx.input.len());
        for (index, ((spend, utxo), context)) in unsigned
            .spends()
            .iter()
            .zip(unsigned.spent_utxos())
            .zip(assigned)
            .enumerate()
        {
            let value = utxo.amount.to_sat();
            let message = sighash_message(&mut cache, index, spend, value, context.sighash_type())?;
            let mut satisfier = ContextSatisfier::new(&self.secp, context, message);
            unlocking.push(spend.satisfy(index, utxo.spending_path.as_slice(), &mut satisfier)?);

            log_signing(
                LogLevel::Debug,
                "Signed input",
                Some(json!({
                    "index": index,
                    "kind": spend.kind.name(),
                    "signatures": satisfier.signatures,
                })),
            );
        }

        let mut signed_tx = tx.clone();
        apply(&mut signed_tx, unlocking);
        check_fee_floor(unsigned, &signed_tx)?;

        let signed = SignedTransaction {
            tx: signed_tx,
            fee: unsigned.fee(),
            spent_outputs,
        };

        #[cfg(feature = "verify")]
        signed.verify()?;

        log_signing(
            LogLevel::Info,
            "Signed transaction",
            Some(json!({
                "txid": signed.txid().to_string(),
                "inputs": signed.transaction().input.len(),
                "vsize": signed.vsize(),
            })),
        );
        Ok(signed)
    }

    fn check_timelocks(&self, unsigned: &UnsignedTransaction) -> Result<(), BuildError> {
        let tx = unsigned.transaction();
        let plan = timelock::resolve(
            unsigned
                .spends()
                .iter()
                .zip(unsigned.spent_utxos())
                .map(|(spend, utxo)| (spend, utxo.spending_path.as_slice())),
            tx.version,
        )?;

        let sequences: Vec<_> = tx.input.iter().map(|i| i.sequence).collect();
        if plan.lock_time != tx.lock_time || plan.sequences != sequences {
            return Err(BuildError::TimelockConflict(
                "lock time or sequences differ from what the inputs require".to_string(),
            ));
        }
        Ok(())
    }
}

// The finalizer prices placeholders; the signed size must not outgrow them
fn check_fee_floor(
    unsigned: &UnsignedTransaction,
    signed_tx: &Transaction,
) -> Result<(), BuildError> {
    let required = unsigned.fee_rate().fee_for_transaction(signed_tx);
    if unsigned.fee() < required {
        return Err(BuildError::InvariantViolation(format!(
            "fee {} sat is below the {} sat the signed transaction needs",
            unsigned.fee().to_sat(),
            required.to_sat()
        )));
    }
    Ok(())
}

fn index_contexts(
    contexts: &[SigningContext],
) -> Result<HashMap<bitcoin::OutPoint, &SigningContext>, BuildError> {
    let mut map = HashMap::with_capacity(contexts.len());
    for context in contexts {
        if map.insert(context.outpoint(), context).is_some() {
            return Err(BuildError::InvalidArgument(format!(
                "two signing contexts for {}",
                sanitize_outpoint(&context.outpoint())
            )));
        }
    }
    Ok(map)
}

fn sighash_message(
    cache: &mut SighashCache<&Transaction>,
    index: usize,
    spend: &ResolvedSpend,
    value: u64,
    sighash_type: EcdsaSighashType,
) -> Result<Message, BuildError> {
    let digest = if spend.kind.is_segwit() {
        cache
            .segwit_signature_hash(index, &spend.script_code, value, sighash_type)
            .map_err(|e| sighash_error(index, e))?
            .to_byte_array()
    } else {
        cache
            .legacy_signature_hash(index, &spend.script_code, sighash_type.to_u32())
            .map_err(|e| sighash_error(index, e))?
            .to_byte_array()
    };
    Message::from_slice(&digest).map_err(|e| sighash_error(index, e))
}

fn sighash_error(index: usize, err: impl fmt::Display) -> BuildError {
    BuildError::Sighash {
        index,
        reason: err.to_string(),
    }
}

fn apply(tx: &mut Transaction, unlocking: Vec<(ScriptBuf, Witness)>) {
    for (input, (script_sig, witness)) in tx.input.iter_mut().zip(unlocking) {
        input.script_sig = script_sig;
        input.witness = witness;
    }
}

/// Satisfier signing one input's sighash with a context's keys
struct ContextSatisfier<'a> {
    secp: &'a Secp256k1<All>,
    context: &'a SigningContext,
    message: Message,
    signatures: usize,
}

impl<'a> ContextSatisfier<'a> {
    fn new(secp: &'a Secp256k1<All>, context: &'a SigningContext, message: Message) -> Self {
        Self {
            secp,
            context,
            message,
            signatures: 0,
        }
    }
}

impl Satisfier for ContextSatisfier<'_> {
    fn signature_for(&mut self, key: &PublicKey) -> Result<Option<Vec<u8>>, SatisfyError> {
        let pairs = self.context.key_pairs(self.secp);
        let Some((_, signing_key)) = pairs.iter().find(|(pk, _)| pk == key) else {
            return Ok(None);
        };
        let secret = signing_key
            .secret_key()
            .ok_or_else(|| SatisfyError::Signing("invalid secret key".to_string()))?;

        let sig = ecdsa::Signature {
            sig: self.secp.sign_ecdsa_low_r(&self.message, &secret),
            hash_ty: self.context.sighash_type(),
        };
        self.signatures += 1;
        Ok(Some(sig.to_vec()))
    }

    fn key_for_hash(&self, hash: &PubkeyHash) -> Option<PublicKey> {
        self.context
            .key_pairs(self.secp)
            .into_iter()
            .map(|(pk, _)| pk)
            .find(|pk| pk.pubkey_hash() == *hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finalizer::Finalizer;
    use bitcoin::hashes::Hash;
    use bitcoin::secp256k1::SecretKey;
    use bitcoin::{Amount, Network, OutPoint, PrivateKey, Txid};
    use coinsmith_common::fee::FeeRate;
    use coinsmith_common::types::DesiredOutput;
    use coinsmith_common::utxo_selection::Utxo;
    use rust_decimal_macros::dec;

    fn private_key(n: u8) -> PrivateKey {
        PrivateKey::new(SecretKey::from_slice(&[n; 32]).unwrap(), Network::Regtest)
    }

    fn p2wpkh(n: u8) -> ScriptBuf {
        let secp = Secp256k1::signing_only();
        let hash = private_key(n).public_key(&secp).wpubkey_hash().unwrap();
        ScriptBuf::new_v0_p2wpkh(&hash)
    }

    fn unsigned() -> UnsignedTransaction {
        let utxo = Utxo::new(
            OutPoint::new(Txid::from_byte_array([1; 32]), 0),
            Amount::from_sat(100_000),
            p2wpkh(1),
        );
        let outputs = [DesiredOutput::new(p2wpkh(50), Amount::from_sat(50_000))];
        Finalizer::new(FeeRate::sat_per_vbyte(dec!(1)).unwrap(), p2wpkh(99))
            .finalize(&[utxo], &outputs)
            .unwrap()
    }

    fn contexts() -> Vec<SigningContext> {
        vec![SigningContext::new(
            OutPoint::new(Txid::from_byte_array([1; 32]), 0),
            &[private_key(1)],
        )]
    }

    #[test]
    fn test_signed_fee_meets_rate() {
        let unsigned = unsigned();
        let signed = Signer::new().sign(&unsigned, &contexts()).unwrap();
        assert!(signed.fee() >= unsigned.fee_rate().fee_for_transaction(signed.transaction()));
    }

    #[test]
    fn test_fee_below_rate_rejected() {
        let mut unsigned = unsigned();
        unsigned.fee_rate = FeeRate::sat_per_vbyte(dec!(10)).unwrap();

        let err = Signer::new().sign(&unsigned, &contexts()).unwrap_err();
        assert!(matches!(err, BuildError::InvariantViolation(ref m) if m.starts_with("fee ")));
    }
}
