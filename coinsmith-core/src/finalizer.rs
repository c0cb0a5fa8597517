//! Transaction finalization
//!
//! The finalizer turns selected UTXOs and desired outputs into an
//! [`UnsignedTransaction`] with an exact fee. Fees are priced against the real
//! serialized size of the transaction, with size-exact placeholder unlocking
//! data in every input, once without and once with a change output.

use crate::error::BuildError;
use crate::invariant::{enforce, ConservationOfValue, TransactionInvariant};
use crate::spend::{ResolvedSpend, SpendKind};
use crate::timelock::{self, TimelockPlan, RELATIVE_LOCK_VERSION};
use crate::transaction::UnsignedTransaction;
use bitcoin::{Amount, OutPoint, ScriptBuf, Transaction, TxIn, TxOut, Witness};
use coinsmith_common::fee::{dust_threshold, FeeRate, DEFAULT_DUST_RELAY_FEE};
use coinsmith_common::logging::{log_transaction, LogLevel};
use coinsmith_common::types::{total_output_value, DesiredOutput};
use coinsmith_common::utxo_selection::Utxo;
use serde_json::json;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Builds unsigned transactions with change and exact fees
#[derive(Clone)]
pub struct Finalizer {
    fee_rate: FeeRate,
    change_script: ScriptBuf,
    dust_relay_fee: u64,
    version: i32,
    invariant: Arc<dyn TransactionInvariant>,
}

impl fmt::Debug for Finalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Finalizer")
            .field("fee_rate", &self.fee_rate)
            .field("change_script", &self.change_script)
            .field("dust_relay_fee", &self.dust_relay_fee)
            .field("version", &self.version)
            .field("invariant", &self.invariant.name())
            .finish()
    }
}

impl Finalizer {
    /// Create a finalizer paying change to `change_script`
    pub fn new(fee_rate: FeeRate, change_script: ScriptBuf) -> Self {
        Self {
            fee_rate,
            change_script,
            dust_relay_fee: DEFAULT_DUST_RELAY_FEE,
            version: RELATIVE_LOCK_VERSION,
            invariant: Arc::new(ConservationOfValue),
        }
    }

    /// Dust relay fee in sat/kvB used for the change dust threshold
    pub fn with_dust_relay_fee(mut self, dust_relay_fee: u64) -> Self {
        self.dust_relay_fee = dust_relay_fee;
        self
    }

    pub fn with_version(mut self, version: i32) -> Self {
        self.version = version;
        self
    }

    /// Extra invariant run after the conservation check
    pub fn with_invariant(mut self, invariant: Arc<dyn TransactionInvariant>) -> Self {
        self.invariant = invariant;
        self
    }

    pub fn fee_rate(&self) -> FeeRate {
        self.fee_rate
    }

    pub fn change_script(&self) -> &ScriptBuf {
        &self.change_script
    }

    pub fn invariant(&self) -> Arc<dyn TransactionInvariant> {
        Arc::clone(&self.invariant)
    }

    /// Dust threshold of the change script
    pub fn change_dust_threshold(&self) -> Amount {
        dust_threshold(&self.change_script, self.dust_relay_fee)
    }

    /// Finalize `utxos` paying `outputs`
    ///
    /// # Errors
    /// * `InvalidArgument` - no inputs, no outputs, duplicate inputs, or
    ///   output values that overflow
    /// * `UnsupportedScriptType` - an input script is not a known template
    /// * `TimelockConflict` - the inputs' locks cannot hold together
    /// * `InsufficientFunds` - inputs do not cover outputs plus fee
    /// * `InvariantViolation` - the assembled transaction fails a check
    pub fn finalize(
        &self,
        utxos: &[Utxo],
        outputs: &[DesiredOutput],
    ) -> Result<UnsignedTransaction, BuildError> {
        check_arguments(utxos, outputs)?;

        let spends = utxos
            .iter()
            .enumerate()
            .map(|(index, utxo)| SpendKind::resolve(index, utxo))
            .collect::<Result<Vec<_>, _>>()?;
        let plan = timelock::resolve(
            spends
                .iter()
                .zip(utxos)
                .map(|(spend, utxo)| (spend, utxo.spending_path.as_slice())),
            self.version,
        )?;

        let total_in = utxos
            .iter()
            .try_fold(Amount::ZERO, |acc, u| acc.checked_add(u.amount))
            .ok_or_else(|| BuildError::InvalidArgument("input values overflow".to_string()))?;
        let total_out = total_output_value(outputs)
            .ok_or_else(|| BuildError::InvalidArgument("output values overflow".to_string()))?;

        let mut tx = self.assemble(utxos, outputs, &plan);
        let mut priced = tx.clone();
        fill_placeholders(&mut priced, utxos, &spends)?;

        let fee_without_change = self.fee_rate.fee_for_transaction(&priced);
        priced.output.push(TxOut {
            value: 0,
            script_pubkey: self.change_script.clone(),
        });
        let fee_with_change = self.fee_rate.fee_for_transaction(&priced);

        let required = total_out
            .checked_add(fee_without_change)
            .ok_or_else(|| BuildError::InvalidArgument("fee overflows".to_string()))?;
        if total_in < required {
            return Err(BuildError::InsufficientFunds {
                available: total_in,
                required: total_out,
                fee: fee_without_change,
            });
        }

        let threshold = self.change_dust_threshold();
        let change = total_in
            .checked_sub(total_out)
            .and_then(|excess| excess.checked_sub(fee_with_change))
            .filter(|change| *change >= threshold);

        let (fee, change_index) = match change {
            Some(change) => {
                tx.output.push(TxOut {
                    value: change.to_sat(),
                    script_pubkey: self.change_script.clone(),
                });
                (fee_with_change, Some(tx.output.len() - 1))
            }
            // Sub-dust change goes to the fee
            None => (total_in - total_out, None),
        };

        let spent_outputs: Vec<TxOut> = utxos.iter().map(Utxo::txout).collect();
        enforce(&ConservationOfValue, &tx, &spent_outputs, fee)?;
        enforce(self.invariant.as_ref(), &tx, &spent_outputs, fee)?;

        log_transaction(
            LogLevel::Info,
            "Finalized transaction",
            Some(json!({
                "inputs": tx.input.len(),
                "outputs": tx.output.len(),
                "fee": fee.to_sat(),
                "fee_rate": self.fee_rate.to_string(),
                "change": change.map(|c| c.to_sat()).unwrap_or(0),
                "lock_time": plan.lock_time.to_consensus_u32(),
            })),
        );
        if change.is_none() && fee > fee_without_change {
            log_transaction(
                LogLevel::Debug,
                "Change below dust threshold added to fee",
                Some(json!({
                    "excess": (fee - fee_without_change).to_sat(),
                    "dust_threshold": threshold.to_sat(),
                })),
            );
        }

        Ok(UnsignedTransaction {
            tx,
            spent: utxos.to_vec(),
            spends,
            fee,
            change_index,
            fee_rate: self.fee_rate,
        })
    }

    fn assemble(
        &self,
        utxos: &[Utxo],
        outputs: &[DesiredOutput],
        plan: &TimelockPlan,
    ) -> Transaction {
        Transaction {
            version: self.version,
            lock_time: plan.lock_time,
            input: utxos
                .iter()
                .zip(&plan.sequences)
                .map(|(utxo, sequence)| TxIn {
                    previous_output: utxo.outpoint,
                    script_sig: ScriptBuf::new(),
                    sequence: *sequence,
                    witness: Witness::new(),
                })
                .collect(),
            output: outputs.iter().map(DesiredOutput::to_txout).collect(),
        }
    }
}

fn check_arguments(utxos: &[Utxo], outputs: &[DesiredOutput]) -> Result<(), BuildError> {
    if utxos.is_empty() {
        return Err(BuildError::InvalidArgument("no inputs to spend".to_string()));
    }
    if outputs.is_empty() {
        return Err(BuildError::InvalidArgument("no outputs to pay".to_string()));
    }

    let mut seen: HashSet<OutPoint> = HashSet::with_capacity(utxos.len());
    for utxo in utxos {
        if !seen.insert(utxo.outpoint) {
            return Err(BuildError::InvalidArgument(format!(
                "input {} spent twice",
                utxo.outpoint
            )));
        }
    }
    Ok(())
}

fn fill_placeholders(
    tx: &mut Transaction,
    utxos: &[Utxo],
    spends: &[ResolvedSpend],
) -> Result<(), BuildError> {
    let inputs = tx.input.iter_mut().zip(utxos).zip(spends);
    for (index, ((input, utxo), spend)) in inputs.enumerate() {
        let (script_sig, witness) = spend.placeholder(index, utxo.spending_path.as_slice())?;
        input.script_sig = script_sig;
        input.witness = witness;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::hashes::Hash;
    use bitcoin::secp256k1::{Secp256k1, SecretKey};
    use bitcoin::{PublicKey, Txid};
    use rust_decimal_macros::dec;

    fn key(n: u8) -> PublicKey {
        let secp = Secp256k1::signing_only();
        PublicKey::new(SecretKey::from_slice(&[n; 32]).unwrap().public_key(&secp))
    }

    fn p2wpkh(n: u8) -> ScriptBuf {
        ScriptBuf::new_v0_p2wpkh(&key(n).wpubkey_hash().unwrap())
    }

    fn utxo(n: u8, sats: u64) -> Utxo {
        Utxo::new(
            OutPoint::new(Txid::from_byte_array([n; 32]), 0),
            Amount::from_sat(sats),
            p2wpkh(n),
        )
    }

    fn pay(sats: u64) -> Vec<DesiredOutput> {
        vec![DesiredOutput::new(p2wpkh(50), Amount::from_sat(sats))]
    }

    fn finalizer() -> Finalizer {
        Finalizer::new(FeeRate::sat_per_vbyte(dec!(1)).unwrap(), p2wpkh(99))
    }

    #[test]
    fn test_change_added() {
        let unsigned = finalizer()
            .finalize(&[utxo(1, 100_000)], &pay(50_000))
            .unwrap();

        assert_eq!(unsigned.change_index(), Some(1));
        assert_eq!(
            unsigned.change_value() + unsigned.fee() + Amount::from_sat(50_000),
            Amount::from_sat(100_000)
        );
        // 1 P2WPKH input, 2 P2WPKH outputs
        assert_eq!(unsigned.fee(), Amount::from_sat(141));
    }

    #[test]
    fn test_dust_change_goes_to_fee() {
        // 110 sat without change; change would be well under 294
        let unsigned = finalizer()
            .finalize(&[utxo(1, 50_300)], &pay(50_000))
            .unwrap();

        assert_eq!(unsigned.change_index(), None);
        assert_eq!(unsigned.fee(), Amount::from_sat(300));
        assert_eq!(unsigned.transaction().output.len(), 1);
    }

    #[test]
    fn test_insufficient_funds() {
        let err = finalizer()
            .finalize(&[utxo(1, 50_050)], &pay(50_000))
            .unwrap_err();
        assert!(matches!(
            err,
            BuildError::InsufficientFunds { available, .. } if available == Amount::from_sat(50_050)
        ));
    }

    #[test]
    fn test_rejects_duplicates_and_empty() {
        let out = [DesiredOutput::new(p2wpkh(50), Amount::from_sat(1_000))];
        assert!(matches!(finalizer().finalize(&[], &out), Err(BuildError::InvalidArgument(_))));
        assert!(matches!(
            finalizer().finalize(&[utxo(1, 10_000)], &[]),
            Err(BuildError::InvalidArgument(_))
        ));
        assert!(matches!(
            finalizer().finalize(&[utxo(1, 10_000), utxo(1, 10_000)], &out),
            Err(BuildError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_unsigned_inputs_are_empty() {
        let unsigned = finalizer()
            .finalize(&[utxo(1, 100_000)], &pay(50_000))
            .unwrap();
        let tx = unsigned.transaction();
        assert_eq!(tx.version, 2);
        assert!(tx.input.iter().all(|i| i.script_sig.is_empty() && i.witness.is_empty()));
        assert!(unsigned.to_psbt().is_ok());
    }
}
