//! Transaction invariant checks
//!
//! An invariant runs on the assembled transaction after finalization and again
//! before signing. A failure is reported as [`BuildError::InvariantViolation`].

use crate::error::BuildError;
use bitcoin::{Amount, Transaction, TxOut};
use coinsmith_common::fee::is_dust;

/// A check every emitted transaction must pass
pub trait TransactionInvariant: Send + Sync {
    /// Name used in error messages
    fn name(&self) -> &str;

    /// Check `tx`, which spends `spent` and pays `fee`
    fn check(&self, tx: &Transaction, spent: &[TxOut], fee: Amount) -> Result<(), String>;
}

/// Inputs equal outputs plus fee, without overflow
#[derive(Debug, Clone, Copy, Default)]
pub struct ConservationOfValue;

impl TransactionInvariant for ConservationOfValue {
    fn name(&self) -> &str {
        "conservation of value"
    }

    fn check(&self, tx: &Transaction, spent: &[TxOut], fee: Amount) -> Result<(), String> {
        if spent.len() != tx.input.len() {
            return Err(format!(
                "{} inputs but {} spent outputs",
                tx.input.len(),
                spent.len()
            ));
        }

        let inputs =
            checked_sum(spent.iter().map(|o| o.value)).ok_or("input total overflows")?;
        let outputs =
            checked_sum(tx.output.iter().map(|o| o.value)).ok_or("output total overflows")?;
        let required = outputs
            .checked_add(fee.to_sat())
            .ok_or("outputs plus fee overflow")?;

        if inputs != required {
            return Err(format!(
                "inputs {} sat != outputs {} sat + fee {}",
                inputs, outputs, fee
            ));
        }
        Ok(())
    }
}

/// No output below the dust threshold of its script
#[derive(Debug, Clone, Copy)]
pub struct NoDustOutputs {
    pub dust_relay_fee: u64,
}

impl TransactionInvariant for NoDustOutputs {
    fn name(&self) -> &str {
        "no dust outputs"
    }

    fn check(&self, tx: &Transaction, _spent: &[TxOut], _fee: Amount) -> Result<(), String> {
        match tx
            .output
            .iter()
            .position(|o| is_dust(Amount::from_sat(o.value), &o.script_pubkey, self.dust_relay_fee))
        {
            Some(index) => Err(format!("output {} is dust", index)),
            None => Ok(()),
        }
    }
}

/// Run `invariant` and map a failure to [`BuildError::InvariantViolation`]
pub(crate) fn enforce(
    invariant: &dyn TransactionInvariant,
    tx: &Transaction,
    spent: &[TxOut],
    fee: Amount,
) -> Result<(), BuildError> {
    invariant.check(tx, spent, fee).map_err(|reason| {
        BuildError::InvariantViolation(format!("{}: {}", invariant.name(), reason))
    })
}

fn checked_sum(mut values: impl Iterator<Item = u64>) -> Option<u64> {
    values.try_fold(0u64, |acc, v| acc.checked_add(v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::absolute::LockTime;
    use bitcoin::hashes::Hash;
    use bitcoin::{OutPoint, ScriptBuf, Sequence, TxIn, Txid, WPubkeyHash, Witness};

    fn tx(outputs: &[u64]) -> Transaction {
        Transaction {
            version: 2,
            lock_time: LockTime::ZERO,
            input: vec![TxIn {
                previous_output: OutPoint::new(Txid::all_zeros(), 0),
                script_sig: ScriptBuf::new(),
                sequence: Sequence::ENABLE_LOCKTIME_NO_RBF,
                witness: Witness::new(),
            }],
            output: outputs
                .iter()
                .map(|v| TxOut {
                    value: *v,
                    script_pubkey: ScriptBuf::new_v0_p2wpkh(&WPubkeyHash::all_zeros()),
                })
                .collect(),
        }
    }

    fn spent(value: u64) -> Vec<TxOut> {
        vec![TxOut {
            value,
            script_pubkey: ScriptBuf::new(),
        }]
    }

    #[test]
    fn test_conservation_holds() {
        let outputs = tx(&[6_000, 3_000]);
        let check = ConservationOfValue.check(&outputs, &spent(10_000), Amount::from_sat(1_000));
        assert_eq!(check, Ok(()));
    }

    #[test]
    fn test_conservation_detects_leak() {
        let check =
            ConservationOfValue.check(&tx(&[6_000]), &spent(10_000), Amount::from_sat(1_000));
        assert!(check.is_err());
    }

    #[test]
    fn test_conservation_overflow() {
        let check = ConservationOfValue.check(&tx(&[u64::MAX, 1]), &spent(10_000), Amount::ZERO);
        assert_eq!(check, Err("output total overflows".to_string()));
    }

    #[test]
    fn test_dust_output_rejected() {
        let invariant = NoDustOutputs { dust_relay_fee: 3_000 };
        assert!(invariant.check(&tx(&[294]), &[], Amount::ZERO).is_ok());
        assert_eq!(
            invariant.check(&tx(&[5_000, 293]), &[], Amount::ZERO),
            Err("output 1 is dust".to_string())
        );
    }

    #[test]
    fn test_enforce_names_invariant() {
        let err = enforce(&ConservationOfValue, &tx(&[1]), &spent(2), Amount::ZERO).unwrap_err();
        assert!(matches!(
            err,
            BuildError::InvariantViolation(ref m) if m.starts_with("conservation of value")
        ));
    }
}
