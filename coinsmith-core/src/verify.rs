//! Script verification through libbitcoinconsensus

use crate::error::BuildError;
use bitcoin::bitcoinconsensus::VERIFY_ALL;
use bitcoin::consensus::encode::serialize;
use bitcoin::{Amount, Transaction, TxOut};

/// Verify every input of `tx` against the output it spends
///
/// Uses every consensus flag libbitcoinconsensus exposes (P2SH, DERSIG,
/// NULLDUMMY, CLTV, CSV and WITNESS). Policy-only rules such as LOW_S and
/// MINIMALIF are not checked. The first failing input is reported.
pub fn verify_transaction(tx: &Transaction, spent: &[TxOut]) -> Result<(), BuildError> {
    if spent.len() != tx.input.len() {
        return Err(BuildError::InvalidArgument(format!(
            "{} inputs but {} spent outputs",
            tx.input.len(),
            spent.len()
        )));
    }

    let bytes = serialize(tx);
    for (index, prevout) in spent.iter().enumerate() {
        prevout
            .script_pubkey
            .verify_with_flags(index, Amount::from_sat(prevout.value), &bytes, VERIFY_ALL)
            .map_err(|e| BuildError::Verification {
                index,
                reason: e.to_string(),
            })?;
    }
    log::debug!("Verified {} inputs of {}", spent.len(), tx.txid());
    Ok(())
}
