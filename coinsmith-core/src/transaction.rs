//! Unsigned and signed transaction checkpoints

use crate::error::BuildError;
use crate::spend::ResolvedSpend;
use bitcoin::consensus::encode::serialize_hex;
use bitcoin::psbt::PartiallySignedTransaction;
use bitcoin::{Amount, Transaction, TxOut, Txid};
use coinsmith_common::fee::FeeRate;
use coinsmith_common::utxo_selection::Utxo;
use rust_decimal::Decimal;

/// A finalized transaction with empty unlocking data
///
/// This is the checkpoint between finalization and signing. The fee, change
/// output, lock time and sequences are fixed; only unlocking data is missing.
#[derive(Debug, Clone, PartialEq)]
pub struct UnsignedTransaction {
    pub(crate) tx: Transaction,
    pub(crate) spent: Vec<Utxo>,
    pub(crate) spends: Vec<ResolvedSpend>,
    pub(crate) fee: Amount,
    pub(crate) change_index: Option<usize>,
    pub(crate) fee_rate: FeeRate,
}

impl UnsignedTransaction {
    pub fn transaction(&self) -> &Transaction {
        &self.tx
    }

    /// The UTXOs spent, in input order
    pub fn spent_utxos(&self) -> &[Utxo] {
        &self.spent
    }

    /// How each input is spent, in input order
    pub fn spends(&self) -> &[ResolvedSpend] {
        &self.spends
    }

    pub fn fee(&self) -> Amount {
        self.fee
    }

    pub fn fee_rate(&self) -> FeeRate {
        self.fee_rate
    }

    /// Index of the change output, if one was added
    pub fn change_index(&self) -> Option<usize> {
        self.change_index
    }

    /// Value of the change output, zero when there is none
    pub fn change_value(&self) -> Amount {
        self.change_index
            .and_then(|i| self.tx.output.get(i))
            .map(|o| Amount::from_sat(o.value))
            .unwrap_or(Amount::ZERO)
    }

    pub fn txid(&self) -> Txid {
        self.tx.txid()
    }

    /// Spent outputs in input order, as needed by sighash and verification
    pub fn spent_outputs(&self) -> Vec<TxOut> {
        self.spent.iter().map(Utxo::txout).collect()
    }

    /// Export as a PSBT carrying `witness_utxo`, `redeem_script` and
    /// `witness_script` for every input
    pub fn to_psbt(&self) -> Result<PartiallySignedTransaction, BuildError> {
        let mut psbt = PartiallySignedTransaction::from_unsigned_tx(self.tx.clone())
            .map_err(|e| BuildError::InvalidArgument(format!("PSBT export failed: {}", e)))?;

        for ((input, utxo), spend) in psbt.inputs.iter_mut().zip(&self.spent).zip(&self.spends) {
            input.witness_utxo = Some(utxo.txout());
            input.redeem_script = spend.redeem_script.clone();
            input.witness_script = spend.witness_script.clone();
        }
        Ok(psbt)
    }
}

/// A fully signed transaction ready for broadcast
#[derive(Debug, Clone, PartialEq)]
pub struct SignedTransaction {
    pub(crate) tx: Transaction,
    pub(crate) fee: Amount,
    pub(crate) spent_outputs: Vec<TxOut>,
}

impl SignedTransaction {
    pub fn transaction(&self) -> &Transaction {
        &self.tx
    }

    pub fn into_transaction(self) -> Transaction {
        self.tx
    }

    pub fn fee(&self) -> Amount {
        self.fee
    }

    pub fn spent_outputs(&self) -> &[TxOut] {
        &self.spent_outputs
    }

    pub fn txid(&self) -> Txid {
        self.tx.txid()
    }

    /// Consensus serialization as lowercase hex
    pub fn serialize_hex(&self) -> String {
        serialize_hex(&self.tx)
    }

    pub fn size(&self) -> usize {
        self.tx.size()
    }

    pub fn vsize(&self) -> usize {
        self.tx.vsize()
    }

    pub fn weight(&self) -> usize {
        self.tx.weight().to_wu() as usize
    }

    /// Paid fee in sat/vB
    pub fn effective_fee_rate(&self) -> Decimal {
        Decimal::from(self.fee.to_sat()) / Decimal::from(self.tx.vsize().max(1))
    }

    /// Verify every input against the output it spends
    #[cfg(feature = "verify")]
    pub fn verify(&self) -> Result<(), BuildError> {
        crate::verify::verify_transaction(&self.tx, &self.spent_outputs)
    }
}
