//! Size estimation utilities
//!
//! The coin selector needs a cheap per-input size before any transaction
//! exists. These helpers give that approximation; the finalizer later prices
//! the real assembled transaction, so small errors here are tolerated.

use crate::utxo_selection::types::Utxo;

/// Fixed per-input overhead: outpoint (32 + 4), sequence (4) and a one-byte
/// script length placeholder
pub const INPUT_OVERHEAD: usize = 41;

/// Assumed unlocking script size when the UTXO carries no script hints
/// (a typical P2PKH signature plus compressed public key)
pub const DEFAULT_SCRIPT_SIG_SIZE: usize = 107;

/// Approximate serialized size of the input that spends `utxo`
///
/// Uses the redeem script length if present, otherwise the witness script
/// length, otherwise [`DEFAULT_SCRIPT_SIG_SIZE`].
pub fn approximate_utxo_size(utxo: &Utxo) -> usize {
    let script_size = if let Some(redeem) = &utxo.redeem_script {
        redeem.len()
    } else if let Some(witness) = &utxo.witness_script {
        witness.len()
    } else {
        DEFAULT_SCRIPT_SIG_SIZE
    };

    INPUT_OVERHEAD + script_size
}
