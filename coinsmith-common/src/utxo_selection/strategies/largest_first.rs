//! LargestFirst UTXO selection strategy
//!
//! Offers the largest UTXOs first, which minimizes the number of inputs and
//! therefore the fee. The trade-off is that the wallet's largest holdings
//! show up in its transactions.

use crate::utxo_selection::strategies::Strategy;
use crate::utxo_selection::types::Utxo;
use rand::RngCore;

/// Strategy for minimizing input count by selecting larger UTXOs first
#[derive(Debug, Clone, Copy, Default)]
pub struct LargestFirstStrategy;

impl LargestFirstStrategy {
    /// Create a new LargestFirstStrategy
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for LargestFirstStrategy {
    fn name(&self) -> &'static str {
        "LargestFirst"
    }

    fn order(&self, pool: &[Utxo], _rng: &mut dyn RngCore) -> Vec<Utxo> {
        let mut sorted = pool.to_vec();
        // Stable sort keeps caller order among equal values
        sorted.sort_by(|a, b| b.amount.cmp(&a.amount));
        sorted
    }
}
