//! SmallestFirst UTXO selection strategy
//!
//! Offers the smallest UTXOs first so low fee periods can be used to
//! consolidate dust. The accumulator skips any UTXO whose spending cost
//! exceeds its value, so only viable small outputs are picked up.
//!
//! Privacy: this links many small UTXOs to one transaction. That is the
//! intended behavior of the strategy.

use crate::utxo_selection::strategies::Strategy;
use crate::utxo_selection::types::Utxo;
use rand::RngCore;

/// Strategy that consolidates small UTXOs first
#[derive(Debug, Clone, Copy, Default)]
pub struct SmallestFirstStrategy;

impl SmallestFirstStrategy {
    /// Create a new SmallestFirstStrategy
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for SmallestFirstStrategy {
    fn name(&self) -> &'static str {
        "SmallestFirst"
    }

    fn order(&self, pool: &[Utxo], _rng: &mut dyn RngCore) -> Vec<Utxo> {
        let mut sorted = pool.to_vec();
        sorted.sort_by(|a, b| a.amount.cmp(&b.amount));
        sorted
    }
}
