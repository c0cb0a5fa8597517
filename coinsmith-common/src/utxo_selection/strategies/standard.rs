//! StandardAccumulate UTXO selection strategy
//!
//! Uses the pool exactly as the caller ordered it.

use crate::utxo_selection::strategies::Strategy;
use crate::utxo_selection::types::Utxo;
use rand::RngCore;

/// Strategy that accumulates in caller order
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardAccumulateStrategy;

impl StandardAccumulateStrategy {
    /// Create a new StandardAccumulateStrategy
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for StandardAccumulateStrategy {
    fn name(&self) -> &'static str {
        "StandardAccumulate"
    }

    fn order(&self, pool: &[Utxo], _rng: &mut dyn RngCore) -> Vec<Utxo> {
        pool.to_vec()
    }
}
