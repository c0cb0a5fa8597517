//! Random UTXO selection strategy
//!
//! Shuffles the pool uniformly before accumulating. Intended for research
//! and testing only; it makes no attempt at privacy or fee efficiency.

use crate::utxo_selection::strategies::Strategy;
use crate::utxo_selection::types::Utxo;
use rand::seq::SliceRandom;
use rand::RngCore;

/// Strategy that shuffles the pool with the supplied random source
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomStrategy;

impl RandomStrategy {
    /// Create a new RandomStrategy
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for RandomStrategy {
    fn name(&self) -> &'static str {
        "Random"
    }

    fn order(&self, pool: &[Utxo], rng: &mut dyn RngCore) -> Vec<Utxo> {
        let mut shuffled = pool.to_vec();
        shuffled.shuffle(rng);
        shuffled
    }
}
