//! UTXO selection strategies
//!
//! Each strategy only decides the order in which the pool is offered to the
//! shared accumulator in [`base`]. The accumulator does the rest.

use crate::fee::FeeRate;
use crate::types::DesiredOutput;
use crate::utxo_selection::types::{Selection, SelectionError, Utxo};
use rand::RngCore;

pub mod base;
pub mod largest_first;
pub mod random;
pub mod smallest_first;
pub mod standard;

pub use largest_first::LargestFirstStrategy;
pub use random::RandomStrategy;
pub use smallest_first::SmallestFirstStrategy;
pub use standard::StandardAccumulateStrategy;

/// Trait defining a UTXO selection strategy
pub trait Strategy {
    /// Name of this strategy
    fn name(&self) -> &'static str;

    /// Order the pool for accumulation
    ///
    /// # Arguments
    /// * `pool` - Available UTXOs, in the caller's order
    /// * `rng` - Random source (ignored by deterministic strategies)
    fn order(&self, pool: &[Utxo], rng: &mut dyn RngCore) -> Vec<Utxo>;

    /// Select UTXOs using this strategy
    ///
    /// # Arguments
    /// * `pool` - Available UTXOs
    /// * `outputs` - Desired payment outputs
    /// * `fee_rate` - Fee rate applied to approximate input sizes
    /// * `rng` - Random source (ignored by deterministic strategies)
    fn select(
        &self,
        pool: &[Utxo],
        outputs: &[DesiredOutput],
        fee_rate: FeeRate,
        rng: &mut dyn RngCore,
    ) -> Result<Selection, SelectionError> {
        let ordered = self.order(pool, rng);
        base::accumulate(&ordered, outputs, fee_rate)
    }
}
