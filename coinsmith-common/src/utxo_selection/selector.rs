//! Main UTXO selector implementation
//!
//! `UtxoSelector` maps a [`SelectionStrategy`] onto its strategy struct and
//! runs it. It holds a fee rate and nothing else, so one selector can be
//! shared freely between threads.
//!
//! # Usage
//!
//! ```
//! use coinsmith_common::fee::FeeRate;
//! use coinsmith_common::types::DesiredOutput;
//! use coinsmith_common::utxo_selection::{SelectionStrategy, Utxo, UtxoSelector};
//! use bitcoin::hashes::Hash;
//! use bitcoin::{Amount, OutPoint, PubkeyHash, ScriptBuf, Txid};
//! use rust_decimal_macros::dec;
//!
//! let script = ScriptBuf::new_p2pkh(&PubkeyHash::all_zeros());
//! let pool = vec![
//!     Utxo::new(OutPoint::new(Txid::all_zeros(), 0), Amount::from_sat(20_000), script.clone()),
//!     Utxo::new(OutPoint::new(Txid::all_zeros(), 1), Amount::from_sat(80_000), script.clone()),
//! ];
//! let outputs = vec![DesiredOutput::new(script, Amount::from_sat(50_000))];
//!
//! let selector = UtxoSelector::with_fee_rate(FeeRate::sat_per_vbyte(dec!(2)).unwrap());
//! let selection = selector
//!     .select_utxos(&pool, &outputs, SelectionStrategy::LargestFirst)
//!     .unwrap();
//!
//! assert_eq!(selection.len(), 1);
//! assert_eq!(selection.total_value, Amount::from_sat(80_000));
//! ```

use crate::fee::FeeRate;
use crate::logging::{self, sanitize_outpoint, LogLevel};
use crate::types::DesiredOutput;
use crate::utxo_selection::strategies::{
    LargestFirstStrategy, RandomStrategy, SmallestFirstStrategy, StandardAccumulateStrategy,
    Strategy,
};
use crate::utxo_selection::types::{Selection, SelectionError, SelectionStrategy, Utxo};
use rand::RngCore;
use serde_json::json;

/// UTXO selector that dispatches to the strategy implementations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtxoSelector {
    /// Fee rate applied to approximate input sizes
    fee_rate: FeeRate,
}

impl Default for UtxoSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl UtxoSelector {
    /// Create a selector with a zero fee rate
    pub fn new() -> Self {
        Self {
            fee_rate: FeeRate::ZERO,
        }
    }

    /// Create a selector with the given fee rate
    pub fn with_fee_rate(fee_rate: FeeRate) -> Self {
        Self { fee_rate }
    }

    /// The fee rate this selector applies
    pub fn fee_rate(&self) -> FeeRate {
        self.fee_rate
    }

    /// Select UTXOs, drawing randomness from the thread-local generator
    ///
    /// # Arguments
    /// * `pool` - Available UTXOs, in caller order
    /// * `outputs` - Desired payment outputs
    /// * `strategy` - Selection strategy to use
    pub fn select_utxos(
        &self,
        pool: &[Utxo],
        outputs: &[DesiredOutput],
        strategy: SelectionStrategy,
    ) -> Result<Selection, SelectionError> {
        let mut rng = rand::rng();
        self.select_utxos_with_rng(pool, outputs, strategy, &mut rng)
    }

    /// Select UTXOs with a caller-supplied random source
    ///
    /// Only [`SelectionStrategy::Random`] consumes randomness; a seeded
    /// generator makes it reproducible.
    pub fn select_utxos_with_rng(
        &self,
        pool: &[Utxo],
        outputs: &[DesiredOutput],
        strategy: SelectionStrategy,
        rng: &mut dyn RngCore,
    ) -> Result<Selection, SelectionError> {
        logging::log_selection(
            LogLevel::Debug,
            "selection_started",
            Some(json!({
                "strategy": strategy.as_str(),
                "pool_size": pool.len(),
                "outputs": outputs.len(),
                "fee_rate": self.fee_rate.to_string(),
            })),
        );

        let result = match strategy {
            SelectionStrategy::Random => {
                RandomStrategy::new().select(pool, outputs, self.fee_rate, rng)
            }
            SelectionStrategy::LargestFirst => {
                LargestFirstStrategy::new().select(pool, outputs, self.fee_rate, rng)
            }
            SelectionStrategy::SmallestFirst => {
                SmallestFirstStrategy::new().select(pool, outputs, self.fee_rate, rng)
            }
            SelectionStrategy::StandardAccumulate => {
                StandardAccumulateStrategy::new().select(pool, outputs, self.fee_rate, rng)
            }
        };

        match &result {
            Ok(selection) => {
                let chosen: Vec<String> = selection
                    .selected
                    .iter()
                    .map(|u| sanitize_outpoint(&u.outpoint))
                    .collect();
                logging::log_selection(
                    LogLevel::Info,
                    "selection_completed",
                    Some(json!({
                        "strategy": strategy.as_str(),
                        "inputs": chosen,
                        "total_value": selection.total_value.to_sat(),
                        "target": selection.target.to_sat(),
                    })),
                );
            }
            Err(SelectionError::InsufficientFunds {
                available,
                required,
                fee,
            }) => {
                logging::log_selection(
                    LogLevel::Warn,
                    "selection_failed",
                    Some(json!({
                        "strategy": strategy.as_str(),
                        "available": available.to_sat(),
                        "required": required.to_sat(),
                        "fee": fee.to_sat(),
                    })),
                );
            }
        }

        result
    }
}
