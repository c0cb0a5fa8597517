//! Core types for UTXO selection
//!
//! # Key Types
//!
//! - [`Utxo`]: a spendable output plus the script metadata needed to spend it
//! - [`SelectionStrategy`]: the closed set of selection strategies
//! - [`Selection`]: the successful result of a selection run
//! - [`SelectionError`]: the only failure the selector can report
//!
//! # Example
//!
//! ```
//! use coinsmith_common::utxo_selection::types::Utxo;
//! use bitcoin::hashes::Hash;
//! use bitcoin::{Amount, OutPoint, PubkeyHash, ScriptBuf, Txid};
//!
//! let utxo = Utxo::new(
//!     OutPoint::new(Txid::all_zeros(), 0),
//!     Amount::from_sat(10_000),
//!     ScriptBuf::new_p2pkh(&PubkeyHash::all_zeros()),
//! )
//! .with_label("Savings".to_string());
//!
//! assert_eq!(utxo.amount, Amount::from_sat(10_000));
//! assert!(utxo.redeem_script.is_none());
//! ```
//!
//! # Security Considerations
//!
//! - The `Utxo` type never contains private keys
//! - Selection results reveal which outputs the wallet links together;
//!   strategies document their privacy trade-offs

use crate::types::SpendingPath;
use bitcoin::{Amount, OutPoint, ScriptBuf, TxOut};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Unspent transaction output (UTXO) with spending metadata
///
/// # Fields
///
/// * `outpoint` - Reference to the transaction output (txid and vout)
/// * `amount` - Value locked in this output
/// * `script_pubkey` - Locking script of the output
/// * `redeem_script` - Redeem script for P2SH-wrapped outputs
/// * `witness_script` - Witness script for P2WSH outputs
/// * `spending_path` - Which conditional branches to satisfy
/// * `label` - Optional user-defined label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    /// Reference to the transaction output (txid and vout)
    pub outpoint: OutPoint,

    /// Value of this UTXO
    #[serde(with = "bitcoin::amount::serde::as_sat")]
    pub amount: Amount,

    /// Locking script
    pub script_pubkey: ScriptBuf,

    /// Redeem script, when the locking script is P2SH
    #[serde(default)]
    pub redeem_script: Option<ScriptBuf>,

    /// Witness script, when the output (or the redeem script) is P2WSH
    #[serde(default)]
    pub witness_script: Option<ScriptBuf>,

    /// Spending-path descriptor for conditional scripts
    #[serde(default)]
    pub spending_path: SpendingPath,

    /// Optional label for display
    #[serde(default)]
    pub label: Option<String>,
}

impl Utxo {
    /// Create a new UTXO with no redeem or witness script
    ///
    /// # Arguments
    /// * `outpoint` - The transaction outpoint (txid and vout)
    /// * `amount` - The value in this UTXO
    /// * `script_pubkey` - The locking script of the output
    pub fn new(outpoint: OutPoint, amount: Amount, script_pubkey: ScriptBuf) -> Self {
        Self {
            outpoint,
            amount,
            script_pubkey,
            redeem_script: None,
            witness_script: None,
            spending_path: SpendingPath::Unconditional,
            label: None,
        }
    }

    /// Attach a redeem script (P2SH)
    pub fn with_redeem_script(mut self, script: ScriptBuf) -> Self {
        self.redeem_script = Some(script);
        self
    }

    /// Attach a witness script (P2WSH, native or nested)
    pub fn with_witness_script(mut self, script: ScriptBuf) -> Self {
        self.witness_script = Some(script);
        self
    }

    /// Set the spending path used to satisfy conditional scripts
    pub fn with_spending_path(mut self, path: SpendingPath) -> Self {
        self.spending_path = path;
        self
    }

    /// Add label information to this UTXO
    pub fn with_label(mut self, label: String) -> Self {
        self.label = Some(label);
        self
    }

    /// The output being spent, as it appears on chain
    pub fn txout(&self) -> TxOut {
        TxOut {
            value: self.amount.to_sat(),
            script_pubkey: self.script_pubkey.clone(),
        }
    }
}

/// UTXO selection strategies
///
/// Every strategy reorders the pool and then runs the shared accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategy {
    /// Shuffle uniformly, then accumulate
    ///
    /// For research and testing only: it gives no privacy or fee-efficiency
    /// guarantee and must not be used in production wallets.
    Random,

    /// Largest values first
    ///
    /// Minimizes the input count, which keeps fees low when rates are high,
    /// but reveals the wallet's largest holdings.
    LargestFirst,

    /// Smallest values first, skipping inputs that cost more than they add
    ///
    /// Consolidates small outputs while fees are cheap. Links many small
    /// UTXOs to one transaction, which is a privacy cost the caller accepts.
    SmallestFirst,

    /// Caller-supplied order, no sorting
    StandardAccumulate,
}

impl SelectionStrategy {
    /// All strategies, in declaration order
    pub const ALL: [SelectionStrategy; 4] = [
        SelectionStrategy::Random,
        SelectionStrategy::LargestFirst,
        SelectionStrategy::SmallestFirst,
        SelectionStrategy::StandardAccumulate,
    ];

    /// Stable identifier used in configuration and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionStrategy::Random => "random",
            SelectionStrategy::LargestFirst => "largest_first",
            SelectionStrategy::SmallestFirst => "smallest_first",
            SelectionStrategy::StandardAccumulate => "standard_accumulate",
        }
    }
}

impl fmt::Display for SelectionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SelectionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "random" => Ok(SelectionStrategy::Random),
            "largest_first" => Ok(SelectionStrategy::LargestFirst),
            "smallest_first" => Ok(SelectionStrategy::SmallestFirst),
            "standard_accumulate" => Ok(SelectionStrategy::StandardAccumulate),
            other => Err(format!("Unknown selection strategy: {}", other)),
        }
    }
}

/// Result of a successful selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Chosen UTXOs, in the order the strategy accepted them
    pub selected: Vec<Utxo>,
    /// Sum of the chosen values
    pub total_value: Amount,
    /// Sum of the desired output values
    pub target: Amount,
    /// Approximate size of the chosen inputs
    pub approximate_bytes: usize,
    /// Fee over `approximate_bytes` at the requested rate (unrounded)
    pub approximate_fee: Decimal,
}

impl Selection {
    /// Number of chosen UTXOs
    pub fn len(&self) -> usize {
        self.selected.len()
    }

    /// Whether nothing was chosen
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Value left over once the target and approximate fee are paid
    pub fn approximate_excess(&self) -> Decimal {
        Decimal::from(self.total_value.to_sat())
            - Decimal::from(self.target.to_sat())
            - self.approximate_fee
    }

    /// Consume the selection, returning the chosen UTXOs
    pub fn into_utxos(self) -> Vec<Utxo> {
        self.selected
    }
}

/// Errors raised by the coin selector
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectionError {
    /// The pool cannot cover the outputs plus the fee
    #[error("Insufficient funds: accumulated {available}, required {required} plus fee {fee}")]
    InsufficientFunds {
        /// Value accumulated before the pool ran out
        available: Amount,
        /// Sum of the desired outputs
        required: Amount,
        /// Fee over the accumulated inputs, rounded up
        fee: Amount,
    },
}
