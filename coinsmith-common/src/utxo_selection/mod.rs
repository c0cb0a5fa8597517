//! UTXO selection
//!
//! Chooses which unspent outputs fund a payment. Every strategy is a pure
//! function of the pool, the desired outputs, the fee rate and (for
//! [`SelectionStrategy::Random`]) an injected random source.
//!
//! # Module Structure
//!
//! - `types.rs` - `Utxo`, `SelectionStrategy`, `Selection`, `SelectionError`
//! - `selector.rs` - `UtxoSelector`, which maps a strategy to its implementation
//! - `strategies/` - the ordering rules and the shared accumulator
//!   - `base.rs` - the accumulator
//!   - `random.rs`, `largest_first.rs`, `smallest_first.rs`, `standard.rs`
//!
//! # Security Considerations
//!
//! - No key material passes through this module
//! - Which UTXOs are chosen together is visible on chain; see each
//!   strategy's privacy notes

pub mod selector;
pub mod strategies;
pub mod types;

pub use selector::UtxoSelector;
pub use strategies::base::accumulate;
pub use strategies::Strategy;
pub use types::{Selection, SelectionError, SelectionStrategy, Utxo};
