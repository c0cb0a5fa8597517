//! Coinsmith Common Library
//!
//! Shared building blocks for the coin selection and transaction-building
//! engine. This crate never handles private keys; signing lives in
//! `coinsmith-core`.
//!
//! # Modules
//!
//! - `types`: desired outputs, spending paths, sensitive byte storage
//! - `fee`: fee rates, dust thresholds
//! - `math`: input size approximation and weight conversions
//! - `utxo_selection`: the coin selector and its strategies
//! - `error`: the umbrella error type
//! - `logging`: `log`/`env_logger` setup and sanitizing helpers
//! - `config`: TOML engine configuration

/// Core domain types
pub mod types;

/// Fee rates and dust rules
pub mod fee;

/// Size and weight calculations
pub mod math;

/// UTXO selection algorithms
pub mod utxo_selection;

/// Standardized error handling
pub mod error;

/// Logging infrastructure
pub mod logging;

/// Configuration management
pub mod config;

pub use config::EngineConfig;
pub use error::{CoinsmithError, CoinsmithResult, ErrorCategory, ErrorContext};
pub use fee::{dust_threshold, is_dust, FeeRate, FeeRateError, FeeUnit, DEFAULT_DUST_RELAY_FEE};
pub use types::{Branch, DesiredOutput, SensitiveBytes, SpendingPath};
pub use utxo_selection::{Selection, SelectionError, SelectionStrategy, Utxo, UtxoSelector};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
