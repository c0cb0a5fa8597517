//! Coinsmith Core
//!
//! Transaction finalization and signing. This is the only crate in the
//! workspace that handles private keys.
//!
//! # Modules
//!
//! - `script`: script templates, parsing and satisfaction
//! - `spend`: spend kinds (legacy, P2SH, segwit v0 and their nestings)
//! - `timelock`: lock time and sequence resolution
//! - `invariant`: checks run on every assembled transaction
//! - `finalizer`: change, dust and exact fee computation
//! - `signer`: sighash computation and ECDSA signing
//! - `builder`: selector, finalizer and signer as one pipeline
//!
//! # Example
//!
//! ```no_run
//! use bitcoin::{Amount, ScriptBuf};
//! use coinsmith_common::{DesiredOutput, FeeRate, Utxo};
//! use coinsmith_core::{SigningContext, TransactionBuilder};
//! use rust_decimal::Decimal;
//!
//! # fn run(pool: Vec<Utxo>, contexts: Vec<SigningContext>, change: ScriptBuf, dest: ScriptBuf)
//! #     -> Result<(), coinsmith_core::BuildError> {
//! let fee_rate = FeeRate::sat_per_vbyte(Decimal::from(2)).expect("non-negative rate");
//! let builder = TransactionBuilder::new(fee_rate, change);
//! let outputs = [DesiredOutput::new(dest, Amount::from_sat(50_000))];
//!
//! let signed = builder.build_and_sign(&pool, &outputs, &contexts, &mut rand::rng())?;
//! println!("{}", signed.serialize_hex());
//! # Ok(())
//! # }
//! ```

/// Errors raised by the finalizer and signer
pub mod error;

/// Script templates
pub mod script;

/// Spend kinds
pub mod spend;

/// Timelock resolution
pub mod timelock;

/// Signing contexts holding key material
pub mod context;

/// Transaction invariants
pub mod invariant;

/// Unsigned and signed transaction types
pub mod transaction;

/// Transaction finalizer
pub mod finalizer;

/// Transaction signer
pub mod signer;

/// Script verification
#[cfg(feature = "verify")]
pub mod verify;

/// End-to-end pipeline
pub mod builder;

pub use builder::TransactionBuilder;
pub use context::SigningContext;
pub use error::BuildError;
pub use finalizer::Finalizer;
pub use invariant::{ConservationOfValue, NoDustOutputs, TransactionInvariant};
pub use script::{ScriptTemplate, Satisfier};
pub use signer::Signer;
pub use spend::{ResolvedSpend, SpendKind};
pub use transaction::{SignedTransaction, UnsignedTransaction};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
