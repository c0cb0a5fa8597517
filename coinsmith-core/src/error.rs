//! Errors raised while finalizing and signing transactions

use bitcoin::Amount;
use coinsmith_common::error::CoinsmithError;
use coinsmith_common::utxo_selection::SelectionError;
use thiserror::Error;

/// Errors from the finalizer, the signer and the builder pipeline
///
/// Every variant is fatal; nothing is retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// Inputs cannot cover the outputs plus the fee
    #[error("Insufficient funds: inputs {available}, outputs {required} plus fee {fee}")]
    InsufficientFunds {
        available: Amount,
        required: Amount,
        fee: Amount,
    },

    /// A transaction invariant check failed
    #[error("Transaction invariant violated: {0}")]
    InvariantViolation(String),

    /// The signing context for an input cannot satisfy its script
    #[error("Signing mismatch on input {index}: {reason}")]
    SigningMismatch { index: usize, reason: String },

    /// Absolute or relative locks that cannot hold together
    #[error("Timelock conflict: {0}")]
    TimelockConflict(String),

    /// The locking script of an input is not a supported template
    #[error("Unsupported script type on input {index}: {script}")]
    UnsupportedScriptType { index: usize, script: String },

    /// Malformed caller input
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Signature hash computation failed
    #[error("Sighash computation failed on input {index}: {reason}")]
    Sighash { index: usize, reason: String },

    /// Script construction failed
    #[error("Script error: {0}")]
    Script(String),

    /// A signed input failed script verification
    #[error("Verification failed on input {index}: {reason}")]
    Verification { index: usize, reason: String },
}

impl From<SelectionError> for BuildError {
    fn from(err: SelectionError) -> Self {
        match err {
            SelectionError::InsufficientFunds {
                available,
                required,
                fee,
            } => BuildError::InsufficientFunds {
                available,
                required,
                fee,
            },
        }
    }
}

impl From<BuildError> for CoinsmithError {
    fn from(err: BuildError) -> Self {
        match err {
            BuildError::SigningMismatch { index, .. } | BuildError::Verification { index, .. } => {
                CoinsmithError::signing(format!("input {}", index), err)
            }
            BuildError::InvalidArgument(ref message) => CoinsmithError::validation(message.clone()),
            other => CoinsmithError::transaction(other.to_string(), other),
        }
    }
}
