//! Standardized error handling for Coinsmith
//!
//! Each component reports its own `thiserror` enum ([`SelectionError`],
//! [`FeeRateError`], and `BuildError` in `coinsmith-core`). Callers that want a
//! single type convert into [`CoinsmithError`], which carries a category and a
//! user-facing message that never includes key material.
//!
//! # Usage
//!
//! ```
//! use coinsmith_common::error::{CoinsmithError, CoinsmithResult, ErrorContext};
//!
//! fn read_pool(path: &str) -> CoinsmithResult<String> {
//!     let content = std::fs::read_to_string(path).context("Failed to read UTXO pool")?;
//!     Ok(content)
//! }
//!
//! let err = read_pool("/definitely/not/here.json").unwrap_err();
//! assert_eq!(err.category().as_str(), "Io");
//! ```

use crate::fee::FeeRateError;
use crate::utxo_selection::types::SelectionError;
use std::error::Error as StdError;
use std::fmt;
use std::io;
use thiserror::Error;

/// Boxed error source
pub type BoxedSource = Box<dyn StdError + Send + Sync>;

/// The umbrella error type for the engine
#[derive(Debug, Error)]
pub enum CoinsmithError {
    /// Coin selection failed
    #[error("Selection error: {0}")]
    Selection(#[from] SelectionError),

    /// A fee rate could not be constructed
    #[error("Fee rate error: {0}")]
    FeeRate(#[from] FeeRateError),

    /// Finalization or transaction assembly failed
    #[error("Transaction error: {context}")]
    Transaction {
        context: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// Signing failed (message never carries key material)
    #[error("Signing error: {context}")]
    Signing {
        context: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// Configuration errors
    #[error("Configuration error: {context}")]
    Config {
        context: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// I/O errors
    #[error("I/O error: {context}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {context}")]
    Serialization {
        context: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// Unexpected errors that don't fit other categories
    #[error("Unexpected error: {context}")]
    Unexpected {
        context: String,
        #[source]
        source: Option<BoxedSource>,
    },
}

/// Type alias for a Result with CoinsmithError
pub type CoinsmithResult<T> = Result<T, CoinsmithError>;

/// Extension trait for adding context to error types
pub trait ErrorContext<T> {
    /// Replace the error's context with `context`, keeping its source
    fn context(self, context: impl Into<String>) -> CoinsmithResult<T>;
}

impl<T, E: Into<CoinsmithError>> ErrorContext<T> for Result<T, E> {
    fn context(self, context: impl Into<String>) -> CoinsmithResult<T> {
        self.map_err(|err| err.into().with_context(context))
    }
}

impl CoinsmithError {
    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        CoinsmithError::Validation(message.into())
    }

    /// Create a transaction error with context and source
    pub fn transaction<S, E>(context: S, source: E) -> Self
    where
        S: Into<String>,
        E: StdError + Send + Sync + 'static,
    {
        CoinsmithError::Transaction {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a signing error with context and source
    pub fn signing<S, E>(context: S, source: E) -> Self
    where
        S: Into<String>,
        E: StdError + Send + Sync + 'static,
    {
        CoinsmithError::Signing {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a configuration error without a source
    pub fn config<S: Into<String>>(context: S) -> Self {
        CoinsmithError::Config {
            context: context.into(),
            source: None,
        }
    }

    fn with_context(self, context: impl Into<String>) -> Self {
        let context = context.into();
        match self {
            CoinsmithError::Transaction { source, .. } => {
                CoinsmithError::Transaction { context, source }
            }
            CoinsmithError::Signing { source, .. } => CoinsmithError::Signing { context, source },
            CoinsmithError::Config { source, .. } => CoinsmithError::Config { context, source },
            CoinsmithError::Io { source, .. } => CoinsmithError::Io { context, source },
            CoinsmithError::Serialization { source, .. } => {
                CoinsmithError::Serialization { context, source }
            }
            CoinsmithError::Unexpected { source, .. } => {
                CoinsmithError::Unexpected { context, source }
            }
            // Variants without a context field keep their own message as the source
            other => CoinsmithError::Unexpected {
                context,
                source: Some(Box::new(other)),
            },
        }
    }

    /// Get the category of this error for logging
    pub fn category(&self) -> ErrorCategory {
        match self {
            CoinsmithError::Selection(_) => ErrorCategory::Selection,
            CoinsmithError::FeeRate(_) => ErrorCategory::Validation,
            CoinsmithError::Transaction { .. } => ErrorCategory::Transaction,
            CoinsmithError::Signing { .. } => ErrorCategory::Signing,
            CoinsmithError::Config { .. } => ErrorCategory::Config,
            CoinsmithError::Validation(_) => ErrorCategory::Validation,
            CoinsmithError::Io { .. } => ErrorCategory::Io,
            CoinsmithError::Serialization { .. } => ErrorCategory::Serialization,
            CoinsmithError::Unexpected { .. } => ErrorCategory::Unexpected,
        }
    }

    /// Get a sanitized message suitable for displaying to users
    pub fn user_message(&self) -> String {
        match self {
            CoinsmithError::Selection(SelectionError::InsufficientFunds {
                available,
                required,
                fee,
            }) => format!(
                "Insufficient funds: {} sat available, {} sat needed plus {} sat fee",
                available.to_sat(),
                required.to_sat(),
                fee.to_sat()
            ),
            CoinsmithError::FeeRate(err) => format!("Invalid fee rate: {}", err),
            CoinsmithError::Transaction { context, .. } => {
                format!("Could not build transaction: {}", context)
            }
            CoinsmithError::Signing { .. } => "Could not sign transaction".to_string(),
            CoinsmithError::Config { context, .. } => format!("Configuration error: {}", context),
            CoinsmithError::Validation(message) => format!("Validation error: {}", message),
            CoinsmithError::Io { context, .. } => format!("File operation error: {}", context),
            CoinsmithError::Serialization { context, .. } => {
                format!("Data format error: {}", context)
            }
            CoinsmithError::Unexpected { context, .. } => format!("Unexpected error: {}", context),
        }
    }
}

impl From<io::Error> for CoinsmithError {
    fn from(err: io::Error) -> Self {
        CoinsmithError::Io {
            context: err.to_string(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for CoinsmithError {
    fn from(err: serde_json::Error) -> Self {
        CoinsmithError::Serialization {
            context: format!("JSON serialization error: {}", err),
            source: Some(Box::new(err)),
        }
    }
}

impl From<toml::de::Error> for CoinsmithError {
    fn from(err: toml::de::Error) -> Self {
        CoinsmithError::Serialization {
            context: format!("TOML deserialization error: {}", err),
            source: Some(Box::new(err)),
        }
    }
}

impl From<toml::ser::Error> for CoinsmithError {
    fn from(err: toml::ser::Error) -> Self {
        CoinsmithError::Serialization {
            context: format!("TOML serialization error: {}", err),
            source: Some(Box::new(err)),
        }
    }
}

impl From<bitcoin::consensus::encode::Error> for CoinsmithError {
    fn from(err: bitcoin::consensus::encode::Error) -> Self {
        CoinsmithError::Serialization {
            context: format!("Bitcoin serialization error: {}", err),
            source: Some(Box::new(err)),
        }
    }
}

/// Convert an `anyhow` result (the config layer's error type)
pub fn from_anyhow<T>(
    result: Result<T, anyhow::Error>,
    context: impl Into<String>,
) -> CoinsmithResult<T> {
    result.map_err(|err| CoinsmithError::Config {
        context: context.into(),
        source: Some(Box::new(AnyhowWrapper(err))),
    })
}

#[derive(Debug)]
struct AnyhowWrapper(anyhow::Error);

impl fmt::Display for AnyhowWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#}", self.0)
    }
}

impl StdError for AnyhowWrapper {}

/// Error category for logging purposes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Selection,
    Transaction,
    Signing,
    Config,
    Validation,
    Io,
    Serialization,
    Unexpected,
}

impl ErrorCategory {
    /// String representation of the category
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Selection => "Selection",
            ErrorCategory::Transaction => "Transaction",
            ErrorCategory::Signing => "Signing",
            ErrorCategory::Config => "Config",
            ErrorCategory::Validation => "Validation",
            ErrorCategory::Io => "Io",
            ErrorCategory::Serialization => "Serialization",
            ErrorCategory::Unexpected => "Unexpected",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
