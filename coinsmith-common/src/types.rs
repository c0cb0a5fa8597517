//! Common data types for the Coinsmith engine
//!
//! These types are shared between the coin selector and the key-handling
//! core. Apart from [`SensitiveBytes`], none of them carry secret material,
//! so they can be logged (after sanitizing) and serialized freely.

use bitcoin::{Amount, ScriptBuf, TxOut};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroize;

/// A payment the caller wants the transaction to make
///
/// Immutable once constructed. The engine never reorders desired outputs;
/// the change output, when present, is appended after them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredOutput {
    /// Destination locking script
    pub script_pubkey: ScriptBuf,

    /// Value to send
    #[serde(with = "bitcoin::amount::serde::as_sat")]
    pub value: Amount,
}

impl DesiredOutput {
    /// Create a new desired output
    pub fn new(script_pubkey: ScriptBuf, value: Amount) -> Self {
        Self {
            script_pubkey,
            value,
        }
    }

    /// Convert into a consensus transaction output
    pub fn to_txout(&self) -> TxOut {
        TxOut {
            value: self.value.to_sat(),
            script_pubkey: self.script_pubkey.clone(),
        }
    }
}

/// Sum the values of a list of desired outputs
///
/// Returns `None` if the sum overflows.
pub fn total_output_value(outputs: &[DesiredOutput]) -> Option<Amount> {
    outputs
        .iter()
        .try_fold(Amount::ZERO, |acc, out| acc.checked_add(out.value))
}

/// Which side of an `OP_IF ... OP_ELSE ... OP_ENDIF` to satisfy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Branch {
    /// Take the `OP_IF` side (selector pushed as `1`)
    If,
    /// Take the `OP_ELSE` side (selector pushed as empty)
    Else,
}

/// Spending-path descriptor for a UTXO
///
/// Scripts without conditionals are spent with [`SpendingPath::Unconditional`].
/// Conditional scripts list one [`Branch`] per conditional met while walking
/// the script from the outside in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SpendingPath {
    /// The script has no conditional branches
    #[default]
    Unconditional,
    /// Branch choices, outermost conditional first
    Branches(Vec<Branch>),
}

impl SpendingPath {
    /// Build a path from branch choices
    pub fn branches(branches: impl Into<Vec<Branch>>) -> Self {
        SpendingPath::Branches(branches.into())
    }

    /// Branch choices in order (empty for unconditional paths)
    pub fn as_slice(&self) -> &[Branch] {
        match self {
            SpendingPath::Unconditional => &[],
            SpendingPath::Branches(branches) => branches,
        }
    }
}

/// Binary data that is zeroed when dropped
///
/// Used by the signing layer to hold private key bytes. Debug and Display
/// output never reveal the content.
#[derive(Zeroize)]
pub struct SensitiveBytes {
    inner: Vec<u8>,
}

impl SensitiveBytes {
    /// Wrap sensitive bytes
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            inner: bytes.into(),
        }
    }

    /// Expose the secret value
    ///
    /// # Security
    ///
    /// The returned slice must not be persisted or logged.
    pub fn expose_secret(&self) -> &[u8] {
        &self.inner
    }

    /// Length of the protected data (does not expose the content)
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the protected data is empty
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// A sanitized representation suitable for logging
    pub fn to_sanitized_string(&self) -> String {
        if self.is_empty() {
            return "[empty]".to_string();
        }
        format!("[{} bytes]", self.len())
    }
}

impl Clone for SensitiveBytes {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl fmt::Debug for SensitiveBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SensitiveBytes([REDACTED], length={})", self.len())
    }
}

impl fmt::Display for SensitiveBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl PartialEq for SensitiveBytes {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}
impl Eq for SensitiveBytes {}

impl From<Vec<u8>> for SensitiveBytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl From<&[u8]> for SensitiveBytes {
    fn from(bytes: &[u8]) -> Self {
        Self::new(bytes.to_vec())
    }
}

impl Drop for SensitiveBytes {
    fn drop(&mut self) {
        self.inner.zeroize();
    }
}
