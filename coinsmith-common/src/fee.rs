//! Fee rates and dust rules
//!
//! A [`FeeRate`] is a non-negative number of satoshis charged per size unit.
//! Two units exist:
//!
//! - [`FeeUnit::Byte`]: charged per raw serialized byte (`Transaction::size`)
//! - [`FeeUnit::VByte`]: charged per virtual byte, `ceil(weight / 4)`
//!   (`Transaction::vsize`, BIP 141)
//!
//! The coin selector only ever works with approximate byte counts, which it
//! prices identically for both units. The finalizer prices the assembled
//! transaction with [`FeeRate::fee_for_transaction`], which picks the size
//! measure matching the unit.
//!
//! Fee arithmetic uses `rust_decimal` so fractional rates such as 1.1 sat/vB
//! do not pick up binary floating point error.

use bitcoin::{Amount, Script, Transaction};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Default dust relay fee in sat/kvB (Bitcoin Core `DUST_RELAY_TX_FEE`)
pub const DEFAULT_DUST_RELAY_FEE: u64 = 3_000;

/// Weight units per virtual byte
pub const WITNESS_SCALE_FACTOR: usize = 4;

/// Serialized size of a non-witness input spending a typical P2PKH output
const LEGACY_SPEND_SIZE: usize = 148;

/// Discounted size of a witness input: 32 + 4 + 1 + (107 / 4) + 4
const WITNESS_SPEND_SIZE: usize = 67;

/// Errors related to fee rate construction
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FeeRateError {
    #[error("Fee rate must not be negative: {0}")]
    Negative(Decimal),
}

/// Size unit a fee rate is charged against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeUnit {
    /// Raw serialized byte
    Byte,
    /// Virtual byte (weight / 4)
    VByte,
}

impl fmt::Display for FeeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeeUnit::Byte => write!(f, "sat/B"),
            FeeUnit::VByte => write!(f, "sat/vB"),
        }
    }
}

/// A non-negative fee rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "FeeRateRepr", into = "FeeRateRepr")]
pub struct FeeRate {
    rate: Decimal,
    unit: FeeUnit,
}

#[derive(Serialize, Deserialize)]
struct FeeRateRepr {
    rate: Decimal,
    unit: FeeUnit,
}

impl TryFrom<FeeRateRepr> for FeeRate {
    type Error = FeeRateError;

    fn try_from(repr: FeeRateRepr) -> Result<Self, Self::Error> {
        FeeRate::new(repr.rate, repr.unit)
    }
}

impl From<FeeRate> for FeeRateRepr {
    fn from(rate: FeeRate) -> Self {
        FeeRateRepr {
            rate: rate.rate,
            unit: rate.unit,
        }
    }
}

impl FeeRate {
    /// Zero fee rate (per virtual byte)
    pub const ZERO: FeeRate = FeeRate {
        rate: Decimal::ZERO,
        unit: FeeUnit::VByte,
    };

    /// Create a fee rate in the given unit
    pub fn new(rate: Decimal, unit: FeeUnit) -> Result<Self, FeeRateError> {
        if rate.is_sign_negative() && !rate.is_zero() {
            return Err(FeeRateError::Negative(rate));
        }
        Ok(Self { rate, unit })
    }

    /// Fee rate in satoshis per raw byte
    pub fn sat_per_byte(rate: Decimal) -> Result<Self, FeeRateError> {
        Self::new(rate, FeeUnit::Byte)
    }

    /// Fee rate in satoshis per virtual byte
    pub fn sat_per_vbyte(rate: Decimal) -> Result<Self, FeeRateError> {
        Self::new(rate, FeeUnit::VByte)
    }

    /// Fee rate from satoshis per 1000 weight units
    pub fn from_sat_per_kwu(sat_per_kwu: Decimal) -> Result<Self, FeeRateError> {
        Self::sat_per_vbyte(sat_per_kwu * Decimal::from(WITNESS_SCALE_FACTOR) / Decimal::from(1000))
    }

    /// Fee rate from satoshis per 1000 virtual bytes (Bitcoin Core's unit)
    pub fn from_sat_per_kvb(sat_per_kvb: u64) -> Self {
        Self {
            rate: Decimal::from(sat_per_kvb) / Decimal::from(1000),
            unit: FeeUnit::VByte,
        }
    }

    /// The numeric rate, in [`FeeRate::unit`]s
    pub fn rate(&self) -> Decimal {
        self.rate
    }

    /// The size unit this rate is charged against
    pub fn unit(&self) -> FeeUnit {
        self.unit
    }

    /// Equivalent rate in satoshis per 1000 weight units
    ///
    /// A per-byte rate is treated as per-vbyte here; the two only differ in
    /// which size measure they are applied to.
    pub fn as_sat_per_kwu(&self) -> Decimal {
        self.rate * Decimal::from(1000) / Decimal::from(WITNESS_SCALE_FACTOR)
    }

    /// Exact (unrounded) fee for `size` units
    pub fn fee_for_size(&self, size: usize) -> Decimal {
        self.rate * Decimal::from(size)
    }

    /// Fee for `size` units, rounded up to a whole satoshi
    pub fn fee_amount_for_size(&self, size: usize) -> Amount {
        Amount::from_sat(ceil_to_sat(self.fee_for_size(size)))
    }

    /// The size of `tx` in this rate's unit
    pub fn measure(&self, tx: &Transaction) -> usize {
        match self.unit {
            FeeUnit::Byte => tx.size(),
            FeeUnit::VByte => tx.vsize(),
        }
    }

    /// Fee for a whole transaction, rounded up to a whole satoshi
    pub fn fee_for_transaction(&self, tx: &Transaction) -> Amount {
        self.fee_amount_for_size(self.measure(tx))
    }
}

impl fmt::Display for FeeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.rate, self.unit)
    }
}

/// Round a fractional satoshi amount up to a whole satoshi
pub fn ceil_to_sat(value: Decimal) -> u64 {
    value.ceil().to_u64().unwrap_or(u64::MAX)
}

/// Dust threshold for an output locked by `script_pubkey`
///
/// Follows Bitcoin Core's `GetDustThreshold`: the cost, at the dust relay
/// fee, of creating the output plus later spending it. Unspendable
/// (`OP_RETURN`) outputs have no threshold.
///
/// # Arguments
/// * `script_pubkey` - Locking script of the output
/// * `dust_relay_fee` - Dust relay fee in sat/kvB
pub fn dust_threshold(script_pubkey: &Script, dust_relay_fee: u64) -> Amount {
    if script_pubkey.is_op_return() {
        return Amount::ZERO;
    }

    // value (8) + script length varint + script
    let output_size = 8 + varint_len(script_pubkey.len()) + script_pubkey.len();
    let spend_size = if script_pubkey.is_witness_program() {
        WITNESS_SPEND_SIZE
    } else {
        LEGACY_SPEND_SIZE
    };

    let total = (output_size + spend_size) as u64;
    Amount::from_sat(total * dust_relay_fee / 1000)
}

/// Whether an output value is dust for the given locking script
pub fn is_dust(value: Amount, script_pubkey: &Script, dust_relay_fee: u64) -> bool {
    value < dust_threshold(script_pubkey, dust_relay_fee)
}

/// Length of the compact-size encoding of `n`
pub fn varint_len(n: usize) -> usize {
    match n {
        0..=0xfc => 1,
        0xfd..=0xffff => 3,
        0x10000..=0xffff_ffff => 5,
        _ => 9,
    }
}
