//! The accumulator shared by every selection strategy
//!
//! Walks an already ordered pool once, accepting UTXOs until the accepted
//! value strictly exceeds the desired outputs plus the fee over the accepted
//! inputs' approximate size.

use crate::fee::{ceil_to_sat, FeeRate};
use crate::math::approximate_utxo_size;
use crate::types::{total_output_value, DesiredOutput};
use crate::utxo_selection::types::{Selection, SelectionError, Utxo};
use bitcoin::Amount;
use log::{debug, trace};
use rust_decimal::Decimal;

/// Accumulate UTXOs in the given order
///
/// UTXOs whose own spending fee exceeds their value are skipped without
/// touching the running totals. Selection stops as soon as
/// `value > target + fee`; reaching exactly `target + fee` is not enough.
///
/// # Arguments
/// * `ordered` - UTXOs in the order they should be considered
/// * `outputs` - Desired payment outputs
/// * `fee_rate` - Fee rate applied to the approximate input sizes
///
/// # Returns
/// * The accepted UTXOs, or `InsufficientFunds` with the accumulated value,
///   the required value and the fee at the point the pool ran out. Outputs
///   whose sum overflows report `required` as `Amount::max_value()`
pub fn accumulate(
    ordered: &[Utxo],
    outputs: &[DesiredOutput],
    fee_rate: FeeRate,
) -> Result<Selection, SelectionError> {
    let Some(target) = total_output_value(outputs).map(|t| t.to_sat()) else {
        debug!("Selection failed: desired outputs overflow the amount range");
        return Err(SelectionError::InsufficientFunds {
            available: Amount::ZERO,
            required: Amount::max_value(),
            fee: Amount::ZERO,
        });
    };
    let target_dec = Decimal::from(target);

    let mut selected = Vec::new();
    let mut value_so_far: u64 = 0;
    let mut bytes_so_far: usize = 0;
    let mut remaining = ordered.iter();

    loop {
        let fee = fee_rate.fee_for_size(bytes_so_far);

        if Decimal::from(value_so_far) > target_dec + fee {
            debug!(
                "Selection complete: {} inputs, value {} sat, target {} sat, fee {} sat",
                selected.len(),
                value_so_far,
                target,
                fee
            );
            return Ok(Selection {
                selected,
                total_value: Amount::from_sat(value_so_far),
                target: Amount::from_sat(target),
                approximate_bytes: bytes_so_far,
                approximate_fee: fee,
            });
        }

        let utxo = match remaining.next() {
            Some(utxo) => utxo,
            None => {
                debug!(
                    "Selection failed: accumulated {} sat, required {} sat plus fee {}",
                    value_so_far, target, fee
                );
                return Err(SelectionError::InsufficientFunds {
                    available: Amount::from_sat(value_so_far),
                    required: Amount::from_sat(target),
                    fee: Amount::from_sat(ceil_to_sat(fee)),
                });
            }
        };

        if is_uneconomical(utxo, fee_rate) {
            trace!(
                "Skipping uneconomical UTXO {}: value {} sat below spend cost",
                utxo.outpoint,
                utxo.amount.to_sat()
            );
            continue;
        }

        value_so_far = value_so_far.saturating_add(utxo.amount.to_sat());
        bytes_so_far += approximate_utxo_size(utxo);
        selected.push(utxo.clone());
    }
}

/// Whether a UTXO costs more to spend than it is worth at `fee_rate`
pub fn is_uneconomical(utxo: &Utxo, fee_rate: FeeRate) -> bool {
    fee_rate.fee_for_size(approximate_utxo_size(utxo)) > Decimal::from(utxo.amount.to_sat())
}
