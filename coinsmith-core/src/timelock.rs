//! Lock time and sequence resolution
//!
//! Absolute locks (`OP_CHECKLOCKTIMEVERIFY`) from every input must agree on
//! one unit, block height or Unix time, because the transaction has a single
//! `nLockTime`. The lock time is the largest required value.
//!
//! Relative locks (`OP_CHECKSEQUENCEVERIFY`) are per input and become that
//! input's `nSequence`. Every other input uses `0xFFFFFFFE`, which keeps the
//! lock time enforced without signalling replaceability.

use crate::error::BuildError;
use crate::spend::ResolvedSpend;
use bitcoin::absolute::LockTime;
use bitcoin::Sequence;
use coinsmith_common::types::Branch;

/// Transaction version required for relative locks (BIP 68)
pub const RELATIVE_LOCK_VERSION: i32 = 2;

/// Resolved lock time and per-input sequences
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelockPlan {
    pub lock_time: LockTime,
    pub sequences: Vec<Sequence>,
}

/// Resolve the timelock plan for a set of inputs
///
/// # Arguments
/// * `inputs` - Each input's resolved spend and spending path
/// * `version` - Transaction version the plan will be used with
pub fn resolve<'a, I>(inputs: I, version: i32) -> Result<TimelockPlan, BuildError>
where
    I: IntoIterator<Item = (&'a ResolvedSpend, &'a [Branch])>,
{
    let mut lock_time: Option<LockTime> = None;
    let mut sequences = Vec::new();

    for (index, (spend, path)) in inputs.into_iter().enumerate() {
        let template = spend.kind.template();

        for required in template.absolute_locks(path) {
            lock_time = Some(match lock_time {
                None => required,
                Some(current) => max_lock_time(current, required, index)?,
            });
        }

        let relative = template.relative_locks(path);
        let sequence = match relative.split_first() {
            None => Sequence::ENABLE_LOCKTIME_NO_RBF,
            Some((first, rest)) => {
                if version < RELATIVE_LOCK_VERSION {
                    return Err(BuildError::TimelockConflict(format!(
                        "input {} has a relative lock but transaction version is {}",
                        index, version
                    )));
                }
                rest.iter()
                    .try_fold(*first, |acc, next| max_sequence(acc, *next, index))?
            }
        };
        sequences.push(sequence);
    }

    Ok(TimelockPlan {
        lock_time: lock_time.unwrap_or(LockTime::ZERO),
        sequences,
    })
}

fn max_lock_time(a: LockTime, b: LockTime, index: usize) -> Result<LockTime, BuildError> {
    if a.is_block_height() != b.is_block_height() {
        return Err(BuildError::TimelockConflict(format!(
            "input {} requires lock time {} but another input requires {}; \
             block heights and timestamps cannot be combined",
            index, b, a
        )));
    }
    Ok(if b.to_consensus_u32() > a.to_consensus_u32() { b } else { a })
}

fn max_sequence(a: Sequence, b: Sequence, index: usize) -> Result<Sequence, BuildError> {
    if a.is_height_locked() != b.is_height_locked() {
        return Err(BuildError::TimelockConflict(format!(
            "input {} combines height and time based relative locks",
            index
        )));
    }
    Ok(if b.to_consensus_u32() > a.to_consensus_u32() { b } else { a })
}
