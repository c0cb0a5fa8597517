//! Script templates the signer knows how to satisfy
//!
//! A [`ScriptTemplate`] is the parsed form of a locking, redeem or witness
//! script. Parsing is strict: the whole script must match one template, and
//! numbers must be minimally encoded, so `parse(t.to_script()) == t` for
//! every template built here.
//!
//! Supported shapes:
//!
//! | template | script |
//! |----------|--------|
//! | `Pk` | `<pubkey> OP_CHECKSIG` |
//! | `Pkh` | `OP_DUP OP_HASH160 <hash160> OP_EQUALVERIFY OP_CHECKSIG` |
//! | `Multisig` | `<m> <pubkey>... <n> OP_CHECKMULTISIG` |
//! | `AbsoluteLock` | `<locktime> OP_CHECKLOCKTIMEVERIFY OP_DROP <then>` |
//! | `RelativeLock` | `<sequence> OP_CHECKSEQUENCEVERIFY OP_DROP <then>` |
//! | `Branch` | `OP_IF <if_true> OP_ELSE <if_false> OP_ENDIF` |

use bitcoin::absolute::LockTime;
use bitcoin::blockdata::opcodes::all::{
    OP_CHECKMULTISIG, OP_CHECKSIG, OP_CLTV, OP_CSV, OP_DROP, OP_DUP, OP_ELSE, OP_ENDIF,
    OP_EQUALVERIFY, OP_HASH160, OP_IF, OP_PUSHNUM_1, OP_PUSHNUM_16,
};
use bitcoin::hashes::Hash;
use bitcoin::script::{Builder, Instruction, PushBytesBuf};
use bitcoin::{PubkeyHash, PublicKey, Script, ScriptBuf, Sequence};
use coinsmith_common::types::Branch;
use std::fmt;
use thiserror::Error;

/// Maximum number of keys in a bare `OP_CHECKMULTISIG`
pub const MAX_MULTISIG_KEYS: usize = 20;

/// Size of the placeholder signature used for fee estimation
///
/// DER signatures are at most 72 bytes including the sighash byte. Low-R
/// signing keeps real ones at 71 or less, so estimates never fall short.
pub const PLACEHOLDER_SIGNATURE_SIZE: usize = 72;

/// Size of the placeholder public key used for fee estimation (compressed)
pub const PLACEHOLDER_PUBKEY_SIZE: usize = 33;

/// A parsed script the signer can satisfy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptTemplate {
    /// Pay to a bare public key
    Pk(PublicKey),
    /// Pay to a public key hash
    Pkh(PubkeyHash),
    /// `threshold`-of-`keys.len()` bare multisig
    Multisig {
        threshold: usize,
        keys: Vec<PublicKey>,
    },
    /// Absolute timelock (`OP_CHECKLOCKTIMEVERIFY`) guarding `then`
    AbsoluteLock {
        lock_time: LockTime,
        then: Box<ScriptTemplate>,
    },
    /// Relative timelock (`OP_CHECKSEQUENCEVERIFY`) guarding `then`
    RelativeLock {
        sequence: Sequence,
        then: Box<ScriptTemplate>,
    },
    /// Two-way conditional
    Branch {
        if_true: Box<ScriptTemplate>,
        if_false: Box<ScriptTemplate>,
    },
}

/// Why a script failed to parse as a template
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("malformed script: {0}")]
    Malformed(String),

    #[error("unexpected trailing data at instruction {0}")]
    TrailingData(usize),

    #[error("unrecognized script shape at instruction {0}")]
    Unrecognized(usize),

    #[error("invalid number: {0}")]
    InvalidNumber(String),

    #[error("invalid public key: {0}")]
    InvalidKey(String),
}

/// Why a template could not be satisfied
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SatisfyError {
    #[error("no key available for {0}")]
    MissingKey(String),

    #[error("multisig threshold not reachable: {available} of {threshold} signatures")]
    ThresholdNotReached { available: usize, threshold: usize },

    #[error("spending path ends before a conditional")]
    MissingBranch,

    #[error("spending path has {0} unused branch choices")]
    UnusedBranches(usize),

    #[error("signing failed: {0}")]
    Signing(String),
}

/// Source of signatures and keys while satisfying a template
pub trait Satisfier {
    /// Serialized signature (DER plus sighash byte) by `key`, if available
    fn signature_for(&mut self, key: &PublicKey) -> Result<Option<Vec<u8>>, SatisfyError>;

    /// Public key whose HASH160 is `hash`, if available
    fn key_for_hash(&self, hash: &PubkeyHash) -> Option<PublicKey>;
}

/// Satisfier producing size-exact placeholders for fee estimation
///
/// Every key "signs" and every hash resolves to the generator point,
/// serialized compressed or uncompressed. Legacy hash-locked keys may be
/// either, so legacy spends price them uncompressed.
#[derive(Debug, Clone, Copy)]
pub struct PlaceholderSatisfier {
    compressed_keys: bool,
}

impl Default for PlaceholderSatisfier {
    fn default() -> Self {
        Self::compressed()
    }
}

impl PlaceholderSatisfier {
    /// Hashes resolve to 33-byte keys
    pub fn compressed() -> Self {
        Self {
            compressed_keys: true,
        }
    }

    /// Hashes resolve to 65-byte keys
    pub fn uncompressed() -> Self {
        Self {
            compressed_keys: false,
        }
    }
}

// Compressed secp256k1 generator point
const PLACEHOLDER_KEY: [u8; PLACEHOLDER_PUBKEY_SIZE] = [
    0x02, 0x79, 0xbe, 0x66, 0x7e, 0xf9, 0xdc, 0xbb, 0xac, 0x55, 0xa0, 0x62, 0x95, 0xce, 0x87,
    0x0b, 0x07, 0x02, 0x9b, 0xfc, 0xdb, 0x2d, 0xce, 0x28, 0xd9, 0x59, 0xf2, 0x81, 0x5b, 0x16,
    0xf8, 0x17, 0x98,
];

impl Satisfier for PlaceholderSatisfier {
    fn signature_for(&mut self, _key: &PublicKey) -> Result<Option<Vec<u8>>, SatisfyError> {
        Ok(Some(vec![0u8; PLACEHOLDER_SIGNATURE_SIZE]))
    }

    fn key_for_hash(&self, _hash: &PubkeyHash) -> Option<PublicKey> {
        let mut key = PublicKey::from_slice(&PLACEHOLDER_KEY).ok()?;
        key.compressed = self.compressed_keys;
        Some(key)
    }
}

impl ScriptTemplate {
    /// Parse a script into a template
    pub fn parse(script: &Script) -> Result<Self, ParseError> {
        let tokens = script
            .instructions()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ParseError::Malformed(e.to_string()))?;

        let (template, pos) = parse_at(&tokens, 0)?;
        if pos != tokens.len() {
            return Err(ParseError::TrailingData(pos));
        }
        Ok(template)
    }

    /// Build the script for this template
    pub fn to_script(&self) -> ScriptBuf {
        self.build(Builder::new()).into_script()
    }

    fn build(&self, builder: Builder) -> Builder {
        match self {
            ScriptTemplate::Pk(key) => builder.push_key(key).push_opcode(OP_CHECKSIG),
            ScriptTemplate::Pkh(hash) => builder
                .push_opcode(OP_DUP)
                .push_opcode(OP_HASH160)
                .push_slice(hash)
                .push_opcode(OP_EQUALVERIFY)
                .push_opcode(OP_CHECKSIG),
            ScriptTemplate::Multisig { threshold, keys } => {
                let mut builder = builder.push_int(*threshold as i64);
                for key in keys {
                    builder = builder.push_key(key);
                }
                builder
                    .push_int(keys.len() as i64)
                    .push_opcode(OP_CHECKMULTISIG)
            }
            ScriptTemplate::AbsoluteLock { lock_time, then } => {
                let builder = builder
                    .push_int(i64::from(lock_time.to_consensus_u32()))
                    .push_opcode(OP_CLTV)
                    .push_opcode(OP_DROP);
                then.build(builder)
            }
            ScriptTemplate::RelativeLock { sequence, then } => {
                let builder = builder
                    .push_int(i64::from(sequence.to_consensus_u32()))
                    .push_opcode(OP_CSV)
                    .push_opcode(OP_DROP);
                then.build(builder)
            }
            ScriptTemplate::Branch { if_true, if_false } => {
                let builder = if_true.build(builder.push_opcode(OP_IF));
                if_false
                    .build(builder.push_opcode(OP_ELSE))
                    .push_opcode(OP_ENDIF)
            }
        }
    }

    /// Absolute locks that apply when spending along `path`
    pub fn absolute_locks(&self, path: &[Branch]) -> Vec<LockTime> {
        let mut locks = Vec::new();
        self.walk(path, &mut |t| {
            if let ScriptTemplate::AbsoluteLock { lock_time, .. } = t {
                locks.push(*lock_time);
            }
        });
        locks
    }

    /// Relative locks that apply when spending along `path`
    pub fn relative_locks(&self, path: &[Branch]) -> Vec<Sequence> {
        let mut locks = Vec::new();
        self.walk(path, &mut |t| {
            if let ScriptTemplate::RelativeLock { sequence, .. } = t {
                locks.push(*sequence);
            }
        });
        locks
    }

    // Visit every template node on the chosen path; a short path stops the walk
    fn walk(&self, path: &[Branch], visit: &mut dyn FnMut(&ScriptTemplate)) {
        visit(self);
        match self {
            ScriptTemplate::AbsoluteLock { then, .. }
            | ScriptTemplate::RelativeLock { then, .. } => then.walk(path, visit),
            ScriptTemplate::Branch { if_true, if_false } => match path.split_first() {
                Some((Branch::If, rest)) => if_true.walk(rest, visit),
                Some((Branch::Else, rest)) => if_false.walk(rest, visit),
                None => {}
            },
            _ => {}
        }
    }

    /// Produce the satisfying stack, bottom element first
    ///
    /// Branch selectors are pushed after the inner satisfaction so that each
    /// `OP_IF` finds its selector on top of the stack.
    pub fn satisfy(
        &self,
        path: &[Branch],
        satisfier: &mut dyn Satisfier,
    ) -> Result<Vec<Vec<u8>>, SatisfyError> {
        let mut stack = Vec::new();
        let rest = self.satisfy_into(path, satisfier, &mut stack)?;
        if !rest.is_empty() {
            return Err(SatisfyError::UnusedBranches(rest.len()));
        }
        Ok(stack)
    }

    fn satisfy_into<'p>(
        &self,
        path: &'p [Branch],
        satisfier: &mut dyn Satisfier,
        stack: &mut Vec<Vec<u8>>,
    ) -> Result<&'p [Branch], SatisfyError> {
        match self {
            ScriptTemplate::Pk(key) => {
                let sig = satisfier
                    .signature_for(key)?
                    .ok_or_else(|| SatisfyError::MissingKey(format!("public key {}", key)))?;
                stack.push(sig);
                Ok(path)
            }
            ScriptTemplate::Pkh(hash) => {
                let key = satisfier
                    .key_for_hash(hash)
                    .ok_or_else(|| SatisfyError::MissingKey(format!("key hash {}", hash)))?;
                let sig = satisfier
                    .signature_for(&key)?
                    .ok_or_else(|| SatisfyError::MissingKey(format!("public key {}", key)))?;
                stack.push(sig);
                stack.push(key.to_bytes());
                Ok(path)
            }
            ScriptTemplate::Multisig { threshold, keys } => {
                let mut sigs = Vec::with_capacity(*threshold);
                for key in keys {
                    if sigs.len() == *threshold {
                        break;
                    }
                    if let Some(sig) = satisfier.signature_for(key)? {
                        sigs.push(sig);
                    }
                }
                if sigs.len() < *threshold {
                    return Err(SatisfyError::ThresholdNotReached {
                        available: sigs.len(),
                        threshold: *threshold,
                    });
                }
                // OP_CHECKMULTISIG pops one extra element, which must be empty
                stack.push(Vec::new());
                stack.extend(sigs);
                Ok(path)
            }
            ScriptTemplate::AbsoluteLock { then, .. }
            | ScriptTemplate::RelativeLock { then, .. } => {
                then.satisfy_into(path, satisfier, stack)
            }
            ScriptTemplate::Branch { if_true, if_false } => {
                let (choice, rest) = path.split_first().ok_or(SatisfyError::MissingBranch)?;
                let (inner, selector) = match choice {
                    Branch::If => (if_true, vec![1u8]),
                    Branch::Else => (if_false, Vec::new()),
                };
                let rest = inner.satisfy_into(rest, satisfier, stack)?;
                stack.push(selector);
                Ok(rest)
            }
        }
    }
}

impl fmt::Display for ScriptTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptTemplate::Pk(_) => write!(f, "pk"),
            ScriptTemplate::Pkh(_) => write!(f, "pkh"),
            ScriptTemplate::Multisig { threshold, keys } => {
                write!(f, "multi({}-of-{})", threshold, keys.len())
            }
            ScriptTemplate::AbsoluteLock { lock_time, then } => {
                write!(f, "after({}, {})", lock_time, then)
            }
            ScriptTemplate::RelativeLock { sequence, then } => {
                write!(f, "older({}, {})", sequence.to_consensus_u32(), then)
            }
            ScriptTemplate::Branch { if_true, if_false } => {
                write!(f, "or({}, {})", if_true, if_false)
            }
        }
    }
}

fn parse_at(tokens: &[Instruction<'_>], pos: usize) -> Result<(ScriptTemplate, usize), ParseError> {
    match tokens.get(pos) {
        Some(Instruction::Op(op)) if *op == OP_DUP => parse_pkh(tokens, pos),
        Some(Instruction::Op(op)) if *op == OP_IF => parse_branch(tokens, pos),
        Some(Instruction::PushBytes(bytes))
            if matches!(bytes.len(), 33 | 65) && is_op(tokens.get(pos + 1), OP_CHECKSIG.to_u8()) =>
        {
            let key = PublicKey::from_slice(bytes.as_bytes())
                .map_err(|e| ParseError::InvalidKey(e.to_string()))?;
            Ok((ScriptTemplate::Pk(key), pos + 2))
        }
        Some(_) if is_op(tokens.get(pos + 1), OP_CLTV.to_u8()) => {
            let value = read_number(&tokens[pos])?;
            let value = u32::try_from(value)
                .map_err(|_| ParseError::InvalidNumber(format!("lock time {}", value)))?;
            expect_op(tokens, pos + 2, OP_DROP.to_u8())?;
            let (then, next) = parse_at(tokens, pos + 3)?;
            Ok((
                ScriptTemplate::AbsoluteLock {
                    lock_time: LockTime::from_consensus(value),
                    then: Box::new(then),
                },
                next,
            ))
        }
        Some(_) if is_op(tokens.get(pos + 1), OP_CSV.to_u8()) => {
            let value = read_number(&tokens[pos])?;
            let value = u32::try_from(value)
                .map_err(|_| ParseError::InvalidNumber(format!("sequence {}", value)))?;
            let sequence = Sequence::from_consensus(value);
            if !sequence.is_relative_lock_time() {
                return Err(ParseError::InvalidNumber(format!(
                    "sequence {:#x} disables relative locks",
                    value
                )));
            }
            expect_op(tokens, pos + 2, OP_DROP.to_u8())?;
            let (then, next) = parse_at(tokens, pos + 3)?;
            Ok((
                ScriptTemplate::RelativeLock {
                    sequence,
                    then: Box::new(then),
                },
                next,
            ))
        }
        Some(_) => parse_multisig(tokens, pos),
        None => Err(ParseError::Unrecognized(pos)),
    }
}

fn parse_pkh(
    tokens: &[Instruction<'_>],
    pos: usize,
) -> Result<(ScriptTemplate, usize), ParseError> {
    expect_op(tokens, pos + 1, OP_HASH160.to_u8())?;
    let hash = match tokens.get(pos + 2) {
        Some(Instruction::PushBytes(bytes)) if bytes.len() == 20 => {
            PubkeyHash::from_slice(bytes.as_bytes())
                .map_err(|e| ParseError::Malformed(e.to_string()))?
        }
        _ => return Err(ParseError::Unrecognized(pos + 2)),
    };
    expect_op(tokens, pos + 3, OP_EQUALVERIFY.to_u8())?;
    expect_op(tokens, pos + 4, OP_CHECKSIG.to_u8())?;
    Ok((ScriptTemplate::Pkh(hash), pos + 5))
}

fn parse_branch(
    tokens: &[Instruction<'_>],
    pos: usize,
) -> Result<(ScriptTemplate, usize), ParseError> {
    let (if_true, next) = parse_at(tokens, pos + 1)?;
    expect_op(tokens, next, OP_ELSE.to_u8())?;
    let (if_false, next) = parse_at(tokens, next + 1)?;
    expect_op(tokens, next, OP_ENDIF.to_u8())?;
    Ok((
        ScriptTemplate::Branch {
            if_true: Box::new(if_true),
            if_false: Box::new(if_false),
        },
        next + 1,
    ))
}

fn parse_multisig(
    tokens: &[Instruction<'_>],
    pos: usize,
) -> Result<(ScriptTemplate, usize), ParseError> {
    let threshold = multisig_number(tokens, pos)?;

    let mut keys = Vec::new();
    let mut cursor = pos + 1;
    while let Some(Instruction::PushBytes(bytes)) = tokens.get(cursor) {
        // Counts above 16 are one or two byte data pushes
        if bytes.len() <= 2 {
            break;
        }
        if !matches!(bytes.len(), 33 | 65) {
            return Err(ParseError::Unrecognized(cursor));
        }
        let key = PublicKey::from_slice(bytes.as_bytes())
            .map_err(|e| ParseError::InvalidKey(e.to_string()))?;
        keys.push(key);
        cursor += 1;
    }

    let count = multisig_number(tokens, cursor)?;
    expect_op(tokens, cursor + 1, OP_CHECKMULTISIG.to_u8())?;

    if count != keys.len() || threshold == 0 || threshold > count || count > MAX_MULTISIG_KEYS {
        return Err(ParseError::InvalidNumber(format!(
            "{}-of-{} multisig with {} keys",
            threshold,
            count,
            keys.len()
        )));
    }

    Ok((ScriptTemplate::Multisig { threshold, keys }, cursor + 2))
}

// Threshold or key count: OP_1..OP_16 or a minimal number push
fn multisig_number(tokens: &[Instruction<'_>], pos: usize) -> Result<usize, ParseError> {
    let token = tokens.get(pos).ok_or(ParseError::Unrecognized(pos))?;
    if let Instruction::PushBytes(bytes) = token {
        if bytes.len() > 2 {
            return Err(ParseError::Unrecognized(pos));
        }
    }
    let value = read_number(token).map_err(|_| ParseError::Unrecognized(pos))?;
    usize::try_from(value)
        .map_err(|_| ParseError::InvalidNumber(format!("multisig count {}", value)))
}

fn is_op(token: Option<&Instruction<'_>>, expected: u8) -> bool {
    matches!(token, Some(Instruction::Op(op)) if op.to_u8() == expected)
}

fn expect_op(tokens: &[Instruction<'_>], pos: usize, expected: u8) -> Result<(), ParseError> {
    if is_op(tokens.get(pos), expected) {
        Ok(())
    } else {
        Err(ParseError::Unrecognized(pos))
    }
}

/// Decode a script number operand (up to 5 bytes, as CLTV and CSV allow)
fn read_number(token: &Instruction<'_>) -> Result<i64, ParseError> {
    match token {
        Instruction::Op(op) => {
            let code = op.to_u8();
            if (OP_PUSHNUM_1.to_u8()..=OP_PUSHNUM_16.to_u8()).contains(&code) {
                Ok(i64::from(code - OP_PUSHNUM_1.to_u8() + 1))
            } else {
                Err(ParseError::InvalidNumber(format!("opcode {:?}", op)))
            }
        }
        Instruction::PushBytes(bytes) => decode_script_num(bytes.as_bytes()),
    }
}

/// Decode a minimally encoded script number of at most 5 bytes
pub fn decode_script_num(bytes: &[u8]) -> Result<i64, ParseError> {
    if bytes.is_empty() {
        return Ok(0);
    }
    if bytes.len() > 5 {
        return Err(ParseError::InvalidNumber(format!(
            "{} byte number",
            bytes.len()
        )));
    }

    let last = bytes[bytes.len() - 1];
    // Minimal encoding: the top byte may only be 0x00/0x80 to carry the sign
    if last & 0x7f == 0 && (bytes.len() == 1 || bytes[bytes.len() - 2] & 0x80 == 0) {
        return Err(ParseError::InvalidNumber(format!(
            "non-minimal encoding {}",
            hex::encode(bytes)
        )));
    }

    let mut value: i64 = 0;
    for (i, byte) in bytes.iter().enumerate() {
        value |= i64::from(*byte) << (8 * i);
    }
    if last & 0x80 != 0 {
        let magnitude = value & !(0x80_i64 << (8 * (bytes.len() - 1)));
        Ok(-magnitude)
    } else {
        Ok(value)
    }
}

/// Push a stack element into a script, using small-number opcodes where a
/// minimal push requires them
pub fn push_element(builder: Builder, element: &[u8]) -> Result<Builder, PushError> {
    match element {
        [n @ 1..=16] => Ok(builder.push_int(i64::from(*n))),
        _ => {
            let data = PushBytesBuf::try_from(element.to_vec())
                .map_err(|_| PushError(element.len()))?;
            Ok(builder.push_slice(data))
        }
    }
}

/// A stack element too large to push
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("cannot push {0} bytes")]
pub struct PushError(pub usize);

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::secp256k1::{Secp256k1, SecretKey};

    fn key(n: u8) -> PublicKey {
        let secp = Secp256k1::signing_only();
        let sk = SecretKey::from_slice(&[n; 32]).unwrap();
        PublicKey::new(sk.public_key(&secp))
    }

    fn round_trip(template: ScriptTemplate) {
        let script = template.to_script();
        assert_eq!(ScriptTemplate::parse(&script), Ok(template));
    }

    #[test]
    fn test_simple_templates_round_trip() {
        round_trip(ScriptTemplate::Pk(key(1)));
        round_trip(ScriptTemplate::Pkh(key(1).pubkey_hash()));
        round_trip(ScriptTemplate::Multisig {
            threshold: 2,
            keys: vec![key(1), key(2), key(3)],
        });
    }

    #[test]
    fn test_wide_multisig_round_trips() {
        let keys: Vec<_> = (1..=MAX_MULTISIG_KEYS as u8).map(key).collect();
        round_trip(ScriptTemplate::Multisig {
            threshold: 17,
            keys: keys.clone(),
        });
        round_trip(ScriptTemplate::Multisig {
            threshold: 1,
            keys: keys[..17].to_vec(),
        });
    }

    #[test]
    fn test_multisig_over_key_limit_rejected() {
        let template = ScriptTemplate::Multisig {
            threshold: 1,
            keys: (1..=21).map(key).collect(),
        };
        assert!(matches!(
            ScriptTemplate::parse(&template.to_script()),
            Err(ParseError::InvalidNumber(_))
        ));
    }

    #[test]
    fn test_timelocked_branch_round_trips() {
        round_trip(ScriptTemplate::Branch {
            if_true: Box::new(ScriptTemplate::Pk(key(1))),
            if_false: Box::new(ScriptTemplate::AbsoluteLock {
                lock_time: LockTime::from_height(700_000).unwrap(),
                then: Box::new(ScriptTemplate::RelativeLock {
                    sequence: Sequence::from_height(144),
                    then: Box::new(ScriptTemplate::Pkh(key(2).pubkey_hash())),
                }),
            }),
        });
    }

    #[test]
    fn test_p2pkh_script_parses_as_pkh() {
        let hash = key(4).pubkey_hash();
        let script = ScriptBuf::new_p2pkh(&hash);
        assert_eq!(ScriptTemplate::parse(&script), Ok(ScriptTemplate::Pkh(hash)));
    }

    #[test]
    fn test_unknown_shapes_rejected() {
        assert!(ScriptTemplate::parse(&ScriptBuf::from(vec![0x6a, 0x01, 0x01])).is_err());
        let mut bytes = ScriptTemplate::Pk(key(1)).to_script().into_bytes();
        bytes.push(OP_DROP.to_u8());
        assert_eq!(
            ScriptTemplate::parse(&ScriptBuf::from(bytes)),
            Err(ParseError::TrailingData(2))
        );
    }

    #[test]
    fn test_decode_script_num() {
        assert_eq!(decode_script_num(&[]), Ok(0));
        assert_eq!(decode_script_num(&[0xe8, 0x03]), Ok(1000));
        assert_eq!(decode_script_num(&[0x81]), Ok(-1));
        assert_eq!(
            decode_script_num(&[0x00, 0x65, 0xcd, 0x1d]),
            Ok(500_000_000)
        );
        assert_eq!(
            decode_script_num(&[0xff, 0xff, 0xff, 0xff, 0x00]),
            Ok(0xffff_ffff)
        );
        assert!(decode_script_num(&[0x01, 0x00]).is_err());
        assert!(decode_script_num(&[0x00]).is_err());
    }

    #[test]
    fn test_branch_satisfaction_order() {
        let template = ScriptTemplate::Branch {
            if_true: Box::new(ScriptTemplate::Pk(key(1))),
            if_false: Box::new(ScriptTemplate::Pk(key(2))),
        };
        let stack = template
            .satisfy(&[Branch::Else], &mut PlaceholderSatisfier::default())
            .unwrap();
        assert_eq!(stack.len(), 2);
        assert_eq!(stack[0].len(), PLACEHOLDER_SIGNATURE_SIZE);
        assert!(stack[1].is_empty());

        assert_eq!(
            template.satisfy(&[], &mut PlaceholderSatisfier::default()),
            Err(SatisfyError::MissingBranch)
        );
        assert_eq!(
            template.satisfy(&[Branch::If, Branch::If], &mut PlaceholderSatisfier::default()),
            Err(SatisfyError::UnusedBranches(1))
        );
    }

    #[test]
    fn test_locks_follow_path() {
        let template = ScriptTemplate::Branch {
            if_true: Box::new(ScriptTemplate::AbsoluteLock {
                lock_time: LockTime::from_height(100).unwrap(),
                then: Box::new(ScriptTemplate::Pk(key(1))),
            }),
            if_false: Box::new(ScriptTemplate::RelativeLock {
                sequence: Sequence::from_height(10),
                then: Box::new(ScriptTemplate::Pk(key(2))),
            }),
        };
        assert_eq!(template.absolute_locks(&[Branch::If]).len(), 1);
        assert!(template.relative_locks(&[Branch::If]).is_empty());
        assert!(template.absolute_locks(&[Branch::Else]).is_empty());
        assert_eq!(
            template.relative_locks(&[Branch::Else]),
            vec![Sequence::from_height(10)]
        );
    }

    #[test]
    fn test_multisig_placeholder_has_dummy_element() {
        let template = ScriptTemplate::Multisig {
            threshold: 2,
            keys: vec![key(1), key(2), key(3)],
        };
        let stack = template.satisfy(&[], &mut PlaceholderSatisfier::default()).unwrap();
        assert_eq!(stack.len(), 3);
        assert!(stack[0].is_empty());
    }
}
