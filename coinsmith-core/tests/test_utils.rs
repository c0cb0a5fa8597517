//! Shared fixtures for coinsmith-core integration tests

#![allow(dead_code)]

use bitcoin::absolute::LockTime;
use bitcoin::secp256k1::{Secp256k1, SecretKey};
use bitcoin::{Amount, Network, OutPoint, PrivateKey, PublicKey, ScriptBuf, Sequence, Txid};
use coinsmith_common::fee::FeeRate;
use coinsmith_common::logging::{self, LogConfig, LogLevel};
use coinsmith_common::types::DesiredOutput;
use coinsmith_common::utxo_selection::Utxo;
use coinsmith_core::{Finalizer, ScriptTemplate, SigningContext};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Once;

static GLOBAL_TEST_INIT: Once = Once::new();

/// Initialize logging once per test binary
pub fn init_test_environment() {
    GLOBAL_TEST_INIT.call_once(|| {
        let config = LogConfig {
            level: LogLevel::Error,
            log_file: None,
            include_timestamps: false,
            include_source_location: false,
            json_format: false,
        };
        let _ = logging::init(&config);
    });
}

/// Deterministic private key `n` (compressed, regtest)
pub fn private_key(n: u8) -> PrivateKey {
    PrivateKey::new(
        SecretKey::from_slice(&[n; 32]).expect("valid secret key"),
        Network::Regtest,
    )
}

/// Public key of [`private_key`]
pub fn public_key(n: u8) -> PublicKey {
    private_key(n).public_key(&Secp256k1::signing_only())
}

/// Deterministic private key `n` serializing its public key uncompressed
pub fn uncompressed_key(n: u8) -> PrivateKey {
    PrivateKey::new_uncompressed(
        SecretKey::from_slice(&[n; 32]).expect("valid secret key"),
        Network::Regtest,
    )
}

/// A P2PKH locking script for the 65-byte public key of [`uncompressed_key`]
pub fn p2pkh_uncompressed(n: u8) -> ScriptBuf {
    let key = uncompressed_key(n).public_key(&Secp256k1::signing_only());
    ScriptBuf::new_p2pkh(&key.pubkey_hash())
}

/// A deterministic txid derived from `n`
pub fn txid(n: u8) -> Txid {
    Txid::from_str(&format!("{:02x}", n).repeat(32)).expect("valid txid hex")
}

pub fn outpoint(n: u8) -> OutPoint {
    OutPoint::new(txid(n), 0)
}

/// A P2WPKH locking script for key `n`
pub fn p2wpkh(n: u8) -> ScriptBuf {
    ScriptBuf::new_v0_p2wpkh(&public_key(n).wpubkey_hash().expect("compressed key"))
}

/// A P2PKH locking script for key `n`
pub fn p2pkh(n: u8) -> ScriptBuf {
    ScriptBuf::new_p2pkh(&public_key(n).pubkey_hash())
}

/// UTXO `n` locked by `script_pubkey`
pub fn utxo(n: u8, sats: u64, script_pubkey: ScriptBuf) -> Utxo {
    Utxo::new(outpoint(n), Amount::from_sat(sats), script_pubkey)
}

/// UTXO `n` spendable by key `n` through P2WPKH
pub fn p2wpkh_utxo(n: u8, sats: u64) -> Utxo {
    utxo(n, sats, p2wpkh(n))
}

/// UTXO `n` locked by `script` wrapped in P2WSH
pub fn p2wsh_utxo(n: u8, sats: u64, script: &ScriptTemplate) -> Utxo {
    let witness = script.to_script();
    utxo(n, sats, witness.to_v0_p2wsh()).with_witness_script(witness)
}

/// UTXO `n` locked by `script` wrapped in P2SH
pub fn p2sh_utxo(n: u8, sats: u64, script: &ScriptTemplate) -> Utxo {
    let redeem = script.to_script();
    utxo(n, sats, redeem.to_p2sh()).with_redeem_script(redeem)
}

pub fn pk(n: u8) -> ScriptTemplate {
    ScriptTemplate::Pk(public_key(n))
}

pub fn multisig(threshold: usize, keys: &[u8]) -> ScriptTemplate {
    ScriptTemplate::Multisig {
        threshold,
        keys: keys.iter().map(|n| public_key(*n)).collect(),
    }
}

pub fn after_height(height: u32, then: ScriptTemplate) -> ScriptTemplate {
    ScriptTemplate::AbsoluteLock {
        lock_time: LockTime::from_height(height).expect("valid height"),
        then: Box::new(then),
    }
}

pub fn after_time(time: u32, then: ScriptTemplate) -> ScriptTemplate {
    ScriptTemplate::AbsoluteLock {
        lock_time: LockTime::from_time(time).expect("valid time"),
        then: Box::new(then),
    }
}

pub fn older(blocks: u16, then: ScriptTemplate) -> ScriptTemplate {
    ScriptTemplate::RelativeLock {
        sequence: Sequence::from_height(blocks),
        then: Box::new(then),
    }
}

/// A signing context for outpoint `n` holding keys `keys`
pub fn context(n: u8, keys: &[u8]) -> SigningContext {
    let keys: Vec<PrivateKey> = keys.iter().map(|k| private_key(*k)).collect();
    SigningContext::new(outpoint(n), &keys)
}

/// A single desired output paying `sats` to key 200
pub fn pay(sats: u64) -> Vec<DesiredOutput> {
    vec![DesiredOutput::new(p2wpkh(200), Amount::from_sat(sats))]
}

/// A per-vbyte fee rate from an integer
pub fn sat_per_vb(rate: u64) -> FeeRate {
    FeeRate::sat_per_vbyte(Decimal::from(rate)).expect("non-negative rate")
}

/// Finalizer at 1 sat/vB paying change to key 201
pub fn finalizer() -> Finalizer {
    Finalizer::new(sat_per_vb(1), p2wpkh(201))
}
