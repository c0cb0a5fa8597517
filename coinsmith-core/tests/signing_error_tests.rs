//! Failures the finalizer and signer must surface

mod test_utils;

use bitcoin::{Amount, ScriptBuf};
use coinsmith_common::error::{CoinsmithError, ErrorCategory};
use coinsmith_core::{BuildError, Signer};
use test_utils::*;

#[test]
fn test_wrong_key_for_p2pkh() {
    init_test_environment();

    let unsigned = finalizer()
        .finalize(&[utxo(1, 100_000, p2pkh(1))], &pay(40_000))
        .unwrap();
    let err = Signer::new().sign(&unsigned, &[context(1, &[9])]).unwrap_err();

    assert!(matches!(err, BuildError::SigningMismatch { index: 0, .. }));
}

#[test]
fn test_mismatch_names_failing_input() {
    init_test_environment();

    let utxos = [p2wpkh_utxo(1, 50_000), p2wpkh_utxo(2, 50_000)];
    let unsigned = finalizer().finalize(&utxos, &pay(40_000)).unwrap();
    let err = Signer::new()
        .sign(&unsigned, &[context(1, &[1]), context(2, &[1])])
        .unwrap_err();

    assert!(matches!(err, BuildError::SigningMismatch { index: 1, .. }));
}

#[test]
fn test_missing_context() {
    init_test_environment();

    let unsigned = finalizer()
        .finalize(&[p2wpkh_utxo(1, 100_000)], &pay(40_000))
        .unwrap();
    let err = Signer::new().sign(&unsigned, &[]).unwrap_err();

    match err {
        BuildError::SigningMismatch { index, reason } => {
            assert_eq!(index, 0);
            assert!(reason.contains("no signing context"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_duplicate_contexts_rejected() {
    init_test_environment();

    let unsigned = finalizer()
        .finalize(&[p2wpkh_utxo(1, 100_000)], &pay(40_000))
        .unwrap();
    let err = Signer::new()
        .sign(&unsigned, &[context(1, &[1]), context(1, &[1])])
        .unwrap_err();

    assert!(matches!(err, BuildError::InvalidArgument(_)));
}

#[test]
fn test_extra_contexts_ignored() {
    init_test_environment();

    let unsigned = finalizer()
        .finalize(&[p2wpkh_utxo(1, 100_000)], &pay(40_000))
        .unwrap();
    let signed = Signer::new()
        .sign(&unsigned, &[context(7, &[7]), context(1, &[1])])
        .unwrap();

    signed.verify().unwrap();
}

#[test]
fn test_multisig_threshold_unreachable() {
    init_test_environment();

    let u = p2wsh_utxo(1, 100_000, &multisig(2, &[1, 2, 3]));
    let unsigned = finalizer().finalize(&[u], &pay(40_000)).unwrap();
    let err = Signer::new().sign(&unsigned, &[context(1, &[2])]).unwrap_err();

    match err {
        BuildError::SigningMismatch { index, reason } => {
            assert_eq!(index, 0);
            assert!(reason.contains("threshold"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_mixed_timelock_units_conflict() {
    init_test_environment();

    let utxos = [
        p2wsh_utxo(1, 50_000, &after_height(1_000, pk(1))),
        p2wsh_utxo(2, 50_000, &after_time(1_700_000_000, pk(2))),
    ];
    let err = finalizer().finalize(&utxos, &pay(40_000)).unwrap_err();

    assert!(matches!(err, BuildError::TimelockConflict(_)));
}

#[test]
fn test_relative_lock_needs_version_two() {
    init_test_environment();

    let u = p2wsh_utxo(1, 100_000, &older(10, pk(1)));
    let err = finalizer()
        .with_version(1)
        .finalize(&[u], &pay(40_000))
        .unwrap_err();

    assert!(matches!(err, BuildError::TimelockConflict(_)));
}

#[test]
fn test_unsupported_script() {
    init_test_environment();

    let op_return = ScriptBuf::from(vec![0x6a, 0x02, 0xde, 0xad]);
    let utxos = [p2wpkh_utxo(1, 50_000), utxo(2, 50_000, op_return)];
    let err = finalizer().finalize(&utxos, &pay(40_000)).unwrap_err();

    assert!(matches!(err, BuildError::UnsupportedScriptType { index: 1, .. }));
}

#[test]
fn test_missing_witness_script() {
    init_test_environment();

    let witness = pk(1).to_script();
    let u = utxo(1, 100_000, witness.to_v0_p2wsh());
    let err = finalizer().finalize(&[u], &pay(40_000)).unwrap_err();

    assert!(matches!(err, BuildError::UnsupportedScriptType { index: 0, .. }));
}

#[test]
fn test_insufficient_funds() {
    init_test_environment();

    let err = finalizer()
        .finalize(&[p2wpkh_utxo(1, 40_050)], &pay(40_000))
        .unwrap_err();

    match err {
        BuildError::InsufficientFunds {
            available,
            required,
            fee,
        } => {
            assert_eq!(available, Amount::from_sat(40_050));
            assert_eq!(required, Amount::from_sat(40_000));
            assert_eq!(fee, Amount::from_sat(110));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_error_categories() {
    let mismatch: CoinsmithError = BuildError::SigningMismatch {
        index: 2,
        reason: "no key".to_string(),
    }
    .into();
    assert_eq!(mismatch.category(), ErrorCategory::Signing);

    let conflict: CoinsmithError = BuildError::TimelockConflict("mixed".to_string()).into();
    assert_eq!(conflict.category(), ErrorCategory::Transaction);

    let invalid: CoinsmithError = BuildError::InvalidArgument("empty".to_string()).into();
    assert_eq!(invalid.category(), ErrorCategory::Validation);
}
