//! Selector, finalizer and signer run end to end

mod test_utils;

use bitcoin::{Amount, Transaction, TxOut};
use coinsmith_common::config::EngineConfig;
use coinsmith_common::types::DesiredOutput;
use coinsmith_common::utxo_selection::SelectionStrategy;
use coinsmith_core::{BuildError, NoDustOutputs, TransactionBuilder, TransactionInvariant};
use quickcheck_macros::quickcheck;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_decimal::Decimal;
use std::sync::Arc;
use test_utils::*;

fn builder() -> TransactionBuilder {
    TransactionBuilder::new(sat_per_vb(2), p2wpkh(201))
}

#[test]
fn test_build_and_sign() {
    init_test_environment();

    let pool = [
        p2wpkh_utxo(1, 20_000),
        p2wpkh_utxo(2, 80_000),
        p2wpkh_utxo(3, 5_000),
    ];
    let contexts = [context(1, &[1]), context(2, &[2]), context(3, &[3])];
    let mut rng = StdRng::seed_from_u64(7);

    let signed = builder()
        .build_and_sign(&pool, &pay(50_000), &contexts, &mut rng)
        .unwrap();

    // LargestFirst takes the 80k UTXO alone
    let tx = signed.transaction();
    assert_eq!(tx.input.len(), 1);
    assert_eq!(tx.input[0].previous_output, outpoint(2));
    assert_eq!(tx.output.len(), 2);
    assert!(signed.effective_fee_rate() >= Decimal::from(2));
    signed.verify().unwrap();
}

#[test]
fn test_zero_value_pool_fails_for_every_strategy() {
    init_test_environment();

    let pool = [p2wpkh_utxo(1, 0)];
    for strategy in SelectionStrategy::ALL {
        let mut rng = StdRng::seed_from_u64(1);
        let err = builder()
            .with_strategy(strategy)
            .build_unsigned(&pool, &pay(1), &mut rng)
            .unwrap_err();
        assert!(
            matches!(err, BuildError::InsufficientFunds { .. }),
            "{} returned {:?}",
            strategy,
            err
        );
    }
}

#[test]
fn test_from_config() {
    init_test_environment();

    let mut config = EngineConfig::default();
    config.selection.strategy = SelectionStrategy::SmallestFirst;
    config.signing.sighash = "NONE".to_string();

    let builder = TransactionBuilder::from_config(&config, p2wpkh(201)).unwrap();
    assert_eq!(builder.strategy(), SelectionStrategy::SmallestFirst);

    let ctx = builder.signing_context(outpoint(1), &[private_key(1)]);
    assert_eq!(ctx.sighash_type(), bitcoin::sighash::EcdsaSighashType::None);

    let pool = [p2wpkh_utxo(1, 100_000)];
    let signed = builder
        .build_and_sign(&pool, &pay(10_000), &[ctx], &mut StdRng::seed_from_u64(3))
        .unwrap();
    signed.verify().unwrap();
}

#[test]
fn test_from_config_rejects_bad_sighash() {
    let mut config = EngineConfig::default();
    config.signing.sighash = "EVERYTHING".to_string();

    assert!(matches!(
        TransactionBuilder::from_config(&config, p2wpkh(201)),
        Err(BuildError::InvalidArgument(_))
    ));
}

#[test]
fn test_psbt_export() {
    init_test_environment();

    let redeem = multisig(1, &[3]).to_script();
    let pool = [
        p2wpkh_utxo(1, 60_000),
        utxo(2, 60_000, redeem.to_p2sh()).with_redeem_script(redeem.clone()),
    ];
    let unsigned = builder()
        .with_strategy(SelectionStrategy::StandardAccumulate)
        .build_unsigned(&pool, &pay(100_000), &mut StdRng::seed_from_u64(0))
        .unwrap();

    let psbt = unsigned.to_psbt().unwrap();
    assert_eq!(psbt.unsigned_tx, *unsigned.transaction());
    assert_eq!(psbt.inputs[0].witness_utxo.as_ref().unwrap().value, 60_000);
    assert_eq!(psbt.inputs[0].redeem_script, None);
    assert_eq!(psbt.inputs[1].redeem_script, Some(redeem));
}

#[test]
fn test_custom_invariant_runs() {
    init_test_environment();

    struct RejectAll;
    impl TransactionInvariant for RejectAll {
        fn name(&self) -> &str {
            "reject all"
        }
        fn check(&self, _tx: &Transaction, _spent: &[TxOut], _fee: Amount) -> Result<(), String> {
            Err("policy".to_string())
        }
    }

    let err = builder()
        .with_invariant(Arc::new(RejectAll))
        .build_unsigned(&[p2wpkh_utxo(1, 100_000)], &pay(10_000), &mut StdRng::seed_from_u64(0))
        .unwrap_err();
    assert_eq!(err, BuildError::InvariantViolation("reject all: policy".to_string()));
}

#[test]
fn test_dust_output_invariant() {
    init_test_environment();

    let outputs = [DesiredOutput::new(p2wpkh(200), Amount::from_sat(100))];
    let err = builder()
        .with_invariant(Arc::new(NoDustOutputs { dust_relay_fee: 3_000 }))
        .build_unsigned(&[p2wpkh_utxo(1, 100_000)], &outputs, &mut StdRng::seed_from_u64(0))
        .unwrap_err();
    assert!(matches!(err, BuildError::InvariantViolation(_)));
}

#[test]
fn test_dust_relay_fee_changes_change_decision() {
    init_test_environment();

    // 1 in, 1 out at 1 sat/vB costs 110; with change 141, leaving 359 change
    let pool = [p2wpkh_utxo(1, 10_500)];
    let outputs = pay(10_000);

    let kept = finalizer().finalize(&pool, &outputs).unwrap();
    assert_eq!(kept.change_value(), Amount::from_sat(359));

    let dropped = finalizer()
        .with_dust_relay_fee(10_000)
        .finalize(&pool, &outputs)
        .unwrap();
    assert_eq!(dropped.change_index(), None);
    assert_eq!(dropped.fee(), Amount::from_sat(500));
}

#[quickcheck]
fn prop_signed_transactions_conserve_value(values: Vec<u32>, target: u32) -> bool {
    init_test_environment();

    let values: Vec<u64> = values.into_iter().take(5).map(|v| u64::from(v % 200_000)).collect();
    let pool: Vec<_> = values
        .iter()
        .enumerate()
        .map(|(i, v)| p2wpkh_utxo(i as u8 + 1, *v))
        .collect();
    let contexts: Vec<_> = (1..=pool.len() as u8).map(|n| context(n, &[n])).collect();
    let outputs = pay(u64::from(target % 300_000) + 1_000);

    let builder = TransactionBuilder::new(sat_per_vb(1), p2wpkh(201));
    match builder.build_and_sign(&pool, &outputs, &contexts, &mut StdRng::seed_from_u64(0)) {
        Ok(signed) => {
            let spent: u64 = signed.spent_outputs().iter().map(|o| o.value).sum();
            let paid: u64 = signed.transaction().output.iter().map(|o| o.value).sum();
            spent == paid + signed.fee().to_sat()
                && signed.fee().to_sat() >= signed.vsize() as u64
                && signed.verify().is_ok()
        }
        Err(BuildError::InsufficientFunds { .. }) => true,
        Err(_) => false,
    }
}
