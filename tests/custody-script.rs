//! Properties of the custody script: derivation, threshold enforcement and witness order.

use std::{collections::BTreeMap, sync::Arc};

use bitcoin::{
    ecdsa,
    secp256k1::{Message, Secp256k1},
    Amount, Network, ScriptBuf, Transaction, TxOut,
};
use common::custody::init_logging;
use oraibtc_bridge_sig_manager::prelude::{
    build_witness, create_message_hashes, sign_message, verify_input, BridgeSigError,
    ScriptError, SignatureManager,
};
use oraibtc_bridge_tx_builder::{
    errors::BridgeTxBuilderError,
    prelude::{
        derive_address, derive_redeem_script, CustodyUtxo, TxBuildContext, TxKind, TxSigningData,
        WithdrawalInfo,
    },
};
use oraibtc_primitives::{bridge::SignatorySet, dest::DestinationCommitment};
use oraibtc_test_utils::bridge::{
    deterministic_keypairs, mock_ibc_dest, mock_outpoint, mock_signatory_set,
};

mod common;

fn commitment(byte: u8) -> DestinationCommitment {
    DestinationCommitment::from([byte; 32])
}

fn single_input_spend(sigset: &SignatorySet) -> TxSigningData {
    WithdrawalInfo::new(
        vec![CustodyUtxo {
            outpoint: mock_outpoint(1),
            amount: Amount::from_sat(100_000),
            commitment: commitment(1),
        }],
        vec![TxOut {
            value: Amount::from_sat(90_000),
            script_pubkey: ScriptBuf::new_op_return([7u8; 4]),
        }],
        Amount::from_sat(1_000),
        Some(commitment(1)),
    )
    .construct_signing_data(&TxBuildContext::new(sigset.clone(), Network::Regtest))
    .expect("spend should build")
}

/// Signatures of the first `num_signers` deterministic keys over the only input of `spend`.
fn sign_first(spend: &TxSigningData, num_signers: usize) -> BTreeMap<usize, ecdsa::Signature> {
    let secp = Secp256k1::new();
    let messages: Vec<Message> =
        create_message_hashes(&spend.unsigned_tx, &spend.prevouts, &spend.redeem_scripts)
            .expect("sighashes");

    deterministic_keypairs(&secp, num_signers)
        .iter()
        .enumerate()
        .map(|(position, (_, secret_key))| {
            (position, sign_message(&secp, &messages[0], secret_key))
        })
        .collect()
}

fn with_witness(spend: &TxSigningData, witness: bitcoin::Witness) -> Transaction {
    let mut tx = spend.unsigned_tx.clone();
    tx.input[0].witness = witness;
    tx
}

#[test]
fn derivation_is_deterministic() {
    for powers in [vec![10], vec![10, 20, 30], vec![7; 40]] {
        let sigset = mock_signatory_set(&powers, (2, 3));

        let first = derive_redeem_script(&sigset, &commitment(1)).unwrap();
        let second = derive_redeem_script(&sigset.clone(), &commitment(1)).unwrap();

        assert_eq!(first.as_bytes(), second.as_bytes(), "scripts should be byte-identical");
    }
}

#[test]
fn addresses_are_bound_to_their_destination() {
    let sigset = mock_signatory_set(&[10, 10, 10], (2, 3));

    let a1 = derive_address(&derive_redeem_script(&sigset, &commitment(1)).unwrap(), Network::Testnet);
    let a2 = derive_address(&derive_redeem_script(&sigset, &commitment(2)).unwrap(), Network::Testnet);

    assert_ne!(a1, a2, "distinct commitments should give distinct addresses");
}

#[test]
fn destination_encoding_is_stable() {
    let dest = mock_ibc_dest();

    assert_eq!(dest.encode().unwrap(), dest.clone().encode().unwrap());
    assert_eq!(dest.commitment().unwrap(), dest.commitment().unwrap());

    let later = dest.with_timeout(dest.timeout_timestamp + 1);
    assert_ne!(dest.encode().unwrap(), later.encode().unwrap());
    assert_ne!(dest.commitment().unwrap(), later.commitment().unwrap());
}

#[test]
fn threshold_is_enforced_by_the_script() {
    let sigset = mock_signatory_set(&[10, 10, 10], (2, 3));
    let spend = single_input_spend(&sigset);
    let script = &spend.redeem_scripts[0];

    let one = build_witness(&sigset, &sign_first(&spend, 1), script);
    let tx = with_witness(&spend, one);
    assert!(
        matches!(
            verify_input(&tx, 0, &spend.prevouts[0]),
            Err(ScriptError::Consensus(_))
        ),
        "10 of 30 should not spend"
    );

    let two = build_witness(&sigset, &sign_first(&spend, 2), script);
    let tx = with_witness(&spend, two);
    assert_eq!(
        verify_input(&tx, 0, &spend.prevouts[0]),
        Ok(()),
        "20 of 30 should spend"
    );
}

#[test]
fn signatures_must_follow_the_declared_order() {
    let sigset = mock_signatory_set(&[10, 10, 10], (2, 3));
    let spend = single_input_spend(&sigset);
    let sigs = sign_first(&spend, 2);

    // canonical order is [sig_2, sig_1, sig_0, script], present sig_0 below sig_1 instead
    let mut witness = bitcoin::Witness::new();
    witness.push(Vec::<u8>::new());
    witness.push(sigs[&0].to_vec());
    witness.push(sigs[&1].to_vec());
    witness.push(spend.redeem_scripts[0].as_bytes());

    let tx = with_witness(&spend, witness);
    assert!(
        verify_input(&tx, 0, &spend.prevouts[0]).is_err(),
        "individually valid signatures in the wrong slots should not spend"
    );
}

#[tokio::test]
async fn finalization_requires_the_threshold() {
    init_logging("custody-script");

    let secp = Secp256k1::new();
    let keys = deterministic_keypairs(&secp, 3);
    let sigset = mock_signatory_set(&[10, 10, 10], (2, 3));
    let spend = single_input_spend(&sigset);
    let messages =
        create_message_hashes(&spend.unsigned_tx, &spend.prevouts, &spend.redeem_scripts).unwrap();

    let manager = SignatureManager::new(Arc::new(Secp256k1::new()));
    let txid = manager.add_tx_state(spend, sigset).await.unwrap();

    let (pubkey, secret_key) = &keys[0];
    let sig = sign_message(&secp, &messages[0], secret_key);
    assert!(!manager.add_signatory_signatures(&txid, pubkey, &[sig]).await.unwrap());
    assert!(matches!(
        manager.finalize(&txid).await,
        Err(BridgeSigError::InsufficientSignatures { current: 10, required: 20, .. })
    ));

    let (pubkey, secret_key) = &keys[1];
    let sig = sign_message(&secp, &messages[0], secret_key);
    assert!(manager.add_signatory_signatures(&txid, pubkey, &[sig]).await.unwrap());
    assert!(manager.finalize(&txid).await.is_ok());
}

#[tokio::test]
async fn large_voting_powers_are_truncated() {
    init_logging("custody-script");

    let sigset = mock_signatory_set(&[1 << 33, 1 << 33, 1 << 33], (2, 3));
    assert!(sigset.truncation() > 0, "powers should not fit script numbers as they are");

    let spend = single_input_spend(&sigset);
    let two = build_witness(&sigset, &sign_first(&spend, 2), &spend.redeem_scripts[0]);
    let tx = with_witness(&spend, two);

    assert_eq!(verify_input(&tx, 0, &spend.prevouts[0]), Ok(()));
}

#[test]
fn signatory_count_is_bounded_by_the_opcode_limit() {
    let largest = mock_signatory_set(&[1; 40], (2, 3));
    assert!(derive_redeem_script(&largest, &commitment(1)).is_ok());

    let too_many = mock_signatory_set(&[1; 41], (2, 3));
    assert!(matches!(
        derive_redeem_script(&too_many, &commitment(1)),
        Err(BridgeTxBuilderError::TooManyOpcodes { count: 206, max: 201 })
    ));
}
