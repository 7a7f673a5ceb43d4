//! Tests the full custody flow: deposit address, co-signing round, finalization and dry run.

use std::time::Duration;

use bitcoin::{address::AddressType, Network, TxOut};
use common::custody::{init_logging, Federation, DEPOSIT_AMOUNT};
use oraibtc_bridge_sig_manager::prelude::{
    verify_input, BridgeSigError, SignatureManager, SpendStatus,
};
use oraibtc_bridge_tx_builder::prelude::derive_deposit_address;
use oraibtc_primitives::dest::IbcDest;
use oraibtc_test_utils::bridge::mock_outpoint;
use tokio::time::Instant;
use tracing::info;

mod common;

const ROUND_TIMEOUT: Duration = Duration::from_secs(5);

fn intent() -> IbcDest {
    IbcDest {
        source_port: "transfer".to_string(),
        source_channel: "channel-0".to_string(),
        receiver: "orai1qv5jn7tueeqw7xqdn5rem7s09n7zletreera5x".to_string(),
        sender: "oraibtc1qv5jn7tueeqw7xqdn5rem7s09n7zletrsnc5vq".to_string(),
        timeout_timestamp: 1_700_000_000_000_000_000,
        memo: String::new(),
    }
}

#[tokio::test]
async fn two_of_three_spend() {
    init_logging("custody-flow");

    let federation = Federation::new(&["A", "B", "C"], 10, (2, 3));
    let dest = intent();
    let commitment = dest.commitment().expect("intent should encode");

    let (address, redeem_script) =
        derive_deposit_address(&federation.sigset, &dest, Network::Testnet)
            .expect("address should derive");
    assert_eq!(address.address_type(), Some(AddressType::P2wsh));
    assert!(address.to_string().starts_with("tb1q"), "should be a testnet address");
    info!(%address, "derived deposit address");

    let spend = federation.build_spend(mock_outpoint(1), commitment);
    assert_eq!(spend.redeem_scripts[0], redeem_script);

    // the synthetic deposit sits at the derived address
    let deposit = TxOut {
        value: DEPOSIT_AMOUNT,
        script_pubkey: address.script_pubkey(),
    };
    assert_eq!(spend.prevouts[0], deposit);

    let manager = SignatureManager::new(federation.secp());
    let txid = manager
        .add_tx_state(spend, federation.sigset.clone())
        .await
        .expect("spend should be tracked");

    let report = manager
        .request_signatures(
            &txid,
            &federation.endpoints(&["A", "B"]),
            Instant::now() + ROUND_TIMEOUT,
        )
        .await
        .expect("round should complete");

    assert_eq!(report.responded.len(), 2);
    assert!(report.failed.is_empty() && report.timed_out.is_empty());
    assert!(
        manager.is_fully_signed(&txid).await.unwrap(),
        "A and B together hold 20 of 30"
    );

    let signed_tx = manager.finalize(&txid).await.expect("should finalize");
    assert_eq!(manager.status(&txid).await.unwrap(), SpendStatus::Finalized);

    let witness = &signed_tx.input[0].witness;
    assert_eq!(witness.len(), 4, "three signature slots and the script");
    assert!(witness.nth(0).unwrap().is_empty(), "C did not sign");
    assert_eq!(witness.last().unwrap(), redeem_script.as_bytes());

    verify_input(&signed_tx, 0, &deposit).expect("dry run against the deposit should pass");
}

#[tokio::test]
async fn one_of_three_is_not_enough() {
    init_logging("custody-flow");

    let federation = Federation::new(&["A", "B", "C"], 10, (2, 3));
    let commitment = intent().commitment().unwrap();
    let spend = federation.build_spend(mock_outpoint(2), commitment);

    let manager = SignatureManager::new(federation.secp());
    let txid = manager
        .add_tx_state(spend, federation.sigset.clone())
        .await
        .unwrap();

    let report = manager
        .request_signatures(
            &txid,
            &federation.endpoints(&["A"]),
            Instant::now() + ROUND_TIMEOUT,
        )
        .await
        .unwrap();

    assert_eq!(report.responded, vec![federation.member("A").pubkey]);
    assert_eq!(
        report.status,
        SpendStatus::PartiallySigned {
            accumulated_power: 10,
            required_power: 20
        }
    );

    match manager.finalize(&txid).await {
        Err(BridgeSigError::InsufficientSignatures {
            input_index,
            current,
            required,
            missing,
        }) => {
            assert_eq!(input_index, 0);
            assert_eq!(current, 10);
            assert_eq!(required, 20);
            assert_eq!(
                missing,
                vec![federation.member("B").pubkey, federation.member("C").pubkey]
            );
        }
        other => panic!("expected insufficient signatures, got {other:?}"),
    }

    assert!(
        matches!(
            manager.status(&txid).await.unwrap(),
            SpendStatus::PartiallySigned { .. }
        ),
        "a failed finalization should leave the spend untouched"
    );

    // a later round with the remaining signatories completes the spend
    manager
        .request_signatures(
            &txid,
            &federation.endpoints(&["A", "B", "C"]),
            Instant::now() + ROUND_TIMEOUT,
        )
        .await
        .unwrap();
    assert!(manager.finalize(&txid).await.is_ok());
}

#[tokio::test]
async fn signatories_of_another_set_are_skipped() {
    init_logging("custody-flow");

    let federation = Federation::new(&["A", "B", "C"], 10, (2, 3));
    let outsiders = Federation::new(&["X", "Y", "Z", "W"], 10, (2, 3));

    let spend = federation.build_spend(mock_outpoint(3), intent().commitment().unwrap());
    let manager = SignatureManager::new(federation.secp());
    let txid = manager
        .add_tx_state(spend, federation.sigset.clone())
        .await
        .unwrap();

    // "W" is derived from a seed no member of the federation uses
    let report = manager
        .request_signatures(
            &txid,
            &outsiders.endpoints(&["W"]),
            Instant::now() + ROUND_TIMEOUT,
        )
        .await
        .unwrap();

    assert!(report.responded.is_empty());
    assert_eq!(report.status, SpendStatus::Built);
}
