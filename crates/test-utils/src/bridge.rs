//! Fixtures for the custody crates: signatory keys, sets, intents and transactions.

use bitcoin::{
    absolute::LockTime,
    hashes::Hash,
    secp256k1::{All, PublicKey, Secp256k1, SecretKey},
    transaction::Version,
    Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness,
};
use oraibtc_primitives::{
    bridge::{Signatory, SignatorySet, Threshold},
    dest::IbcDest,
};
use rand::thread_rng;

/// Index given to the sets built by [`mock_signatory_set`].
pub const MOCK_SIGSET_INDEX: u32 = 1;

/// Generate `n` random keypairs.
pub fn generate_keypairs(secp: &Secp256k1<All>, n: usize) -> (Vec<PublicKey>, Vec<SecretKey>) {
    let mut rng = thread_rng();

    (0..n)
        .map(|_| {
            let secret_key = SecretKey::new(&mut rng);
            (PublicKey::from_secret_key(secp, &secret_key), secret_key)
        })
        .unzip()
}

/// Generate `n` keypairs that are the same on every call. The `i`-th secret key is `[i + 1; 32]`.
pub fn deterministic_keypairs(secp: &Secp256k1<All>, n: usize) -> Vec<(PublicKey, SecretKey)> {
    (0..n)
        .map(|i| {
            let byte = u8::try_from(i + 1).expect("at most 255 deterministic keys");
            let secret_key = SecretKey::from_slice(&[byte; 32]).expect("valid secret key");
            (PublicKey::from_secret_key(secp, &secret_key), secret_key)
        })
        .collect()
}

/// Build a set with one signatory per entry of `voting_powers`, keyed by
/// [`deterministic_keypairs`] in the same order.
pub fn mock_signatory_set(voting_powers: &[u64], threshold: (u64, u64)) -> SignatorySet {
    let secp = Secp256k1::new();
    let keys = deterministic_keypairs(&secp, voting_powers.len());

    let signatories = keys
        .iter()
        .zip(voting_powers)
        .map(|((pubkey, _), voting_power)| Signatory::new(*pubkey, *voting_power))
        .collect();

    let threshold = Threshold::new(threshold.0, threshold.1).expect("valid threshold");

    SignatorySet::new(MOCK_SIGSET_INDEX, signatories, threshold).expect("valid signatory set")
}

/// A plausible IBC transfer intent.
pub fn mock_ibc_dest() -> IbcDest {
    IbcDest {
        source_port: "transfer".to_string(),
        source_channel: "channel-1".to_string(),
        receiver: "orai1ehmhqcn8erf3dgavrca69zgp4rtxj5kqgtcnyd".to_string(),
        sender: "oraibtc1ehmhqcn8erf3dgavrca69zgp4rtxj5kql5gzkm".to_string(),
        timeout_timestamp: 1_727_740_800_000_000_000,
        memo: String::new(),
    }
}

/// An outpoint whose txid is filled with `seed`.
pub fn mock_outpoint(seed: u8) -> OutPoint {
    OutPoint {
        txid: Txid::from_byte_array([seed; 32]),
        vout: u32::from(seed),
    }
}

/// An unsigned transaction with `num_inputs` inputs and a single output.
pub fn mock_unsigned_tx(num_inputs: usize) -> Transaction {
    let input = (0..num_inputs)
        .map(|i| TxIn {
            previous_output: mock_outpoint(i as u8),
            script_sig: ScriptBuf::new(),
            sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
            witness: Witness::new(),
        })
        .collect();

    Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input,
        output: vec![TxOut {
            value: Amount::from_sat(1_000),
            script_pubkey: ScriptBuf::new_op_return([0u8; 4]),
        }],
    }
}
