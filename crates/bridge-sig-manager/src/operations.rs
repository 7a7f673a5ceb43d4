//! Provides wallet-like functionalities for computing sighashes and producing/verifying ECDSA
//! signatures over them.

use bitcoin::{
    ecdsa,
    hashes::Hash,
    secp256k1::{All, Message, PublicKey, Secp256k1, SecretKey},
    sighash::{EcdsaSighashType, SighashCache},
    Script, Transaction, TxOut,
};

use crate::errors::{BridgeSigError, BridgeSigResult};

/// Compute the segwit v0 sighash of `input_index` spending `prevout` through `redeem_script`.
///
/// Every custody signature commits to [`EcdsaSighashType::All`].
pub fn create_message_hash(
    sighash_cache: &mut SighashCache<&Transaction>,
    input_index: usize,
    redeem_script: &Script,
    prevout: &TxOut,
) -> BridgeSigResult<Message> {
    let sighash = sighash_cache
        .p2wsh_signature_hash(input_index, redeem_script, prevout.value, EcdsaSighashType::All)
        .map_err(|e| BridgeSigError::Sighash(e.to_string()))?;

    Ok(Message::from_digest(sighash.to_byte_array()))
}

/// Compute the sighash of every input of `tx`.
///
/// # Errors
///
/// If `prevouts` or `redeem_scripts` do not cover every input.
pub fn create_message_hashes(
    tx: &Transaction,
    prevouts: &[TxOut],
    redeem_scripts: &[impl AsRef<Script>],
) -> BridgeSigResult<Vec<Message>> {
    let mut sighash_cache = SighashCache::new(tx);

    (0..tx.input.len())
        .map(|input_index| {
            let prevout = prevouts
                .get(input_index)
                .ok_or(BridgeSigError::InputIndexOutOfBounds(input_index))?;
            let script = redeem_scripts
                .get(input_index)
                .ok_or(BridgeSigError::InputIndexOutOfBounds(input_index))?;

            create_message_hash(&mut sighash_cache, input_index, script.as_ref(), prevout)
        })
        .collect()
}

/// Sign a sighash with a signatory's key.
///
/// Signing is deterministic (RFC 6979) so the same key and message always give the same bytes.
pub fn sign_message(
    secp: &Secp256k1<All>,
    message: &Message,
    secret_key: &SecretKey,
) -> ecdsa::Signature {
    ecdsa::Signature {
        signature: secp.sign_ecdsa(message, secret_key),
        sighash_type: EcdsaSighashType::All,
    }
}

/// Check that `signature` is a valid [`EcdsaSighashType::All`] signature of `pubkey` over
/// `message`.
pub fn verify_signature(
    secp: &Secp256k1<All>,
    signature: &ecdsa::Signature,
    message: &Message,
    pubkey: &PublicKey,
) -> bool {
    signature.sighash_type == EcdsaSighashType::All
        && secp
            .verify_ecdsa(message, &signature.signature, pubkey)
            .is_ok()
}

#[cfg(test)]
mod tests {
    use bitcoin::{Amount, ScriptBuf};
    use oraibtc_test_utils::bridge::{deterministic_keypairs, mock_unsigned_tx};

    use super::*;

    #[test]
    fn test_create_message_hash() {
        let tx = mock_unsigned_tx(2);
        let script = ScriptBuf::from_bytes(vec![0x51]);
        let prevout = TxOut {
            value: Amount::from_sat(1_000),
            script_pubkey: script.to_p2wsh(),
        };

        let mut sighash_cache = SighashCache::new(&tx);
        let first = create_message_hash(&mut sighash_cache, 0, &script, &prevout).unwrap();
        let second = create_message_hash(&mut sighash_cache, 1, &script, &prevout).unwrap();
        assert_ne!(first, second, "sighash should commit to the input index");

        let other_value = TxOut {
            value: Amount::from_sat(1_001),
            ..prevout.clone()
        };
        let third = create_message_hash(&mut sighash_cache, 0, &script, &other_value).unwrap();
        assert_ne!(first, third, "sighash should commit to the spent value");

        assert!(
            create_message_hash(&mut sighash_cache, 2, &script, &prevout).is_err(),
            "should error if the input does not exist"
        );
    }

    #[test]
    fn test_create_message_hashes_requires_every_input() {
        let tx = mock_unsigned_tx(2);
        let script = ScriptBuf::from_bytes(vec![0x51]);
        let prevout = TxOut {
            value: Amount::from_sat(1_000),
            script_pubkey: script.to_p2wsh(),
        };

        assert_eq!(
            create_message_hashes(&tx, &[prevout.clone(), prevout.clone()], &[&script, &script])
                .unwrap()
                .len(),
            2
        );
        assert!(matches!(
            create_message_hashes(&tx, &[prevout], &[&script, &script]),
            Err(BridgeSigError::InputIndexOutOfBounds(1))
        ));
    }

    #[test]
    fn test_sign_and_verify() {
        let secp = Secp256k1::new();
        let keys = deterministic_keypairs(&secp, 2);
        let message = Message::from_digest([3u8; 32]);

        let signature = sign_message(&secp, &message, &keys[0].1);
        assert_eq!(
            signature,
            sign_message(&secp, &message, &keys[0].1),
            "signing should be deterministic"
        );

        assert!(verify_signature(&secp, &signature, &message, &keys[0].0));
        assert!(!verify_signature(&secp, &signature, &message, &keys[1].0));
        assert!(!verify_signature(
            &secp,
            &signature,
            &Message::from_digest([4u8; 32]),
            &keys[0].0
        ));

        let wrong_type = ecdsa::Signature {
            sighash_type: EcdsaSighashType::None,
            ..signature
        };
        assert!(!verify_signature(&secp, &wrong_type, &message, &keys[0].0));
    }
}
