//! Dry-run of finalized custody spends through libbitcoinconsensus.
//!
//! `libbitcoinconsensus` only accepts consensus flags, so policy-only rules such as `MINIMALIF`
//! and `NULLFAIL` are not applied here. Witness v0 scripts implicitly require a clean stack.

use bitcoin::{consensus::encode::serialize, Transaction, TxOut};

use crate::errors::ScriptError;

/// The script verification flags applied to custody inputs.
pub const CUSTODY_VERIFY_FLAGS: u32 = bitcoinconsensus::VERIFY_P2SH
    | bitcoinconsensus::VERIFY_DERSIG
    | bitcoinconsensus::VERIFY_NULLDUMMY
    | bitcoinconsensus::VERIFY_CHECKLOCKTIMEVERIFY
    | bitcoinconsensus::VERIFY_CHECKSEQUENCEVERIFY
    | bitcoinconsensus::VERIFY_WITNESS;

/// Verify that input `input_index` of `tx` is able to spend `prevout`.
pub fn verify_input(
    tx: &Transaction,
    input_index: usize,
    prevout: &TxOut,
) -> Result<(), ScriptError> {
    if input_index >= tx.input.len() {
        return Err(ScriptError::InputIndexOutOfBounds(input_index));
    }

    prevout.script_pubkey.verify_with_flags(
        input_index,
        prevout.value,
        &serialize(tx),
        CUSTODY_VERIFY_FLAGS,
    )?;

    Ok(())
}
