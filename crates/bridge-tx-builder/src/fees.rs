//! Fee arithmetic for custody inputs and outputs.
//!
//! These only estimate sizes; choosing a fee rate is left to the caller.

use bitcoin::{Amount, Script};

use crate::constants::{
    INPUT_BASE_VSIZE, OUTPUT_BASE_VSIZE, WITNESS_VSIZE_BASE, WITNESS_VSIZE_PER_SIGNATORY,
};

/// Estimated vsize of the witness spending a custody input locked by `num_signatories` keys.
pub fn est_witness_vsize(num_signatories: usize) -> u64 {
    num_signatories as u64 * WITNESS_VSIZE_PER_SIGNATORY + WITNESS_VSIZE_BASE
}

/// Estimated vsize of a whole custody input.
pub fn est_input_vsize(num_signatories: usize) -> u64 {
    est_witness_vsize(num_signatories) + INPUT_BASE_VSIZE
}

/// Convert the miner fee advertised by the bridge (BTC per custody witness) to sats per vbyte,
/// rounding up.
pub fn fee_rate_from_miner_fee(miner_fee_rate_btc: f64, num_signatories: usize) -> u64 {
    let sats = (miner_fee_rate_btc.max(0.0) * Amount::ONE_BTC.to_sat() as f64).ceil() as u64;

    sats.div_ceil(est_witness_vsize(num_signatories))
}

/// Fee paid by a deposit for the custody input that will eventually spend it.
pub fn deposit_fee(num_signatories: usize, sat_per_vb: u64) -> Amount {
    Amount::from_sat(est_input_vsize(num_signatories).saturating_mul(sat_per_vb))
}

/// Fee paid by a withdrawal for its output paying to `script_pubkey`.
pub fn withdrawal_fee(script_pubkey: &Script, sat_per_vb: u64) -> Amount {
    let vsize = OUTPUT_BASE_VSIZE + script_pubkey.len() as u64;

    Amount::from_sat(vsize.saturating_mul(sat_per_vb))
}

/// Fee of a checkpoint transaction of `checkpoint_vsize` spending `num_inputs` custody inputs.
///
/// `checkpoint_vsize` excludes the witnesses which are added here.
pub fn checkpoint_fee(
    checkpoint_vsize: u64,
    num_inputs: u64,
    num_signatories: usize,
    sat_per_vb: u64,
) -> Amount {
    let witnesses = num_inputs.saturating_mul(est_witness_vsize(num_signatories));
    let vsize = checkpoint_vsize.saturating_add(witnesses);

    Amount::from_sat(vsize.saturating_mul(sat_per_vb))
}
