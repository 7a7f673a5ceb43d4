//! Constants related to custody scripts and transactions.

/// Largest witness script relayed by standard bitcoin nodes (`MAX_STANDARD_P2WSH_SCRIPT_SIZE`).
pub const MAX_REDEEM_SCRIPT_SIZE: usize = 3600;

/// Largest number a script push can hold while still being usable in arithmetic (4 bytes, signed).
pub const MAX_SCRIPT_NUM: i64 = i32::MAX as i64;

/// Vbytes added to the witness of a custody input for every signatory.
pub const WITNESS_VSIZE_PER_SIGNATORY: u64 = 79;

/// Fixed vbytes of a custody input witness regardless of the number of signatories.
pub const WITNESS_VSIZE_BASE: u64 = 39;

/// Non-witness vbytes of a transaction input (outpoint, sequence, empty script sig).
pub const INPUT_BASE_VSIZE: u64 = 40;

/// Vbytes of an output excluding its script pubkey (value and script length).
pub const OUTPUT_BASE_VSIZE: u64 = 9;

/// Largest number of non-push opcodes a script may execute (`MAX_OPS_PER_SCRIPT`).
pub const MAX_OPS_PER_SCRIPT: usize = 201;
