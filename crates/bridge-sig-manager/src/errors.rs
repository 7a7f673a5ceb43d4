//! Defines errors associated with the signature manager.

use bitcoin::{
    consensus::validation::BitcoinconsensusError, psbt::ExtractTxError, secp256k1::PublicKey, Txid,
};
use oraibtc_key_derivation::error::KeyError;
use thiserror::Error;

/// Errors that may occur while collecting signatures for and finalizing a custody spend.
#[derive(Debug, Clone, Error)]
pub enum BridgeSigError {
    /// Failed to build a [`Psbt`](bitcoin::Psbt) from the unsigned transaction. This can happen if
    /// the transaction contains a non-empty script sig or witness fields, or if the signing data
    /// does not describe every input.
    #[error("build psbt: {0}")]
    PsbtConstruction(String),

    /// No input exists for the given index in the psbt.
    #[error("no input exists for index {0} in the PSBT")]
    InputIndexOutOfBounds(usize),

    /// A redeem script does not belong to the signatory set or does not lock its prevout.
    #[error("redeem script for input {input_index} does not match the signatory set")]
    ScriptMismatch {
        /// The input whose script was rejected.
        input_index: usize,
    },

    /// The provided signature is not valid for the given transaction and pubkey.
    #[error("invalid signature from {pubkey} for input {input_index}")]
    InvalidSignature {
        /// The input the signature was meant for.
        input_index: usize,

        /// The signatory that produced it.
        pubkey: PublicKey,
    },

    /// The pubkey is not part of the signatory set locking the inputs.
    #[error("pubkey is not a signatory of this set")]
    UnauthorizedPubkey,

    /// Failed to compute the segwit v0 sighash.
    #[error("could not compute sighash: {0}")]
    Sighash(String),

    /// Transaction for the provided txid does not exist in state.
    #[error("transaction {0} does not exist")]
    TransactionNotFound(Txid),

    /// The accumulated voting power does not meet the threshold yet.
    #[error(
        "insufficient signatures for input {input_index}: {current} of {required} voting power, {} signatories missing",
        .missing.len()
    )]
    InsufficientSignatures {
        /// The first input that is short of signatures.
        input_index: usize,

        /// The voting power of the signatories that signed this input.
        current: u64,

        /// The voting power required to spend.
        required: u64,

        /// The signatories whose signature is still missing for this input.
        missing: Vec<PublicKey>,
    },

    /// The assembled witness failed the local dry-run evaluation and must not be broadcast.
    #[error("witness for input {input_index} failed validation: {source}")]
    ScriptValidation {
        /// The input whose witness was rejected.
        input_index: usize,

        /// Why the witness was rejected.
        source: ScriptError,
    },

    /// Failed to create signed transaction after all signatures have been collected.
    #[error("could not build signed transaction due to {0}")]
    TxExtraction(#[from] ExtractTxError),

    /// The spend is finalized and no longer accepts signatures.
    #[error("spend {0} is already finalized")]
    AlreadyFinalized(Txid),

    /// The spend was handed to the broadcaster and no longer accepts changes.
    #[error("spend {0} was already handed to broadcast")]
    AlreadyBroadcast(Txid),

    /// Broadcast can only be recorded for a finalized spend.
    #[error("spend {0} is not finalized")]
    NotFinalized(Txid),
}

/// Result type alias for the signature manager with [`BridgeSigError`] as the Error variant.
pub type BridgeSigResult<T> = Result<T, BridgeSigError>;

/// Reasons a finalized witness fails the dry run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    /// The transaction has no input at this index.
    #[error("no input exists for index {0}")]
    InputIndexOutOfBounds(usize),

    /// libbitcoinconsensus rejected the input.
    #[error("rejected by libbitcoinconsensus: {0:?}")]
    Consensus(#[from] BitcoinconsensusError),
}

/// Errors returned by a signatory when asked to sign.
#[derive(Debug, Clone, Error)]
pub enum SignatoryError {
    /// The signatory could not be reached or did not answer properly.
    #[error("signatory unavailable: {0}")]
    Unavailable(String),

    /// The signatory could not derive its key for the requested set.
    #[error("key derivation: {0}")]
    Key(#[from] KeyError),
}
