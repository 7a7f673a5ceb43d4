//! Enumerated errors related to creation of custody scripts, addresses and transactions.

use oraibtc_primitives::errors::{EncodingError, SignatorySetError, ThresholdError};
use thiserror::Error;

/// Error during building of custody scripts and transactions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeTxBuilderError {
    /// The signatory set cannot be used to lock funds.
    #[error("invalid signatory set: {0}")]
    InvalidSignatorySet(SignatorySetError),

    /// The threshold of the signatory set cannot be enforced.
    #[error("invalid threshold: {0}")]
    InvalidThreshold(#[from] ThresholdError),

    /// The transfer intent could not be encoded.
    #[error("could not encode destination: {0}")]
    Encoding(#[from] EncodingError),

    /// The redeem script exceeds the standard witness script size.
    #[error("redeem script is {size} bytes, exceeding the limit of {max}")]
    ScriptTooLarge {
        /// The size of the built script.
        size: usize,

        /// The largest standard witness script.
        max: usize,
    },

    /// The redeem script executes more opcodes than consensus allows, making it unspendable.
    #[error("redeem script has {count} opcodes, exceeding the limit of {max}")]
    TooManyOpcodes {
        /// The number of non-push opcodes in the script.
        count: usize,

        /// The largest number allowed.
        max: usize,
    },

    /// The bytes are not a custody redeem script.
    #[error("malformed redeem script: {0}")]
    MalformedScript(String),

    /// Error building the spend transaction.
    #[error("could not build spend transaction")]
    SpendConstruction(#[from] SpendConstructionError),
}

/// Result type alias that has [`BridgeTxBuilderError`] as the error type for succinctness.
pub type BridgeTxBuilderResult<T> = Result<T, BridgeTxBuilderError>;

/// Threshold problems surface as [`BridgeTxBuilderError::InvalidThreshold`] so that callers can
/// tell them apart from malformed signatories.
impl From<SignatorySetError> for BridgeTxBuilderError {
    fn from(value: SignatorySetError) -> Self {
        match value {
            SignatorySetError::Threshold(err) => BridgeTxBuilderError::InvalidThreshold(err),
            other => BridgeTxBuilderError::InvalidSignatorySet(other),
        }
    }
}

/// Error building the transaction that spends custodied UTXOs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpendConstructionError {
    /// No custody UTXOs were supplied.
    #[error("spend has no inputs")]
    NoInputs,

    /// No payments were supplied.
    #[error("spend has no outputs")]
    NoOutputs,

    /// The inputs do not cover the payments and fee.
    #[error("insufficient funds: inputs {available} sat < outputs + fee {required} sat")]
    InsufficientFunds {
        /// Sum of the input amounts in sats.
        available: u64,

        /// Sum of the outputs and the fee in sats.
        required: u64,
    },

    /// An amount overflowed while summing.
    #[error("amount overflow")]
    AmountOverflow,
}
