//! Errors during validation/conversion of primitives.

use bitcoin::secp256k1;
use thiserror::Error;

/// A signatory set snapshot that cannot be used to lock funds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatorySetError {
    /// The set has no signatories.
    #[error("signatory set is empty")]
    Empty,

    /// A signatory carries no voting power.
    #[error("signatory at position {position} has zero voting power")]
    ZeroVotingPower {
        /// Position of the signatory in the declared order.
        position: usize,
    },

    /// The same key appears more than once.
    #[error("signatory at position {position} duplicates an earlier pubkey")]
    DuplicatePubkey {
        /// Position of the duplicate in the declared order.
        position: usize,
    },

    /// The pubkey bytes in the snapshot are not a valid compressed secp256k1 key.
    #[error("signatory at position {position} has an invalid pubkey: {source}")]
    InvalidPubkey {
        /// Position of the signatory in the declared order.
        position: usize,

        /// The underlying parse failure.
        source: secp256k1::Error,
    },

    /// The total voting power does not fit in a `u64`.
    #[error("total voting power overflows")]
    VotingPowerOverflow,

    /// The threshold attached to the set is invalid.
    #[error(transparent)]
    Threshold(#[from] ThresholdError),
}

/// A threshold fraction that cannot be enforced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThresholdError {
    /// The fraction is not in `(0, 1]`.
    #[error("threshold {numerator}/{denominator} is out of range")]
    OutOfRange {
        /// The numerator of the fraction.
        numerator: u64,

        /// The denominator of the fraction.
        denominator: u64,
    },

    /// Even if every signatory signs, the truncated script weights cannot reach the threshold.
    #[error("threshold unsatisfiable: total weight {available} < required weight {required}")]
    Unsatisfiable {
        /// Sum of all truncated signatory weights.
        available: u64,

        /// Weight the script would require.
        required: u64,
    },
}

/// A transfer intent that cannot be encoded into a destination commitment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    /// A string field does not fit in its length prefix.
    #[error("field {field} is {len} bytes long, exceeding the maximum of {max}")]
    FieldTooLong {
        /// Name of the offending field.
        field: &'static str,

        /// Length of the field in bytes.
        len: usize,

        /// Largest length the prefix can represent.
        max: usize,
    },

    /// A required identifier is empty.
    #[error("required identifier {field} is empty")]
    EmptyIdentifier {
        /// Name of the offending field.
        field: &'static str,
    },

    /// The timeout is past what `u64` nanoseconds since the epoch can represent.
    #[error("timeout does not fit in u64 nanoseconds")]
    TimeoutOverflow,
}
