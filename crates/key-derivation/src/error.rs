//! Error types for key derivation.

use bitcoin::secp256k1::PublicKey;
use thiserror::Error;

/// Errors deriving or checking signatory keys.
#[derive(Error, Debug, Clone)]
pub enum KeyError {
    /// An error from the [`bitcoin::bip32`] module.
    ///
    /// This means that the [`Xpriv`](bitcoin::bip32::Xpriv) is not a valid extended private key
    /// or the derivation index is out of the normal child range.
    #[error("bip32: {0}")]
    Bip32(#[from] bitcoin::bip32::Error),

    /// The key derived for an epoch is not the one the signatory set expects.
    #[error("derived pubkey {derived} for index {index} does not match expected {expected}")]
    PubkeyMismatch {
        /// The derivation index.
        index: u32,

        /// The key listed in the signatory set.
        expected: PublicKey,

        /// The key derived locally.
        derived: PublicKey,
    },
}
