//! Key derivation for custody signatories.
//!
//! Every checkpoint epoch locks funds to a fresh set of keys. A signatory derives the key for an
//! epoch from its master [`Xpriv`](bitcoin::bip32::Xpriv) using the signatory set index as the
//! (normal) child number, so rotating keys needs no extra key-exchange round.

pub mod error;
pub mod signatory;

pub use signatory::{signatory_pubkey, KeyProvider, SignatoryKeys};
