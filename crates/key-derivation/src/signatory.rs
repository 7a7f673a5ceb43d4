//! Per-epoch signing keys of a custody signatory.
//!
//! The key for signatory set `index` is the normal child `m/<index>` of the master [`Xpriv`]. Using
//! a normal (non-hardened) child means the public keys of future sets can be computed by anyone
//! holding the master [`Xpub`], which is how the validator set assembles new signatory sets.

use bitcoin::{
    bip32::{ChildNumber, Xpriv, Xpub},
    secp256k1::{Keypair, PublicKey},
};
use secp256k1::SECP256K1;
#[cfg(feature = "zeroize")]
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::KeyError;

/// Gives out the signing key of a signatory for a given signatory set index.
pub trait KeyProvider: Send + Sync {
    /// Get the keypair used to sign for the set with `derivation_index`.
    fn signing_keypair(&self, derivation_index: u32) -> Result<Keypair, KeyError>;

    /// Get the public key used in the set with `derivation_index`.
    fn pubkey(&self, derivation_index: u32) -> Result<PublicKey, KeyError> {
        Ok(self.signing_keypair(derivation_index)?.public_key())
    }
}

/// A signatory's master key from which all per-epoch keys are derived.
#[derive(Debug, Clone)]
pub struct SignatoryKeys {
    /// The signatory's master [`Xpriv`].
    master: Xpriv,
}

impl SignatoryKeys {
    /// Creates a new [`SignatoryKeys`] from a master [`Xpriv`].
    pub fn new(master: Xpriv) -> Self {
        Self { master }
    }

    /// Signatory's master [`Xpub`], shared with whoever assembles the signatory sets.
    pub fn master_xpub(&self) -> Xpub {
        Xpub::from_priv(SECP256K1, &self.master)
    }

    /// The [`Xpriv`] for the set with `derivation_index`.
    pub fn signing_xpriv(&self, derivation_index: u32) -> Result<Xpriv, KeyError> {
        let child = ChildNumber::from_normal_idx(derivation_index)?;

        Ok(self.master.derive_priv(SECP256K1, &[child])?)
    }
}

impl KeyProvider for SignatoryKeys {
    fn signing_keypair(&self, derivation_index: u32) -> Result<Keypair, KeyError> {
        Ok(self.signing_xpriv(derivation_index)?.to_keypair(SECP256K1))
    }
}

/// Derive the public key a signatory uses in the set with `derivation_index` from its master
/// [`Xpub`].
pub fn signatory_pubkey(xpub: &Xpub, derivation_index: u32) -> Result<PublicKey, KeyError> {
    let child = ChildNumber::from_normal_idx(derivation_index)?;

    Ok(xpub.derive_pub(SECP256K1, &[child])?.public_key)
}

#[cfg(feature = "zeroize")]
impl Zeroize for SignatoryKeys {
    fn zeroize(&mut self) {
        let Self { master } = self;

        // The network and child number are public parameters and are left as they are.
        master.depth.zeroize();
        {
            let fingerprint: &mut [u8; 4] = master.parent_fingerprint.as_mut();
            fingerprint.zeroize();
        }
        master.private_key.non_secure_erase();
        {
            let chaincode: &mut [u8; 32] = master.chain_code.as_mut();
            chaincode.zeroize();
        }
    }
}

#[cfg(feature = "zeroize")]
impl ZeroizeOnDrop for SignatoryKeys {}

#[cfg(feature = "zeroize")]
impl Drop for SignatoryKeys {
    fn drop(&mut self) {
        self.zeroize();
    }
}
