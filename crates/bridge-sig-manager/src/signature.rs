//! Types related to the signatures signatories contribute to a custody spend.

use bitcoin::ecdsa;
use serde::{Deserialize, Serialize};

/// A signature over one input of a spend along with the position of its signer in the signatory
/// set so that it can be verified at the callsite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureInfo {
    /// The ECDSA signature including its sighash type.
    signature: ecdsa::Signature,

    /// The position of the signer in the declared order of the signatory set.
    signer_index: usize,
}

impl SignatureInfo {
    /// Create a new [`SignatureInfo`].
    pub fn new(signature: ecdsa::Signature, signer_index: usize) -> Self {
        Self {
            signature,
            signer_index,
        }
    }

    /// Get the signature.
    pub fn signature(&self) -> &ecdsa::Signature {
        &self.signature
    }

    /// Get the position of the signer.
    pub fn signer_index(&self) -> usize {
        self.signer_index
    }
}
