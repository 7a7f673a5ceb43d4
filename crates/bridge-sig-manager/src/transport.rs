//! The seam between the coordinator and the signatories it asks for signatures.
//!
//! The coordinator only knows [`SignatoryClient`]. Remote signatories are reached through whatever
//! transport implements it, [`LocalSignatory`] signs in-process with a [`KeyProvider`].

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use bitcoin::{
    ecdsa,
    secp256k1::{All, Message, PublicKey, Secp256k1},
    Txid,
};
use oraibtc_key_derivation::{error::KeyError, KeyProvider};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{errors::SignatoryError, operations::sign_message};

/// A request for signatures over every input of a spend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningRequest {
    /// The spend being signed.
    pub txid: Txid,

    /// The derivation index of the signatory set, i.e. its index.
    pub derivation_index: u32,

    /// The sighash of each input in input order.
    pub sighashes: Vec<[u8; 32]>,
}

/// Anything able to return a signatory's signatures for a [`SigningRequest`].
///
/// A response must hold exactly one signature per sighash, in the same order.
#[async_trait]
pub trait SignatoryClient: Send + Sync {
    /// Sign every sighash of the request.
    async fn sign(&self, request: &SigningRequest) -> Result<Vec<ecdsa::Signature>, SignatoryError>;
}

/// A signatory and the client used to reach it.
#[derive(Clone)]
pub struct SignatoryEndpoint {
    /// The key the signatory signs with in the current set.
    pub pubkey: PublicKey,

    /// The transport to the signatory.
    pub client: Arc<dyn SignatoryClient>,
}

impl fmt::Debug for SignatoryEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "signatory endpoint: {}", self.pubkey)
    }
}

impl SignatoryEndpoint {
    /// Create a new [`SignatoryEndpoint`].
    pub fn new(pubkey: PublicKey, client: Arc<dyn SignatoryClient>) -> Self {
        Self { pubkey, client }
    }
}

/// A signatory whose keys live in this process.
#[derive(Clone)]
pub struct LocalSignatory {
    keys: Arc<dyn KeyProvider>,

    /// The key the set expects this signatory to sign with.
    expected: PublicKey,

    secp: Arc<Secp256k1<All>>,
}

impl fmt::Debug for LocalSignatory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "local signatory: {}", self.expected)
    }
}

impl LocalSignatory {
    /// Create a new [`LocalSignatory`] expected to sign as `expected`.
    pub fn new(keys: Arc<dyn KeyProvider>, expected: PublicKey, secp: Arc<Secp256k1<All>>) -> Self {
        Self {
            keys,
            expected,
            secp,
        }
    }
}

#[async_trait]
impl SignatoryClient for LocalSignatory {
    async fn sign(&self, request: &SigningRequest) -> Result<Vec<ecdsa::Signature>, SignatoryError> {
        let keypair = self.keys.signing_keypair(request.derivation_index)?;

        let derived = keypair.public_key();
        if derived != self.expected {
            return Err(KeyError::PubkeyMismatch {
                index: request.derivation_index,
                expected: self.expected,
                derived,
            })?;
        }

        debug!(txid = %request.txid, pubkey = %derived, inputs = request.sighashes.len(), "signing locally");

        let secret_key = keypair.secret_key();
        Ok(request
            .sighashes
            .iter()
            .map(|sighash| sign_message(&self.secp, &Message::from_digest(*sighash), &secret_key))
            .collect())
    }
}
