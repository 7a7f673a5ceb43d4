//! Error types for the broadcast and relayer clients.

use bitcoin::Txid;
use oraibtc_bridge_sig_manager::errors::BridgeSigError;
use oraibtc_primitives::errors::SignatorySetError;
use thiserror::Error;

/// Failures handing a transaction to the broadcast endpoint.
///
/// These are never retried here, the retry policy belongs to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BroadcastError {
    /// The endpoint could not be reached or the request failed in transit.
    #[error("transport: {0}")]
    Transport(String),

    /// The endpoint answered with a non-success status.
    #[error("broadcast rejected with status {status}: {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,

        /// Response body, usually the node's rejection reason.
        body: String,
    },

    /// The endpoint reported success but the body is not a txid.
    #[error("malformed txid in response: {0}")]
    MalformedTxid(String),

    /// The endpoint acknowledged a different transaction than the one submitted.
    #[error("endpoint returned txid {returned}, expected {expected}")]
    TxidMismatch {
        /// The txid of the submitted transaction.
        expected: Txid,

        /// The txid the endpoint returned.
        returned: Txid,
    },
}

/// Failures finalizing a spend and handing it off.
#[derive(Debug, Clone, Error)]
pub enum HandOffError {
    /// The spend could not be finalized or recorded.
    #[error("signature manager: {0}")]
    Sig(#[from] BridgeSigError),

    /// The broadcast endpoint did not accept the spend.
    #[error("broadcast: {0}")]
    Broadcast(#[from] BroadcastError),
}

/// Failures talking to the relayer.
#[derive(Debug, Clone, Error)]
pub enum RelayerError {
    /// The relayer could not be reached or the request failed in transit.
    #[error("transport: {0}")]
    Transport(String),

    /// The relayer answered with a non-success status.
    #[error("relayer returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,

        /// Response body.
        body: String,
    },

    /// The response body could not be decoded.
    #[error("could not parse relayer response: {0}")]
    Parse(String),

    /// The served signatory set violates the set invariants.
    #[error("relayer served an invalid signatory set: {0}")]
    InvalidSigset(#[from] SignatorySetError),
}

impl From<reqwest::Error> for BroadcastError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(value.to_string())
    }
}

impl From<reqwest::Error> for RelayerError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(value.to_string())
    }
}
