//! Hands finalized custody spends to a broadcast endpoint.

use std::str::FromStr;

use async_trait::async_trait;
use bitcoin::{consensus::encode::serialize_hex, Transaction, Txid};
use oraibtc_bridge_sig_manager::manager::SignatureManager;
use reqwest::Client;
use tracing::*;

use crate::errors::{BroadcastError, HandOffError};

/// Node RPC error code for a transaction that is already in the chain.
const RPC_VERIFY_ALREADY_IN_CHAIN: i32 = -27;

/// A broadcast endpoint accepting a serialized signed transaction.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    /// Submit the transaction once and return the txid acknowledged by the endpoint.
    async fn broadcast(&self, tx: &Transaction) -> Result<Txid, BroadcastError>;
}

/// An `async` client for the Esplora `POST /tx` endpoint.
#[derive(Debug, Clone)]
pub struct EsploraClient {
    /// Base URL of the Esplora API, e.g. `https://blockstream.info/testnet/api`.
    base_url: String,

    /// The underlying `async` HTTP client.
    client: Client,
}

impl EsploraClient {
    /// Creates a new [`EsploraClient`] for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        trace!(%base_url, "created esplora client");

        Self {
            base_url,
            client: Client::new(),
        }
    }

    /// Get the base URL the client posts to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Broadcaster for EsploraClient {
    async fn broadcast(&self, tx: &Transaction) -> Result<Txid, BroadcastError> {
        let tx_hex = serialize_hex(tx);
        let url = format!("{}/tx", self.base_url);
        trace!(%url, txid = %tx.compute_txid(), "sending raw transaction");

        let response = self.client.post(&url).body(tx_hex).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        interpret_response(status, &body, tx)
    }
}

/// Turn an endpoint response into the acknowledged txid.
///
/// A rejection because the transaction is already in the chain counts as success.
pub fn interpret_response(status: u16, body: &str, tx: &Transaction) -> Result<Txid, BroadcastError> {
    let expected = tx.compute_txid();

    if !(200..300).contains(&status) {
        if is_already_in_chain(body) {
            debug!(txid = %expected, "transaction already in chain");
            return Ok(expected);
        }

        return Err(BroadcastError::Rejected {
            status,
            body: body.trim().to_string(),
        });
    }

    let returned =
        Txid::from_str(body.trim()).map_err(|_| BroadcastError::MalformedTxid(body.to_string()))?;

    if returned != expected {
        return Err(BroadcastError::TxidMismatch { expected, returned });
    }

    Ok(returned)
}

fn is_already_in_chain(body: &str) -> bool {
    body.contains(&format!("\"code\":{RPC_VERIFY_ALREADY_IN_CHAIN}"))
        || body.contains("already in block chain")
}

/// Finalize a fully signed spend, hand it to `broadcaster` and record the hand-off.
///
/// A spend is handed off at most once, even with concurrent callers. Nothing is recorded when the
/// broadcast fails so that the caller can retry.
pub async fn broadcast_spend(
    manager: &SignatureManager,
    broadcaster: &impl Broadcaster,
    txid: &Txid,
) -> Result<Txid, HandOffError> {
    let spend_txid = *txid;

    let broadcast_txid = manager
        .hand_off(txid, |signed_tx| async move {
            broadcaster.broadcast(&signed_tx).await.map_err(|err| {
                warn!(txid = %spend_txid, %err, "broadcast failed");
                HandOffError::from(err)
            })
        })
        .await?;

    info!(%txid, "custody spend broadcast");

    Ok(broadcast_txid)
}
