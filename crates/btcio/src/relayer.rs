//! Client for the relayer that serves the current signatory set and indexes deposit addresses.

use base64::{engine::general_purpose, Engine};
use bitcoin::Address;
use oraibtc_primitives::bridge::{SignatorySet, SigsetSnapshot};
use reqwest::Client;
use serde::Serialize;
use tracing::*;

use crate::errors::RelayerError;

/// Query parameters of the deposit address registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterDepositQuery {
    /// The deposit address.
    pub deposit_addr: String,

    /// Index of the signatory set the address was derived from.
    pub sigset_index: u32,

    /// Base64 of the relayer destination bytes.
    pub dest_bytes: String,
}

impl RegisterDepositQuery {
    /// Build the query for a deposit address.
    pub fn new(address: &Address, sigset_index: u32, dest_bytes: &[u8]) -> Self {
        Self {
            deposit_addr: address.to_string(),
            sigset_index,
            dest_bytes: general_purpose::STANDARD.encode(dest_bytes),
        }
    }
}

/// An `async` client for a single relayer.
#[derive(Debug, Clone)]
pub struct RelayerClient {
    /// Base URL of the relayer.
    url: String,

    /// The underlying `async` HTTP client.
    client: Client,
}

impl RelayerClient {
    /// Creates a new [`RelayerClient`] for the relayer at `url`.
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into().trim_end_matches('/').to_string();

        Self {
            url,
            client: Client::new(),
        }
    }

    /// Get the relayer URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch the snapshot of the current signatory set.
    pub async fn get_sigset(&self) -> Result<SigsetSnapshot, RelayerError> {
        let url = format!("{}/sigset", self.url);
        trace!(%url, "fetching signatory set");

        let response = self.client.get(&url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        parse_sigset_response(status, &body)
    }

    /// Fetch the current signatory set along with its snapshot.
    pub async fn get_signatory_set(&self) -> Result<(SignatorySet, SigsetSnapshot), RelayerError> {
        let snapshot = self.get_sigset().await?;
        let sigset = SignatorySet::try_from(&snapshot)?;

        debug!(index = sigset.index(), signatories = sigset.len(), "fetched signatory set");

        Ok((sigset, snapshot))
    }

    /// Ask the relayer to watch a deposit address and relay deposits to `dest_bytes`.
    pub async fn register_deposit_address(
        &self,
        address: &Address,
        sigset_index: u32,
        dest_bytes: &[u8],
    ) -> Result<(), RelayerError> {
        let url = format!("{}/address", self.url);
        let query = RegisterDepositQuery::new(address, sigset_index, dest_bytes);

        let response = self.client.post(&url).query(&query).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayerError::Status {
                status: status.as_u16(),
                body,
            });
        }

        info!(%address, sigset_index, relayer = %self.url, "registered deposit address");

        Ok(())
    }
}

/// Decode the relayer's `/sigset` response.
pub fn parse_sigset_response(status: u16, body: &str) -> Result<SigsetSnapshot, RelayerError> {
    if !(200..300).contains(&status) {
        return Err(RelayerError::Status {
            status,
            body: body.to_string(),
        });
    }

    serde_json::from_str(body).map_err(|e| RelayerError::Parse(e.to_string()))
}
