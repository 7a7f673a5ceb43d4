//! Configuration of the bridge client, read from a toml file and overridden from the environment.

use std::{fs, path::Path};

use anyhow::Context;
use bitcoin::Network;
use oraibtc_common::env::parse_env;
use serde::{Deserialize, Serialize};
use tracing::*;

use crate::constants::{
    DEFAULT_ESPLORA_URL, DEFAULT_IBC_CHANNEL, DEFAULT_IBC_PORT, DEFAULT_IBC_TIMEOUT_SECS,
    DEFAULT_RELAYER, ESPLORA_URL_ENVVAR, IBC_CHANNEL_ENVVAR, NETWORK_ENVVAR, RELAYER_ENVVAR,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Config {
    /// The bitcoin network addresses are encoded for.
    pub network: Network,

    /// Relayers serving the signatory set and indexing deposit addresses. The first one is queried.
    pub relayers: Vec<String>,

    /// Base URL of the Esplora API.
    pub esplora_url: String,

    pub ibc_port: String,

    pub ibc_channel: String,

    /// Lifetime of a deposit's IBC transfer in seconds.
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: Network::Testnet,
            relayers: vec![DEFAULT_RELAYER.to_string()],
            esplora_url: DEFAULT_ESPLORA_URL.to_string(),
            ibc_port: DEFAULT_IBC_PORT.to_string(),
            ibc_channel: DEFAULT_IBC_CHANNEL.to_string(),
            timeout_secs: DEFAULT_IBC_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Load the config at `path`, or the defaults, and apply the environment overrides.
    pub(crate) fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from_path(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides();

        if config.relayers.is_empty() {
            anyhow::bail!("config: no relayers configured");
        }

        debug!(?config, "loaded config");

        Ok(config)
    }

    fn load_from_path(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("error loading config file {}", path.display()))?;

        Self::from_toml(&contents)
    }

    fn from_toml(contents: &str) -> anyhow::Result<Self> {
        toml::from_str::<Config>(contents).context("invalid config data")
    }

    fn apply_env_overrides(&mut self) {
        if let Some(relayer) = parse_env::<String>(RELAYER_ENVVAR) {
            self.relayers = vec![relayer];
        }

        if let Some(channel) = parse_env(IBC_CHANNEL_ENVVAR) {
            self.ibc_channel = channel;
        }

        if let Some(network) = parse_env(NETWORK_ENVVAR) {
            self.network = network;
        }

        if let Some(url) = parse_env(ESPLORA_URL_ENVVAR) {
            self.esplora_url = url;
        }
    }

    /// The relayer queried for the signatory set.
    pub(crate) fn primary_relayer(&self) -> &str {
        // `load` rejects an empty list
        self.relayers.first().map(String::as_str).unwrap_or(DEFAULT_RELAYER)
    }
}
