/// The relayer used when neither the config nor `RELAYER` names one.
pub(super) const DEFAULT_RELAYER: &str = "https://btc.relayer.orai.io";

pub(super) const DEFAULT_ESPLORA_URL: &str = "https://blockstream.info/testnet/api";

pub(super) const DEFAULT_IBC_PORT: &str = "transfer";

pub(super) const DEFAULT_IBC_CHANNEL: &str = "channel-0";

/// How long a deposit address stays valid before its IBC transfer times out, 5 days.
pub(super) const DEFAULT_IBC_TIMEOUT_SECS: u64 = 5 * 24 * 60 * 60;

pub(super) const RELAYER_ENVVAR: &str = "RELAYER";
pub(super) const IBC_CHANNEL_ENVVAR: &str = "IBC_CHANNEL";
pub(super) const NETWORK_ENVVAR: &str = "NETWORK";
pub(super) const ESPLORA_URL_ENVVAR: &str = "ESPLORA_URL";
