//! Parses command-line arguments for the bridge-client CLI.
use std::path::PathBuf;

use argh::FromArgs;
use chrono::NaiveDate;

#[derive(Debug, FromArgs)]
#[argh(name = "oraibtc-bridge-client")]
#[argh(description = "Operator tooling for the oraibtc bitcoin custody")]
pub(crate) struct Cli {
    #[argh(
        option,
        description = "path to the toml config file (default: testnet defaults, overridable from the environment)"
    )]
    pub config: Option<PathBuf>,

    #[argh(subcommand)]
    pub cmd: Commands,
}

#[derive(Debug, FromArgs)]
#[argh(subcommand)]
pub(crate) enum Commands {
    DepositAddress(DepositAddressArgs),
    RecoverDeposit(RecoverDepositArgs),
    Fees(FeesArgs),
    SignatoryPubkey(SignatoryPubkeyArgs),
    Broadcast(BroadcastArgs),
}

/// Derive a deposit address that relays funds to `receiver` over IBC.
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "deposit-address")]
pub(crate) struct DepositAddressArgs {
    #[argh(positional, description = "bech32 account credited on the destination chain")]
    pub receiver: String,

    #[argh(option, description = "bech32 account on the bridge chain forwarding the transfer")]
    pub sender: String,

    #[argh(option, description = "memo forwarded with the IBC packet (default: empty)")]
    pub memo: Option<String>,

    #[argh(switch, description = "register the address with every configured relayer")]
    pub register: bool,
}

/// Recover the destination of a deposit address derived on a given day.
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "recover-deposit")]
pub(crate) struct RecoverDepositArgs {
    #[argh(positional, description = "the deposit address to recover")]
    pub address: String,

    #[argh(option, description = "bech32 account credited on the destination chain")]
    pub receiver: String,

    #[argh(option, description = "bech32 account on the bridge chain forwarding the transfer")]
    pub sender: String,

    #[argh(option, description = "UTC day the IBC timeout falls on, as YYYY-MM-DD")]
    pub date: NaiveDate,

    #[argh(option, description = "memo forwarded with the IBC packet (default: empty)")]
    pub memo: Option<String>,

    #[argh(switch, description = "register the recovered address with every configured relayer")]
    pub register: bool,
}

/// Print the custody fees for the current signatory set.
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "fees")]
pub(crate) struct FeesArgs {
    #[argh(
        option,
        description = "fee rate in sat/vbyte (default: derived from the miner fee advertised by the relayer)"
    )]
    pub fee_rate: Option<u64>,

    #[argh(option, description = "withdrawal address to estimate the output fee for")]
    pub withdrawal_address: Option<String>,
}

/// Derive this signatory's public key for a signatory set.
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "signatory-pubkey")]
pub(crate) struct SignatoryPubkeyArgs {
    #[argh(
        option,
        description = "signatory set index to derive for (default: the current set served by the relayer)"
    )]
    pub index: Option<u32>,

    #[argh(
        option,
        description = "master xpriv, insecure (default: read from envvar ORAIBTC_SIGNATORY_XPRIV)"
    )]
    pub xpriv: Option<String>,

    #[argh(option, description = "path to a file holding the master xpriv")]
    pub xpriv_path: Option<PathBuf>,
}

/// Hand a finalized custody spend to the configured Esplora endpoint, once.
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "broadcast")]
pub(crate) struct BroadcastArgs {
    #[argh(positional, description = "the signed transaction as consensus hex")]
    pub tx_hex: String,
}
