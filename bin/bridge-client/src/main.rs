//! Bridge client for the oraibtc custody.
//!
//! Derives and registers deposit addresses, recovers the destination of past deposits, estimates
//! custody fees, derives a signatory's per-epoch key and broadcasts finalized spends.

mod args;
mod cmd;
mod config;
mod constants;
mod xpriv;

use args::{Cli, Commands};
use config::Config;
use oraibtc_common::logging::{self, LoggerConfig};
use tracing::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init(LoggerConfig::with_base_name("oraibtc-bridge-client"));

    let cli: Cli = argh::from_env();
    let config = Config::load(cli.config.as_deref())?;

    info!(network = %config.network, relayer = config.primary_relayer(), "running bridge client");

    let result = match cli.cmd {
        Commands::DepositAddress(args) => cmd::deposit_address(args, &config).await,
        Commands::RecoverDeposit(args) => cmd::recover_deposit(args, &config).await,
        Commands::Fees(args) => cmd::fees(args, &config).await,
        Commands::SignatoryPubkey(args) => cmd::signatory_pubkey(args, &config).await,
        Commands::Broadcast(args) => cmd::broadcast(args, &config).await,
    };

    if let Err(e) = &result {
        error!(err = %e, "command failed");
    }

    logging::finalize();

    result
}
