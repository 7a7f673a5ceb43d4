//! Handlers of the bridge-client subcommands.

use anyhow::Context;
use bitcoin::{address::NetworkUnchecked, consensus::encode::deserialize_hex, Address, Transaction};
use chrono::{Duration, Utc};
use oraibtc_bridge_tx_builder::prelude::{
    deposit_fee, derive_deposit_address, fee_rate_from_miner_fee, find_deposit_destination,
    withdrawal_fee,
};
use oraibtc_btcio::{
    broadcaster::{Broadcaster, EsploraClient},
    relayer::RelayerClient,
};
use oraibtc_key_derivation::KeyProvider;
use oraibtc_primitives::{
    bridge::{SignatorySet, SigsetSnapshot},
    dest::{hourly_timeouts, ibc_timeout_timestamp, IbcDest},
};
use tracing::*;

use crate::{
    args::{
        BroadcastArgs, DepositAddressArgs, FeesArgs, RecoverDepositArgs, SignatoryPubkeyArgs,
    },
    config::Config,
    xpriv::{resolve_xpriv, SIGNATORY_XPRIV_ENVVAR},
};

pub(crate) async fn deposit_address(args: DepositAddressArgs, config: &Config) -> anyhow::Result<()> {
    let (sigset, snapshot) = fetch_sigset(config).await?;
    if !snapshot.deposits_enabled {
        anyhow::bail!("deposits are disabled for signatory set {}", sigset.index());
    }

    let ttl = Duration::try_seconds(i64::try_from(config.timeout_secs)?)
        .context("config: timeout_secs out of range")?;
    let timeout_timestamp = ibc_timeout_timestamp(Utc::now(), ttl)?;
    let dest = IbcDest {
        source_port: config.ibc_port.clone(),
        source_channel: config.ibc_channel.clone(),
        receiver: args.receiver,
        sender: args.sender,
        timeout_timestamp,
        memo: args.memo.unwrap_or_default(),
    };

    let (address, _) = derive_deposit_address(&sigset, &dest, config.network)?;
    info!(%address, sigset_index = sigset.index(), timeout = dest.timeout_timestamp, "derived deposit address");

    if args.register {
        register(config, &address, sigset.index(), &dest).await?;
    }

    println!("{address}");

    Ok(())
}

pub(crate) async fn recover_deposit(args: RecoverDepositArgs, config: &Config) -> anyhow::Result<()> {
    let address = parse_address(&args.address, config)?;
    let (sigset, _) = fetch_sigset(config).await?;

    let template = IbcDest {
        source_port: config.ibc_port.clone(),
        source_channel: config.ibc_channel.clone(),
        receiver: args.receiver,
        sender: args.sender,
        timeout_timestamp: 0,
        memo: args.memo.unwrap_or_default(),
    };

    let Some(recovered) = find_deposit_destination(
        &sigset,
        &template,
        hourly_timeouts(args.date),
        &address,
        config.network,
    )?
    else {
        anyhow::bail!(
            "{address} is not a deposit address of signatory set {} for any timeout on {}",
            sigset.index(),
            args.date
        );
    };

    if args.register {
        register(config, &address, recovered.sigset_index, &recovered.dest).await?;
    }

    println!("timeout_timestamp: {}", recovered.dest.timeout_timestamp);
    println!("sigset_index: {}", recovered.sigset_index);

    Ok(())
}

pub(crate) async fn fees(args: FeesArgs, config: &Config) -> anyhow::Result<()> {
    let (sigset, snapshot) = fetch_sigset(config).await?;
    let num_signatories = sigset.len();

    let fee_rate = args
        .fee_rate
        .unwrap_or_else(|| fee_rate_from_miner_fee(snapshot.miner_fee_rate, num_signatories));
    if fee_rate == 0 {
        anyhow::bail!("fee rate must be at least 1 sat/vbyte");
    }

    println!("signatory set: {} ({num_signatories} signatories)", sigset.index());
    println!("fee rate: {fee_rate} sat/vbyte");
    println!("deposit fee: {} sat", deposit_fee(num_signatories, fee_rate).to_sat());
    println!("bridge fee rate: {}", snapshot.bridge_fee_rate);

    if let Some(withdrawal_address) = args.withdrawal_address {
        let address = parse_address(&withdrawal_address, config)?;
        let fee = withdrawal_fee(&address.script_pubkey(), fee_rate);
        println!("withdrawal fee: {} sat", fee.to_sat());
    }

    Ok(())
}

pub(crate) async fn signatory_pubkey(
    args: SignatoryPubkeyArgs,
    config: &Config,
) -> anyhow::Result<()> {
    let keys = resolve_xpriv(
        args.xpriv,
        args.xpriv_path,
        std::env::var(SIGNATORY_XPRIV_ENVVAR).ok(),
    )?;

    let (index, sigset) = match args.index {
        Some(index) => (index, None),
        None => {
            let (sigset, _) = fetch_sigset(config).await?;
            (sigset.index(), Some(sigset))
        }
    };

    let pubkey = keys.pubkey(index)?;

    println!("master xpub: {}", keys.master_xpub());
    println!("signatory set {index}: {pubkey}");

    if let Some(sigset) = sigset {
        match sigset.position_of(&pubkey) {
            Some(position) => println!("member of the current set at position {position}"),
            None => warn!(%pubkey, index, "key is not a member of the current signatory set"),
        }
    }

    Ok(())
}

pub(crate) async fn broadcast(args: BroadcastArgs, config: &Config) -> anyhow::Result<()> {
    let tx: Transaction =
        deserialize_hex(args.tx_hex.trim()).context("invalid raw transaction hex")?;

    let client = EsploraClient::new(config.esplora_url.as_str());
    let txid = client.broadcast(&tx).await?;

    println!("{txid}");

    Ok(())
}

async fn fetch_sigset(config: &Config) -> anyhow::Result<(SignatorySet, SigsetSnapshot)> {
    let relayer = RelayerClient::new(config.primary_relayer());

    relayer
        .get_signatory_set()
        .await
        .with_context(|| format!("fetching signatory set from {}", relayer.url()))
}

async fn register(
    config: &Config,
    address: &Address,
    sigset_index: u32,
    dest: &IbcDest,
) -> anyhow::Result<()> {
    let dest_bytes = dest.relayer_dest_bytes()?;

    for url in &config.relayers {
        RelayerClient::new(url.as_str())
            .register_deposit_address(address, sigset_index, &dest_bytes)
            .await
            .with_context(|| format!("registering {address} with {url}"))?;
    }

    Ok(())
}

fn parse_address(address: &str, config: &Config) -> anyhow::Result<Address> {
    let address = address
        .parse::<Address<NetworkUnchecked>>()
        .with_context(|| format!("invalid address {address}"))?;

    Ok(address.require_network(config.network)?)
}
