//! Derive the segwit v0 custody address that a redeem script locks.

use bitcoin::{Address, Network, Script, ScriptBuf};
use oraibtc_primitives::{bridge::SignatorySet, dest::IbcDest};

use crate::{errors::BridgeTxBuilderResult, script::derive_redeem_script_for_dest};

/// Wrap the redeem script in a P2WSH address for `network`.
pub fn derive_address(redeem_script: &Script, network: Network) -> Address {
    Address::p2wsh(redeem_script, network)
}

/// The P2WSH `script_pubkey` locking funds to the redeem script.
pub fn custody_script_pubkey(redeem_script: &Script) -> ScriptBuf {
    redeem_script.to_p2wsh()
}

/// Derive the deposit address for a transfer intent along with the redeem script behind it.
pub fn derive_deposit_address(
    sigset: &SignatorySet,
    dest: &IbcDest,
    network: Network,
) -> BridgeTxBuilderResult<(Address, ScriptBuf)> {
    let redeem_script = derive_redeem_script_for_dest(sigset, dest)?;
    let address = derive_address(&redeem_script, network);

    Ok((address, redeem_script))
}

#[cfg(test)]
mod tests {
    use bitcoin::address::AddressType;
    use oraibtc_test_utils::{
        bridge::{mock_ibc_dest, mock_signatory_set},
        ArbitraryGenerator,
    };

    use super::*;

    #[test]
    fn test_address_per_network() {
        let sigset = mock_signatory_set(&[10, 10, 10], (2, 3));
        let dest = mock_ibc_dest();

        let (testnet, script) = derive_deposit_address(&sigset, &dest, Network::Testnet).unwrap();
        let (mainnet, _) = derive_deposit_address(&sigset, &dest, Network::Bitcoin).unwrap();

        assert_eq!(testnet.address_type(), Some(AddressType::P2wsh));
        assert!(testnet.to_string().starts_with("tb1q"));
        assert!(mainnet.to_string().starts_with("bc1q"));

        // only the encoding differs between networks
        assert_eq!(testnet.script_pubkey(), mainnet.script_pubkey());
        assert_eq!(testnet.script_pubkey(), custody_script_pubkey(&script));
    }

    #[test]
    fn test_distinct_destinations_give_distinct_addresses() {
        let sigset = mock_signatory_set(&[10, 10, 10], (2, 3));
        let dest = mock_ibc_dest();
        let mut other = dest.clone();
        other.receiver.push('x');

        let (first, _) = derive_deposit_address(&sigset, &dest, Network::Testnet).unwrap();
        let (again, _) = derive_deposit_address(&sigset, &dest, Network::Testnet).unwrap();
        let (second, _) = derive_deposit_address(&sigset, &other, Network::Testnet).unwrap();

        assert_eq!(first, again, "derivation should be deterministic");
        assert_ne!(first, second, "addresses should be bound to the destination");
    }

    #[test]
    fn test_arbitrary_destinations() {
        let sigset = mock_signatory_set(&[10, 10, 10], (2, 3));
        let generator = ArbitraryGenerator::new();

        for _ in 0..20 {
            let mut dest: IbcDest = generator.generate();
            dest.source_port = "transfer".to_string();
            dest.source_channel = "channel-0".to_string();

            let (address, script) = derive_deposit_address(&sigset, &dest, Network::Regtest)
                .expect("any intent with identifiers should derive an address");

            assert_eq!(address.script_pubkey(), script.to_p2wsh());
            assert_eq!(
                derive_deposit_address(&sigset, &dest, Network::Regtest).unwrap().0,
                address
            );
        }
    }
}
