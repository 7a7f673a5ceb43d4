//! A federation of in-process signatories and the spends they co-sign.

use std::sync::Arc;

use bitcoin::{
    bip32::Xpriv,
    secp256k1::{All, PublicKey, Secp256k1},
    Amount, Network, OutPoint, ScriptBuf, TxOut,
};
use oraibtc_bridge_sig_manager::prelude::{LocalSignatory, SignatoryEndpoint};
use oraibtc_bridge_tx_builder::prelude::{
    CustodyUtxo, TxBuildContext, TxKind, TxSigningData, WithdrawalInfo,
};
use oraibtc_common::logging::{self, LoggerConfig};
use oraibtc_key_derivation::{KeyProvider, SignatoryKeys};
use oraibtc_primitives::{
    bridge::{Signatory, SignatorySet, Threshold},
    dest::DestinationCommitment,
};
use oraibtc_test_utils::bridge::MOCK_SIGSET_INDEX;
use tracing::debug;

pub(crate) const DEPOSIT_AMOUNT: Amount = Amount::from_sat(100_000);
pub(crate) const PAYOUT_AMOUNT: Amount = Amount::from_sat(90_000);
pub(crate) const MIN_FEE: Amount = Amount::from_sat(1_000);

pub(crate) fn init_logging(whoami: &str) {
    logging::init(LoggerConfig::new(whoami.to_string()));
}

/// A signatory that holds its own master key.
pub(crate) struct Member {
    pub(crate) name: &'static str,
    pub(crate) pubkey: PublicKey,
    keys: Arc<SignatoryKeys>,
}

/// Signatories sharing custody under one [`SignatorySet`].
pub(crate) struct Federation {
    pub(crate) members: Vec<Member>,
    pub(crate) sigset: SignatorySet,
    secp: Arc<Secp256k1<All>>,
}

impl Federation {
    /// Every member gets `voting_power` and signs with the key derived for [`MOCK_SIGSET_INDEX`].
    pub(crate) fn new(names: &[&'static str], voting_power: u64, threshold: (u64, u64)) -> Self {
        let members: Vec<Member> = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let seed = [i as u8 + 1; 32];
                let master = Xpriv::new_master(Network::Testnet, &seed).expect("valid seed");
                let keys = Arc::new(SignatoryKeys::new(master));
                let pubkey = keys.pubkey(MOCK_SIGSET_INDEX).expect("derive signing key");

                Member { name, pubkey, keys }
            })
            .collect();

        let signatories = members
            .iter()
            .map(|m| Signatory::new(m.pubkey, voting_power))
            .collect();
        let threshold = Threshold::new(threshold.0, threshold.1).expect("valid threshold");
        let sigset = SignatorySet::new(MOCK_SIGSET_INDEX, signatories, threshold)
            .expect("valid signatory set");

        debug!(signatories = members.len(), "federation created");

        Self {
            members,
            sigset,
            secp: Arc::new(Secp256k1::new()),
        }
    }

    pub(crate) fn secp(&self) -> Arc<Secp256k1<All>> {
        self.secp.clone()
    }

    pub(crate) fn member(&self, name: &str) -> &Member {
        self.members
            .iter()
            .find(|m| m.name == name)
            .expect("member should exist")
    }

    /// In-process endpoints for the named members.
    pub(crate) fn endpoints(&self, names: &[&str]) -> Vec<SignatoryEndpoint> {
        names
            .iter()
            .map(|name| {
                let member = self.member(name);
                let client =
                    LocalSignatory::new(member.keys.clone(), member.pubkey, self.secp.clone());

                SignatoryEndpoint::new(member.pubkey, Arc::new(client))
            })
            .collect()
    }

    /// Build a spend of a single deposit locked to `commitment`, returning change to it.
    pub(crate) fn build_spend(
        &self,
        deposit: OutPoint,
        commitment: DestinationCommitment,
    ) -> TxSigningData {
        let withdrawal = WithdrawalInfo::new(
            vec![CustodyUtxo {
                outpoint: deposit,
                amount: DEPOSIT_AMOUNT,
                commitment,
            }],
            vec![TxOut {
                value: PAYOUT_AMOUNT,
                script_pubkey: ScriptBuf::new_op_return([7u8; 4]),
            }],
            MIN_FEE,
            Some(commitment),
        );

        withdrawal
            .construct_signing_data(&TxBuildContext::new(self.sigset.clone(), Network::Testnet))
            .expect("spend should build")
    }
}
