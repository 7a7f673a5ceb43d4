//! The context shared by every transaction that spends from the custody address.

use bitcoin::Network;
use oraibtc_primitives::bridge::SignatorySet;

/// Provides access to the components required to build a transaction spending custodied funds.
pub trait BuildContext {
    /// Get the signatory set whose redeem scripts lock the spent UTXOs.
    fn signatory_set(&self) -> &SignatorySet;

    /// Get the bitcoin network for which the builder constructs transactions.
    fn network(&self) -> &Network;
}

/// A builder context for raw custody transactions.
#[derive(Debug, Clone)]
pub struct TxBuildContext {
    /// The signatory set of the epoch the UTXOs were locked in.
    signatory_set: SignatorySet,

    /// The network to build the transactions for.
    network: Network,
}

impl TxBuildContext {
    /// Create a new [`TxBuildContext`].
    pub fn new(signatory_set: SignatorySet, network: Network) -> Self {
        Self {
            signatory_set,
            network,
        }
    }
}

impl BuildContext for TxBuildContext {
    fn signatory_set(&self) -> &SignatorySet {
        &self.signatory_set
    }

    fn network(&self) -> &Network {
        &self.network
    }
}
