//! Build bitcoin scripts and transactions for the custody address.
//!
//! Handles creation of the weighted-threshold redeem script via `bitcoin-rs` and provides
//! high-level APIs to derive deposit addresses and the unsigned transactions that spend from them.

use builder::TxSigningData;
use context::BuildContext;
use errors::BridgeTxBuilderResult;

pub mod address;
pub mod builder;
pub mod constants;
pub mod context;
pub mod deposit;
pub mod errors;
pub mod fees;
pub mod operations;
pub mod prelude;
pub mod script;
pub mod withdrawal;

/// Trait for any (bridge) transaction.
///
/// This is implemented by any struct that contains bridge-specific information to create
/// transactions.
pub trait TxKind {
    /// Construct the unsigned transaction along with the information required to collect
    /// signatures for it.
    fn construct_signing_data<C: BuildContext>(
        &self,
        build_context: &C,
    ) -> BridgeTxBuilderResult<TxSigningData>;
}
