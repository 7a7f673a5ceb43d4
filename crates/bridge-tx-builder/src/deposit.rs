//! Recover the transfer intent behind a deposit address.
//!
//! A deposit address only commits to the hash of its intent, so it can only be recovered by
//! re-deriving addresses for every intent the depositor may have used. Timeouts are hour-aligned,
//! which makes the candidate set for a given day small enough to scan.

use bitcoin::{Address, Network};
use oraibtc_primitives::{bridge::SignatorySet, dest::IbcDest};
use tracing::{debug, trace};

use crate::{address::derive_deposit_address, errors::BridgeTxBuilderResult};

/// A deposit destination recovered by [`find_deposit_destination`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveredDeposit {
    /// The intent whose address matched.
    pub dest: IbcDest,

    /// The index of the signatory set the address was derived from.
    pub sigset_index: u32,

    /// The bytes to register with the relayer for this deposit.
    pub relayer_dest_bytes: Vec<u8>,
}

/// Find the intent among `template` with each of `candidate_timeouts` whose deposit address is
/// `address`.
///
/// Returns `None` if no candidate matches.
///
/// # Errors
///
/// If the template cannot be encoded or the script cannot be built for this set.
pub fn find_deposit_destination(
    sigset: &SignatorySet,
    template: &IbcDest,
    candidate_timeouts: impl IntoIterator<Item = u64>,
    address: &Address,
    network: Network,
) -> BridgeTxBuilderResult<Option<RecoveredDeposit>> {
    let target = address.script_pubkey();

    for timeout in candidate_timeouts {
        let dest = template.with_timeout(timeout);
        let (candidate, _) = derive_deposit_address(sigset, &dest, network)?;

        trace!(%candidate, timeout, "checking deposit candidate");

        if candidate.script_pubkey() == target {
            debug!(%address, timeout, sigset_index = sigset.index(), "recovered deposit destination");

            let relayer_dest_bytes = dest.relayer_dest_bytes()?;

            return Ok(Some(RecoveredDeposit {
                dest,
                sigset_index: sigset.index(),
                relayer_dest_bytes,
            }));
        }
    }

    Ok(None)
}
