//! The output of the transaction builder handed to the signature manager.

use bitcoin::{ScriptBuf, Transaction, TxOut};

/// All the information necessary to collect signatures for and finalize a custody spend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxSigningData {
    /// The unsigned transaction (with the `script_sig` and `witness` fields not set).
    pub unsigned_tx: Transaction,

    /// The list of prevouts for each input in the unsigned transaction respectively.
    pub prevouts: Vec<TxOut>,

    /// The redeem script locking each input in the unsigned transaction respectively.
    pub redeem_scripts: Vec<ScriptBuf>,
}
