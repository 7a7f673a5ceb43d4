//! Standalone wrappers over [`bitcoin`](bitcoin) to assemble unsigned custody transactions.

use bitcoin::{
    absolute::LockTime, transaction, Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn,
    TxOut, Witness,
};

/// Create a version 2 [`Transaction`] with no locktime for the given inputs and outputs.
pub fn create_tx(tx_ins: Vec<TxIn>, tx_outs: Vec<TxOut>) -> Transaction {
    Transaction {
        version: transaction::Version::TWO,
        lock_time: LockTime::ZERO,
        input: tx_ins,
        output: tx_outs,
    }
}

/// Create a list of [`TxIn`]'s from given [`OutPoint`]'s.
///
/// Each input has a blank `witness`, a blank `script_sig` and the `sequence` set to enable
/// replace-by-fee with no locktime.
pub fn create_tx_ins(utxos: impl IntoIterator<Item = OutPoint>) -> Vec<TxIn> {
    utxos
        .into_iter()
        .map(|previous_output| TxIn {
            previous_output,
            sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
            script_sig: ScriptBuf::default(),
            witness: Witness::new(),
        })
        .collect()
}

/// Create a list of [`TxOut`]'s based on pairs of scripts and corresponding amounts.
pub fn create_tx_outs(
    scripts_and_amounts: impl IntoIterator<Item = (ScriptBuf, Amount)>,
) -> Vec<TxOut> {
    scripts_and_amounts
        .into_iter()
        .map(|(script_pubkey, value)| TxOut {
            script_pubkey,
            value,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use bitcoin::{hashes::Hash, Txid};

    use super::*;

    #[test]
    fn test_create_tx() {
        let outpoints = [
            OutPoint::new(Txid::all_zeros(), 0),
            OutPoint::new(Txid::all_zeros(), 1),
        ];
        let tx_ins = create_tx_ins(outpoints);
        let tx_outs = create_tx_outs([(ScriptBuf::new(), Amount::from_sat(1_000))]);

        let tx = create_tx(tx_ins, tx_outs);

        assert_eq!(tx.input.len(), 2);
        assert_eq!(tx.output.len(), 1);
        assert!(tx.is_explicitly_rbf(), "inputs should signal replace-by-fee");
        assert!(tx.input.iter().all(|i| i.witness.is_empty()));
        assert_eq!(tx.version, transaction::Version::TWO);
    }
}
