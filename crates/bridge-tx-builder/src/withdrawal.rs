//! Provides types associated with spending custodied funds, i.e. withdrawals.

use bitcoin::{Amount, OutPoint, ScriptBuf, TxOut};
use oraibtc_primitives::dest::DestinationCommitment;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    address::custody_script_pubkey,
    builder::TxSigningData,
    context::BuildContext,
    errors::{BridgeTxBuilderResult, SpendConstructionError},
    operations::{create_tx, create_tx_ins, create_tx_outs},
    script::derive_redeem_script,
    TxKind,
};

/// A UTXO locked to the custody address of a particular destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustodyUtxo {
    /// The outpoint of the custodied output.
    pub outpoint: OutPoint,

    /// The value of the output.
    pub amount: Amount,

    /// The commitment the output's redeem script was derived with.
    pub commitment: DestinationCommitment,
}

/// The information required to create a transaction paying out custodied funds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalInfo {
    /// The custodied UTXOs to spend.
    utxos: Vec<CustodyUtxo>,

    /// The payments made by the transaction.
    payments: Vec<TxOut>,

    /// The absolute fee paid by the transaction.
    fee: Amount,

    /// If set, any amount left over is paid back to the custody address for this commitment.
    change_commitment: Option<DestinationCommitment>,
}

impl TxKind for WithdrawalInfo {
    fn construct_signing_data<C: BuildContext>(
        &self,
        build_context: &C,
    ) -> BridgeTxBuilderResult<TxSigningData> {
        if self.utxos.is_empty() {
            return Err(SpendConstructionError::NoInputs)?;
        }

        if self.payments.is_empty() {
            return Err(SpendConstructionError::NoOutputs)?;
        }

        let sigset = build_context.signatory_set();

        let mut redeem_scripts = Vec::with_capacity(self.utxos.len());
        let mut prevouts = Vec::with_capacity(self.utxos.len());

        for utxo in &self.utxos {
            let redeem_script = derive_redeem_script(sigset, &utxo.commitment)?;

            prevouts.push(TxOut {
                value: utxo.amount,
                script_pubkey: custody_script_pubkey(&redeem_script),
            });
            redeem_scripts.push(redeem_script);
        }

        let available = sum_amounts(self.utxos.iter().map(|u| u.amount))?;
        let paid = sum_amounts(self.payments.iter().map(|p| p.value))?;
        let required = paid
            .checked_add(self.fee)
            .ok_or(SpendConstructionError::AmountOverflow)?;

        let leftover = available.checked_sub(required).ok_or(
            SpendConstructionError::InsufficientFunds {
                available: available.to_sat(),
                required: required.to_sat(),
            },
        )?;

        let mut outputs: Vec<(ScriptBuf, Amount)> = self
            .payments
            .iter()
            .map(|p| (p.script_pubkey.clone(), p.value))
            .collect();

        if let Some(commitment) = &self.change_commitment {
            let change_script = custody_script_pubkey(&derive_redeem_script(sigset, commitment)?);

            if leftover >= change_script.minimal_non_dust() {
                outputs.push((change_script, leftover));
            } else {
                debug!(%leftover, "change below dust, leaving it to the miners");
            }
        }

        let tx_ins = create_tx_ins(self.utxos.iter().map(|u| u.outpoint));
        let unsigned_tx = create_tx(tx_ins, create_tx_outs(outputs));

        debug!(
            txid = %unsigned_tx.compute_txid(),
            inputs = unsigned_tx.input.len(),
            outputs = unsigned_tx.output.len(),
            sigset_index = sigset.index(),
            "built custody spend"
        );

        Ok(TxSigningData {
            unsigned_tx,
            prevouts,
            redeem_scripts,
        })
    }
}

impl WithdrawalInfo {
    /// Create a new withdrawal.
    pub fn new(
        utxos: Vec<CustodyUtxo>,
        payments: Vec<TxOut>,
        fee: Amount,
        change_commitment: Option<DestinationCommitment>,
    ) -> Self {
        Self {
            utxos,
            payments,
            fee,
            change_commitment,
        }
    }

    /// Get the custodied UTXOs spent by the withdrawal.
    pub fn utxos(&self) -> &[CustodyUtxo] {
        &self.utxos[..]
    }

    /// Get the payments made by the withdrawal.
    pub fn payments(&self) -> &[TxOut] {
        &self.payments[..]
    }

    /// Get the fee paid by the withdrawal.
    pub fn fee(&self) -> Amount {
        self.fee
    }
}

fn sum_amounts(amounts: impl Iterator<Item = Amount>) -> BridgeTxBuilderResult<Amount> {
    let mut total = Amount::ZERO;
    for amount in amounts {
        total = total
            .checked_add(amount)
            .ok_or(SpendConstructionError::AmountOverflow)?;
    }

    Ok(total)
}
