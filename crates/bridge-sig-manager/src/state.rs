//! Defines the [`TxState`] type that tracks the state of signature collection for a particular
//! [`Psbt`].

use std::collections::BTreeMap;

use bitcoin::{ecdsa, secp256k1::PublicKey, Psbt, ScriptBuf, Transaction, TxOut, Txid};
use oraibtc_bridge_tx_builder::{prelude::TxSigningData, script::parse_redeem_script};
use oraibtc_primitives::bridge::SignatorySet;
use serde::{Deserialize, Serialize};

use super::{
    errors::{BridgeSigError, BridgeSigResult},
    signature::SignatureInfo,
};

/// Where a spend is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpendStatus {
    /// Built but no signature collected yet.
    Built,

    /// Some signatures collected. The powers are those of the least signed input.
    PartiallySigned {
        /// Voting power of the signatories that signed.
        accumulated_power: u64,

        /// Voting power needed to spend.
        required_power: u64,
    },

    /// Witnesses assembled and validated.
    Finalized,

    /// Handed to the broadcaster.
    HandedToBroadcast {
        /// The txid reported by the broadcaster.
        txid: Txid,
    },
}

/// The state a transaction is in with respect to the signatures that have been collected from the
/// signatory set.
#[derive(Debug, Clone)]
pub struct TxState {
    /// The partially signed bitcoin transaction that this state tracks.
    psbt: Psbt,

    /// The prevouts of the unsigned transaction, required for segwit v0 sighashes.
    prevouts: Vec<TxOut>,

    /// The witness script of each input.
    redeem_scripts: Vec<ScriptBuf>,

    /// The signatory set that locks every input of the transaction.
    signatory_set: SignatorySet,

    /// The signatures collected so far per input and per signatory position.
    collected_sigs: Vec<BTreeMap<usize, ecdsa::Signature>>,

    /// The lifecycle status.
    status: SpendStatus,

    /// The signed transaction, set once the spend is finalized.
    finalized_tx: Option<Transaction>,
}

impl TxState {
    /// Create a new [`TxState`] for the given signing data and the set locking its inputs.
    ///
    /// # Errors
    ///
    /// If the signing data does not describe every input, or an input's redeem script does not
    /// belong to `signatory_set` or does not hash to the prevout it spends.
    pub fn new(
        tx_signing_data: TxSigningData,
        signatory_set: SignatorySet,
    ) -> BridgeSigResult<Self> {
        let TxSigningData {
            unsigned_tx,
            prevouts,
            redeem_scripts,
        } = tx_signing_data;

        let num_inputs = unsigned_tx.input.len();
        if prevouts.len() != num_inputs || redeem_scripts.len() != num_inputs {
            return Err(BridgeSigError::PsbtConstruction(format!(
                "{num_inputs} inputs but {} prevouts and {} redeem scripts",
                prevouts.len(),
                redeem_scripts.len()
            )));
        }

        for (input_index, (script, prevout)) in redeem_scripts.iter().zip(&prevouts).enumerate() {
            let parsed = parse_redeem_script(script)
                .map_err(|_| BridgeSigError::ScriptMismatch { input_index })?;

            if !parsed.matches_set(&signatory_set) || script.to_p2wsh() != prevout.script_pubkey {
                return Err(BridgeSigError::ScriptMismatch { input_index });
            }
        }

        let mut psbt = Psbt::from_unsigned_tx(unsigned_tx)
            .map_err(|e| BridgeSigError::PsbtConstruction(e.to_string()))?;

        for (input, (prevout, script)) in psbt
            .inputs
            .iter_mut()
            .zip(prevouts.iter().zip(&redeem_scripts))
        {
            input.witness_utxo = Some(prevout.clone());
            input.witness_script = Some(script.clone());
        }

        Ok(Self {
            psbt,
            prevouts,
            redeem_scripts,
            signatory_set,
            collected_sigs: vec![BTreeMap::new(); num_inputs],
            status: SpendStatus::Built,
            finalized_tx: None,
        })
    }

    /// Get the [`Psbt`] that this state is associated with.
    pub fn psbt(&self) -> &Psbt {
        &self.psbt
    }

    /// Get the unsigned transaction.
    pub fn unsigned_tx(&self) -> &Transaction {
        &self.psbt.unsigned_tx
    }

    /// Compute the txid of the unsigned transaction, which is also the txid of the signed one.
    pub fn compute_txid(&self) -> Txid {
        self.psbt.unsigned_tx.compute_txid()
    }

    /// Get the relevant previous outputs of the transaction that this state tracks.
    pub fn prevouts(&self) -> &[TxOut] {
        &self.prevouts[..]
    }

    /// Get the witness script of each input.
    pub fn redeem_scripts(&self) -> &[ScriptBuf] {
        &self.redeem_scripts[..]
    }

    /// Get the signatory set locking the inputs.
    pub fn signatory_set(&self) -> &SignatorySet {
        &self.signatory_set
    }

    /// Get table of signatures collected so far where the first index is the index of the
    /// transaction input and the key is the position of the signer.
    pub fn collected_sigs(&self) -> &[BTreeMap<usize, ecdsa::Signature>] {
        &self.collected_sigs[..]
    }

    /// Get the lifecycle status.
    pub fn status(&self) -> SpendStatus {
        self.status
    }

    pub(crate) fn set_status(&mut self, status: SpendStatus) {
        self.status = status;
    }

    /// The signed transaction if the spend is finalized.
    pub fn finalized_tx(&self) -> Option<&Transaction> {
        self.finalized_tx.as_ref()
    }

    pub(crate) fn set_finalized(&mut self, signed_tx: Transaction) {
        self.finalized_tx = Some(signed_tx);
        self.status = SpendStatus::Finalized;
    }

    /// Whether the signatory at `position` signed every input.
    pub fn has_signed(&self, position: usize) -> bool {
        self.collected_sigs
            .iter()
            .all(|sigs| sigs.contains_key(&position))
    }

    /// Voting power of the signatories that signed `input_index`.
    pub fn signed_power(&self, input_index: usize) -> u64 {
        self.collected_sigs
            .get(input_index)
            .map(|sigs| self.signatory_set.voting_power_of(sigs.keys().copied()))
            .unwrap_or_default()
    }

    /// Whether `input_index` carries enough weight to satisfy its redeem script.
    pub fn is_input_satisfied(&self, input_index: usize) -> bool {
        self.collected_sigs
            .get(input_index)
            .is_some_and(|sigs| self.signatory_set.is_satisfied_by(sigs.keys().copied()))
    }

    /// Check if enough signatures have been collected for every input of the [`Psbt`].
    pub fn is_fully_signed(&self) -> bool {
        (0..self.collected_sigs.len()).all(|input_index| self.is_input_satisfied(input_index))
    }

    /// The signatories that have not signed `input_index` yet, in declared order.
    pub fn missing_signatories(&self, input_index: usize) -> Vec<PublicKey> {
        let Some(sigs) = self.collected_sigs.get(input_index) else {
            return Vec::new();
        };

        self.signatory_set
            .iter()
            .enumerate()
            .filter(|(position, _)| !sigs.contains_key(position))
            .map(|(_, signatory)| signatory.pubkey)
            .collect()
    }

    /// Add a signature to the collection. The signature must already have been verified.
    ///
    /// A signatory can only contribute one signature per input, later ones are ignored.
    ///
    /// # Returns
    ///
    /// Whether the signature was new.
    ///
    /// # Errors
    ///
    /// If the spend is already finalized, the [`SignatureInfo::signer_index`] is not a part of the
    /// signatory set or the `input_index` is not part of the [`Psbt`].
    pub(crate) fn add_signature(
        &mut self,
        signature_info: SignatureInfo,
        input_index: usize,
    ) -> BridgeSigResult<bool> {
        if self.finalized_tx.is_some() {
            return Err(BridgeSigError::AlreadyFinalized(self.compute_txid()));
        }

        let signer_index = signature_info.signer_index();
        if self.signatory_set.get(signer_index).is_none() {
            return Err(BridgeSigError::UnauthorizedPubkey);
        }

        let sigs = self
            .collected_sigs
            .get_mut(input_index)
            .ok_or(BridgeSigError::InputIndexOutOfBounds(input_index))?;

        if sigs.contains_key(&signer_index) {
            return Ok(false);
        }
        sigs.insert(signer_index, *signature_info.signature());

        if let (Some(input), Some(signatory)) = (
            self.psbt.inputs.get_mut(input_index),
            self.signatory_set.get(signer_index),
        ) {
            input.partial_sigs.insert(
                bitcoin::PublicKey::new(signatory.pubkey),
                *signature_info.signature(),
            );
        }

        self.refresh_status();

        Ok(true)
    }

    fn refresh_status(&mut self) {
        if !matches!(
            self.status,
            SpendStatus::Built | SpendStatus::PartiallySigned { .. }
        ) {
            return;
        }

        let accumulated_power = (0..self.collected_sigs.len())
            .map(|input_index| self.signed_power(input_index))
            .min()
            .unwrap_or_default();

        self.status = SpendStatus::PartiallySigned {
            accumulated_power,
            required_power: self.signatory_set.required_voting_power(),
        };
    }
}
