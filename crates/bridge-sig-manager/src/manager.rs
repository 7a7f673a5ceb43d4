//! Define the [`SignatureManager`] that collects signatures for custody spends from the
//! signatory set and finalizes them.

use std::{
    collections::{BTreeMap, HashMap},
    future::Future,
    sync::Arc,
};

use bitcoin::{
    ecdsa,
    secp256k1::{All, PublicKey, Secp256k1},
    Script, Transaction, Txid, Witness,
};
use futures::{stream::FuturesUnordered, StreamExt};
use oraibtc_bridge_tx_builder::prelude::TxSigningData;
use oraibtc_primitives::bridge::SignatorySet;
use tokio::{
    sync::RwLock,
    time::{timeout_at, Instant},
};
use tracing::{debug, info, warn};

use super::{
    errors::{BridgeSigError, BridgeSigResult},
    operations::{create_message_hashes, verify_signature},
    signature::SignatureInfo,
    state::{SpendStatus, TxState},
    transport::{SignatoryEndpoint, SigningRequest},
    validation::verify_input,
};

/// The outcome of a [`SignatureManager::request_signatures`] round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundReport {
    /// Signatories whose signatures were verified and added.
    pub responded: Vec<PublicKey>,

    /// Signatories that answered with an error or with signatures that failed verification.
    pub failed: Vec<(PublicKey, String)>,

    /// Signatories that did not answer before the deadline.
    pub timed_out: Vec<PublicKey>,

    /// Signatories still pending when the spend became fully signed.
    pub not_needed: Vec<PublicKey>,

    /// The status of the spend after the round.
    pub status: SpendStatus,
}

/// Handle collection, verification and aggregation of signatures for the [`TxState`]s of all
/// in-flight custody spends.
#[derive(Clone)]
pub struct SignatureManager {
    /// The spends being tracked, keyed by their txid.
    states: Arc<RwLock<HashMap<Txid, TxState>>>,

    /// The secp engine used to verify signatures.
    secp: Arc<Secp256k1<All>>,
}

impl std::fmt::Debug for SignatureManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "signature manager")
    }
}

impl SignatureManager {
    /// Create a new [`SignatureManager`].
    pub fn new(secp: Arc<Secp256k1<All>>) -> Self {
        Self {
            states: Arc::new(RwLock::new(HashMap::new())),
            secp,
        }
    }

    /// Start tracking a spend locked by `signatory_set`.
    ///
    /// Adding a spend that is already tracked keeps the signatures collected for it.
    pub async fn add_tx_state(
        &self,
        tx_signing_data: TxSigningData,
        signatory_set: SignatorySet,
    ) -> BridgeSigResult<Txid> {
        let tx_state = TxState::new(tx_signing_data, signatory_set)?;
        let txid = tx_state.compute_txid();

        let mut states = self.states.write().await;
        if states.contains_key(&txid) {
            debug!(%txid, "spend already tracked");
        } else {
            info!(%txid, inputs = tx_state.unsigned_tx().input.len(), "tracking custody spend");
            states.insert(txid, tx_state);
        }

        Ok(txid)
    }

    /// Get a copy of the state of a tracked spend.
    pub async fn get_tx_state(&self, txid: &Txid) -> BridgeSigResult<TxState> {
        self.states
            .read()
            .await
            .get(txid)
            .cloned()
            .ok_or(BridgeSigError::TransactionNotFound(*txid))
    }

    /// Get the lifecycle status of a tracked spend.
    pub async fn status(&self, txid: &Txid) -> BridgeSigResult<SpendStatus> {
        Ok(self.get_tx_state(txid).await?.status())
    }

    /// Check whether the spend has collected enough signatures on every input.
    pub async fn is_fully_signed(&self, txid: &Txid) -> BridgeSigResult<bool> {
        Ok(self.get_tx_state(txid).await?.is_fully_signed())
    }

    /// Verify and add a signature for one input, e.g. one received out of band.
    ///
    /// # Returns
    ///
    /// A flag indicating whether the spend has become fully signed after adding the signature.
    pub async fn add_signature(
        &self,
        txid: &Txid,
        signature_info: SignatureInfo,
        input_index: usize,
    ) -> BridgeSigResult<bool> {
        let mut states = self.states.write().await;
        let tx_state = states
            .get_mut(txid)
            .ok_or(BridgeSigError::TransactionNotFound(*txid))?;

        ensure_accepts_signatures(tx_state, txid)?;

        let pubkey = tx_state
            .signatory_set()
            .get(signature_info.signer_index())
            .ok_or(BridgeSigError::UnauthorizedPubkey)?
            .pubkey;

        let messages = create_message_hashes(
            tx_state.unsigned_tx(),
            tx_state.prevouts(),
            tx_state.redeem_scripts(),
        )?;
        let message = messages
            .get(input_index)
            .ok_or(BridgeSigError::InputIndexOutOfBounds(input_index))?;

        if !verify_signature(&self.secp, signature_info.signature(), message, &pubkey) {
            return Err(BridgeSigError::InvalidSignature {
                input_index,
                pubkey,
            });
        }

        tx_state.add_signature(signature_info, input_index)?;

        Ok(tx_state.is_fully_signed())
    }

    /// Verify and add a signatory's signatures for every input of the spend.
    ///
    /// Nothing is added unless every signature is valid.
    ///
    /// # Returns
    ///
    /// A flag indicating whether the spend has become fully signed after adding the signatures.
    pub async fn add_signatory_signatures(
        &self,
        txid: &Txid,
        pubkey: &PublicKey,
        signatures: &[ecdsa::Signature],
    ) -> BridgeSigResult<bool> {
        let mut states = self.states.write().await;
        let tx_state = states
            .get_mut(txid)
            .ok_or(BridgeSigError::TransactionNotFound(*txid))?;

        ensure_accepts_signatures(tx_state, txid)?;

        let signer_index = tx_state
            .signatory_set()
            .position_of(pubkey)
            .ok_or(BridgeSigError::UnauthorizedPubkey)?;

        let messages = create_message_hashes(
            tx_state.unsigned_tx(),
            tx_state.prevouts(),
            tx_state.redeem_scripts(),
        )?;

        if signatures.len() != messages.len() {
            return Err(BridgeSigError::InputIndexOutOfBounds(
                signatures.len().min(messages.len()),
            ));
        }

        for (input_index, (signature, message)) in signatures.iter().zip(&messages).enumerate() {
            if !verify_signature(&self.secp, signature, message, pubkey) {
                return Err(BridgeSigError::InvalidSignature {
                    input_index,
                    pubkey: *pubkey,
                });
            }
        }

        for (input_index, signature) in signatures.iter().enumerate() {
            tx_state.add_signature(SignatureInfo::new(*signature, signer_index), input_index)?;
        }

        debug!(%txid, %pubkey, status = ?tx_state.status(), "added signatory signatures");

        Ok(tx_state.is_fully_signed())
    }

    /// Ask the given signatories for their signatures until the spend is fully signed or the
    /// deadline passes.
    ///
    /// Requests run concurrently. Endpoints that are not part of the set or that already signed
    /// are skipped. A failing or slow signatory never aborts the round, it is only reported.
    pub async fn request_signatures(
        &self,
        txid: &Txid,
        endpoints: &[SignatoryEndpoint],
        deadline: Instant,
    ) -> BridgeSigResult<RoundReport> {
        let tx_state = self.get_tx_state(txid).await?;
        ensure_accepts_signatures(&tx_state, txid)?;

        let sighashes = create_message_hashes(
            tx_state.unsigned_tx(),
            tx_state.prevouts(),
            tx_state.redeem_scripts(),
        )?
        .iter()
        .map(|message| *AsRef::<[u8; 32]>::as_ref(message))
        .collect();

        let request = Arc::new(SigningRequest {
            txid: *txid,
            derivation_index: tx_state.signatory_set().index(),
            sighashes,
        });

        let mut report = RoundReport {
            responded: Vec::new(),
            failed: Vec::new(),
            timed_out: Vec::new(),
            not_needed: Vec::new(),
            status: tx_state.status(),
        };

        if tx_state.is_fully_signed() {
            return Ok(report);
        }

        let mut pending = FuturesUnordered::new();
        let mut outstanding = Vec::new();

        for endpoint in endpoints {
            let Some(position) = tx_state.signatory_set().position_of(&endpoint.pubkey) else {
                warn!(%txid, pubkey = %endpoint.pubkey, "endpoint is not a signatory of this set");
                continue;
            };

            if tx_state.has_signed(position) {
                continue;
            }

            let pubkey = endpoint.pubkey;
            let client = endpoint.client.clone();
            let request = request.clone();

            outstanding.push(pubkey);
            pending.push(async move {
                let response = timeout_at(deadline, client.sign(&request)).await;
                (pubkey, response)
            });
        }

        debug!(%txid, requested = outstanding.len(), "requesting signatures");

        while let Some((pubkey, response)) = pending.next().await {
            outstanding.retain(|p| *p != pubkey);

            match response {
                Ok(Ok(signatures)) => {
                    match self
                        .add_signatory_signatures(txid, &pubkey, &signatures)
                        .await
                    {
                        Ok(fully_signed) => {
                            report.responded.push(pubkey);
                            if fully_signed {
                                break;
                            }
                        }
                        Err(e) => {
                            warn!(%txid, %pubkey, err = %e, "rejected signatory response");
                            report.failed.push((pubkey, e.to_string()));
                        }
                    }
                }
                Ok(Err(e)) => {
                    warn!(%txid, %pubkey, err = %e, "signatory failed to sign");
                    report.failed.push((pubkey, e.to_string()));
                }
                Err(_) => {
                    warn!(%txid, %pubkey, "signatory did not answer in time");
                    report.timed_out.push(pubkey);
                }
            }
        }

        report.not_needed = outstanding;
        report.status = self.status(txid).await?;

        info!(
            %txid,
            responded = report.responded.len(),
            failed = report.failed.len(),
            timed_out = report.timed_out.len(),
            status = ?report.status,
            "signing round complete"
        );

        Ok(report)
    }

    /// Assemble the witnesses, dry-run them and return the signed transaction.
    ///
    /// Once finalized the spend accepts no more signatures and calling this again returns the same
    /// transaction.
    ///
    /// # Errors
    ///
    /// If an input lacks voting power or an assembled witness fails validation.
    pub async fn finalize(&self, txid: &Txid) -> BridgeSigResult<Transaction> {
        let mut states = self.states.write().await;
        let tx_state = states
            .get_mut(txid)
            .ok_or(BridgeSigError::TransactionNotFound(*txid))?;

        finalize_state(tx_state, txid)
    }

    /// Finalize the spend and pass it to `broadcast` without releasing the state lock, then record
    /// the hand-off under the txid `broadcast` returns.
    ///
    /// Concurrent callers for the same spend are serialized, so at most one of them broadcasts.
    /// Nothing is recorded when `broadcast` fails.
    pub async fn hand_off<F, Fut, E>(&self, txid: &Txid, broadcast: F) -> Result<Txid, E>
    where
        F: FnOnce(Transaction) -> Fut,
        Fut: Future<Output = Result<Txid, E>>,
        E: From<BridgeSigError>,
    {
        let mut states = self.states.write().await;
        let tx_state = states
            .get_mut(txid)
            .ok_or(BridgeSigError::TransactionNotFound(*txid))?;

        if let SpendStatus::HandedToBroadcast { .. } = tx_state.status() {
            return Err(BridgeSigError::AlreadyBroadcast(*txid).into());
        }

        let signed_tx = finalize_state(tx_state, txid)?;
        let broadcast_txid = broadcast(signed_tx).await?;

        info!(%txid, %broadcast_txid, "spend handed to broadcast");
        tx_state.set_status(SpendStatus::HandedToBroadcast {
            txid: broadcast_txid,
        });

        Ok(broadcast_txid)
    }

    /// Record that the finalized spend was handed to the broadcaster.
    ///
    /// After this no more signatures are accepted for it.
    pub async fn record_broadcast(&self, txid: &Txid, broadcast_txid: Txid) -> BridgeSigResult<()> {
        let mut states = self.states.write().await;
        let tx_state = states
            .get_mut(txid)
            .ok_or(BridgeSigError::TransactionNotFound(*txid))?;

        match tx_state.status() {
            SpendStatus::Finalized => {
                info!(%txid, %broadcast_txid, "spend handed to broadcast");
                tx_state.set_status(SpendStatus::HandedToBroadcast {
                    txid: broadcast_txid,
                });
                Ok(())
            }
            SpendStatus::HandedToBroadcast { .. } => Err(BridgeSigError::AlreadyBroadcast(*txid)),
            _ => Err(BridgeSigError::NotFinalized(*txid)),
        }
    }
}

fn finalize_state(tx_state: &mut TxState, txid: &Txid) -> BridgeSigResult<Transaction> {
    if let Some(signed_tx) = tx_state.finalized_tx() {
        return Ok(signed_tx.clone());
    }

    let signed_tx = finalize_tx(tx_state)?;

    info!(%txid, "finalized custody spend");
    tx_state.set_finalized(signed_tx.clone());

    Ok(signed_tx)
}

fn ensure_accepts_signatures(tx_state: &TxState, txid: &Txid) -> BridgeSigResult<()> {
    match tx_state.status() {
        SpendStatus::Built | SpendStatus::PartiallySigned { .. } => Ok(()),
        SpendStatus::Finalized => Err(BridgeSigError::AlreadyFinalized(*txid)),
        SpendStatus::HandedToBroadcast { .. } => Err(BridgeSigError::AlreadyBroadcast(*txid)),
    }
}

/// Build the witness spending a custody redeem script.
///
/// Signatures are pushed in the reverse of the declared order so that the first signatory's is on
/// top of the stack when the script starts. Absent signatures are empty elements.
pub fn build_witness(
    sigset: &SignatorySet,
    sigs: &BTreeMap<usize, ecdsa::Signature>,
    redeem_script: &Script,
) -> Witness {
    let mut witness = Witness::new();

    for position in (0..sigset.len()).rev() {
        match sigs.get(&position) {
            Some(signature) => witness.push(signature.to_vec()),
            None => witness.push(Vec::<u8>::new()),
        }
    }
    witness.push(redeem_script.as_bytes());

    witness
}

/// Build the signed transaction for a spend and check every witness against its prevout.
pub fn finalize_tx(tx_state: &TxState) -> BridgeSigResult<Transaction> {
    let sigset = tx_state.signatory_set();

    for (input_index, sigs) in tx_state.collected_sigs().iter().enumerate() {
        if !tx_state.is_input_satisfied(input_index) {
            return Err(BridgeSigError::InsufficientSignatures {
                input_index,
                current: sigset.voting_power_of(sigs.keys().copied()),
                required: sigset.required_voting_power(),
                missing: tx_state.missing_signatories(input_index),
            });
        }
    }

    let mut psbt = tx_state.psbt().clone();

    for ((input, sigs), redeem_script) in psbt
        .inputs
        .iter_mut()
        .zip(tx_state.collected_sigs())
        .zip(tx_state.redeem_scripts())
    {
        input.final_script_witness = Some(build_witness(sigset, sigs, redeem_script));

        // clear everything but the final witness and the utxo
        input.partial_sigs = BTreeMap::new();
        input.sighash_type = None;
        input.redeem_script = None;
        input.witness_script = None;
        input.bip32_derivation = BTreeMap::new();
    }

    let signed_tx = psbt.extract_tx()?;

    for (input_index, prevout) in tx_state.prevouts().iter().enumerate() {
        verify_input(&signed_tx, input_index, prevout).map_err(|source| {
            BridgeSigError::ScriptValidation {
                input_index,
                source,
            }
        })?;
    }

    Ok(signed_tx)
}
