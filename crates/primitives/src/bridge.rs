//! Primitive data types related to the custody signatory set.

use std::collections::BTreeSet;

use bitcoin::secp256k1::PublicKey;
use serde::{Deserialize, Serialize};

use crate::{
    constants::VOTING_POWER_PRECISION_BITS,
    errors::{SignatorySetError, ThresholdError},
};

/// A party holding one key share and a voting-power weight in the custody script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signatory {
    /// The compressed secp256k1 key checked by the script for this signatory.
    pub pubkey: PublicKey,

    /// The weight of this signatory's signature.
    pub voting_power: u64,
}

impl Signatory {
    /// Create a new [`Signatory`].
    pub fn new(pubkey: PublicKey, voting_power: u64) -> Self {
        Self {
            pubkey,
            voting_power,
        }
    }
}

/// Minimum fraction of the total voting power required to authorize a spend.
///
/// Serialized as a `[numerator, denominator]` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "(u64, u64)", into = "(u64, u64)")]
pub struct Threshold {
    numerator: u64,
    denominator: u64,
}

impl Threshold {
    /// Create a new [`Threshold`].
    ///
    /// # Errors
    ///
    /// If the fraction is not within `(0, 1]`.
    pub fn new(numerator: u64, denominator: u64) -> Result<Self, ThresholdError> {
        if numerator == 0 || denominator == 0 || numerator > denominator {
            return Err(ThresholdError::OutOfRange {
                numerator,
                denominator,
            });
        }

        Ok(Self {
            numerator,
            denominator,
        })
    }

    /// Get the numerator.
    pub fn numerator(&self) -> u64 {
        self.numerator
    }

    /// Get the denominator.
    pub fn denominator(&self) -> u64 {
        self.denominator
    }

    /// Compute `ceil(total * numerator / denominator)` without overflowing.
    pub fn apply(&self, total: u64) -> u64 {
        let numerator = self.numerator as u128;
        let denominator = self.denominator as u128;
        let scaled = total as u128 * numerator;

        // numerator <= denominator so the result never exceeds `total`
        scaled.div_ceil(denominator) as u64
    }
}

impl TryFrom<(u64, u64)> for Threshold {
    type Error = ThresholdError;

    fn try_from((numerator, denominator): (u64, u64)) -> Result<Self, Self::Error> {
        Self::new(numerator, denominator)
    }
}

impl From<Threshold> for (u64, u64) {
    fn from(value: Threshold) -> Self {
        (value.numerator, value.denominator)
    }
}

/// The ordered, weighted set of signatories plus threshold valid for one checkpoint epoch.
///
/// The order of the signatories is part of the derivation contract: the redeem script checks them
/// in exactly this order and the witness presents signatures in the reverse of it.
///
/// A [`SignatorySet`] can only be constructed through [`SignatorySet::new`] (or the snapshot
/// conversion), so every instance satisfies the set invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatorySet {
    /// The checkpoint epoch, also used as the key derivation index.
    index: u32,

    /// The signatories in declared order.
    signatories: Vec<Signatory>,

    /// The fraction of voting power required to spend.
    threshold: Threshold,

    /// Sum of all voting power in the set.
    total_voting_power: u64,

    /// Number of low bits dropped from each voting power to fit script arithmetic.
    truncation: u32,
}

impl SignatorySet {
    /// Create a new [`SignatorySet`] keeping the supplied order.
    ///
    /// # Errors
    ///
    /// If the set is empty, contains a zero-power or duplicate signatory, overflows the total
    /// voting power, or cannot reach its threshold after voting power truncation.
    pub fn new(
        index: u32,
        signatories: Vec<Signatory>,
        threshold: Threshold,
    ) -> Result<Self, SignatorySetError> {
        if signatories.is_empty() {
            return Err(SignatorySetError::Empty);
        }

        let mut seen = BTreeSet::new();
        let mut total_voting_power: u64 = 0;

        for (position, signatory) in signatories.iter().enumerate() {
            if signatory.voting_power == 0 {
                return Err(SignatorySetError::ZeroVotingPower { position });
            }

            if !seen.insert(signatory.pubkey.serialize()) {
                return Err(SignatorySetError::DuplicatePubkey { position });
            }

            total_voting_power = total_voting_power
                .checked_add(signatory.voting_power)
                .ok_or(SignatorySetError::VotingPowerOverflow)?;
        }

        let truncation = get_truncation(total_voting_power, VOTING_POWER_PRECISION_BITS);

        let set = Self {
            index,
            signatories,
            threshold,
            total_voting_power,
            truncation,
        };

        let available = set.total_weight();
        let required = set.required_weight();
        if available < required {
            return Err(ThresholdError::Unsatisfiable {
                available,
                required,
            })?;
        }

        Ok(set)
    }

    /// Get the index (checkpoint epoch) of this set.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Get the signatories in declared order.
    pub fn signatories(&self) -> &[Signatory] {
        &self.signatories[..]
    }

    /// Get the signatory at a position in the declared order.
    pub fn get(&self, position: usize) -> Option<&Signatory> {
        self.signatories.get(position)
    }

    /// Find the position of a pubkey in the declared order.
    pub fn position_of(&self, pubkey: &PublicKey) -> Option<usize> {
        self.signatories.iter().position(|s| s.pubkey == *pubkey)
    }

    /// An iterator over the signatories in declared order.
    pub fn iter(&self) -> impl Iterator<Item = &Signatory> {
        self.signatories.iter()
    }

    /// Number of signatories in the set.
    pub fn len(&self) -> usize {
        self.signatories.len()
    }

    /// Always `false` as empty sets are rejected on construction.
    pub fn is_empty(&self) -> bool {
        self.signatories.is_empty()
    }

    /// Get the threshold of this set.
    pub fn threshold(&self) -> Threshold {
        self.threshold
    }

    /// Sum of all voting power in the set.
    pub fn total_voting_power(&self) -> u64 {
        self.total_voting_power
    }

    /// Number of low bits dropped from each voting power before it is placed in the script.
    pub fn truncation(&self) -> u32 {
        self.truncation
    }

    /// The voting power required to spend: `ceil(total * numerator / denominator)`.
    pub fn required_voting_power(&self) -> u64 {
        self.threshold.apply(self.total_voting_power)
    }

    /// The truncated weight of the signatory at `position` as it appears in the script.
    pub fn weight(&self, position: usize) -> Option<u64> {
        self.signatories
            .get(position)
            .map(|s| s.voting_power >> self.truncation)
    }

    /// Sum of every signatory's truncated weight.
    pub fn total_weight(&self) -> u64 {
        self.signatories
            .iter()
            .map(|s| s.voting_power >> self.truncation)
            .sum()
    }

    /// The weight the script requires, rounded up so that meeting it implies meeting
    /// [`Self::required_voting_power`].
    pub fn required_weight(&self) -> u64 {
        let required = self.required_voting_power() as u128;
        let unit = 1u128 << self.truncation;

        required.div_ceil(unit) as u64
    }

    /// Sum of the voting power of the signatories at the given positions.
    pub fn voting_power_of(&self, positions: impl IntoIterator<Item = usize>) -> u64 {
        positions
            .into_iter()
            .filter_map(|p| self.signatories.get(p))
            .map(|s| s.voting_power)
            .sum()
    }

    /// Sum of the truncated weights of the signatories at the given positions.
    pub fn weight_of(&self, positions: impl IntoIterator<Item = usize>) -> u64 {
        positions
            .into_iter()
            .filter_map(|p| self.weight(p))
            .sum()
    }

    /// Whether signatures from the given positions satisfy the script's threshold check.
    pub fn is_satisfied_by(&self, positions: impl IntoIterator<Item = usize>) -> bool {
        self.weight_of(positions) >= self.required_weight()
    }
}

/// Calculates the number of bits of precision to remove from voting power values in order to
/// have a maximum of `target_precision` bits of precision.
fn get_truncation(total_voting_power: u64, target_precision: u32) -> u32 {
    let vp_bits = u64::BITS - total_voting_power.leading_zeros();
    vp_bits.saturating_sub(target_precision)
}

/// A signatory entry as served by the relayer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatorySnapshot {
    /// The compressed pubkey as a list of bytes.
    pub pubkey: Vec<u8>,

    /// The voting power of the signatory.
    pub voting_power: u64,
}

/// The signatory set snapshot as supplied by the validator/checkpoint service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigsetSnapshot {
    /// The checkpoint index of the set.
    pub index: u32,

    /// The signatories in the order the validator set supplied them.
    pub signatories: Vec<SignatorySnapshot>,

    /// The `[numerator, denominator]` spend threshold.
    pub threshold: (u64, u64),

    /// Whether the bridge currently accepts deposits to this set.
    #[serde(default)]
    pub deposits_enabled: bool,

    /// The miner fee rate advertised for the pending checkpoint, in BTC.
    #[serde(default)]
    pub miner_fee_rate: f64,

    /// The bridge fee rate advertised for the pending checkpoint.
    #[serde(default)]
    pub bridge_fee_rate: f64,
}

impl TryFrom<&SigsetSnapshot> for SignatorySet {
    type Error = SignatorySetError;

    fn try_from(value: &SigsetSnapshot) -> Result<Self, Self::Error> {
        let signatories = value
            .signatories
            .iter()
            .enumerate()
            .map(|(position, s)| {
                PublicKey::from_slice(&s.pubkey)
                    .map(|pubkey| Signatory::new(pubkey, s.voting_power))
                    .map_err(|source| SignatorySetError::InvalidPubkey { position, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let threshold = Threshold::try_from(value.threshold)?;

        SignatorySet::new(value.index, signatories, threshold)
    }
}

impl From<&SignatorySet> for SigsetSnapshot {
    fn from(value: &SignatorySet) -> Self {
        Self {
            index: value.index,
            signatories: value
                .signatories
                .iter()
                .map(|s| SignatorySnapshot {
                    pubkey: s.pubkey.serialize().to_vec(),
                    voting_power: s.voting_power,
                })
                .collect(),
            threshold: value.threshold.into(),
            deposits_enabled: true,
            miner_fee_rate: 0.0,
            bridge_fee_rate: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use bitcoin::secp256k1::{Secp256k1, SecretKey};

    use super::*;

    fn pubkeys(n: u8) -> Vec<PublicKey> {
        let secp = Secp256k1::new();
        (1..=n)
            .map(|i| {
                let sk = SecretKey::from_slice(&[i; 32]).expect("valid secret key");
                PublicKey::from_secret_key(&secp, &sk)
            })
            .collect()
    }

    fn set_with_powers(powers: &[u64], threshold: (u64, u64)) -> Result<SignatorySet, SignatorySetError> {
        let signatories = pubkeys(powers.len() as u8)
            .into_iter()
            .zip(powers)
            .map(|(pk, vp)| Signatory::new(pk, *vp))
            .collect();

        SignatorySet::new(7, signatories, Threshold::try_from(threshold)?)
    }

    #[test]
    fn test_threshold_range() {
        assert!(Threshold::new(2, 3).is_ok());
        assert!(Threshold::new(1, 1).is_ok());
        assert!(
            matches!(Threshold::new(0, 3), Err(ThresholdError::OutOfRange { .. })),
            "zero numerator should be rejected"
        );
        assert!(
            matches!(Threshold::new(4, 3), Err(ThresholdError::OutOfRange { .. })),
            "numerator above denominator should be rejected"
        );
        assert!(
            matches!(Threshold::new(1, 0), Err(ThresholdError::OutOfRange { .. })),
            "zero denominator should be rejected"
        );
    }

    #[test]
    fn test_threshold_rounds_up() {
        let two_thirds = Threshold::new(2, 3).unwrap();
        assert_eq!(two_thirds.apply(30), 20);
        assert_eq!(two_thirds.apply(31), 21, "20.67 should round up");
        assert_eq!(two_thirds.apply(u64::MAX), u64::MAX - u64::MAX / 3);
    }

    #[test]
    fn test_new_signatory_set_rejects_invalid_sets() {
        let threshold = Threshold::new(2, 3).unwrap();
        assert_eq!(
            SignatorySet::new(0, vec![], threshold),
            Err(SignatorySetError::Empty)
        );

        assert_eq!(
            set_with_powers(&[10, 0, 10], (2, 3)),
            Err(SignatorySetError::ZeroVotingPower { position: 1 })
        );

        assert_eq!(
            set_with_powers(&[u64::MAX, 1], (2, 3)),
            Err(SignatorySetError::VotingPowerOverflow)
        );

        let pk = pubkeys(1)[0];
        let duplicate = vec![Signatory::new(pk, 10), Signatory::new(pk, 10)];
        assert_eq!(
            SignatorySet::new(0, duplicate, threshold),
            Err(SignatorySetError::DuplicatePubkey { position: 1 })
        );
    }

    #[test]
    fn test_exact_weights_without_truncation() {
        let set = set_with_powers(&[10, 10, 10], (2, 3)).unwrap();

        assert_eq!(set.truncation(), 0);
        assert_eq!(set.total_voting_power(), 30);
        assert_eq!(set.required_voting_power(), 20);
        assert_eq!(set.required_weight(), 20);
        assert!(!set.is_satisfied_by([0]), "one of three should not pass");
        assert!(set.is_satisfied_by([0, 2]), "two of three should pass");
        assert!(set.is_satisfied_by([0, 1, 2]));
    }

    #[test]
    fn test_truncation() {
        // total less than target precision (10, 4 bits)
        assert_eq!(get_truncation(10, 23), 0);

        // total greater than target precision (100M, 27 bits)
        assert_eq!(get_truncation(100_000_000, 23), 4);

        let set = set_with_powers(&[10_000_000_000, 10_000_000_000], (9, 10)).unwrap();
        assert_eq!(set.truncation(), 12);
        assert!(set.weight(0).unwrap() < 1 << 23);

        // the rounded-up weight implies the exact voting power
        let required = set.required_weight() << set.truncation();
        assert!(required >= set.required_voting_power());
        assert!(!set.is_satisfied_by([0]));
        assert!(set.is_satisfied_by([0, 1]));
    }

    #[test]
    fn test_unsatisfiable_after_truncation() {
        // every weight loses its low bits so unanimity can no longer be expressed
        let result = set_with_powers(&[(1 << 23) + 1, (1 << 23) + 1], (1, 1));
        assert!(
            matches!(
                result,
                Err(SignatorySetError::Threshold(ThresholdError::Unsatisfiable { .. }))
            ),
            "should reject sets that cannot reach their threshold, got {result:?}"
        );
    }

    #[test]
    fn test_snapshot_conversion_keeps_order() {
        let json = serde_json::json!({
            "index": 2,
            "signatories": pubkeys(3)
                .iter()
                .zip([5u64, 30, 12])
                .map(|(pk, vp)| serde_json::json!({
                    "pubkey": pk.serialize().to_vec(),
                    "voting_power": vp,
                }))
                .collect::<Vec<_>>(),
            "threshold": [2, 3],
            "depositsEnabled": true,
            "minerFeeRate": 0.0001,
        });

        let snapshot: SigsetSnapshot = serde_json::from_value(json).expect("valid snapshot");
        let set = SignatorySet::try_from(&snapshot).expect("valid set");

        assert_eq!(set.index(), 2);
        let powers: Vec<u64> = set.iter().map(|s| s.voting_power).collect();
        assert_eq!(powers, vec![5, 30, 12], "declared order must be preserved");
        assert!(snapshot.deposits_enabled);

        let round_trip = SigsetSnapshot::from(&set);
        assert_eq!(round_trip.signatories, snapshot.signatories);
    }

    #[test]
    fn test_snapshot_with_bad_pubkey() {
        let snapshot = SigsetSnapshot {
            index: 0,
            signatories: vec![SignatorySnapshot {
                pubkey: vec![0u8; 33],
                voting_power: 1,
            }],
            threshold: (2, 3),
            deposits_enabled: true,
            miner_fee_rate: 0.0,
            bridge_fee_rate: 0.0,
        };

        assert!(matches!(
            SignatorySet::try_from(&snapshot),
            Err(SignatorySetError::InvalidPubkey { position: 0, .. })
        ));
    }
}
