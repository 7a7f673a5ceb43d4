//! Cross-chain transfer intents and the commitment that binds a custody script to one of them.

use std::fmt;

use arbitrary::Arbitrary;
use bitcoin::hashes::{sha256, Hash};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    constants::{NANOS_PER_SEC, TIMEOUT_ALIGNMENT_SECS},
    errors::EncodingError,
};

/// Tag prefixed to the encoded intent when it is handed to the relayer, marking an IBC destination.
pub const IBC_DEST_TAG: u8 = 0x01;

/// Largest string field representable behind the `u16` length prefix.
pub const MAX_FIELD_LEN: usize = u16::MAX as usize;

/// An IBC transfer intent that custodied funds are bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Arbitrary)]
#[serde(rename_all = "camelCase")]
pub struct IbcDest {
    /// Port on the source chain, usually `transfer`.
    pub source_port: String,

    /// Channel on the source chain, e.g. `channel-0`.
    pub source_channel: String,

    /// Account credited on the destination chain.
    pub receiver: String,

    /// Account on the bridge chain that forwards the transfer.
    pub sender: String,

    /// IBC packet timeout in nanoseconds since the unix epoch.
    pub timeout_timestamp: u64,

    /// Free-form memo forwarded with the packet.
    pub memo: String,
}

impl IbcDest {
    /// Encode this intent into its canonical byte layout.
    ///
    /// Every string is emitted as a big-endian `u16` length followed by its UTF-8 bytes and the
    /// timeout as a big-endian `u64`. The order is `source_port`, `source_channel`, `receiver`,
    /// `sender`, `timeout_timestamp`, `memo`.
    ///
    /// # Errors
    ///
    /// If the port or channel is empty or any string does not fit its length prefix.
    pub fn encode(&self) -> Result<Vec<u8>, EncodingError> {
        if self.source_port.is_empty() {
            return Err(EncodingError::EmptyIdentifier {
                field: "source_port",
            });
        }

        if self.source_channel.is_empty() {
            return Err(EncodingError::EmptyIdentifier {
                field: "source_channel",
            });
        }

        let mut buf = Vec::with_capacity(
            self.source_port.len()
                + self.source_channel.len()
                + self.receiver.len()
                + self.sender.len()
                + self.memo.len()
                + 5 * 2
                + 8,
        );

        write_str(&mut buf, "source_port", &self.source_port)?;
        write_str(&mut buf, "source_channel", &self.source_channel)?;
        write_str(&mut buf, "receiver", &self.receiver)?;
        write_str(&mut buf, "sender", &self.sender)?;
        buf.extend_from_slice(&self.timeout_timestamp.to_be_bytes());
        write_str(&mut buf, "memo", &self.memo)?;

        Ok(buf)
    }

    /// Hash the encoded intent into the commitment embedded in the custody script.
    pub fn commitment(&self) -> Result<DestinationCommitment, EncodingError> {
        let encoded = self.encode()?;
        let hash = sha256::Hash::hash(&encoded);

        Ok(DestinationCommitment(hash.to_byte_array()))
    }

    /// The destination bytes the relayer expects when registering a deposit address.
    pub fn relayer_dest_bytes(&self) -> Result<Vec<u8>, EncodingError> {
        let encoded = self.encode()?;

        let mut bytes = Vec::with_capacity(encoded.len() + 1);
        bytes.push(IBC_DEST_TAG);
        bytes.extend(encoded);

        Ok(bytes)
    }

    /// Return a copy of this intent with a different timeout.
    pub fn with_timeout(&self, timeout_timestamp: u64) -> Self {
        Self {
            timeout_timestamp,
            ..self.clone()
        }
    }
}

fn write_str(buf: &mut Vec<u8>, field: &'static str, value: &str) -> Result<(), EncodingError> {
    let len = u16::try_from(value.len()).map_err(|_| EncodingError::FieldTooLong {
        field,
        len: value.len(),
        max: MAX_FIELD_LEN,
    })?;

    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(value.as_bytes());

    Ok(())
}

/// The 32-byte hash binding a custody script to exactly one transfer intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DestinationCommitment([u8; 32]);

impl DestinationCommitment {
    /// Get the raw bytes of the commitment.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0
    }
}

impl From<[u8; 32]> for DestinationCommitment {
    fn from(value: [u8; 32]) -> Self {
        Self(value)
    }
}

impl AsRef<[u8; 32]> for DestinationCommitment {
    fn as_ref(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for DestinationCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl<'a> Arbitrary<'a> for DestinationCommitment {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        let bytes: [u8; 32] = u.arbitrary()?;
        Ok(Self(bytes))
    }
}

/// Compute the IBC timeout for a deposit made at `now` that should stay valid for `ttl`.
///
/// The result is floored to the hour so that an address derived from it can later be recovered by
/// scanning [`hourly_timeouts`].
///
/// # Errors
///
/// If the expiry is not representable as nanoseconds in a `u64`.
pub fn ibc_timeout_timestamp(now: DateTime<Utc>, ttl: Duration) -> Result<u64, EncodingError> {
    let expiry = now
        .checked_add_signed(ttl)
        .ok_or(EncodingError::TimeoutOverflow)?
        .timestamp()
        .max(0);
    let aligned = expiry - expiry % TIMEOUT_ALIGNMENT_SECS;

    (aligned as u64)
        .checked_mul(NANOS_PER_SEC)
        .ok_or(EncodingError::TimeoutOverflow)
}

/// The 24 hour-aligned timeout candidates (in nanoseconds) within one UTC day.
///
/// Hours whose timestamp does not fit in a `u64` are left out.
pub fn hourly_timeouts(date: NaiveDate) -> Vec<u64> {
    let Some(midnight) = date.and_hms_opt(0, 0, 0) else {
        return Vec::new();
    };
    let start = Utc.from_utc_datetime(&midnight).timestamp().max(0) as u64;

    (0..24)
        .filter_map(|hour| {
            start
                .checked_add(hour * TIMEOUT_ALIGNMENT_SECS as u64)?
                .checked_mul(NANOS_PER_SEC)
        })
        .collect()
}
