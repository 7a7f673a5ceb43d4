//! Constants shared by the signatory set arithmetic and the destination types.

/// Bits of voting power precision kept in the redeem script.
///
/// Bitcoin script reserves one bit of a number for the sign, so 23 bits keeps every weight within
/// three bytes and every sum well within the 4-byte arithmetic limit.
pub const VOTING_POWER_PRECISION_BITS: u32 = 23;

/// Length of a compressed secp256k1 public key.
pub const COMPRESSED_PUBKEY_LEN: usize = 33;

/// Number of nanoseconds in a second, IBC timeouts are expressed in nanoseconds.
pub const NANOS_PER_SEC: u64 = 1_000_000_000;

/// IBC timeouts are aligned to this many seconds so that they can be recovered by scanning.
pub const TIMEOUT_ALIGNMENT_SECS: i64 = 60 * 60;
