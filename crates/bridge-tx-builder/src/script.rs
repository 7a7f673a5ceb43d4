//! Build and parse the weighted-threshold redeem script that locks custodied funds.
//!
//! The script checks every signatory of a [`SignatorySet`] in declared order and sums the weights
//! of those whose signature verifies:
//!
//! ```text
//! <pk_0> OP_CHECKSIG OP_IF <w_0> OP_ELSE 0 OP_ENDIF
//! OP_SWAP <pk_1> OP_CHECKSIG OP_IF <w_1> OP_ADD OP_ENDIF
//! ...
//! <required_weight> OP_GREATERTHANOREQUAL
//! <commitment> OP_DROP
//! ```
//!
//! `OP_SWAP` brings the next signature above the running sum, so the witness has to supply the
//! signatures in the reverse of the declared order (the signature of the first signatory ends up on
//! top of the stack). Signatories that did not sign are given an empty signature.

use bitcoin::{
    opcodes::{
        all::{
            OP_ADD, OP_CHECKSIG, OP_DROP, OP_ELSE, OP_ENDIF, OP_GREATERTHANOREQUAL, OP_IF,
            OP_PUSHNUM_1, OP_PUSHNUM_16, OP_SWAP,
        },
        Opcode,
    },
    script::{Builder, Instruction},
    secp256k1::PublicKey,
    Script, ScriptBuf,
};
use oraibtc_primitives::{
    bridge::SignatorySet,
    constants::COMPRESSED_PUBKEY_LEN,
    dest::{DestinationCommitment, IbcDest},
};
use thiserror::Error;

use crate::{
    constants::{MAX_OPS_PER_SCRIPT, MAX_REDEEM_SCRIPT_SIZE, MAX_SCRIPT_NUM},
    errors::{BridgeTxBuilderError, BridgeTxBuilderResult},
};

/// Derive the redeem script for a signatory set and a destination commitment.
///
/// This is a pure function: the same inputs always produce byte-identical scripts.
///
/// # Errors
///
/// If the resulting script is larger than a standard witness script or executes more opcodes than
/// consensus allows.
pub fn derive_redeem_script(
    sigset: &SignatorySet,
    commitment: &DestinationCommitment,
) -> BridgeTxBuilderResult<ScriptBuf> {
    let mut builder = Builder::new();

    for (position, signatory) in sigset.iter().enumerate() {
        // `SignatorySet` keeps every weight below 2^23 so this never saturates in practice.
        let weight = sigset.weight(position).unwrap_or_default().min(MAX_SCRIPT_NUM as u64) as i64;

        if position == 0 {
            builder = builder
                .push_slice(signatory.pubkey.serialize())
                .push_opcode(OP_CHECKSIG)
                .push_opcode(OP_IF)
                .push_int(weight)
                .push_opcode(OP_ELSE)
                .push_int(0)
                .push_opcode(OP_ENDIF);
        } else {
            builder = builder
                .push_opcode(OP_SWAP)
                .push_slice(signatory.pubkey.serialize())
                .push_opcode(OP_CHECKSIG)
                .push_opcode(OP_IF)
                .push_int(weight)
                .push_opcode(OP_ADD)
                .push_opcode(OP_ENDIF);
        }
    }

    let required_weight = sigset.required_weight().min(MAX_SCRIPT_NUM as u64) as i64;

    let script = builder
        .push_int(required_weight)
        .push_opcode(OP_GREATERTHANOREQUAL)
        .push_slice(commitment.to_bytes())
        .push_opcode(OP_DROP)
        .into_script();

    if script.len() > MAX_REDEEM_SCRIPT_SIZE {
        return Err(BridgeTxBuilderError::ScriptTooLarge {
            size: script.len(),
            max: MAX_REDEEM_SCRIPT_SIZE,
        });
    }

    let count = count_opcodes(&script);
    if count > MAX_OPS_PER_SCRIPT {
        return Err(BridgeTxBuilderError::TooManyOpcodes {
            count,
            max: MAX_OPS_PER_SCRIPT,
        });
    }

    Ok(script)
}

/// Count the opcodes that consensus charges against [`MAX_OPS_PER_SCRIPT`], i.e. everything
/// above `OP_16`.
pub fn count_opcodes(script: &Script) -> usize {
    script
        .instructions()
        .filter(|i| matches!(i, Ok(Instruction::Op(op)) if op.to_u8() > OP_PUSHNUM_16.to_u8()))
        .count()
}

/// Encode the intent and derive the redeem script bound to it.
pub fn derive_redeem_script_for_dest(
    sigset: &SignatorySet,
    dest: &IbcDest,
) -> BridgeTxBuilderResult<ScriptBuf> {
    let commitment = dest.commitment()?;

    derive_redeem_script(sigset, &commitment)
}

/// The contents of a custody redeem script recovered from its bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRedeemScript {
    /// The pubkeys and their script weights in declared order.
    pub signatories: Vec<(PublicKey, u64)>,

    /// The weight the script requires to succeed.
    pub required_weight: u64,

    /// The destination commitment embedded in the script.
    pub commitment: DestinationCommitment,
}

impl ParsedRedeemScript {
    /// Check whether these contents are exactly what `sigset` would produce.
    pub fn matches_set(&self, sigset: &SignatorySet) -> bool {
        self.signatories.len() == sigset.len()
            && self.required_weight == sigset.required_weight()
            && self
                .signatories
                .iter()
                .zip(sigset.iter().enumerate())
                .all(|((pubkey, weight), (position, signatory))| {
                    *pubkey == signatory.pubkey && Some(*weight) == sigset.weight(position)
                })
    }
}

/// Recover signatories, weights, threshold and commitment from a custody redeem script.
///
/// # Errors
///
/// If the script does not have the exact shape produced by [`derive_redeem_script`].
pub fn parse_redeem_script(script: &Script) -> BridgeTxBuilderResult<ParsedRedeemScript> {
    let instructions = script
        .instructions()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| BridgeTxBuilderError::MalformedScript(e.to_string()))?;

    let mut cursor = Cursor {
        instructions: &instructions[..],
        pos: 0,
    };

    let mut signatories = Vec::new();

    let pubkey = cursor.pubkey()?;
    cursor.op(OP_CHECKSIG)?;
    cursor.op(OP_IF)?;
    let weight = cursor.num()?;
    cursor.op(OP_ELSE)?;
    if cursor.num()? != 0 {
        return Err(malformed("first branch must default to zero"));
    }
    cursor.op(OP_ENDIF)?;
    signatories.push((pubkey, weight));

    while cursor.peek_op() == Some(OP_SWAP) {
        cursor.op(OP_SWAP)?;
        let pubkey = cursor.pubkey()?;
        cursor.op(OP_CHECKSIG)?;
        cursor.op(OP_IF)?;
        let weight = cursor.num()?;
        cursor.op(OP_ADD)?;
        cursor.op(OP_ENDIF)?;
        signatories.push((pubkey, weight));
    }

    let required_weight = cursor.num()?;
    cursor.op(OP_GREATERTHANOREQUAL)?;
    let commitment = cursor.commitment()?;
    cursor.op(OP_DROP)?;

    if !cursor.is_done() {
        return Err(malformed("trailing instructions"));
    }

    Ok(ParsedRedeemScript {
        signatories,
        required_weight,
        commitment,
    })
}

fn malformed(reason: &str) -> BridgeTxBuilderError {
    BridgeTxBuilderError::MalformedScript(reason.to_string())
}

struct Cursor<'a, 'b> {
    instructions: &'b [Instruction<'a>],
    pos: usize,
}

impl<'a, 'b> Cursor<'a, 'b> {
    fn next(&mut self) -> BridgeTxBuilderResult<&'b Instruction<'a>> {
        let instruction = self
            .instructions
            .get(self.pos)
            .ok_or_else(|| malformed("unexpected end of script"))?;
        self.pos += 1;

        Ok(instruction)
    }

    fn peek_op(&self) -> Option<Opcode> {
        match self.instructions.get(self.pos) {
            Some(Instruction::Op(op)) => Some(*op),
            _ => None,
        }
    }

    fn is_done(&self) -> bool {
        self.pos == self.instructions.len()
    }

    fn op(&mut self, expected: Opcode) -> BridgeTxBuilderResult<()> {
        let pos = self.pos;
        match self.next()? {
            Instruction::Op(op) if *op == expected => Ok(()),
            other => Err(BridgeTxBuilderError::MalformedScript(format!(
                "expected {expected} at instruction {pos}, found {other:?}"
            ))),
        }
    }

    fn pubkey(&mut self) -> BridgeTxBuilderResult<PublicKey> {
        match self.next()? {
            Instruction::PushBytes(bytes) if bytes.len() == COMPRESSED_PUBKEY_LEN => {
                PublicKey::from_slice(bytes.as_bytes())
                    .map_err(|e| BridgeTxBuilderError::MalformedScript(e.to_string()))
            }
            _ => Err(malformed("expected a compressed pubkey")),
        }
    }

    fn commitment(&mut self) -> BridgeTxBuilderResult<DestinationCommitment> {
        match self.next()? {
            Instruction::PushBytes(bytes) => {
                let bytes: [u8; 32] = bytes
                    .as_bytes()
                    .try_into()
                    .map_err(|_| malformed("commitment must be 32 bytes"))?;
                Ok(DestinationCommitment::from(bytes))
            }
            _ => Err(malformed("expected the destination commitment")),
        }
    }

    fn num(&mut self) -> BridgeTxBuilderResult<u64> {
        let value = match self.next()? {
            Instruction::PushBytes(bytes) => decode_script_num(bytes.as_bytes(), 4)
                .map_err(|e| BridgeTxBuilderError::MalformedScript(e.to_string()))?,
            Instruction::Op(op) => pushnum_value(*op).ok_or_else(|| malformed("expected a number"))?,
        };

        u64::try_from(value).map_err(|_| malformed("weights cannot be negative"))
    }
}

/// The value pushed by `OP_1` through `OP_16`.
pub fn pushnum_value(op: Opcode) -> Option<i64> {
    let code = op.to_u8();
    if (OP_PUSHNUM_1.to_u8()..=OP_PUSHNUM_16.to_u8()).contains(&code) {
        Some((code - OP_PUSHNUM_1.to_u8() + 1) as i64)
    } else {
        None
    }
}

/// Failure to interpret bytes as a script number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ScriptNumError {
    /// The number is wider than allowed.
    #[error("script number of {len} bytes exceeds {max} bytes")]
    Overflow {
        /// Length of the encoded number.
        len: usize,

        /// Largest allowed length.
        max: usize,
    },

    /// The number carries redundant padding.
    #[error("script number is not minimally encoded")]
    NonMinimal,
}

/// Decode a minimally encoded little-endian sign-magnitude script number.
pub fn decode_script_num(bytes: &[u8], max_len: usize) -> Result<i64, ScriptNumError> {
    if bytes.len() > max_len {
        return Err(ScriptNumError::Overflow {
            len: bytes.len(),
            max: max_len,
        });
    }

    let Some((&last, rest)) = bytes.split_last() else {
        return Ok(0);
    };

    // the most significant byte may only be 0x00/0x80 when the next byte needs its sign bit
    if last & 0x7f == 0 && rest.last().map_or(true, |b| b & 0x80 == 0) {
        return Err(ScriptNumError::NonMinimal);
    }

    let mut value: i64 = 0;
    for (i, byte) in bytes.iter().enumerate() {
        value |= (*byte as i64) << (8 * i);
    }

    if last & 0x80 != 0 {
        let sign_bit = 0x80i64 << (8 * (bytes.len() - 1));
        Ok(-(value & !sign_bit))
    } else {
        Ok(value)
    }
}
