//! Collection of the data types shared by the custody crates.
//!
//! The signatory set is an immutable snapshot handed to us by the validator/checkpoint service and
//! the destination types describe a single cross-chain transfer intent. Everything else in the
//! workspace is a pure function of these two.

pub mod bridge;
pub mod constants;
pub mod dest;
pub mod errors;
