//! Handles collecting, verifying and assembling signatures for custody spends.
//!
//! Signatories are asked for their signatures over every input of a spend, each response is
//! verified before it is accepted and once enough voting power has signed, the witnesses are
//! assembled and dry-run before the transaction is handed to the broadcaster.

pub mod errors;
pub mod manager;
pub mod operations;
pub mod prelude;
pub mod signature;
pub mod state;
pub mod transport;
pub mod validation;
