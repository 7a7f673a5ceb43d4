//! Input-output with the outside world: handing finalized spends to a broadcast endpoint and
//! talking to the relayer that serves signatory sets and indexes deposit addresses.

pub mod broadcaster;
pub mod errors;
pub mod relayer;
