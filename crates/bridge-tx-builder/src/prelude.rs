//! Re-exports of the commonly used items in this crate.

pub use crate::{
    address::*, builder::*, constants::*, context::*, deposit::*, fees::*, operations::*,
    script::*, withdrawal::*, TxKind,
};
