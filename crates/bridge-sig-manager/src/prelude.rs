//! Re-exports the commonly used types of the crate.

pub use super::{
    errors::*, manager::*, operations::*, signature::*, state::*, transport::*,
    validation::verify_input,
};
