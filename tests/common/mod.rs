//! Utilities shared by the integration tests.

pub(crate) mod custody;
