//! Crate includes reusable utils for services that handle common behavior.
//! Such as initializing the tracing framework and reading the environment.

pub mod env;
pub mod logging;
