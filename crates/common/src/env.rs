//! Reads typed settings from environment variables.

use std::{env, str::FromStr};

/// Parse an `envvar` as `T`. Returns `None` if the variable is unset, empty or does not parse.
pub fn parse_env<T: FromStr>(envvar: &str) -> Option<T> {
    env::var(envvar)
        .ok()
        .filter(|s| !s.is_empty())
        .and_then(|s| T::from_str(&s).ok())
}
