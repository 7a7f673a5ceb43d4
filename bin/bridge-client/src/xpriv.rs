//! Parses the signatory's master xpriv.

use std::{fs::read_to_string, path::PathBuf};

use bitcoin::bip32::Xpriv;
use oraibtc_key_derivation::SignatoryKeys;
use tracing::*;
use zeroize::Zeroize;

/// The environment variable that contains the signatory's master [`Xpriv`].
pub(crate) const SIGNATORY_XPRIV_ENVVAR: &str = "ORAIBTC_SIGNATORY_XPRIV";

/// Resolves the master [`Xpriv`] from the various sources.
///
/// Rules:
///
/// 1. If none are set, error out.
/// 2. If multiple are set, error out.
/// 3. If we have the verbatim key provided, parse it.
/// 4. If we have a path provided, load it and parse that instead.
///
/// # Errors
///
/// Returns an error if the master xpriv is invalid or not found, or if
/// conflicting options are set.
pub(crate) fn resolve_xpriv(
    cli_arg: Option<String>,
    cli_path: Option<PathBuf>,
    env_val: Option<String>,
) -> anyhow::Result<SignatoryKeys> {
    if cli_arg.is_some() {
        error!("FOUND CLI ARG KEY, THIS IS INSECURE!");
    }

    let mut xpriv_str: String = match (cli_arg, cli_path, env_val) {
        // If there's none set then we error out.
        (None, None, None) => {
            anyhow::bail!(
                "must provide master xpriv with either `--xpriv-path` or {SIGNATORY_XPRIV_ENVVAR}"
            )
        }

        // If multiple are set then we error out.
        (_, Some(_), Some(_)) | (Some(_), Some(_), _) | (Some(_), _, Some(_)) => {
            anyhow::bail!("multiple master xpriv options specified, don't know what to do, aborting");
        }

        // In these cases we have the string explicitly.
        (Some(xpriv_str), _, _) | (_, _, Some(xpriv_str)) => xpriv_str,

        // In this case we fetch it from file.
        (_, Some(path), _) => read_to_string(path)?,
    };

    let parsed = xpriv_str.trim().parse::<Xpriv>();
    xpriv_str.zeroize();

    let Ok(master) = parsed else {
        anyhow::bail!("invalid master xpriv");
    };

    Ok(SignatoryKeys::new(master))
}
