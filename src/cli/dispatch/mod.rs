//! Maps validated CLI matches to the action to run.

use crate::{
    cli::{
        actions::Action,
        commands::{cors, security, timeouts, tls, web3, ARG_ADDRESS, ARG_CONFIG, ARG_PORT, ARG_PREFIX, ARG_REALM},
    },
    config::Settings,
    dav::normalize_prefix,
};
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Build and validate the server settings.
///
/// # Errors
/// Returns an error if required arguments are missing or a setting is invalid.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let users_file = matches
        .get_one::<PathBuf>(ARG_CONFIG)
        .cloned()
        .context("missing required argument: --config")?;

    let read = |id: &str, default: &str| -> String {
        matches
            .get_one::<String>(id)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| default.to_string())
    };

    let security = security::Options::parse(matches);

    let settings = Settings {
        users_file,
        address: read(ARG_ADDRESS, "0.0.0.0"),
        port: matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(6065),
        prefix: normalize_prefix(&read(ARG_PREFIX, "/")),
        realm: read(ARG_REALM, "web3dav"),
        require_password: security.require_password,
        behind_proxy: security.behind_proxy,
        options_passthrough: security.options_passthrough,
        web3: web3::Options::parse(matches).web3,
        cors: cors::parse(matches),
        tls: tls::Options::parse(matches).tls,
        timeouts: timeouts::parse(matches),
    };

    settings.validate().context("invalid configuration")?;

    Ok(Action::Server(settings))
}
