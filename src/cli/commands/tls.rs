use crate::config::TlsConfig;
use clap::{Arg, ArgMatches, Command};
use std::path::PathBuf;

pub const ARG_TLS_CERT: &str = "tls-cert";
pub const ARG_TLS_KEY: &str = "tls-key";

#[derive(Debug, Clone, Default)]
pub struct Options {
    /// `None` serves plain HTTP.
    pub tls: Option<TlsConfig>,
}

impl Options {
    #[must_use]
    pub fn parse(matches: &ArgMatches) -> Self {
        let path = |id: &str| matches.get_one::<PathBuf>(id).cloned();

        Self {
            tls: path(ARG_TLS_CERT)
                .zip(path(ARG_TLS_KEY))
                .map(|(cert, key)| TlsConfig { cert, key }),
        }
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_TLS_CERT)
                .long(ARG_TLS_CERT)
                .help("Path to the TLS certificate chain (PEM); enables HTTPS")
                .env("WEB3DAV_TLS_CERT")
                .requires(ARG_TLS_KEY)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new(ARG_TLS_KEY)
                .long(ARG_TLS_KEY)
                .help("Path to the TLS private key (PEM)")
                .env("WEB3DAV_TLS_KEY")
                .requires(ARG_TLS_CERT)
                .value_parser(clap::value_parser!(PathBuf)),
        )
}
