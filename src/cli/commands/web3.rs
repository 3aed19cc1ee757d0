use crate::{
    auth::web3::{DEFAULT_CHALLENGE_TTL_SECONDS, DEFAULT_TOKEN_TTL_SECONDS},
    config::Web3Config,
};
use clap::{Arg, ArgAction, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_WEB3: &str = "web3";
pub const ARG_JWT_SECRET: &str = "jwt-secret";
pub const ARG_TOKEN_TTL: &str = "web3-token-ttl";
pub const ARG_CHALLENGE_TTL: &str = "web3-challenge-ttl";

#[derive(Debug, Clone)]
pub struct Options {
    /// `None` when wallet authentication is disabled.
    pub web3: Option<Web3Config>,
}

impl Options {
    #[must_use]
    pub fn parse(matches: &ArgMatches) -> Self {
        if !matches.get_flag(ARG_WEB3) {
            return Self { web3: None };
        }

        // A missing secret is reported by validation, not by clap.
        let jwt_secret = matches
            .get_one::<String>(ARG_JWT_SECRET)
            .cloned()
            .unwrap_or_default();

        Self {
            web3: Some(Web3Config {
                jwt_secret: SecretString::from(jwt_secret),
                token_ttl_seconds: matches
                    .get_one::<i64>(ARG_TOKEN_TTL)
                    .copied()
                    .unwrap_or(DEFAULT_TOKEN_TTL_SECONDS),
                challenge_ttl_seconds: matches
                    .get_one::<i64>(ARG_CHALLENGE_TTL)
                    .copied()
                    .unwrap_or(DEFAULT_CHALLENGE_TTL_SECONDS),
            }),
        }
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_WEB3)
                .long(ARG_WEB3)
                .help("Enable Ethereum wallet authentication")
                .env("WEB3DAV_WEB3")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(ARG_JWT_SECRET)
                .long(ARG_JWT_SECRET)
                .help("Secret used to sign bearer tokens, at least 32 characters")
                .env("WEB3DAV_JWT_SECRET")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_TOKEN_TTL)
                .long(ARG_TOKEN_TTL)
                .help("Bearer token lifetime in seconds")
                .env("WEB3DAV_WEB3_TOKEN_TTL")
                .default_value("86400")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_CHALLENGE_TTL)
                .long(ARG_CHALLENGE_TTL)
                .help("Challenge lifetime in seconds")
                .env("WEB3DAV_WEB3_CHALLENGE_TTL")
                .default_value("300")
                .value_parser(clap::value_parser!(i64)),
        )
}
