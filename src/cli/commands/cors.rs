use crate::config::CorsConfig;
use clap::{Arg, ArgAction, ArgMatches, Command};

pub const ARG_CORS_ORIGIN: &str = "cors-origin";
pub const ARG_CORS_CREDENTIALS: &str = "cors-credentials";

#[must_use]
pub fn parse(matches: &ArgMatches) -> CorsConfig {
    CorsConfig {
        origins: matches
            .get_many::<String>(ARG_CORS_ORIGIN)
            .map(|values| {
                values
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
                    .collect()
            })
            .unwrap_or_default(),
        credentials: matches.get_flag(ARG_CORS_CREDENTIALS),
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_CORS_ORIGIN)
                .long(ARG_CORS_ORIGIN)
                .help("Allowed CORS origin, repeatable; '*' allows any")
                .env("WEB3DAV_CORS_ORIGINS")
                .action(ArgAction::Append)
                .value_delimiter(','),
        )
        .arg(
            Arg::new(ARG_CORS_CREDENTIALS)
                .long(ARG_CORS_CREDENTIALS)
                .help("Allow credentials on CORS requests")
                .env("WEB3DAV_CORS_CREDENTIALS")
                .action(ArgAction::SetTrue),
        )
}
