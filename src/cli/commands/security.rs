use clap::{Arg, ArgAction, ArgMatches, Command};

pub const ARG_NO_PASSWORD: &str = "no-password";
pub const ARG_BEHIND_PROXY: &str = "behind-proxy";
pub const ARG_AUTHENTICATE_OPTIONS: &str = "authenticate-options";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    pub require_password: bool,
    pub behind_proxy: bool,
    pub options_passthrough: bool,
}

impl Options {
    #[must_use]
    pub fn parse(matches: &ArgMatches) -> Self {
        Self {
            require_password: !matches.get_flag(ARG_NO_PASSWORD),
            behind_proxy: matches.get_flag(ARG_BEHIND_PROXY),
            options_passthrough: !matches.get_flag(ARG_AUTHENTICATE_OPTIONS),
        }
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_NO_PASSWORD)
                .long(ARG_NO_PASSWORD)
                .help("Allow users without a password or wallet address")
                .long_help(
                    "Allow users without a password or wallet address. Basic authentication then accepts any password for them.",
                )
                .env("WEB3DAV_NO_PASSWORD")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(ARG_BEHIND_PROXY)
                .long(ARG_BEHIND_PROXY)
                .help("Trust X-Forwarded-For and X-Real-IP for the logged client address")
                .env("WEB3DAV_BEHIND_PROXY")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(ARG_AUTHENTICATE_OPTIONS)
                .long(ARG_AUTHENTICATE_OPTIONS)
                .help("Require credentials for OPTIONS requests too")
                .env("WEB3DAV_AUTHENTICATE_OPTIONS")
                .action(ArgAction::SetTrue),
        )
}
