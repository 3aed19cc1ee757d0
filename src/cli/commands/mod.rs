pub mod cors;
pub mod security;
pub mod timeouts;
pub mod tls;
pub mod web3;

use crate::cli::telemetry;
use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ColorChoice, Command,
};

pub const ARG_CONFIG: &str = "config";
pub const ARG_ADDRESS: &str = "address";
pub const ARG_PORT: &str = "port";
pub const ARG_PREFIX: &str = "prefix";
pub const ARG_REALM: &str = "realm";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("web3dav")
        .about("WebDAV with password and wallet signature authentication")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_CONFIG)
                .short('c')
                .long(ARG_CONFIG)
                .help("Path to the users JSON file")
                .env("WEB3DAV_CONFIG")
                .required(true)
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            Arg::new(ARG_ADDRESS)
                .long(ARG_ADDRESS)
                .help("Address to bind")
                .env("WEB3DAV_ADDRESS")
                .default_value("0.0.0.0"),
        )
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("6065")
                .env("WEB3DAV_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_PREFIX)
                .long(ARG_PREFIX)
                .help("Path the WebDAV surface is mounted at")
                .env("WEB3DAV_PREFIX")
                .default_value("/"),
        )
        .arg(
            Arg::new(ARG_REALM)
                .long(ARG_REALM)
                .help("Realm advertised in WWW-Authenticate challenges")
                .env("WEB3DAV_REALM")
                .default_value("web3dav"),
        );

    let command = security::with_args(command);
    let command = web3::with_args(command);
    let command = cors::with_args(command);
    let command = tls::with_args(command);
    let command = timeouts::with_args(command);
    telemetry::with_args(command)
}
