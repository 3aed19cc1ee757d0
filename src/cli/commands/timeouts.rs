use crate::config::Timeouts;
use clap::{Arg, ArgMatches, Command};
use std::time::Duration;

pub const ARG_READ_TIMEOUT: &str = "read-timeout";
pub const ARG_WRITE_TIMEOUT: &str = "write-timeout";
pub const ARG_IDLE_TIMEOUT: &str = "idle-timeout";
pub const ARG_SHUTDOWN_TIMEOUT: &str = "shutdown-timeout";

#[must_use]
pub fn parse(matches: &ArgMatches) -> Timeouts {
    let defaults = Timeouts::default();
    let seconds = |id: &str, default: Duration| {
        matches
            .get_one::<u64>(id)
            .copied()
            .map_or(default, Duration::from_secs)
    };

    Timeouts {
        read: seconds(ARG_READ_TIMEOUT, defaults.read),
        write: seconds(ARG_WRITE_TIMEOUT, defaults.write),
        idle: seconds(ARG_IDLE_TIMEOUT, defaults.idle),
        shutdown: seconds(ARG_SHUTDOWN_TIMEOUT, defaults.shutdown),
    }
}

// Unset falls back to `Timeouts::default()`.
fn seconds_arg(id: &'static str, env: &'static str, help: &'static str) -> Arg {
    Arg::new(id)
        .long(id)
        .help(help)
        .env(env)
        .value_name("SECONDS")
        .value_parser(clap::value_parser!(u64).range(1..))
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(seconds_arg(
            ARG_READ_TIMEOUT,
            "WEB3DAV_READ_TIMEOUT",
            "Seconds a request body may stall [default: 30]",
        ))
        .arg(seconds_arg(
            ARG_WRITE_TIMEOUT,
            "WEB3DAV_WRITE_TIMEOUT",
            "Seconds a request may take to produce a response [default: 30]",
        ))
        .arg(seconds_arg(
            ARG_IDLE_TIMEOUT,
            "WEB3DAV_IDLE_TIMEOUT",
            "Seconds a connection may wait for its next request [default: 60]",
        ))
        .arg(seconds_arg(
            ARG_SHUTDOWN_TIMEOUT,
            "WEB3DAV_SHUTDOWN_TIMEOUT",
            "Seconds open connections get to finish after a shutdown signal [default: 10]",
        ))
}
