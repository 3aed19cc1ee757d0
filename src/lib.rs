//! # web3dav
//!
//! A WebDAV gateway that authenticates clients with either a username and password or
//! an Ethereum wallet signature, and authorizes every request against per-user CRUD
//! permissions.
//!
//! ## Authentication
//!
//! Requests to the protected surface go through an ordered list of authenticators.
//! Basic credentials are checked against Argon2id hashes loaded from the users file.
//! Wallet users first request a challenge for their address, sign it with
//! `personal_sign`, and exchange the signature for a bearer token. The token is
//! accepted as `Authorization: Bearer` or as the password of a Basic header, so plain
//! WebDAV clients can use it too.
//!
//! ## Authorization
//!
//! Each user has default permissions (a subset of `CRUD`) and an ordered list of path
//! rules. The first rule whose prefix or pattern matches the request path decides;
//! otherwise the defaults apply.

pub mod api;
pub mod auth;
pub mod cli;
pub mod clock;
pub mod config;
pub mod dav;
pub mod error;
pub mod tls;
pub mod user;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
