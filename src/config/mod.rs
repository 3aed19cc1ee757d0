//! Runtime settings assembled from the command line, and validation of the users file.

pub mod users;

pub use self::users::{RuleConfig, UserConfig, UsersFile};

use crate::{
    auth::{PasswordHasher, Web3Settings},
    error::ErrorKind,
    user::{DirectoryError, PermissionError, User, UserDirectory},
};
use chrono::Duration;
use secrecy::{ExposeSecret, SecretString};
use std::{path::PathBuf, time::Duration as StdDuration};
use thiserror::Error;
use url::Url;

pub const MIN_JWT_SECRET_LEN: usize = 32;

pub const DEFAULT_READ_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_WRITE_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_IDLE_TIMEOUT_SECONDS: u64 = 60;
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECONDS: u64 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid users file: {0}")]
    Parse(String),
    #[error("at least one user is required")]
    NoUsers,
    #[error("user #{0} has an empty username")]
    EmptyUsername(usize),
    #[error("duplicate username: {0}")]
    DuplicateUsername(String),
    #[error("duplicate wallet address: {0}")]
    DuplicateWalletAddress(String),
    #[error("user {0} needs a password or a wallet address")]
    MissingCredential(String),
    #[error("user {username} has an invalid wallet address: {address}")]
    InvalidWalletAddress { username: String, address: String },
    #[error("user {0} has an empty directory")]
    EmptyDirectory(String),
    #[error("user {username}: {source}")]
    Permissions {
        username: String,
        source: PermissionError,
    },
    #[error("user {username}: invalid rule pattern {pattern}: {source}")]
    RulePattern {
        username: String,
        pattern: String,
        source: regex::Error,
    },
    #[error("user {0} has a rule with an empty path")]
    EmptyRulePath(String),
    #[error("user {0} has a password hash with an unsupported algorithm tag")]
    UnsupportedPasswordHash(String),
    #[error("user {0}: password could not be hashed or parsed")]
    PasswordHash(String),
    #[error("a JWT secret is required when web3 authentication is enabled")]
    MissingJwtSecret,
    #[error("the JWT secret must be at least {MIN_JWT_SECRET_LEN} characters")]
    JwtSecretTooShort,
    #[error("{0} must be greater than zero")]
    InvalidTtl(&'static str),
    #[error("invalid CORS origin: {0}")]
    InvalidCorsOrigin(String),
    #[error("CORS origin '*' cannot be combined with credentials")]
    WildcardWithCredentials,
    #[error("{0} must be greater than zero")]
    InvalidTimeout(&'static str),
    #[error("TLS {0} file does not exist: {1}")]
    MissingTlsFile(&'static str, String),
}

impl ConfigError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Read { .. } => ErrorKind::Internal,
            Self::DuplicateUsername(_) | Self::DuplicateWalletAddress(_) => ErrorKind::Conflict,
            _ => ErrorKind::Malformed,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Web3Config {
    pub jwt_secret: SecretString,
    pub token_ttl_seconds: i64,
    pub challenge_ttl_seconds: i64,
}

impl Web3Config {
    /// # Errors
    /// Returns an error for a short secret or a non-positive TTL.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let secret = self.jwt_secret.expose_secret();
        if secret.is_empty() {
            return Err(ConfigError::MissingJwtSecret);
        }
        if secret.chars().count() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::JwtSecretTooShort);
        }
        if self.token_ttl_seconds <= 0 {
            return Err(ConfigError::InvalidTtl("web3-token-ttl"));
        }
        if self.challenge_ttl_seconds <= 0 {
            return Err(ConfigError::InvalidTtl("web3-challenge-ttl"));
        }
        Ok(())
    }

    #[must_use]
    pub fn settings(&self) -> Web3Settings {
        Web3Settings::new(self.jwt_secret.clone())
            .with_token_ttl(Duration::seconds(self.token_ttl_seconds))
            .with_challenge_ttl(Duration::seconds(self.challenge_ttl_seconds))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorsConfig {
    /// Empty disables CORS.
    pub origins: Vec<String>,
    pub credentials: bool,
}

impl CorsConfig {
    #[must_use]
    pub fn enabled(&self) -> bool {
        !self.origins.is_empty()
    }

    #[must_use]
    pub fn allows_any(&self) -> bool {
        self.origins.iter().any(|o| o == "*")
    }

    /// # Errors
    /// Returns an error for an origin that is not `scheme://host[:port]`, or for `*`
    /// combined with credentials.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.allows_any() {
            if self.credentials {
                return Err(ConfigError::WildcardWithCredentials);
            }
            return Ok(());
        }

        for origin in &self.origins {
            let parsed =
                Url::parse(origin).map_err(|_| ConfigError::InvalidCorsOrigin(origin.clone()))?;
            let bare = parsed.host_str().is_some()
                && parsed.path() == "/"
                && parsed.query().is_none()
                && parsed.fragment().is_none()
                && !origin.ends_with('/');
            if !bare || !matches!(parsed.scheme(), "http" | "https") {
                return Err(ConfigError::InvalidCorsOrigin(origin.clone()));
            }
        }
        Ok(())
    }
}

/// PEM certificate chain and private key; when present the listener speaks HTTPS only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConfig {
    pub cert: PathBuf,
    pub key: PathBuf,
}

impl TlsConfig {
    /// # Errors
    /// Returns an error naming the first file that does not exist.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (label, path) in [("certificate", &self.cert), ("key", &self.key)] {
            if !path.is_file() {
                return Err(ConfigError::MissingTlsFile(
                    label,
                    path.display().to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Connection and shutdown limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Longest pause between two chunks of a request body.
    pub read: StdDuration,
    /// Longest time a handler may take to produce a response; answered with 408.
    pub write: StdDuration,
    /// Longest time a connection may wait for the next request head.
    pub idle: StdDuration,
    /// Longest time open connections get to drain after a shutdown signal.
    pub shutdown: StdDuration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            read: StdDuration::from_secs(DEFAULT_READ_TIMEOUT_SECONDS),
            write: StdDuration::from_secs(DEFAULT_WRITE_TIMEOUT_SECONDS),
            idle: StdDuration::from_secs(DEFAULT_IDLE_TIMEOUT_SECONDS),
            shutdown: StdDuration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECONDS),
        }
    }
}

impl Timeouts {
    /// # Errors
    /// Returns an error for a zero timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("read-timeout", self.read),
            ("write-timeout", self.write),
            ("idle-timeout", self.idle),
            ("shutdown-timeout", self.shutdown),
        ] {
            if value.is_zero() {
                return Err(ConfigError::InvalidTimeout(name));
            }
        }
        Ok(())
    }
}

/// Everything the server needs to start.
#[derive(Debug, Clone)]
pub struct Settings {
    pub users_file: PathBuf,
    pub address: String,
    pub port: u16,
    /// Normalized mount prefix of the WebDAV surface, `/` or `/name/`.
    pub prefix: String,
    pub realm: String,
    pub require_password: bool,
    pub behind_proxy: bool,
    /// Let `OPTIONS` through without credentials.
    pub options_passthrough: bool,
    pub web3: Option<Web3Config>,
    pub cors: CorsConfig,
    pub tls: Option<TlsConfig>,
    pub timeouts: Timeouts,
}

impl Settings {
    /// # Errors
    /// Returns the first invalid setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(web3) = &self.web3 {
            web3.validate()?;
        }
        if let Some(tls) = &self.tls {
            tls.validate()?;
        }
        self.timeouts.validate()?;
        self.cors.validate()
    }

    /// Read and validate the users file, then build the directory from it.
    ///
    /// # Errors
    /// Returns the first validation failure.
    pub fn load_directory(&self, hasher: &dyn PasswordHasher) -> Result<UserDirectory, ConfigError> {
        let users: Vec<User> =
            UsersFile::load(&self.users_file)?.into_users(hasher, self.require_password)?;
        UserDirectory::from_users(users).map_err(|err| match err {
            DirectoryError::DuplicateAddress(address) => {
                ConfigError::DuplicateWalletAddress(address)
            }
            DirectoryError::DuplicateUsername(username) | DirectoryError::UserNotFound(username) => {
                ConfigError::DuplicateUsername(username)
            }
        })
    }
}
