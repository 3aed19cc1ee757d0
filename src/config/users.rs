//! The users file: who may log in, with which credentials, and what they may touch.
//!
//! ```json
//! {
//!   "users": [
//!     {
//!       "username": "alice",
//!       "password": "plaintext or {argon2}$argon2id$...",
//!       "wallet_address": "0x...",
//!       "directory": "/data/alice",
//!       "permissions": "R",
//!       "rules": [{ "path": "/private", "permissions": "CRUD" }]
//!     }
//!   ]
//! }
//! ```

use super::ConfigError;
use crate::{
    auth::password::{is_tagged, PasswordError, PasswordHasher},
    user::{Permissions, Rule, User},
};
use serde::Deserialize;
use std::{collections::HashSet, fs, path::Path};
use tracing::debug;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RuleConfig {
    pub path: String,
    pub permissions: String,
    /// Treat `path` as a regular expression instead of a literal prefix.
    #[serde(default)]
    pub regex: bool,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct UserConfig {
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub wallet_address: Option<String>,
    pub directory: String,
    #[serde(default = "default_permissions")]
    pub permissions: String,
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

fn default_permissions() -> String {
    Permissions::read_only().code()
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct UsersFile {
    pub users: Vec<UserConfig>,
}

impl UsersFile {
    /// # Errors
    /// Returns an error if the file cannot be read or is not valid JSON.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// # Errors
    /// Returns [`ConfigError::Parse`] on malformed JSON.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Validate every entry and turn it into a [`User`]. Plaintext passwords are hashed
    /// with `hasher`; tagged hashes are kept after checking the tag is supported.
    ///
    /// # Errors
    /// Returns the first validation failure.
    pub fn into_users(
        self,
        hasher: &dyn PasswordHasher,
        require_password: bool,
    ) -> Result<Vec<User>, ConfigError> {
        if self.users.is_empty() {
            return Err(ConfigError::NoUsers);
        }

        let mut usernames = HashSet::new();
        let mut addresses = HashSet::new();
        let mut users = Vec::with_capacity(self.users.len());

        for (index, entry) in self.users.into_iter().enumerate() {
            let username = entry.username.trim().to_string();
            if username.is_empty() {
                return Err(ConfigError::EmptyUsername(index));
            }
            if !usernames.insert(username.clone()) {
                return Err(ConfigError::DuplicateUsername(username));
            }

            let user = build_user(&username, entry, hasher, require_password)?;
            if let Some(address) = user.wallet_address() {
                if !addresses.insert(address.to_string()) {
                    return Err(ConfigError::DuplicateWalletAddress(address.to_string()));
                }
            }

            debug!(
                username,
                rules = user.rules.len(),
                permissions = %user.permissions,
                "user loaded"
            );
            users.push(user);
        }

        Ok(users)
    }
}

fn build_user(
    username: &str,
    entry: UserConfig,
    hasher: &dyn PasswordHasher,
    require_password: bool,
) -> Result<User, ConfigError> {
    let password = entry.password.filter(|p| !p.is_empty());
    let wallet = entry
        .wallet_address
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty());

    if require_password && password.is_none() && wallet.is_none() {
        return Err(ConfigError::MissingCredential(username.to_string()));
    }

    let directory = entry.directory.trim();
    if directory.is_empty() {
        return Err(ConfigError::EmptyDirectory(username.to_string()));
    }

    let permissions =
        Permissions::parse(&entry.permissions).map_err(|source| ConfigError::Permissions {
            username: username.to_string(),
            source,
        })?;

    let rules = entry
        .rules
        .into_iter()
        .map(|rule| build_rule(username, rule))
        .collect::<Result<Vec<_>, _>>()?;

    let mut user = User::new(username)
        .with_directory(directory)
        .with_permissions(permissions)
        .with_rules(rules);

    if let Some(password) = password {
        user = user.with_password_hash(stored_hash(username, &password, hasher)?);
    }

    if let Some(address) = wallet {
        user = user
            .with_wallet_address(&address)
            .map_err(|_| ConfigError::InvalidWalletAddress {
                username: username.to_string(),
                address,
            })?;
    }

    Ok(user)
}

fn build_rule(username: &str, rule: RuleConfig) -> Result<Rule, ConfigError> {
    let permissions =
        Permissions::parse(&rule.permissions).map_err(|source| ConfigError::Permissions {
            username: username.to_string(),
            source,
        })?;

    if rule.regex {
        Rule::pattern(&rule.path, permissions).map_err(|source| ConfigError::RulePattern {
            username: username.to_string(),
            pattern: rule.path,
            source,
        })
    } else if rule.path.trim().is_empty() {
        Err(ConfigError::EmptyRulePath(username.to_string()))
    } else {
        Ok(Rule::prefix(rule.path.trim(), permissions))
    }
}

fn stored_hash(
    username: &str,
    password: &str,
    hasher: &dyn PasswordHasher,
) -> Result<String, ConfigError> {
    if !is_tagged(password) {
        return hasher
            .hash(password)
            .map_err(|_| ConfigError::PasswordHash(username.to_string()));
    }

    // Verifying against an empty password only exercises tag and format parsing.
    match hasher.verify(password, "") {
        Ok(_) => Ok(password.to_string()),
        Err(PasswordError::UnsupportedFormat) => {
            Err(ConfigError::UnsupportedPasswordHash(username.to_string()))
        }
        Err(_) => Err(ConfigError::PasswordHash(username.to_string())),
    }
}
