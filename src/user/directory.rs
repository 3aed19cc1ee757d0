use crate::{error::ErrorKind, user::User};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("user not found: {0}")]
    UserNotFound(String),
    #[error("username already taken: {0}")]
    DuplicateUsername(String),
    #[error("wallet address already registered: {0}")]
    DuplicateAddress(String),
}

impl DirectoryError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::UserNotFound(_) => ErrorKind::NotFound,
            Self::DuplicateUsername(_) | Self::DuplicateAddress(_) => ErrorKind::Conflict,
        }
    }
}

/// Both lookup tables. Only mutated through [`Indices::upsert`] and [`Indices::remove`],
/// which keep them in agreement.
#[derive(Debug, Default)]
struct Indices {
    by_username: HashMap<String, User>,
    // lower-cased address -> username
    by_address: HashMap<String, String>,
}

impl Indices {
    fn upsert(&mut self, user: User) -> Result<(), DirectoryError> {
        if let Some(existing) = self.by_username.get(user.username()) {
            if existing.id() != user.id() {
                return Err(DirectoryError::DuplicateUsername(user.username().to_string()));
            }
        }

        if let Some(address) = user.wallet_address() {
            let owner = self
                .by_address
                .get(address)
                .and_then(|username| self.by_username.get(username));
            if owner.is_some_and(|owner| owner.id() != user.id()) {
                return Err(DirectoryError::DuplicateAddress(address.to_string()));
            }
        }

        // Drop whatever this id was stored under before, the address may have changed.
        let previous = self
            .by_username
            .values()
            .find(|u| u.id() == user.id())
            .map(|u| u.username().to_string());
        if let Some(previous) = previous {
            self.remove(&previous);
        }

        if let Some(address) = user.wallet_address() {
            self.by_address
                .insert(address.to_string(), user.username().to_string());
        }
        self.by_username.insert(user.username().to_string(), user);

        Ok(())
    }

    fn remove(&mut self, username: &str) -> Option<User> {
        let user = self.by_username.remove(username)?;
        if let Some(address) = user.wallet_address() {
            self.by_address.remove(address);
        }
        Some(user)
    }
}

/// Concurrent in-memory user store indexed by username and wallet address.
#[derive(Debug, Default)]
pub struct UserDirectory {
    inner: RwLock<Indices>,
}

impl UserDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a directory from an initial user list.
    ///
    /// # Errors
    /// Returns the first uniqueness violation found.
    pub fn from_users(users: impl IntoIterator<Item = User>) -> Result<Self, DirectoryError> {
        let mut indices = Indices::default();
        for user in users {
            indices.upsert(user)?;
        }
        Ok(Self {
            inner: RwLock::new(indices),
        })
    }

    /// # Errors
    /// Returns [`DirectoryError::UserNotFound`] when no user has that name.
    pub async fn find_by_username(&self, username: &str) -> Result<User, DirectoryError> {
        self.inner
            .read()
            .await
            .by_username
            .get(username)
            .cloned()
            .ok_or_else(|| DirectoryError::UserNotFound(username.to_string()))
    }

    /// Lookup is case-insensitive.
    ///
    /// # Errors
    /// Returns [`DirectoryError::UserNotFound`] when no user owns the address.
    pub async fn find_by_address(&self, address: &str) -> Result<User, DirectoryError> {
        let address = address.trim().to_ascii_lowercase();
        let indices = self.inner.read().await;
        indices
            .by_address
            .get(&address)
            .and_then(|username| indices.by_username.get(username))
            .cloned()
            .ok_or(DirectoryError::UserNotFound(address))
    }

    /// Insert or replace a user. Uniqueness is checked against other users only, so a
    /// user re-saving its own record never conflicts with itself.
    ///
    /// # Errors
    /// Returns a conflict and leaves the directory untouched when the username or the
    /// wallet address belongs to a different user.
    pub async fn save(&self, user: User) -> Result<(), DirectoryError> {
        let username = user.username().to_string();
        self.inner.write().await.upsert(user)?;
        debug!(username, "user saved");
        Ok(())
    }

    /// # Errors
    /// Returns [`DirectoryError::UserNotFound`] when no user has that name.
    pub async fn delete(&self, username: &str) -> Result<User, DirectoryError> {
        let user = self
            .inner
            .write()
            .await
            .remove(username)
            .ok_or_else(|| DirectoryError::UserNotFound(username.to_string()))?;
        debug!(username, "user deleted");
        Ok(user)
    }

    /// Snapshot of every user, sorted by username.
    pub async fn list(&self) -> Vec<User> {
        let mut users: Vec<User> = self.inner.read().await.by_username.values().cloned().collect();
        users.sort_by(|a, b| a.username().cmp(b.username()));
        users
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.by_username.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.by_username.is_empty()
    }
}
