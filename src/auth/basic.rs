use crate::{
    auth::{credentials::Credentials, password::PasswordHasher, AuthError},
    user::{User, UserDirectory},
};
use axum::http::HeaderMap;
use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::{debug, error};

/// Username and password from a Basic `Authorization` header.
#[derive(Debug, Clone)]
pub struct BasicAuthenticator {
    directory: Arc<UserDirectory>,
    hasher: Arc<dyn PasswordHasher>,
    require_password: bool,
}

impl BasicAuthenticator {
    #[must_use]
    pub fn new(directory: Arc<UserDirectory>, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self {
            directory,
            hasher,
            require_password: true,
        }
    }

    /// With `false` any existing username is accepted without checking the password.
    #[must_use]
    pub const fn with_require_password(mut self, require_password: bool) -> Self {
        self.require_password = require_password;
        self
    }

    /// `Ok(None)` when the request has no Basic credentials.
    ///
    /// # Errors
    /// Unknown usernames and wrong passwords both yield
    /// [`AuthError::InvalidCredentials`].
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<Option<User>, AuthError> {
        let Some(Credentials::Basic { username, password }) = Credentials::from_headers(headers)?
        else {
            return Ok(None);
        };

        let user = self
            .directory
            .find_by_username(&username)
            .await
            .map_err(|_| AuthError::InvalidCredentials)?;

        if !self.require_password {
            debug!(username, "password check disabled");
            return Ok(Some(user));
        }

        let hash = user.password_hash().ok_or(AuthError::InvalidCredentials)?;
        match self.hasher.verify(hash, password.expose_secret()) {
            Ok(true) => Ok(Some(user)),
            Ok(false) => Err(AuthError::InvalidCredentials),
            Err(err) => {
                error!(username, error = %err, "stored password hash unusable");
                Err(AuthError::Internal(err.to_string()))
            }
        }
    }
}
