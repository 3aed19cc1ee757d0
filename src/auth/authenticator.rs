use crate::{
    auth::{basic::BasicAuthenticator, web3::Web3Authenticator, AuthError},
    user::User,
};
use axum::http::HeaderMap;
use std::sync::Arc;

/// The credential schemes the protected surface accepts, tried in configured order.
#[derive(Debug, Clone)]
pub enum Authenticator {
    Basic(BasicAuthenticator),
    Web3(Arc<Web3Authenticator>),
}

impl Authenticator {
    /// `Ok(None)` means the request carries nothing this authenticator can check.
    ///
    /// # Errors
    /// Returns the verification failure when credential material was present.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<Option<User>, AuthError> {
        match self {
            Self::Basic(basic) => basic.authenticate(headers).await,
            Self::Web3(web3) => web3.authenticate(headers).await,
        }
    }

    #[must_use]
    pub const fn scheme(&self) -> &'static str {
        match self {
            Self::Basic(_) => "Basic",
            Self::Web3(_) => "Bearer",
        }
    }

    /// `WWW-Authenticate` value advertising this scheme.
    #[must_use]
    pub fn challenge(&self, realm: &str) -> String {
        format!("{} realm=\"{}\"", self.scheme(), realm.replace('"', "'"))
    }
}
