//! Wallet challenge-response login.
//!
//! A client asks for a challenge for its address, signs the returned message with
//! `personal_sign` and exchanges the signature for a bearer token. The token is then
//! accepted as `Authorization: Bearer <token>` or as the password of a Basic header.

pub mod challenge;
pub mod signature;
pub mod token;

pub use self::challenge::{Challenge, ChallengeStore};
pub use self::token::{Token, TokenClaims, TokenIssuer};

use crate::{
    auth::{credentials::Credentials, AuthError},
    clock::Clock,
    user::{normalize_address, User, UserDirectory},
};
use axum::http::HeaderMap;
use chrono::Duration;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::{info, warn};

pub const DEFAULT_CHALLENGE_TTL_SECONDS: i64 = 300;
pub const DEFAULT_TOKEN_TTL_SECONDS: i64 = 86_400;

#[derive(Debug, Clone)]
pub struct Web3Settings {
    pub jwt_secret: SecretString,
    pub challenge_ttl: Duration,
    pub token_ttl: Duration,
}

impl Web3Settings {
    #[must_use]
    pub fn new(jwt_secret: SecretString) -> Self {
        Self {
            jwt_secret,
            challenge_ttl: Duration::seconds(DEFAULT_CHALLENGE_TTL_SECONDS),
            token_ttl: Duration::seconds(DEFAULT_TOKEN_TTL_SECONDS),
        }
    }

    #[must_use]
    pub const fn with_challenge_ttl(mut self, ttl: Duration) -> Self {
        self.challenge_ttl = ttl;
        self
    }

    #[must_use]
    pub const fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }
}

#[derive(Debug)]
pub struct Web3Authenticator {
    directory: Arc<UserDirectory>,
    challenges: ChallengeStore,
    tokens: TokenIssuer,
    clock: Arc<dyn Clock>,
    challenge_ttl: Duration,
}

impl Web3Authenticator {
    #[must_use]
    pub fn new(directory: Arc<UserDirectory>, clock: Arc<dyn Clock>, settings: Web3Settings) -> Self {
        Self {
            directory,
            challenges: ChallengeStore::new(),
            tokens: TokenIssuer::new(settings.jwt_secret, settings.token_ttl),
            clock,
            challenge_ttl: settings.challenge_ttl,
        }
    }

    #[must_use]
    pub const fn challenges(&self) -> &ChallengeStore {
        &self.challenges
    }

    /// Issue a fresh challenge for a registered address, replacing any previous one.
    ///
    /// # Errors
    /// [`AuthError::InvalidAddress`] for a malformed address and
    /// [`AuthError::UserNotFound`] when no user owns it.
    pub async fn create_challenge(&self, address: &str) -> Result<Challenge, AuthError> {
        let address = normalize_address(address).map_err(|_| AuthError::InvalidAddress)?;
        self.directory.find_by_address(&address).await?;

        let now = self.clock.now();
        let challenge = Challenge::new(&address, now, now + self.challenge_ttl);
        self.challenges.issue(challenge.clone(), now).await;

        info!(address, expires_at = %challenge.expires_at, "challenge issued");
        Ok(challenge)
    }

    /// Check `signature` against the live challenge for `address` and issue a token.
    ///
    /// The user is resolved first, so an address that was unregistered after its
    /// challenge was issued keeps failing with [`AuthError::UserNotFound`]. Otherwise the
    /// challenge is removed on the first attempt, successful or not.
    ///
    /// # Errors
    /// [`AuthError::UserNotFound`] when no user holds `address`,
    /// [`AuthError::ChallengeExpired`] when there is no live challenge, or a signature
    /// error when it does not recover to `address`.
    pub async fn verify_signature(
        &self,
        address: &str,
        signature_hex: &str,
    ) -> Result<(Token, User), AuthError> {
        let address = normalize_address(address).map_err(|_| AuthError::InvalidAddress)?;
        let user = self.directory.find_by_address(&address).await?;

        let challenge = self
            .challenges
            .take(&address)
            .await
            .ok_or(AuthError::ChallengeExpired)?;
        let now = self.clock.now();
        if challenge.is_expired(now) {
            warn!(address, "challenge expired");
            return Err(AuthError::ChallengeExpired);
        }

        if let Err(err) = signature::verify_signature(&address, &challenge.message, signature_hex) {
            warn!(address, error = %err, "signature verification failed");
            return Err(err);
        }

        let token = self.tokens.issue(&address, now)?;

        info!(address, username = user.username(), "wallet authenticated");
        Ok((token, user))
    }

    /// Resolve a bearer token to its user.
    ///
    /// # Errors
    /// [`AuthError::InvalidToken`], [`AuthError::TokenExpired`] or
    /// [`AuthError::UserNotFound`].
    pub async fn authenticate_token(&self, value: &str) -> Result<User, AuthError> {
        let claims = self.tokens.verify(value, self.clock.now())?;
        Ok(self.directory.find_by_address(&claims.sub).await?)
    }

    /// `Ok(None)` when the request carries no token.
    ///
    /// # Errors
    /// Returns the token error, or [`AuthError::InvalidCredentials`] when a token sent
    /// over Basic names a different user.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<Option<User>, AuthError> {
        match Credentials::from_headers(headers)? {
            Some(Credentials::Bearer(value)) => self.authenticate_token(&value).await.map(Some),
            Some(Credentials::Basic { username, password })
                if token::looks_like_token(password.expose_secret()) =>
            {
                let user = self.authenticate_token(password.expose_secret()).await?;
                let same_address = user
                    .wallet_address()
                    .is_some_and(|a| a.eq_ignore_ascii_case(username.trim()));
                if user.username() == username || same_address {
                    Ok(Some(user))
                } else {
                    Err(AuthError::InvalidCredentials)
                }
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::auth::web3::signature::{
        address_of,
        tests::{key, sign},
    };
    use crate::clock::ManualClock;
    use axum::http::{header::AUTHORIZATION, HeaderValue};
    use base64ct::{Base64, Encoding};
    use chrono::Utc;

    struct Fixture {
        clock: Arc<ManualClock>,
        directory: Arc<UserDirectory>,
        web3: Web3Authenticator,
        key: k256::ecdsa::SigningKey,
        address: String,
    }

    fn fixture() -> Fixture {
        let key = key(42);
        let address = address_of(key.verifying_key());
        let user = User::new("alice").with_wallet_address(&address).unwrap();
        let directory = Arc::new(UserDirectory::from_users([user]).unwrap());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let settings = Web3Settings::new(SecretString::from(
            "0123456789abcdef0123456789abcdef".to_string(),
        ));
        let web3 = Web3Authenticator::new(directory.clone(), clock.clone(), settings);
        Fixture {
            clock,
            directory,
            web3,
            key,
            address,
        }
    }

    fn bearer(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {value}")).unwrap(),
        );
        headers
    }

    fn basic(username: &str, password: &str) -> HeaderMap {
        let encoded = Base64::encode_string(format!("{username}:{password}").as_bytes());
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Basic {encoded}")).unwrap(),
        );
        headers
    }

    #[tokio::test]
    async fn unregistered_address_gets_no_challenge() {
        let f = fixture();
        let result = f
            .web3
            .create_challenge("0x9999999999999999999999999999999999999999")
            .await;
        assert_eq!(result.unwrap_err(), AuthError::UserNotFound);
        assert!(f.web3.challenges().is_empty().await);
    }

    #[tokio::test]
    async fn malformed_address_is_rejected() {
        let f = fixture();
        assert_eq!(
            f.web3.create_challenge("not-an-address").await.unwrap_err(),
            AuthError::InvalidAddress
        );
    }

    #[tokio::test]
    async fn signed_challenge_yields_token_for_address() {
        let f = fixture();
        let challenge = f
            .web3
            .create_challenge(&f.address.to_ascii_uppercase().replace("0X", "0x"))
            .await
            .unwrap();
        assert_eq!(challenge.address, f.address);

        let signature = sign(&f.key, &challenge.message);
        let (token, user) = f.web3.verify_signature(&f.address, &signature).await.unwrap();
        assert_eq!(token.address, f.address);
        assert!(token.is_valid(f.clock.now()));
        assert_eq!(user.username(), "alice");
    }

    #[tokio::test]
    async fn replay_fails() {
        let f = fixture();
        let challenge = f.web3.create_challenge(&f.address).await.unwrap();
        let signature = sign(&f.key, &challenge.message);

        f.web3.verify_signature(&f.address, &signature).await.unwrap();
        assert_eq!(
            f.web3
                .verify_signature(&f.address, &signature)
                .await
                .unwrap_err(),
            AuthError::ChallengeExpired
        );
    }

    #[tokio::test]
    async fn removed_user_is_checked_before_the_challenge() {
        let f = fixture();
        let challenge = f.web3.create_challenge(&f.address).await.unwrap();
        f.directory.delete("alice").await.unwrap();

        let signature = sign(&f.key, &challenge.message);
        for _ in 0..2 {
            assert_eq!(
                f.web3
                    .verify_signature(&f.address, &signature)
                    .await
                    .unwrap_err(),
                AuthError::UserNotFound
            );
        }
        assert_eq!(f.web3.challenges().len().await, 1);
    }

    #[tokio::test]
    async fn failed_attempt_consumes_challenge() {
        let f = fixture();
        let challenge = f.web3.create_challenge(&f.address).await.unwrap();

        let wrong = sign(&key(1), &challenge.message);
        assert!(matches!(
            f.web3.verify_signature(&f.address, &wrong).await,
            Err(AuthError::SignatureMismatch { .. })
        ));

        let right = sign(&f.key, &challenge.message);
        assert_eq!(
            f.web3.verify_signature(&f.address, &right).await.unwrap_err(),
            AuthError::ChallengeExpired
        );
    }

    #[tokio::test]
    async fn expired_challenge_fails() {
        let f = fixture();
        let challenge = f.web3.create_challenge(&f.address).await.unwrap();
        let signature = sign(&f.key, &challenge.message);

        f.clock
            .advance(Duration::seconds(DEFAULT_CHALLENGE_TTL_SECONDS + 1));
        assert_eq!(
            f.web3
                .verify_signature(&f.address, &signature)
                .await
                .unwrap_err(),
            AuthError::ChallengeExpired
        );
    }

    #[tokio::test]
    async fn replaced_challenge_cannot_be_answered() {
        let f = fixture();
        let stale = f.web3.create_challenge(&f.address).await.unwrap();
        let fresh = f.web3.create_challenge(&f.address).await.unwrap();
        assert_ne!(stale.nonce, fresh.nonce);

        let signature = sign(&f.key, &stale.message);
        assert!(f.web3.verify_signature(&f.address, &signature).await.is_err());
    }

    #[tokio::test]
    async fn bearer_token_authenticates_until_expiry() {
        let f = fixture();
        let challenge = f.web3.create_challenge(&f.address).await.unwrap();
        let (token, _) = f
            .web3
            .verify_signature(&f.address, &sign(&f.key, &challenge.message))
            .await
            .unwrap();

        let user = f.web3.authenticate(&bearer(&token.value)).await.unwrap();
        assert_eq!(user.map(|u| u.username().to_string()), Some("alice".into()));

        f.clock.set(token.expires_at);
        assert_eq!(
            f.web3.authenticate(&bearer(&token.value)).await.unwrap_err(),
            AuthError::TokenExpired
        );
    }

    #[tokio::test]
    async fn token_accepted_as_basic_password() {
        let f = fixture();
        let challenge = f.web3.create_challenge(&f.address).await.unwrap();
        let (token, _) = f
            .web3
            .verify_signature(&f.address, &sign(&f.key, &challenge.message))
            .await
            .unwrap();

        assert!(f
            .web3
            .authenticate(&basic("alice", &token.value))
            .await
            .unwrap()
            .is_some());
        assert!(f
            .web3
            .authenticate(&basic(&f.address, &token.value))
            .await
            .unwrap()
            .is_some());
        assert_eq!(
            f.web3
                .authenticate(&basic("mallory", &token.value))
                .await
                .unwrap_err(),
            AuthError::InvalidCredentials
        );
    }

    #[tokio::test]
    async fn declines_without_token() {
        let f = fixture();
        assert!(f.web3.authenticate(&HeaderMap::new()).await.unwrap().is_none());
        assert!(f
            .web3
            .authenticate(&basic("alice", "plain password"))
            .await
            .unwrap()
            .is_none());
    }
}
