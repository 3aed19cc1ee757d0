//! HS256 bearer tokens issued after a successful signature check.

use crate::auth::AuthError;
use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use ulid::Ulid;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct TokenHeader {
    alg: String,
    typ: String,
}

impl TokenHeader {
    fn hs256() -> Self {
        Self {
            alg: "HS256".to_string(),
            typ: "JWT".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenClaims {
    /// Lower-cased wallet address.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub value: String,
    pub address: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Token {
    #[must_use]
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.value.is_empty() && now < self.expires_at
    }
}

/// Three non-empty dot separated segments.
#[must_use]
pub fn looks_like_token(value: &str) -> bool {
    let mut parts = value.split('.');
    let shaped = (0..3).all(|_| parts.next().is_some_and(|p| !p.is_empty()));
    shaped && parts.next().is_none()
}

fn b64e_json<T: Serialize>(value: &T) -> Result<String, AuthError> {
    let json = serde_json::to_vec(value).map_err(|e| AuthError::Internal(e.to_string()))?;
    Ok(Base64UrlUnpadded::encode_string(&json))
}

fn b64d_json<T: for<'de> Deserialize<'de>>(s: &str) -> Result<T, AuthError> {
    let bytes = Base64UrlUnpadded::decode_vec(s).map_err(|_| AuthError::InvalidToken)?;
    serde_json::from_slice(&bytes).map_err(|_| AuthError::InvalidToken)
}

#[derive(Debug, Clone)]
pub struct TokenIssuer {
    secret: SecretString,
    ttl: Duration,
}

impl TokenIssuer {
    #[must_use]
    pub const fn new(secret: SecretString, ttl: Duration) -> Self {
        Self { secret, ttl }
    }

    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    fn mac(&self) -> Result<HmacSha256, AuthError> {
        HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|e| AuthError::Internal(e.to_string()))
    }

    /// # Errors
    /// Returns [`AuthError::Internal`] if the claims cannot be encoded.
    pub fn issue(&self, address: &str, now: DateTime<Utc>) -> Result<Token, AuthError> {
        let iat = now.timestamp();
        let exp = iat + self.ttl.num_seconds();
        let claims = TokenClaims {
            sub: address.to_string(),
            iat,
            exp,
            jti: Ulid::new().to_string(),
        };

        let signing_input = format!("{}.{}", b64e_json(&TokenHeader::hs256())?, b64e_json(&claims)?);
        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let signature = Base64UrlUnpadded::encode_string(&mac.finalize().into_bytes());

        Ok(Token {
            value: format!("{signing_input}.{signature}"),
            address: claims.sub,
            issued_at: DateTime::from_timestamp(iat, 0).unwrap_or(now),
            expires_at: DateTime::from_timestamp(exp, 0).unwrap_or(now),
        })
    }

    /// Check signature, algorithm and expiry.
    ///
    /// # Errors
    /// Returns [`AuthError::InvalidToken`] for anything not signed by this issuer and
    /// [`AuthError::TokenExpired`] once `now` reaches `exp`.
    pub fn verify(&self, value: &str, now: DateTime<Utc>) -> Result<TokenClaims, AuthError> {
        let mut parts = value.split('.');
        let header_b64 = parts.next().ok_or(AuthError::InvalidToken)?;
        let claims_b64 = parts.next().ok_or(AuthError::InvalidToken)?;
        let sig_b64 = parts.next().ok_or(AuthError::InvalidToken)?;
        if parts.next().is_some() {
            return Err(AuthError::InvalidToken);
        }

        let header: TokenHeader = b64d_json(header_b64)?;
        if header.alg != "HS256" {
            return Err(AuthError::InvalidToken);
        }

        let signature = Base64UrlUnpadded::decode_vec(sig_b64).map_err(|_| AuthError::InvalidToken)?;
        let mut mac = self.mac()?;
        mac.update(format!("{header_b64}.{claims_b64}").as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| AuthError::InvalidToken)?;

        let claims: TokenClaims = b64d_json(claims_b64)?;
        if claims.exp <= now.timestamp() {
            return Err(AuthError::TokenExpired);
        }

        Ok(claims)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const ADDR: &str = "0x1111111111111111111111111111111111111111";

    fn issuer(secret: &str) -> TokenIssuer {
        TokenIssuer::new(SecretString::from(secret.to_string()), Duration::hours(24))
    }

    #[test]
    fn issued_token_verifies() {
        let issuer = issuer("0123456789abcdef0123456789abcdef");
        let now = Utc::now();
        let token = issuer.issue(ADDR, now).unwrap();

        assert!(looks_like_token(&token.value));
        assert_eq!(token.address, ADDR);
        assert!(token.is_valid(now));
        assert_eq!(token.expires_at - token.issued_at, Duration::hours(24));

        let claims = issuer.verify(&token.value, now).unwrap();
        assert_eq!(claims.sub, ADDR);
        assert!(Ulid::from_string(&claims.jti).is_ok());
    }

    #[test]
    fn expired_token_is_rejected() {
        let issuer = issuer("0123456789abcdef0123456789abcdef");
        let now = Utc::now();
        let token = issuer.issue(ADDR, now).unwrap();
        let later = token.expires_at;

        assert!(!token.is_valid(later));
        assert_eq!(
            issuer.verify(&token.value, later),
            Err(AuthError::TokenExpired)
        );
    }

    #[test]
    fn other_secret_is_rejected() {
        let now = Utc::now();
        let token = issuer("0123456789abcdef0123456789abcdef")
            .issue(ADDR, now)
            .unwrap();
        assert_eq!(
            issuer("fedcba9876543210fedcba9876543210").verify(&token.value, now),
            Err(AuthError::InvalidToken)
        );
    }

    #[test]
    fn tampered_claims_are_rejected() {
        let issuer = issuer("0123456789abcdef0123456789abcdef");
        let now = Utc::now();
        let token = issuer.issue(ADDR, now).unwrap();

        let parts: Vec<&str> = token.value.split('.').collect();
        let forged = TokenClaims {
            sub: "0x2222222222222222222222222222222222222222".to_string(),
            iat: now.timestamp(),
            exp: now.timestamp() + 60,
            jti: Ulid::new().to_string(),
        };
        let forged = format!("{}.{}.{}", parts[0], b64e_json(&forged).unwrap(), parts[2]);
        assert_eq!(issuer.verify(&forged, now), Err(AuthError::InvalidToken));
    }

    #[test]
    fn empty_value_is_never_valid() {
        let token = Token {
            value: String::new(),
            address: ADDR.to_string(),
            issued_at: Utc::now(),
            expires_at: Utc::now() + Duration::hours(1),
        };
        assert!(!token.is_valid(Utc::now()));
    }

    #[test]
    fn token_shape() {
        assert!(looks_like_token("a.b.c"));
        assert!(!looks_like_token("a.b"));
        assert!(!looks_like_token("a..c"));
        assert!(!looks_like_token("a.b.c.d"));
        assert!(!looks_like_token("hunter2"));
    }
}
