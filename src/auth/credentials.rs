use crate::auth::AuthError;
use axum::http::{header::AUTHORIZATION, HeaderMap};
use base64ct::{Base64, Encoding};
use secrecy::SecretString;

/// Credential material carried by the `Authorization` header.
#[derive(Debug, Clone)]
pub enum Credentials {
    Basic {
        username: String,
        password: SecretString,
    },
    Bearer(String),
}

impl Credentials {
    /// `Ok(None)` when there is no `Authorization` header or its scheme is not one we
    /// understand.
    ///
    /// # Errors
    /// Returns [`AuthError::InvalidCredentials`] when a Basic or Bearer value is present
    /// but cannot be decoded.
    pub fn from_headers(headers: &HeaderMap) -> Result<Option<Self>, AuthError> {
        let Some(value) = headers.get(AUTHORIZATION) else {
            return Ok(None);
        };
        let value = value.to_str().map_err(|_| AuthError::InvalidCredentials)?.trim();

        let (scheme, rest) = value.split_once(' ').unwrap_or((value, ""));
        let rest = rest.trim();

        if scheme.eq_ignore_ascii_case("basic") {
            if rest.is_empty() {
                return Err(AuthError::InvalidCredentials);
            }
            decode_basic(rest).map(Some)
        } else if scheme.eq_ignore_ascii_case("bearer") {
            if rest.is_empty() {
                Err(AuthError::InvalidCredentials)
            } else {
                Ok(Some(Self::Bearer(rest.to_string())))
            }
        } else {
            Ok(None)
        }
    }
}

fn decode_basic(encoded: &str) -> Result<Credentials, AuthError> {
    let bytes = Base64::decode_vec(encoded).map_err(|_| AuthError::InvalidCredentials)?;
    let decoded = String::from_utf8(bytes).map_err(|_| AuthError::InvalidCredentials)?;
    let (username, password) = decoded
        .split_once(':')
        .ok_or(AuthError::InvalidCredentials)?;

    if username.is_empty() {
        return Err(AuthError::InvalidCredentials);
    }

    Ok(Credentials::Basic {
        username: username.to_string(),
        password: SecretString::from(password.to_string()),
    })
}
