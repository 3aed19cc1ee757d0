use crate::{error::ErrorKind, user::DirectoryError};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("user not found")]
    UserNotFound,
    #[error("missing credentials")]
    MissingCredentials,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("challenge expired or not found")]
    ChallengeExpired,
    #[error("token expired")]
    TokenExpired,
    #[error("invalid token")]
    InvalidToken,
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
    #[error("invalid signature length: expected 65 bytes, got {0}")]
    InvalidSignatureLength(usize),
    #[error("signature mismatch: expected {expected}, recovered {recovered}")]
    SignatureMismatch { expected: String, recovered: String },
    #[error("invalid wallet address")]
    InvalidAddress,
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::UserNotFound => ErrorKind::NotFound,
            Self::MissingCredentials
            | Self::InvalidCredentials
            | Self::InvalidToken
            | Self::SignatureMismatch { .. } => ErrorKind::Unauthorized,
            Self::ChallengeExpired | Self::TokenExpired => ErrorKind::Expired,
            Self::InvalidSignature(_) | Self::InvalidSignatureLength(_) | Self::InvalidAddress => {
                ErrorKind::Malformed
            }
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<DirectoryError> for AuthError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::UserNotFound(_) => Self::UserNotFound,
            other => Self::Internal(other.to_string()),
        }
    }
}
