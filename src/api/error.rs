use crate::auth::AuthError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

/// Body of every error answered by this service.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    #[must_use]
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "FORBIDDEN", message)
    }

    #[must_use]
    pub fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            "internal server error",
        )
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let status = err.kind().status();
        let code = match &err {
            AuthError::UserNotFound => "USER_NOT_FOUND",
            AuthError::InvalidAddress => "INVALID_ADDRESS",
            AuthError::ChallengeExpired => "CHALLENGE_EXPIRED",
            AuthError::InvalidSignature(_)
            | AuthError::InvalidSignatureLength(_)
            | AuthError::SignatureMismatch { .. } => "INVALID_SIGNATURE",
            AuthError::MissingCredentials
            | AuthError::InvalidCredentials
            | AuthError::TokenExpired
            | AuthError::InvalidToken => "UNAUTHORIZED",
            AuthError::Internal(detail) => {
                error!(detail, "internal authentication error");
                return Self::internal();
            }
        };
        let message = match &err {
            // The recovered address is not echoed back.
            AuthError::SignatureMismatch { .. } => "signature does not match address".to_string(),
            other => other.to_string(),
        };
        Self::new(status, code, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.code.to_string(),
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_errors_map_to_codes() {
        let err = ApiError::from(AuthError::UserNotFound);
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.code, "USER_NOT_FOUND");

        let err = ApiError::from(AuthError::InvalidSignatureLength(3));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "INVALID_SIGNATURE");

        let err = ApiError::from(AuthError::SignatureMismatch {
            expected: "0xa".into(),
            recovered: "0xb".into(),
        });
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert!(!err.message.contains("0xb"));

        let err = ApiError::from(AuthError::ChallengeExpired);
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(err.code, "CHALLENGE_EXPIRED");
    }

    #[test]
    fn internal_errors_hide_details() {
        let err = ApiError::from(AuthError::Internal("secret detail".into()));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message.contains("secret"));
    }
}
