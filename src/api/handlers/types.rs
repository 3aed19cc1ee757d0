//! Request/response types for the public endpoints.

use crate::{
    auth::web3::{Challenge, Token},
    user::User,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(IntoParams, Serialize, Deserialize, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct ChallengeQuery {
    /// Wallet address, `0x` followed by 40 hex digits.
    pub address: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
pub struct ChallengeRequest {
    pub address: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ChallengeResponse {
    pub address: String,
    pub nonce: String,
    pub message: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<Challenge> for ChallengeResponse {
    fn from(challenge: Challenge) -> Self {
        Self {
            address: challenge.address,
            nonce: challenge.nonce,
            message: challenge.message,
            issued_at: challenge.issued_at,
            expires_at: challenge.expires_at,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
pub struct VerifyRequest {
    pub address: Option<String>,
    pub signature: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct UserInfo {
    pub username: String,
    pub wallet_address: Option<String>,
    /// Default permissions, e.g. `["read"]`.
    pub permissions: Vec<String>,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            username: user.username().to_string(),
            wallet_address: user.wallet_address().map(str::to_string),
            permissions: user.permissions.names(),
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct VerifyResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserInfo,
}

impl VerifyResponse {
    #[must_use]
    pub fn new(token: Token, user: &User) -> Self {
        Self {
            token: token.value,
            expires_at: token.expires_at,
            user: UserInfo::from(user),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::Permissions;

    #[test]
    fn verify_request_allows_missing_fields() -> anyhow::Result<()> {
        let request: VerifyRequest = serde_json::from_str("{}")?;
        assert!(request.address.is_none());
        assert!(request.signature.is_none());
        Ok(())
    }

    #[test]
    fn user_info_lists_permission_names() -> anyhow::Result<()> {
        let user = User::new("alice")
            .with_wallet_address("0x1111111111111111111111111111111111111111")?
            .with_permissions(Permissions::parse("CR")?);
        let info = UserInfo::from(&user);
        let json = serde_json::to_value(&info)?;
        assert_eq!(json["username"], "alice");
        assert_eq!(
            json["wallet_address"],
            "0x1111111111111111111111111111111111111111"
        );
        assert_eq!(json["permissions"], serde_json::json!(["create", "read"]));
        Ok(())
    }
}
