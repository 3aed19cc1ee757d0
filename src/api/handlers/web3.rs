//! Unauthenticated endpoints of the wallet login flow.

use super::types::{ChallengeQuery, ChallengeRequest, ChallengeResponse, VerifyRequest, VerifyResponse};
use crate::{
    api::error::{ApiError, ErrorResponse},
    auth::Web3Authenticator,
};
use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Extension, Query},
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::{debug, instrument};

fn required(value: Option<String>, code: &'static str, field: &str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request(code, format!("{field} is required")))
}

async fn issue(web3: &Web3Authenticator, address: Option<String>) -> Response {
    let address = match required(address, "MISSING_ADDRESS", "address") {
        Ok(address) => address,
        Err(err) => return err.into_response(),
    };

    match web3.create_challenge(&address).await {
        Ok(challenge) => Json(ChallengeResponse::from(challenge)).into_response(),
        Err(err) => {
            debug!(error = %err, "challenge refused");
            ApiError::from(err).into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/auth/challenge",
    params(ChallengeQuery),
    responses(
        (status = 200, description = "Challenge issued", body = ChallengeResponse),
        (status = 400, description = "Missing or malformed address", body = ErrorResponse),
        (status = 404, description = "No user owns the address", body = ErrorResponse),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn challenge_get(
    Extension(web3): Extension<Arc<Web3Authenticator>>,
    query: Result<Query<ChallengeQuery>, QueryRejection>,
) -> Response {
    let address = query.ok().and_then(|Query(q)| q.address);
    issue(&web3, address).await
}

#[utoipa::path(
    post,
    path = "/api/auth/challenge",
    request_body = ChallengeRequest,
    responses(
        (status = 200, description = "Challenge issued", body = ChallengeResponse),
        (status = 400, description = "Missing or malformed address", body = ErrorResponse),
        (status = 404, description = "No user owns the address", body = ErrorResponse),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn challenge_post(
    Extension(web3): Extension<Arc<Web3Authenticator>>,
    payload: Result<Json<ChallengeRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(err) => {
            return ApiError::bad_request("INVALID_REQUEST", err.body_text()).into_response();
        }
    };
    issue(&web3, request.address).await
}

#[utoipa::path(
    post,
    path = "/api/auth/verify",
    request_body = VerifyRequest,
    responses(
        (status = 200, description = "Signature accepted, token issued", body = VerifyResponse),
        (status = 400, description = "Malformed request, address or signature", body = ErrorResponse),
        (status = 401, description = "Signature mismatch or challenge expired", body = ErrorResponse),
        (status = 404, description = "No user owns the address", body = ErrorResponse),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn verify(
    Extension(web3): Extension<Arc<Web3Authenticator>>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(err) => {
            return ApiError::bad_request("INVALID_REQUEST", err.body_text()).into_response();
        }
    };

    let fields = required(request.address, "MISSING_ADDRESS", "address").and_then(|address| {
        required(request.signature, "MISSING_SIGNATURE", "signature")
            .map(|signature| (address, signature))
    });
    let (address, signature) = match fields {
        Ok(fields) => fields,
        Err(err) => return err.into_response(),
    };

    match web3.verify_signature(&address, &signature).await {
        Ok((token, user)) => Json(VerifyResponse::new(token, &user)).into_response(),
        Err(err) => ApiError::from(err).into_response(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{
        auth::{
            web3::signature::{address_of, tests::{key, sign}},
            Web3Settings,
        },
        clock::SystemClock,
        user::{User, UserDirectory},
    };
    use axum::{
        body::{to_bytes, Body},
        http::{header::CONTENT_TYPE, Request, StatusCode},
        routing::{get, post},
        Router,
    };
    use secrecy::SecretString;
    use tower::ServiceExt;

    fn app(address: &str) -> Router {
        let user = User::new("alice").with_wallet_address(address).unwrap();
        let directory = Arc::new(UserDirectory::from_users([user]).unwrap());
        let web3 = Arc::new(Web3Authenticator::new(
            directory,
            Arc::new(SystemClock),
            Web3Settings::new(SecretString::from("k".repeat(32))),
        ));
        Router::new()
            .route("/api/auth/challenge", get(challenge_get).post(challenge_post))
            .route("/api/auth/verify", post(verify))
            .layer(Extension(web3))
    }

    fn json_post(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn get_challenge_by_query() {
        let address = address_of(key(5).verifying_key());
        let response = app(&address)
            .oneshot(
                Request::get(format!("/api/auth/challenge?address={address}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["address"], address.as_str());
        assert!(json["message"].as_str().unwrap().contains(json["nonce"].as_str().unwrap()));
    }

    #[tokio::test]
    async fn missing_address() {
        let address = address_of(key(5).verifying_key());
        let response = app(&address)
            .oneshot(Request::get("/api/auth/challenge").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "MISSING_ADDRESS");
    }

    #[tokio::test]
    async fn invalid_json_body() {
        let address = address_of(key(5).verifying_key());
        let response = app(&address)
            .oneshot(json_post("/api/auth/challenge", "{not json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "INVALID_REQUEST");
    }

    #[tokio::test]
    async fn unknown_address_is_not_found() {
        let address = address_of(key(5).verifying_key());
        let response = app(&address)
            .oneshot(json_post(
                "/api/auth/challenge",
                r#"{"address":"0x9999999999999999999999999999999999999999"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "USER_NOT_FOUND");
    }

    #[tokio::test]
    async fn verify_requires_signature() {
        let address = address_of(key(5).verifying_key());
        let response = app(&address)
            .oneshot(json_post(
                "/api/auth/verify",
                &format!(r#"{{"address":"{address}"}}"#),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "MISSING_SIGNATURE");
    }

    #[tokio::test]
    async fn challenge_then_verify() {
        let signer = key(5);
        let address = address_of(signer.verifying_key());
        let app = app(&address);

        let response = app
            .clone()
            .oneshot(json_post(
                "/api/auth/challenge",
                &format!(r#"{{"address":"{}"}}"#, address.to_ascii_uppercase().replace("0X", "0x")),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let challenge = body_json(response).await;
        let signature = sign(&signer, challenge["message"].as_str().unwrap());

        let verify_body = format!(r#"{{"address":"{address}","signature":"{signature}"}}"#);
        let response = app
            .clone()
            .oneshot(json_post("/api/auth/verify", &verify_body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert!(!json["token"].as_str().unwrap().is_empty());
        assert_eq!(json["user"]["username"], "alice");
        assert_eq!(json["user"]["permissions"], serde_json::json!(["read"]));

        let response = app
            .oneshot(json_post("/api/auth/verify", &verify_body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "CHALLENGE_EXPIRED");
    }
}
