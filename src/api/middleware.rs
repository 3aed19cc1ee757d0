//! Request pipeline pieces: authentication, WebDAV capability headers and panic recovery.

use crate::{
    api::error::ApiError,
    auth::{AuthError, Authenticator},
    dav::ALLOW_METHODS,
    error::ErrorKind,
    user::User,
};
use axum::{
    extract::{Request, State},
    http::{
        header::{ACCEPT_RANGES, ALLOW, WWW_AUTHENTICATE},
        HeaderMap, HeaderName, HeaderValue, Method, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{any::Any, sync::Arc};
use tracing::{debug, error, info, warn};

const DAV: HeaderName = HeaderName::from_static("dav");
const MS_AUTHOR_VIA: HeaderName = HeaderName::from_static("ms-author-via");

/// The ordered authenticators guarding the WebDAV surface.
#[derive(Debug)]
pub struct AuthGate {
    authenticators: Vec<Authenticator>,
    realm: String,
    options_passthrough: bool,
}

impl AuthGate {
    #[must_use]
    pub fn new(authenticators: Vec<Authenticator>, realm: impl Into<String>) -> Self {
        Self {
            authenticators,
            realm: realm.into(),
            options_passthrough: true,
        }
    }

    /// With `false`, `OPTIONS` requests need credentials like any other method.
    #[must_use]
    pub const fn with_options_passthrough(mut self, passthrough: bool) -> Self {
        self.options_passthrough = passthrough;
        self
    }

    /// Try every authenticator in order and return the first user resolved.
    ///
    /// # Errors
    /// [`AuthError::MissingCredentials`] when every authenticator declined, otherwise
    /// the first verification failure. Internal failures stop the walk immediately.
    pub async fn resolve(&self, headers: &HeaderMap) -> Result<User, AuthError> {
        let mut failure = None;

        for authenticator in &self.authenticators {
            match authenticator.authenticate(headers).await {
                Ok(Some(user)) => {
                    debug!(
                        scheme = authenticator.scheme(),
                        username = user.username(),
                        "authenticated"
                    );
                    return Ok(user);
                }
                Ok(None) => {}
                Err(err) if err.kind() == ErrorKind::Internal => return Err(err),
                Err(err) => {
                    debug!(scheme = authenticator.scheme(), error = %err, "authenticator rejected credentials");
                    failure.get_or_insert(err);
                }
            }
        }

        Err(failure.unwrap_or(AuthError::MissingCredentials))
    }

    fn unauthorized(&self, err: &AuthError) -> Response {
        let mut response = ApiError::unauthorized(err.to_string()).into_response();
        let headers = response.headers_mut();
        for authenticator in &self.authenticators {
            if let Ok(value) = HeaderValue::from_str(&authenticator.challenge(&self.realm)) {
                headers.append(WWW_AUTHENTICATE, value);
            }
        }
        response
    }
}

/// Attach the authenticated [`User`] to the request or answer 401.
pub async fn authenticate(
    State(gate): State<Arc<AuthGate>>,
    mut request: Request,
    next: Next,
) -> Response {
    if gate.options_passthrough && request.method() == Method::OPTIONS {
        return next.run(request).await;
    }

    match gate.resolve(request.headers()).await {
        Ok(user) => {
            info!(username = user.username(), method = %request.method(), "request authenticated");
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(err) if err.kind() == ErrorKind::Internal => {
            error!(error = %err, "authentication failed unexpectedly");
            ApiError::internal().into_response()
        }
        Err(err) => {
            if err != AuthError::MissingCredentials {
                warn!(error = %err, path = request.uri().path(), "authentication failed");
            }
            gate.unauthorized(&err)
        }
    }
}

fn insert_capabilities(headers: &mut HeaderMap) {
    headers.insert(DAV, HeaderValue::from_static("1, 2"));
    headers.insert(MS_AUTHOR_VIA, HeaderValue::from_static("DAV"));
}

/// Answer `OPTIONS` with the WebDAV capabilities and advertise them on every other
/// response.
pub async fn dav_headers(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        let mut response = StatusCode::OK.into_response();
        let headers = response.headers_mut();
        headers.insert(ALLOW, HeaderValue::from_static(ALLOW_METHODS));
        headers.insert(ACCEPT_RANGES, HeaderValue::from_static("bytes"));
        insert_capabilities(headers);
        return response;
    }

    let mut response = next.run(request).await;
    insert_capabilities(response.headers_mut());
    response
}

/// Turn a panic anywhere below into a generic 500.
#[allow(clippy::needless_pass_by_value)]
pub fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = payload
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| payload.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");
    error!(panic = detail, "request handler panicked");
    ApiError::internal().into_response()
}
