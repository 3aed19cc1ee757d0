//! Protected WebDAV surface: checks the caller's permissions, then hands the request
//! to the configured [`ProtocolDispatcher`].

use crate::{
    api::error::ApiError,
    dav::{self, ProtocolDispatcher, ALLOW_METHODS},
    user::{Permission, User},
};
use axum::{
    body::Body,
    extract::{Extension, Request},
    http::{header::ALLOW, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct DavState {
    pub dispatcher: Arc<dyn ProtocolDispatcher>,
    /// Normalized mount prefix. Request and `Destination` paths are resolved against it.
    pub prefix: String,
}

fn deny(user: &User, path: &str, permission: Permission) -> Response {
    warn!(
        username = user.username(),
        path,
        permission = permission.name(),
        "access denied"
    );
    ApiError::forbidden(format!("{permission} access to {path} denied")).into_response()
}

pub async fn handle(
    Extension(state): Extension<DavState>,
    user: Option<Extension<User>>,
    request: Request<Body>,
) -> Response {
    let Some(Extension(user)) = user else {
        return ApiError::unauthorized("authentication required").into_response();
    };

    let Some(path) = dav::relative_path(request.uri().path(), &state.prefix) else {
        return ApiError::bad_request("INVALID_REQUEST", "invalid request path").into_response();
    };

    let method = request.method().clone();
    let exists = method == Method::PUT && state.dispatcher.exists(&user, &path).await;

    let Some(requirement) = dav::requirement(&method, exists) else {
        let mut response = ApiError::new(
            StatusCode::METHOD_NOT_ALLOWED,
            "METHOD_NOT_ALLOWED",
            format!("{method} is not supported"),
        )
        .into_response();
        response
            .headers_mut()
            .insert(ALLOW, HeaderValue::from_static(ALLOW_METHODS));
        return response;
    };

    if !user.can_access(&path, requirement.source) {
        return deny(&user, &path, requirement.source);
    }

    if let Some(permission) = requirement.destination {
        let destination = request
            .headers()
            .get("destination")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| dav::destination_path(value, &state.prefix));
        let Some(destination) = destination else {
            return ApiError::bad_request("INVALID_REQUEST", "missing or invalid Destination header")
                .into_response();
        };
        if !user.can_access(&destination, permission) {
            return deny(&user, &destination, permission);
        }
    }

    debug!(username = user.username(), %method, path, "dispatching");
    state.dispatcher.dispatch(&user, &path, request).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::user::{Permissions, Rule};
    use async_trait::async_trait;
    use axum::{http::Request, routing::any, Router};
    use tower::ServiceExt;

    #[derive(Debug, Default)]
    struct EchoDispatcher;

    #[async_trait]
    impl ProtocolDispatcher for EchoDispatcher {
        async fn exists(&self, _user: &User, path: &str) -> bool {
            path == "/private/existing"
        }

        async fn dispatch(&self, user: &User, path: &str, _request: Request<Body>) -> Response {
            (StatusCode::OK, format!("{}:{path}", user.username())).into_response()
        }
    }

    fn alice() -> User {
        User::new("alice")
            .with_permissions(Permissions::parse("R").unwrap())
            .with_rules(vec![Rule::prefix("/private", Permissions::parse("RW").unwrap())])
    }

    fn app(user: Option<User>) -> Router {
        let state = DavState {
            dispatcher: Arc::new(EchoDispatcher),
            prefix: "/".to_string(),
        };
        let router = Router::new()
            .route("/", any(handle))
            .route("/*path", any(handle))
            .layer(Extension(state));
        match user {
            Some(user) => router.layer(Extension(user)),
            None => router,
        }
    }

    fn request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(Method::from_bytes(method.as_bytes()).unwrap())
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn status(user: Option<User>, req: Request<Body>) -> StatusCode {
        app(user).oneshot(req).await.unwrap().status()
    }

    #[tokio::test]
    async fn read_allowed_by_default() {
        assert_eq!(
            status(Some(alice()), request("PROPFIND", "/public/x")).await,
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn writes_follow_rules() {
        assert_eq!(
            status(Some(alice()), request("PUT", "/private/new")).await,
            StatusCode::OK
        );
        assert_eq!(
            status(Some(alice()), request("PUT", "/private/existing")).await,
            StatusCode::OK
        );
        assert_eq!(
            status(Some(alice()), request("PUT", "/public/x")).await,
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status(Some(alice()), request("DELETE", "/private/x")).await,
            StatusCode::FORBIDDEN
        );
    }

    #[tokio::test]
    async fn encoded_traversal_cannot_escape_rule() {
        assert_eq!(
            status(Some(alice()), request("MKCOL", "/private/%2e%2e/public/x")).await,
            StatusCode::FORBIDDEN
        );
    }

    #[tokio::test]
    async fn copy_checks_destination() {
        let mut allowed = request("COPY", "/public/a");
        allowed.headers_mut().insert(
            "destination",
            HeaderValue::from_static("http://localhost/private/a"),
        );
        assert_eq!(status(Some(alice()), allowed).await, StatusCode::OK);

        let mut denied = request("COPY", "/private/a");
        denied
            .headers_mut()
            .insert("destination", HeaderValue::from_static("/public/a"));
        assert_eq!(status(Some(alice()), denied).await, StatusCode::FORBIDDEN);

        assert_eq!(
            status(Some(alice()), request("COPY", "/public/a")).await,
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn unsupported_method() {
        let response = app(Some(alice()))
            .oneshot(request("PATCH", "/x"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert!(response.headers().get(ALLOW).is_some());
    }

    #[tokio::test]
    async fn missing_user_is_unauthorized() {
        assert_eq!(
            status(None, request("GET", "/x")).await,
            StatusCode::UNAUTHORIZED
        );
    }
}
