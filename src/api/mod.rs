use crate::{
    api::{
        handlers::{dav as dav_handler, health, web3, DavState, StartedAt},
        middleware::{authenticate, dav_headers, handle_panic, AuthGate},
    },
    auth::{Authenticator, BasicAuthenticator, PasswordHasher, Web3Authenticator},
    clock::Clock,
    config::{CorsConfig, Settings},
    dav::ProtocolDispatcher,
    tls,
    user::UserDirectory,
};
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::{ConnectInfo, MatchedPath},
    http::{
        header::{HeaderName, WWW_AUTHENTICATE},
        HeaderValue, Request, StatusCode,
    },
    middleware::{from_fn, from_fn_with_state},
    routing::{any, get, post},
    Extension, Router,
};
use std::{net::SocketAddr, sync::Arc, time::Instant};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;

pub mod error;
pub mod handlers;
pub mod middleware;
mod openapi;
pub mod server;

pub use openapi::openapi;

const X_REQUEST_ID: &str = "x-request-id";

/// Collaborators the router is built from.
#[derive(Debug, Clone)]
pub struct Services {
    pub directory: Arc<UserDirectory>,
    pub hasher: Arc<dyn PasswordHasher>,
    pub clock: Arc<dyn Clock>,
    pub dispatcher: Arc<dyn ProtocolDispatcher>,
}

/// Build the complete application: public routes, the protected WebDAV surface under
/// the mount prefix, and the outer request pipeline.
///
/// # Errors
/// Returns an error if the CORS settings are invalid.
pub fn app(settings: &Settings, services: Services) -> Result<Router> {
    let mut authenticators = vec![Authenticator::Basic(
        BasicAuthenticator::new(services.directory.clone(), services.hasher)
            .with_require_password(settings.require_password),
    )];

    let mut public = Router::new()
        .route("/health", get(health))
        .layer(Extension(StartedAt(Instant::now())));

    if let Some(web3_config) = &settings.web3 {
        let web3_auth = Arc::new(Web3Authenticator::new(
            services.directory.clone(),
            services.clock,
            web3_config.settings(),
        ));
        authenticators.push(Authenticator::Web3(web3_auth.clone()));

        public = public.merge(
            Router::new()
                .route(
                    "/api/auth/challenge",
                    get(web3::challenge_get).post(web3::challenge_post),
                )
                .route("/api/auth/verify", post(web3::verify))
                .layer(Extension(web3_auth)),
        );
    }

    let gate = Arc::new(
        AuthGate::new(authenticators, settings.realm.clone())
            .with_options_passthrough(settings.options_passthrough),
    );

    let state = DavState {
        dispatcher: services.dispatcher,
        prefix: settings.prefix.clone(),
    };

    let protected = dav_routes(&settings.prefix)
        .route_layer(from_fn(dav_headers))
        .route_layer(from_fn_with_state(gate, authenticate))
        .route_layer(Extension(state));

    let mut router = public.merge(protected);

    if settings.cors.enabled() {
        router = router.layer(cors_layer(&settings.cors)?);
    }

    let behind_proxy = settings.behind_proxy;
    let x_request_id = HeaderName::from_static(X_REQUEST_ID);

    Ok(router.layer(
        ServiceBuilder::new()
            .layer(CatchPanicLayer::custom(handle_panic))
            .layer(SetRequestHeaderLayer::if_not_present(
                x_request_id.clone(),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(x_request_id))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(move |request: &Request<Body>| make_span(request, behind_proxy)),
            )
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                settings.timeouts.write,
            )),
    ))
}

// axum cannot nest at `/`, so the mount point and everything below it are routed
// explicitly and the handler strips the prefix itself.
fn dav_routes(prefix: &str) -> Router {
    let handler = any(dav_handler::handle);
    if prefix == "/" {
        return Router::new()
            .route("/", handler.clone())
            .route("/*path", handler);
    }

    let mount = prefix.trim_end_matches('/');
    Router::new()
        .route(mount, handler.clone())
        .route(&format!("{mount}/"), handler.clone())
        .route(&format!("{mount}/*path"), handler)
}

fn cors_layer(config: &CorsConfig) -> Result<CorsLayer> {
    config.validate()?;

    let origins = if config.allows_any() {
        AllowOrigin::any()
    } else {
        let origins = config
            .origins
            .iter()
            .map(|origin| {
                HeaderValue::from_str(origin).with_context(|| format!("Invalid CORS origin: {origin}"))
            })
            .collect::<Result<Vec<_>>>()?;
        AllowOrigin::list(origins)
    };

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .expose_headers([
            WWW_AUTHENTICATE,
            HeaderName::from_static("dav"),
            HeaderName::from_static(X_REQUEST_ID),
        ])
        .allow_credentials(config.credentials))
}

fn client_ip(request: &Request<Body>, behind_proxy: bool) -> Option<String> {
    if behind_proxy {
        let headers = request.headers();
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .or_else(|| {
                headers
                    .get("x-real-ip")
                    .and_then(|value| value.to_str().ok())
                    .map(str::trim)
                    .filter(|value| !value.is_empty())
            });
        if let Some(ip) = forwarded {
            return Some(ip.to_string());
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
}

fn make_span(request: &Request<Body>, behind_proxy: bool) -> Span {
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);
    let client_ip = client_ip(request, behind_proxy);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        client.ip = client_ip.as_deref().unwrap_or("unknown"),
        request_id
    )
}

/// Bind the configured address and serve, over HTTPS when a certificate is configured,
/// until ctrl-c or SIGTERM.
///
/// # Errors
/// Returns an error if the router or the TLS config cannot be built, or the address
/// cannot be bound.
pub async fn serve(settings: &Settings, services: Services) -> Result<()> {
    let app = app(settings, services)?;
    let acceptor = settings.tls.as_ref().map(tls::acceptor).transpose()?;

    let listener = TcpListener::bind((settings.address.as_str(), settings.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", settings.address, settings.port))?;

    info!(
        "Listening on {}://{}, WebDAV mounted at {}",
        if acceptor.is_some() { "https" } else { "http" },
        listener.local_addr()?,
        settings.prefix
    );

    server::run(
        listener,
        app,
        acceptor,
        settings.timeouts,
        server::shutdown_signal(),
    )
    .await;

    Ok(())
}
