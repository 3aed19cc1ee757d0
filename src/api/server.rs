//! Accept loop shared by the plain and the HTTPS listener.
//!
//! Each connection is served by hyper's auto (HTTP/1.1 + HTTP/2) builder and registered
//! with a graceful-shutdown watcher. The idle timeout bounds how long a connection may
//! wait for the next request head (and for the TLS handshake), the read timeout bounds
//! every pause in a request body, and the shutdown timeout bounds how long open
//! connections may drain once the shutdown signal fires.

use crate::config::Timeouts;
use axum::{
    body::Body,
    extract::ConnectInfo,
    http::Request,
    Router,
};
use hyper::{body::Incoming, service::service_fn};
use hyper_util::{
    rt::{TokioExecutor, TokioIo, TokioTimer},
    server::{
        conn::auto::Builder,
        graceful::{GracefulShutdown, Watcher},
    },
};
use std::{future::Future, net::SocketAddr, sync::Arc, time::Duration};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpListener,
};
use tokio_rustls::TlsAcceptor;
use tower::Service;
use tower_http::timeout::TimeoutBody;
use tracing::{debug, error, info, warn};

/// Serve `app` on `listener` until `shutdown` resolves. With an acceptor every
/// connection must complete a TLS handshake first.
pub async fn run<F>(
    listener: TcpListener,
    app: Router,
    tls: Option<TlsAcceptor>,
    timeouts: Timeouts,
    shutdown: F,
) where
    F: Future<Output = ()>,
{
    let mut builder = Builder::new(TokioExecutor::new());
    builder
        .http1()
        .timer(TokioTimer::new())
        .header_read_timeout(timeouts.idle);
    let builder = Arc::new(builder);

    let graceful = GracefulShutdown::new();
    let mut shutdown = std::pin::pin!(shutdown);

    loop {
        let (stream, remote) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(connection) => connection,
                Err(err) => {
                    // Usually out of file descriptors; give the process a moment.
                    warn!("Failed to accept connection: {err}");
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    continue;
                }
            },
            () = &mut shutdown => break,
        };

        let connection = Connection {
            app: app.clone(),
            builder: builder.clone(),
            watcher: graceful.watcher(),
            remote,
            read_timeout: timeouts.read,
        };

        match tls.clone() {
            Some(acceptor) => {
                let handshake_timeout = timeouts.idle;
                tokio::spawn(async move {
                    match tokio::time::timeout(handshake_timeout, acceptor.accept(stream)).await {
                        Ok(Ok(stream)) => connection.serve(stream).await,
                        Ok(Err(err)) => debug!(%remote, "TLS handshake failed: {err}"),
                        Err(_) => debug!(%remote, "TLS handshake timed out"),
                    }
                });
            }
            None => {
                tokio::spawn(connection.serve(stream));
            }
        }
    }

    drop(listener);

    let open = graceful.count();
    if open > 0 {
        info!(connections = open, "Draining open connections");
    }
    if tokio::time::timeout(timeouts.shutdown, graceful.shutdown())
        .await
        .is_err()
    {
        error!(
            "Connections still open after {}s, closing them",
            timeouts.shutdown.as_secs_f32()
        );
    }
}

struct Connection {
    app: Router,
    builder: Arc<Builder<TokioExecutor>>,
    watcher: Watcher,
    remote: SocketAddr,
    read_timeout: Duration,
}

impl Connection {
    async fn serve<I>(self, io: I)
    where
        I: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let Self {
            app,
            builder,
            watcher,
            remote,
            read_timeout,
        } = self;

        let service = service_fn(move |request: Request<Incoming>| {
            let mut request = request.map(|body| Body::new(TimeoutBody::new(read_timeout, body)));
            request.extensions_mut().insert(ConnectInfo(remote));
            app.clone().call(request)
        });

        let connection = builder.serve_connection_with_upgrades(TokioIo::new(io), service);
        if let Err(err) = watcher.watch(connection).await {
            debug!(%remote, "connection closed: {err}");
        }
    }
}

/// Resolves on ctrl-c or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!("Failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Gracefully shutdown");
}
