//! HTTP server and graceful shutdown.
//!
//! # Graceful shutdown and Kubernetes
//!
//! When Kubernetes terminates a pod it sends **SIGTERM** and waits
//! `terminationGracePeriodSeconds` (default 30 s) before sending SIGKILL.
//!
//! The server reacts by:
//! 1. Immediately stopping `listener.accept()` — no new connections are made.
//! 2. Letting every in-flight connection task run to completion.
//! 3. Returning from [`Server::serve`], which lets `main` exit cleanly.
//!
//! Set `terminationGracePeriodSeconds` in your pod spec to a value longer
//! than your slowest request.

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use http_body_util::BodyExt;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::method::Method;
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;
use crate::status::Status;

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// # Panics
    ///
    /// Panics if `addr` is not a valid `host:port` string.
    pub fn bind(addr: &str) -> Self {
        let addr: SocketAddr = addr.parse().expect("invalid socket address");
        Self { addr }
    }

    /// Starts accepting connections and dispatching them through `router`.
    ///
    /// Returns only after a full graceful shutdown (SIGTERM or Ctrl-C,
    /// followed by all in-flight requests completing).
    pub async fn serve(self, router: Router) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.addr).await?;

        // Shared across concurrent connection tasks without copying the
        // routing table.
        let router = Arc::new(router);

        info!(addr = %self.addr, "trellis listening");

        // JoinSet tracks every spawned connection task so we can wait for
        // them all to finish during graceful shutdown.
        let mut tasks = tokio::task::JoinSet::new();

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Check shutdown first so a SIGTERM immediately stops
                // accepting new connections, even if more are queued.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let router = Arc::clone(&router);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        let svc = service_fn(move |req| {
                            let router = Arc::clone(&router);
                            async move { dispatch(router, req).await }
                        });

                        // Handles both HTTP/1.1 and HTTP/2, whatever the
                        // client negotiates.
                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks so the JoinSet does not grow
                // without bound on long-running servers.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        // Drain: wait for every in-flight connection to finish.
        while tasks.join_next().await.is_some() {}

        info!("trellis stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Bridges one hyper request into the router and back.
///
/// The error type is [`Infallible`](std::convert::Infallible) — routing
/// failures are responses (403/404/405), never errors.
async fn dispatch(
    router: Arc<Router>,
    req: hyper::Request<hyper::body::Incoming>,
) -> Result<http::Response<http_body_util::Full<bytes::Bytes>>, std::convert::Infallible> {
    let Ok(method) = Method::from_str(req.method().as_str()) else {
        return Ok(into_http(Response::empty(Status::MethodNotAllowed)));
    };

    // Host: absolute-form URI first, then the Host header (HTTP/1.1) or
    // :authority pseudo-header (HTTP/2, surfaced by hyper in the URI).
    let host = req
        .uri()
        .host()
        .map(str::to_owned)
        .or_else(|| {
            req.headers()
                .get(http::header::HOST)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.split(':').next().unwrap_or(v).to_owned())
        })
        .unwrap_or_default();
    let path = req.uri().path().to_owned();

    let mut request = Request::new(method, host, path);
    for (name, value) in req.headers() {
        if let Ok(value) = value.to_str() {
            request = request.with_header(name.as_str(), value);
        }
    }

    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes().to_vec(),
        Err(e) => {
            error!("body read error: {e}");
            return Ok(into_http(Response::empty(Status::BadRequest)));
        }
    };
    let request = request.with_body(body);

    Ok(into_http(router.handle(request).await))
}

fn into_http(res: Response) -> http::Response<http_body_util::Full<bytes::Bytes>> {
    let status = http::StatusCode::from_u16(res.status)
        .unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR);

    let mut builder = http::Response::builder().status(status);
    for (name, value) in &res.headers {
        builder = builder.header(name, value);
    }

    builder
        .body(http_body_util::Full::new(bytes::Bytes::from(res.body)))
        .unwrap_or_else(|_| {
            // A handler produced an unencodable header; surface it as a 500
            // rather than tearing down the connection.
            http::Response::builder()
                .status(http::StatusCode::INTERNAL_SERVER_ERROR)
                .body(http_body_util::Full::new(bytes::Bytes::new()))
                .expect("empty response is always valid")
        })
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first shutdown signal the process receives.
///
/// On Unix this listens for both **SIGTERM** (sent by the Kubernetes control
/// plane) and **SIGINT** (Ctrl-C, for local dev). On Windows only Ctrl-C is
/// available.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let sigterm = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
