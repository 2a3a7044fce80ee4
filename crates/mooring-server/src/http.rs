//! HTTP/1.1 transport on hyper.
//!
//! Every accepted connection runs in its own task. When the shutdown signal
//! fires the accept loop stops, each connection is asked to finish its
//! in-flight request and close, and the serve future resolves once the last
//! connection is gone.

use std::convert::Infallible;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use mooring_middleware::{BodyReadError, Request, RequestHandler};
use tokio::net::{TcpListener, TcpStream};

use crate::config::HttpConfig;
use crate::error::ServeError;
use crate::lifecycle::Transport;
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

const KIND: &str = "http";
const MIN_ACCEPT_BACKOFF: Duration = Duration::from_millis(5);
const MAX_ACCEPT_BACKOFF: Duration = Duration::from_secs(1);

/// Serves a [`RequestHandler`] over HTTP/1.1.
///
/// Usually the handler is a
/// [`PipelineService`](mooring_middleware::PipelineService), so every
/// response has passed error normalization.
#[derive(Clone)]
pub struct HttpTransport {
    handler: Arc<dyn RequestHandler>,
    config: HttpConfig,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    /// Creates a transport with the default limits.
    pub fn new(handler: impl RequestHandler) -> Self {
        Self::from_arc(Arc::new(handler))
    }

    /// Creates a transport around an already shared handler.
    #[must_use]
    pub fn from_arc(handler: Arc<dyn RequestHandler>) -> Self {
        Self {
            handler,
            config: HttpConfig::default(),
        }
    }

    /// Replaces the limits.
    #[must_use]
    pub fn with_config(mut self, config: HttpConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the limits in use.
    #[must_use]
    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    async fn run(self, listener: TcpListener, shutdown: ShutdownSignal) -> Result<(), ServeError> {
        let tracker = ConnectionTracker::new();
        let mut stop = shutdown.recv();

        let mut backoff: Option<Duration> = None;

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote_addr)) => {
                        backoff = None;
                        tracing::trace!(remote_addr = %remote_addr, "Accepted connection");
                        let token = tracker.acquire();
                        let transport = self.clone();
                        let shutdown = shutdown.clone();
                        tokio::spawn(async move {
                            if let Err(e) = transport.serve_connection(stream, shutdown).await {
                                tracing::debug!(remote_addr = %remote_addr, error = %e, "Connection error");
                            }
                            drop(token);
                        });
                    }
                    Err(e) => match classify_accept_error(&e) {
                        AcceptFailure::Skip => tracing::debug!(error = %e, "Connection dropped before accept"),
                        AcceptFailure::Backoff => {
                            let delay = next_backoff(backoff);
                            backoff = Some(delay);
                            tracing::warn!(error = %e, retry_in = ?delay, "Accept failed, pausing before retry");
                            tokio::select! {
                                () = tokio::time::sleep(delay) => {}
                                () = &mut stop => break,
                            }
                        }
                        AcceptFailure::Fatal => return Err(ServeError::new(KIND, format!("accept failed: {e}"))),
                    },
                },
                () = &mut stop => break,
            }
        }

        drop(listener);
        tracing::debug!(
            active_connections = tracker.active_connections(),
            "Draining http connections"
        );
        tracker.wait_idle().await;
        Ok(())
    }

    async fn serve_connection(&self, stream: TcpStream, shutdown: ShutdownSignal) -> Result<(), hyper::Error> {
        let io = TokioIo::new(stream);
        let handler = Arc::clone(&self.handler);
        let read_timeout = self.config.read_timeout();

        let service = service_fn(move |request: hyper::Request<Incoming>| {
            let handler = Arc::clone(&handler);
            async move {
                let request = collect_request(request, read_timeout).await;
                Ok::<_, Infallible>(handler.handle(request).await)
            }
        });

        let mut builder = http1::Builder::new();
        builder
            .timer(TokioTimer::new())
            .header_read_timeout(self.config.header_read_timeout())
            .max_buf_size(self.config.max_header_bytes());
        let conn = builder.serve_connection(io, service);
        tokio::pin!(conn);

        tokio::select! {
            result = conn.as_mut() => result,
            () = shutdown.recv() => {
                conn.as_mut().graceful_shutdown();
                conn.await
            }
        }
    }
}

impl Transport for HttpTransport {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn serve(self, listener: TcpListener, shutdown: ShutdownSignal) -> BoxFuture<'static, Result<(), ServeError>> {
        Box::pin(self.run(listener, shutdown))
    }
}

/// Buffers the body so handlers can read it more than once.
///
/// A body that fails or takes longer than `read_timeout` is replaced by an
/// empty one and the request is marked with [`BodyReadError`]; the pipeline
/// then answers `bad_json` without calling the endpoint.
async fn collect_request(request: hyper::Request<Incoming>, read_timeout: Duration) -> Request {
    let (parts, body) = request.into_parts();
    let failure = match tokio::time::timeout(read_timeout, body.collect()).await {
        Ok(Ok(collected)) => return Request::from_parts(parts, Full::new(collected.to_bytes())),
        Ok(Err(e)) => format!("failed to read request body: {e}"),
        Err(_) => "request body read timed out".to_string(),
    };

    tracing::debug!(http.method = %parts.method, http.path = %parts.uri.path(), error = %failure, "Request body not read");
    let mut request = Request::from_parts(parts, Full::default());
    request.extensions_mut().insert(BodyReadError(failure));
    request
}

/// How the accept loop reacts to a failed `accept`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AcceptFailure {
    /// The peer gave up before the connection was accepted.
    Skip,
    /// Out of descriptors, buffers or memory. Clears up as connections close.
    Backoff,
    /// The listener itself is unusable.
    Fatal,
}

fn classify_accept_error(error: &io::Error) -> AcceptFailure {
    match error.kind() {
        io::ErrorKind::ConnectionAborted | io::ErrorKind::ConnectionReset | io::ErrorKind::Interrupted => {
            AcceptFailure::Skip
        }
        io::ErrorKind::InvalidInput | io::ErrorKind::Unsupported | io::ErrorKind::NotConnected => {
            AcceptFailure::Fatal
        }
        // EMFILE, ENFILE, ENOBUFS and ENOMEM land here.
        _ => AcceptFailure::Backoff,
    }
}

/// Doubles the previous pause, from 5 ms up to 1 s.
fn next_backoff(previous: Option<Duration>) -> Duration {
    previous.map_or(MIN_ACCEPT_BACKOFF, |delay| (delay * 2).min(MAX_ACCEPT_BACKOFF))
}
