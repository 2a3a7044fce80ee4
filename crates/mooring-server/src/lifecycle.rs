//! Uniform start / wait / shutdown lifecycle for transport servers.
//!
//! A [`ServerHandle`] owns a not-yet-listening [`Transport`]. It binds the
//! listener itself, runs the transport's serve loop as a Tokio task and
//! reports a serve failure through [`Failures`] instead of shutting itself
//! down. The owner decides what to do with a failure and must still call
//! [`ServerHandle::shutdown`] to release the handle.
//!
//! ```text
//! Created ──start(ok)──▶ Running ──shutdown──▶ Closed
//!    │  ▲                   │                    ▲
//!    │  └──start(err)───────┘ serve failure       │
//!    │                      ▼                    │
//!    │                   Failed ───shutdown──────┤
//!    └───────────────shutdown────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use mooring_server::{HttpTransport, ServerHandle, ShutdownSignal};
//! use mooring_middleware::{HandlerError, Pipeline, PipelineService, Request, Response, ResponseExt};
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let service = PipelineService::new(Pipeline::default(), |_req: Request| async {
//!     Ok::<_, HandlerError>(Response::empty(http::StatusCode::NO_CONTENT))
//! });
//! let server = ServerHandle::new("0.0.0.0:8080", HttpTransport::new(service));
//! server.start().await?;
//!
//! let mut failures = server.wait();
//! let os_signal = ShutdownSignal::with_os_signals();
//! tokio::select! {
//!     Some(err) = failures.recv() => tracing::error!(error = %err, "server failed"),
//!     () = os_signal.recv() => {}
//! }
//!
//! server.shutdown(Some(Duration::from_secs(30))).await?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::net::TcpListener;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::error::{ServeError, ServerError};
use crate::shutdown::ShutdownSignal;

/// A "listen and serve" server that the lifecycle adapter can drive.
///
/// The adapter owns binding; the transport serves an already-bound
/// listener until `shutdown` fires, then drains in-flight work and returns.
pub trait Transport: Send + 'static {
    /// Short name used in logs and errors ("http", "grpc", ...).
    fn kind(&self) -> &'static str;

    /// Serves `listener` until `shutdown` is triggered.
    ///
    /// Returning an error, or returning at all before `shutdown` fires, is a
    /// serve failure.
    fn serve(self, listener: TcpListener, shutdown: ShutdownSignal)
        -> BoxFuture<'static, Result<(), ServeError>>;
}

/// Externally observable state of a [`ServerHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Not started yet, or the last `start` failed to bind.
    Created,
    /// Serving.
    Running,
    /// The serve loop failed; `shutdown` is still required.
    Failed,
    /// Shut down. Terminal.
    Closed,
}

/// The write-once failure cell shared by the serve task and receivers.
#[derive(Debug, Clone, Default)]
struct FailureCell {
    failure: Option<ServeError>,
    closed: bool,
}

struct Running {
    shutdown: ShutdownSignal,
    task: JoinHandle<Option<ServeError>>,
    local_addr: SocketAddr,
}

struct Inner<T> {
    transport: Option<T>,
    running: Option<Running>,
    closed: Option<Result<(), ServerError>>,
}

/// Lifecycle adapter around a [`Transport`].
///
/// Call [`shutdown`](Self::shutdown) to stop it. Dropping a running handle
/// only triggers the stop signal: the serve task drains in the background
/// and nobody observes the outcome.
pub struct ServerHandle<T: Transport> {
    address: String,
    kind: &'static str,
    inner: Mutex<Inner<T>>,
    cell: Arc<watch::Sender<FailureCell>>,
}

impl<T: Transport> fmt::Debug for ServerHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerHandle")
            .field("address", &self.address)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> ServerHandle<T> {
    /// Wraps `transport`, to be bound on `address` ("host:port"; port `0`
    /// picks a free port) when started.
    pub fn new(address: impl Into<String>, transport: T) -> Self {
        let (cell, _) = watch::channel(FailureCell::default());
        Self {
            address: address.into(),
            kind: transport.kind(),
            inner: Mutex::new(Inner {
                transport: Some(transport),
                running: None,
                closed: None,
            }),
            cell: Arc::new(cell),
        }
    }

    /// Returns the configured address.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Returns the transport kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Binds the listener and starts serving in the background.
    ///
    /// Returns the bound address, which differs from the configured one when
    /// port `0` was requested. Binding is the only failure reported here;
    /// later failures arrive through [`wait`](Self::wait). After a bind
    /// failure the handle stays `Created` and `start` may be retried.
    ///
    /// # Errors
    ///
    /// - [`ServerError::Bind`] if the address cannot be bound
    /// - [`ServerError::AlreadyStarted`] if the handle is running
    /// - [`ServerError::Closed`] if the handle has been shut down
    pub async fn start(&self) -> Result<SocketAddr, ServerError> {
        let mut inner = self.inner.lock().await;
        if inner.closed.is_some() {
            return Err(ServerError::Closed);
        }
        if inner.running.is_some() {
            return Err(ServerError::AlreadyStarted);
        }

        let listener = TcpListener::bind(self.address.as_str())
            .await
            .map_err(|e| ServerError::bind(&self.address, e))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| ServerError::bind(&self.address, e))?;
        let transport = inner.transport.take().ok_or(ServerError::Closed)?;

        tracing::info!(transport = self.kind, address = %local_addr, "{} server listening", self.kind);

        let shutdown = ShutdownSignal::new();
        let task = tokio::spawn(serve_task(
            transport,
            listener,
            shutdown.clone(),
            Arc::clone(&self.cell),
        ));

        inner.running = Some(Running {
            shutdown,
            task,
            local_addr,
        });
        Ok(local_addr)
    }

    /// Returns a receiver for the asynchronous failure of the serve loop.
    ///
    /// Every receiver observes the failure at most once. Nothing is ever
    /// delivered for a caller-initiated shutdown, and once the handle is
    /// closed `recv` returns `None` immediately, after handing out a failure
    /// that happened before the close and was not read yet.
    #[must_use]
    pub fn wait(&self) -> Failures {
        Failures {
            receiver: self.cell.subscribe(),
            delivered: false,
        }
    }

    /// Stops accepting, drains in-flight work and closes the handle.
    ///
    /// With a `timeout`, gives up waiting after it elapses and returns
    /// [`ServerError::ShutdownTimeout`]; the undrained work is abandoned,
    /// not aborted. Closing the failure cell is the last step, so receivers
    /// see `None` only after the drain has finished or been given up.
    ///
    /// Idempotent: later calls return the first call's result. Calling it
    /// on a handle that never started simply closes it.
    ///
    /// # Errors
    ///
    /// - [`ServerError::ShutdownTimeout`] if draining exceeded `timeout`
    /// - [`ServerError::Serve`] if the serve loop failed while draining
    pub async fn shutdown(&self, timeout: Option<Duration>) -> Result<(), ServerError> {
        let mut inner = self.inner.lock().await;
        if let Some(result) = &inner.closed {
            return result.clone();
        }

        let result = match inner.running.take() {
            Some(running) => self.stop(running, timeout).await,
            None => Ok(()),
        };

        inner.transport = None;
        inner.closed = Some(result.clone());
        self.cell.send_modify(|cell| cell.closed = true);

        match &result {
            Ok(()) => tracing::info!(transport = self.kind, "{} server stopped", self.kind),
            Err(e) => tracing::warn!(transport = self.kind, error = %e, "{} server stopped uncleanly", self.kind),
        }
        result
    }

    async fn stop(&self, running: Running, timeout: Option<Duration>) -> Result<(), ServerError> {
        tracing::info!(
            transport = self.kind,
            address = %running.local_addr,
            "Shutting down {} server",
            self.kind
        );
        running.shutdown.trigger();

        let joined = match timeout {
            Some(limit) => match tokio::time::timeout(limit, running.task).await {
                Ok(joined) => joined,
                Err(_) => return Err(ServerError::ShutdownTimeout(limit)),
            },
            None => running.task.await,
        };

        match joined {
            Ok(None) => Ok(()),
            Ok(Some(err)) => Err(ServerError::Serve(err)),
            Err(join_err) => Err(ServerError::Serve(ServeError::new(self.kind, join_err))),
        }
    }

    /// Returns the current state.
    pub async fn state(&self) -> ServerState {
        let inner = self.inner.lock().await;
        if inner.closed.is_some() {
            ServerState::Closed
        } else if inner.running.is_none() {
            ServerState::Created
        } else if self.cell.borrow().failure.is_some() {
            ServerState::Failed
        } else {
            ServerState::Running
        }
    }

    /// Returns the bound address while the handle is running or failed.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.inner.lock().await.running.as_ref().map(|r| r.local_addr)
    }
}

impl<T: Transport> Drop for ServerHandle<T> {
    fn drop(&mut self) {
        let inner = self.inner.get_mut();
        if let Some(running) = inner.running.take() {
            tracing::warn!(
                transport = self.kind,
                address = %running.local_addr,
                "{} server handle dropped without shutdown",
                self.kind
            );
            running.shutdown.trigger();
        }
        self.cell.send_modify(|cell| cell.closed = true);
    }
}

/// Runs the transport and routes its outcome.
///
/// The serve future is polled ahead of the stop signal, so a failure it
/// reports on its first poll after the trigger still counts as happening
/// before shutdown and is published to the cell. A failure reported once
/// draining is under way is returned so `shutdown` can report it.
async fn serve_task<T: Transport>(
    transport: T,
    listener: TcpListener,
    shutdown: ShutdownSignal,
    cell: Arc<watch::Sender<FailureCell>>,
) -> Option<ServeError> {
    let kind = transport.kind();
    let serve = AssertUnwindSafe(transport.serve(listener, shutdown.clone())).catch_unwind();
    tokio::pin!(serve);

    let (outcome, draining) = tokio::select! {
        biased;
        outcome = &mut serve => (outcome, false),
        () = shutdown.recv() => (serve.await, true),
    };

    let error = match outcome {
        Ok(Ok(())) if shutdown.is_shutdown() => return None,
        Ok(Ok(())) => ServeError::new(kind, "serve loop exited unexpectedly"),
        Ok(Err(err)) => err,
        Err(_) => ServeError::new(kind, "serve loop panicked"),
    };

    if draining {
        return Some(error);
    }

    tracing::error!(transport = kind, error = %error, "{} server closed", kind);
    cell.send_modify(|state| {
        if state.failure.is_none() {
            state.failure = Some(error);
        }
    });
    None
}

/// Receive side of a [`ServerHandle`]'s failure cell.
///
/// Created by [`ServerHandle::wait`].
#[derive(Debug)]
pub struct Failures {
    receiver: watch::Receiver<FailureCell>,
    delivered: bool,
}

impl Failures {
    /// Waits for the serve loop to fail.
    ///
    /// Returns `Some` at most once per receiver, and `None` once the handle
    /// is closed (or dropped). Pending until then otherwise.
    pub async fn recv(&mut self) -> Option<ServeError> {
        loop {
            if let Some(outcome) = self.poll_cell() {
                return outcome;
            }
            if self.receiver.changed().await.is_err() {
                // Handle and serve task are gone; hand out what is left.
                return self.take_failure();
            }
        }
    }

    /// Non-blocking form of [`recv`](Self::recv).
    ///
    /// Returns `Some` for an undelivered failure and `None` otherwise,
    /// whether or not the handle is closed.
    pub fn try_recv(&mut self) -> Option<ServeError> {
        self.take_failure()
    }

    /// Returns `Some(outcome)` when `recv` can complete right away.
    fn poll_cell(&mut self) -> Option<Option<ServeError>> {
        let cell = self.receiver.borrow_and_update();
        if !self.delivered {
            if let Some(failure) = &cell.failure {
                self.delivered = true;
                return Some(Some(failure.clone()));
            }
        }
        cell.closed.then_some(None)
    }

    fn take_failure(&mut self) -> Option<ServeError> {
        if self.delivered {
            return None;
        }
        let failure = self.receiver.borrow().failure.clone();
        if failure.is_some() {
            self.delivered = true;
        }
        failure
    }
}
