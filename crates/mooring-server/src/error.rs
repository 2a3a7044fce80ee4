//! Server error types.

use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// A terminal failure of a transport's serve loop.
///
/// Cheap to clone so it can be handed to every [`Failures`](crate::Failures)
/// receiver and stored as the result of a shutdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeError {
    kind: &'static str,
    message: String,
}

impl ServeError {
    /// Creates a serve error for the given transport kind.
    pub fn new(kind: &'static str, error: impl fmt::Display) -> Self {
        Self {
            kind,
            message: error.to_string(),
        }
    }

    /// Returns the transport kind ("http", "grpc", ...).
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Returns the failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ServeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} server failed: {}", self.kind, self.message)
    }
}

impl std::error::Error for ServeError {}

/// Errors returned by [`ServerHandle`](crate::ServerHandle) operations.
#[derive(Debug, Clone, Error)]
pub enum ServerError {
    /// The listening endpoint could not be bound.
    #[error("failed to bind {address}: {source}")]
    Bind {
        /// The configured address.
        address: String,
        /// The underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// `start` was called on a running handle.
    #[error("server already started")]
    AlreadyStarted,

    /// The handle has been shut down.
    #[error("server is closed")]
    Closed,

    /// In-flight work did not drain before the deadline.
    #[error("graceful shutdown did not complete within {0:?}")]
    ShutdownTimeout(Duration),

    /// The serve loop failed while shutting down.
    #[error(transparent)]
    Serve(#[from] ServeError),
}

impl ServerError {
    pub(crate) fn bind(address: &str, source: io::Error) -> Self {
        Self::Bind {
            address: address.to_string(),
            source: Arc::new(source),
        }
    }

    /// Returns `true` for bind failures.
    #[must_use]
    pub fn is_bind(&self) -> bool {
        matches!(self, Self::Bind { .. })
    }
}
