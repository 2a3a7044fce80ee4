//! Transport configuration types.
//!
//! # Example
//!
//! ```rust
//! use mooring_server::{GrpcConfig, HttpConfig};
//! use std::time::Duration;
//!
//! let http = HttpConfig::builder()
//!     .header_read_timeout(Duration::from_secs(5))
//!     .max_header_bytes(64 * 1024)
//!     .build();
//! assert_eq!(http.read_timeout(), Duration::from_secs(120));
//!
//! let grpc = GrpcConfig::builder().timeout(Duration::from_secs(3)).build();
//! assert!(grpc.tcp_nodelay());
//! ```

use std::time::Duration;

/// Default time allowed to read request headers.
pub const DEFAULT_HEADER_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Default time allowed to read a full request body.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(120);

/// Default maximum size of the request head, in bytes.
pub const DEFAULT_MAX_HEADER_BYTES: usize = 300 * 1024;

/// Smallest header buffer hyper accepts.
pub const MIN_MAX_HEADER_BYTES: usize = 8192;

/// HTTP transport limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    header_read_timeout: Duration,
    read_timeout: Duration,
    max_header_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            header_read_timeout: DEFAULT_HEADER_READ_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            max_header_bytes: DEFAULT_MAX_HEADER_BYTES,
        }
    }
}

impl HttpConfig {
    /// Creates a builder starting from the defaults.
    #[must_use]
    pub fn builder() -> HttpConfigBuilder {
        HttpConfigBuilder::default()
    }

    /// Time allowed for a client to send the request head.
    #[must_use]
    pub fn header_read_timeout(&self) -> Duration {
        self.header_read_timeout
    }

    /// Time allowed to read the whole request body.
    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Maximum request head size; never below [`MIN_MAX_HEADER_BYTES`].
    #[must_use]
    pub fn max_header_bytes(&self) -> usize {
        self.max_header_bytes
    }
}

/// Builder for [`HttpConfig`].
#[derive(Debug, Clone, Default)]
pub struct HttpConfigBuilder {
    config: HttpConfig,
}

impl HttpConfigBuilder {
    /// Sets the header read timeout.
    pub fn header_read_timeout(mut self, timeout: Duration) -> Self {
        self.config.header_read_timeout = timeout;
        self
    }

    /// Sets the body read timeout.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    /// Sets the maximum request head size. Values below
    /// [`MIN_MAX_HEADER_BYTES`] are raised to it.
    pub fn max_header_bytes(mut self, bytes: usize) -> Self {
        self.config.max_header_bytes = bytes.max(MIN_MAX_HEADER_BYTES);
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> HttpConfig {
        self.config
    }
}

/// gRPC transport settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrpcConfig {
    tcp_nodelay: bool,
    timeout: Option<Duration>,
    concurrency_limit_per_connection: Option<usize>,
}

impl Default for GrpcConfig {
    fn default() -> Self {
        Self {
            tcp_nodelay: true,
            timeout: None,
            concurrency_limit_per_connection: None,
        }
    }
}

impl GrpcConfig {
    /// Creates a builder starting from the defaults.
    #[must_use]
    pub fn builder() -> GrpcConfigBuilder {
        GrpcConfigBuilder::default()
    }

    /// Whether accepted sockets get `TCP_NODELAY`.
    #[must_use]
    pub fn tcp_nodelay(&self) -> bool {
        self.tcp_nodelay
    }

    /// Per-request timeout, if any.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Maximum concurrent requests per connection, if limited.
    #[must_use]
    pub fn concurrency_limit_per_connection(&self) -> Option<usize> {
        self.concurrency_limit_per_connection
    }

    /// Returns a tonic server builder with these settings applied.
    ///
    /// Add services to it and pass the resulting router to
    /// [`GrpcTransport::with_config`](crate::GrpcTransport::with_config).
    #[must_use]
    pub fn server_builder(&self) -> tonic::transport::Server {
        let mut builder = tonic::transport::Server::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(limit) = self.concurrency_limit_per_connection {
            builder = builder.concurrency_limit_per_connection(limit);
        }
        builder
    }
}

/// Builder for [`GrpcConfig`].
#[derive(Debug, Clone, Default)]
pub struct GrpcConfigBuilder {
    config: GrpcConfig,
}

impl GrpcConfigBuilder {
    /// Enables or disables `TCP_NODELAY`.
    pub fn tcp_nodelay(mut self, enabled: bool) -> Self {
        self.config.tcp_nodelay = enabled;
        self
    }

    /// Sets the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Limits concurrent requests per connection.
    pub fn concurrency_limit_per_connection(mut self, limit: usize) -> Self {
        self.config.concurrency_limit_per_connection = Some(limit);
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> GrpcConfig {
        self.config
    }
}
