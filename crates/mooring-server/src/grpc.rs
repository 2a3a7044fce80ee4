//! gRPC transport on tonic.

use futures_util::future::BoxFuture;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_stream::StreamExt;
use tonic::transport::server::Router;

use crate::config::GrpcConfig;
use crate::error::ServeError;
use crate::lifecycle::Transport;
use crate::shutdown::ShutdownSignal;

const KIND: &str = "grpc";

/// Serves a tonic [`Router`] on a listener bound by the lifecycle adapter.
///
/// Shutdown uses tonic's own drain: the listener stops accepting and
/// in-flight RPCs complete before the serve future resolves.
///
/// ```rust,no_run
/// use mooring_server::{GrpcConfig, GrpcTransport, ServerHandle};
///
/// # async fn run() -> Result<(), mooring_server::ServerError> {
/// let config = GrpcConfig::default();
/// let (_reporter, health) = tonic_health::server::health_reporter();
/// let router = config.server_builder().add_service(health);
///
/// let server = ServerHandle::new("0.0.0.0:50051", GrpcTransport::with_config(router, &config));
/// server.start().await?;
/// # Ok(())
/// # }
/// ```
pub struct GrpcTransport {
    router: Router,
    tcp_nodelay: bool,
}

impl std::fmt::Debug for GrpcTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrpcTransport")
            .field("tcp_nodelay", &self.tcp_nodelay)
            .finish_non_exhaustive()
    }
}

impl GrpcTransport {
    /// Wraps a router built without [`GrpcConfig`]. Accepted sockets get
    /// `TCP_NODELAY`.
    #[must_use]
    pub fn new(router: Router) -> Self {
        Self {
            router,
            tcp_nodelay: true,
        }
    }

    /// Wraps a router built from [`GrpcConfig::server_builder`], applying the
    /// socket options tonic cannot apply to an external listener.
    #[must_use]
    pub fn with_config(router: Router, config: &GrpcConfig) -> Self {
        Self {
            router,
            tcp_nodelay: config.tcp_nodelay(),
        }
    }
}

impl Transport for GrpcTransport {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn serve(self, listener: TcpListener, shutdown: ShutdownSignal) -> BoxFuture<'static, Result<(), ServeError>> {
        let nodelay = self.tcp_nodelay;
        let incoming = TcpListenerStream::new(listener).map(move |accepted| {
            if let Ok(stream) = &accepted {
                if let Err(e) = stream.set_nodelay(nodelay) {
                    tracing::debug!(error = %e, "Failed to set TCP_NODELAY");
                }
            }
            accepted
        });

        Box::pin(async move {
            self.router
                .serve_with_incoming_shutdown(incoming, shutdown.recv())
                .await
                .map_err(|e| ServeError::new(KIND, e))
        })
    }
}
