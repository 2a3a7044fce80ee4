//! # Mooring Server
//!
//! One lifecycle for every long-running network server in a process.
//!
//! A [`ServerHandle`] wraps a [`Transport`] that has not started listening
//! and gives it a uniform contract:
//!
//! - [`start`](ServerHandle::start) binds the address and serves in the
//!   background; binding is the only failure it reports
//! - [`wait`](ServerHandle::wait) yields the serve loop's failure, at most
//!   once, and nothing for a caller-initiated shutdown
//! - [`shutdown`](ServerHandle::shutdown) drains in-flight work within an
//!   optional deadline and is safe to call more than once
//!
//! Two transports ship with the crate: [`HttpTransport`] (hyper, serving a
//! [`mooring_middleware`] pipeline) and [`GrpcTransport`] (tonic).
//!
//! ## Example
//!
//! ```rust,no_run
//! use mooring_middleware::{HandlerError, Pipeline, PipelineService, Request, Response, ResponseExt};
//! use mooring_server::{GrpcTransport, HttpTransport, ServerHandle};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let api = PipelineService::new(Pipeline::default(), |_req: Request| async {
//!         Ok::<_, HandlerError>(Response::json(http::StatusCode::OK, r#"{"ok":true}"#))
//!     });
//!     let http = ServerHandle::new("0.0.0.0:8080", HttpTransport::new(api));
//!
//!     let (_reporter, health) = tonic_health::server::health_reporter();
//!     let router = tonic::transport::Server::builder().add_service(health);
//!     let grpc = ServerHandle::new("0.0.0.0:50051", GrpcTransport::new(router));
//!
//!     http.start().await?;
//!     grpc.start().await?;
//!
//!     let (mut http_failures, mut grpc_failures) = (http.wait(), grpc.wait());
//!     tokio::select! {
//!         Some(err) = http_failures.recv() => tracing::error!(error = %err, "stopping"),
//!         Some(err) = grpc_failures.recv() => tracing::error!(error = %err, "stopping"),
//!         () = mooring_server::shutdown::wait_for_os_signal() => {}
//!     }
//!
//!     let deadline = Some(Duration::from_secs(30));
//!     http.shutdown(deadline).await?;
//!     grpc.shutdown(deadline).await?;
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/mooring-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod grpc;
mod http;
mod lifecycle;
pub mod shutdown;

pub use config::{
    GrpcConfig, GrpcConfigBuilder, HttpConfig, HttpConfigBuilder, DEFAULT_HEADER_READ_TIMEOUT,
    DEFAULT_MAX_HEADER_BYTES, DEFAULT_READ_TIMEOUT, MIN_MAX_HEADER_BYTES,
};
pub use error::{ServeError, ServerError};
pub use grpc::GrpcTransport;
pub use self::http::HttpTransport;
pub use lifecycle::{Failures, ServerHandle, ServerState, Transport};
pub use shutdown::ShutdownSignal;
