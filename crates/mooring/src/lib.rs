//! # Mooring
//!
//! Run HTTP and gRPC servers side by side under one lifecycle, and give
//! every HTTP error a single, predictable shape.
//!
//! - [`server`]: `start` / `wait` / `shutdown` for any transport, with
//!   hyper and tonic transports included
//! - [`middleware`]: a request pipeline whose outermost stage turns every
//!   handler error or panic into exactly one response
//! - [`core`]: the error taxonomy and its JSON wire format
//! - [`config`] and [`telemetry`]: layered configuration and logging setup
//!
//! ## Error wire format
//!
//! ```text
//! 400 {"error_code":"object_not_found"}
//! 400 {"error_code":"bad_json","description":"expected value at line 1 column 1"}
//! 400 {"error_code":"form_validation","fields":{"name":"required","age":"not_numeric"}}
//! 500 (empty body)
//! ```
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use mooring::prelude::*;
//!
//! async fn hello(_request: Request) -> HandlerResult {
//!     Ok(Response::json(http::StatusCode::OK, r#"{"hello":"world"}"#))
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pipeline = Pipeline::builder().stage(RequestIdMiddleware::new()).build();
//!     let server = ServerHandle::new(
//!         "0.0.0.0:8080",
//!         HttpTransport::new(PipelineService::new(pipeline, hello)),
//!     );
//!
//!     server.start().await?;
//!     let mut failures = server.wait();
//!     tokio::select! {
//!         Some(err) = failures.recv() => eprintln!("{err}"),
//!         () = ShutdownSignal::with_os_signals().recv() => {}
//!     }
//!     server.shutdown(Some(std::time::Duration::from_secs(30))).await?;
//!     Ok(())
//! }
//! ```
//!
//! See `crates/mooring/examples/dual_server.rs` for a process running both
//! transports from a configuration file.

#![doc(html_root_url = "https://docs.rs/mooring/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export error taxonomy
pub use mooring_core as core;

// Re-export lifecycle and transports
pub use mooring_server as server;

// Re-export request pipeline
pub use mooring_middleware as middleware;

// Re-export configuration
pub use mooring_config as config;

// Re-export logging setup
pub use mooring_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// ```rust
/// use mooring::prelude::*;
///
/// let err = ApiError::plain("object_not_found");
/// assert_eq!(err.code().as_str(), "object_not_found");
/// ```
pub mod prelude {
    pub use mooring_core::{ApiError, ErrorCode, ErrorResponse, RequestId};

    pub use mooring_middleware::stages::{CorsMiddleware, RequestIdMiddleware};
    pub use mooring_middleware::{
        auth_token, bind_json, bind_query, HandlerError, HandlerResult, Middleware,
        MiddlewareContext, Next, Pipeline, PipelineService, Request, Response, ResponseExt,
    };

    pub use mooring_server::{
        Failures, GrpcConfig, GrpcTransport, HttpConfig, HttpTransport, ServeError, ServerError,
        ServerHandle, ServerState, ShutdownSignal, Transport,
    };

    pub use mooring_config::{ConfigLoader, MooringConfig};
    pub use mooring_telemetry::{init_logging, LogConfig};
}
