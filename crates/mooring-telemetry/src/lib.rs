//! Structured logging for Mooring services.
//!
//! Every Mooring crate logs through [`tracing`] with structured fields. This
//! crate installs the subscriber that turns those events into output:
//!
//! - JSON lines for production (one object per event)
//! - Pretty, human-readable output for development
//! - Level filtering through [`tracing_subscriber::EnvFilter`] directives
//!
//! # Example
//!
//! ```rust,ignore
//! use mooring_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::production())?;
//! tracing::info!(address = %addr, "HTTP server listening");
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, init_logging, logging_layer, BoxedLayer, LogConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
