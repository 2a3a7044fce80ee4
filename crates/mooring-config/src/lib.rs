//! Typed configuration for Mooring servers.
//!
//! - TOML and JSON files, strict about unknown keys
//! - layered loading: defaults, then files, then environment variables
//! - validation of addresses, timeouts and limits before anything binds
//! - conversion into [`mooring_server`] and [`mooring_telemetry`] settings
//!
//! # Example
//!
//! ```no_run
//! use mooring_config::ConfigLoader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::new()
//!     .with_file("mooring.toml")?
//!     .with_env_prefix("MOORING")
//!     .load()?;
//!
//! mooring_telemetry::init_logging(&config.logging.to_log_config())?;
//! let http_limits = config.http.to_http_config();
//! let grpc_settings = config.grpc.to_grpc_config();
//! # let _ = (http_limits, grpc_settings);
//! # Ok(())
//! # }
//! ```
//!
//! # File format
//!
//! Every key is optional.
//!
//! ```toml
//! [http]
//! address = "0.0.0.0:8080"
//! shutdown_timeout_secs = 30
//! header_read_timeout_secs = 10
//! read_timeout_secs = 120
//! max_header_bytes = 307200
//!
//! [grpc]
//! address = "0.0.0.0:50051"
//! shutdown_timeout_secs = 30
//! tcp_nodelay = true
//! timeout_secs = 10
//! concurrency_limit_per_connection = 256
//!
//! [logging]
//! enabled = true
//! level = "info"
//! format = "json"
//! ```
//!
//! # Environment overrides
//!
//! `PREFIX__SECTION__KEY`, e.g. `MOORING__HTTP__ADDRESS=0.0.0.0:9000` or
//! `MOORING__LOGGING__FORMAT=pretty`. An override naming an unknown key is
//! an error.

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::MooringConfig;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{GrpcSection, HttpSection, LogFormat, LoggingSection};
