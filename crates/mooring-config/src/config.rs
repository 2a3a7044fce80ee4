//! Root configuration type.

use std::net::SocketAddr;

use mooring_server::MIN_MAX_HEADER_BYTES;
use mooring_telemetry::LogConfig;
use serde::{Deserialize, Serialize};

use crate::{ConfigError, GrpcSection, HttpSection, LoggingSection};

/// Complete configuration of a Mooring process.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to layer files and environment
/// variables on top of the defaults.
///
/// ```
/// use mooring_config::MooringConfig;
///
/// let config = MooringConfig::default();
/// assert_eq!(config.http.address, "0.0.0.0:8080");
/// assert_eq!(config.grpc.address, "0.0.0.0:50051");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct MooringConfig {
    /// HTTP server settings.
    pub http: HttpSection,

    /// gRPC server settings.
    pub grpc: GrpcSection,

    /// Logging settings.
    pub logging: LoggingSection,
}

impl MooringConfig {
    /// Defaults with human-readable debug logging.
    #[must_use]
    pub fn development() -> Self {
        Self {
            logging: LoggingSection::from(&LogConfig::development()),
            ..Self::default()
        }
    }

    /// Defaults with JSON info logging.
    #[must_use]
    pub fn production() -> Self {
        Self::default()
    }

    /// Checks values that deserialize fine but cannot be used.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field:
    /// an address that is not `host:port`, a zero timeout, a header limit
    /// below 8192 bytes or an empty log level.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_address("http.address", &self.http.address)?;
        validate_timeout("http.shutdown_timeout_secs", self.http.shutdown_timeout_secs)?;
        validate_timeout("http.header_read_timeout_secs", self.http.header_read_timeout_secs)?;
        validate_timeout("http.read_timeout_secs", self.http.read_timeout_secs)?;
        if self.http.max_header_bytes < MIN_MAX_HEADER_BYTES {
            return Err(ConfigError::invalid(
                "http.max_header_bytes",
                format!("must be at least {MIN_MAX_HEADER_BYTES}"),
            ));
        }

        validate_address("grpc.address", &self.grpc.address)?;
        validate_timeout("grpc.shutdown_timeout_secs", self.grpc.shutdown_timeout_secs)?;
        if let Some(secs) = self.grpc.timeout_secs {
            validate_timeout("grpc.timeout_secs", secs)?;
        }
        if self.grpc.concurrency_limit_per_connection == Some(0) {
            return Err(ConfigError::invalid(
                "grpc.concurrency_limit_per_connection",
                "must be greater than 0",
            ));
        }

        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::invalid("logging.level", "must not be empty"));
        }
        Ok(())
    }
}

fn validate_address(field: &str, address: &str) -> Result<(), ConfigError> {
    address
        .parse::<SocketAddr>()
        .map(|_| ())
        .map_err(|_| ConfigError::invalid(field, format!("invalid socket address: {address}")))
}

fn validate_timeout(field: &str, secs: u64) -> Result<(), ConfigError> {
    if secs == 0 {
        return Err(ConfigError::invalid(field, "must be greater than 0"));
    }
    Ok(())
}
