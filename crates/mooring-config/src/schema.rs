//! Configuration sections.
//!
//! Every section rejects unknown keys and fills missing ones with defaults,
//! so a file only needs the values it changes.

use std::time::Duration;

use mooring_server::{GrpcConfig, HttpConfig};
use mooring_telemetry::LogConfig;
use serde::{Deserialize, Serialize};

/// HTTP server section (`[http]`).
///
/// ```
/// use mooring_config::HttpSection;
///
/// let section: HttpSection = toml::from_str(r#"address = "127.0.0.1:3000""#).unwrap();
/// assert_eq!(section.address, "127.0.0.1:3000");
/// assert_eq!(section.read_timeout_secs, 120);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct HttpSection {
    /// Listen address, `host:port`.
    pub address: String,

    /// Graceful shutdown deadline in seconds.
    pub shutdown_timeout_secs: u64,

    /// Time allowed to read request headers, in seconds.
    pub header_read_timeout_secs: u64,

    /// Time allowed to read a full request body, in seconds.
    pub read_timeout_secs: u64,

    /// Maximum request head size in bytes.
    pub max_header_bytes: usize,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            address: "0.0.0.0:8080".to_string(),
            shutdown_timeout_secs: 30,
            header_read_timeout_secs: 10,
            read_timeout_secs: 120,
            max_header_bytes: 300 * 1024,
        }
    }
}

impl HttpSection {
    /// Returns the graceful shutdown deadline.
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Converts the section into transport limits.
    #[must_use]
    pub fn to_http_config(&self) -> HttpConfig {
        HttpConfig::builder()
            .header_read_timeout(Duration::from_secs(self.header_read_timeout_secs))
            .read_timeout(Duration::from_secs(self.read_timeout_secs))
            .max_header_bytes(self.max_header_bytes)
            .build()
    }
}

/// gRPC server section (`[grpc]`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct GrpcSection {
    /// Listen address, `host:port`.
    pub address: String,

    /// Graceful shutdown deadline in seconds.
    pub shutdown_timeout_secs: u64,

    /// Set `TCP_NODELAY` on accepted sockets.
    pub tcp_nodelay: bool,

    /// Per-request timeout in seconds. Unset means no timeout.
    pub timeout_secs: Option<u64>,

    /// Maximum concurrent requests per connection. Unset means unlimited.
    pub concurrency_limit_per_connection: Option<usize>,
}

impl Default for GrpcSection {
    fn default() -> Self {
        Self {
            address: "0.0.0.0:50051".to_string(),
            shutdown_timeout_secs: 30,
            tcp_nodelay: true,
            timeout_secs: None,
            concurrency_limit_per_connection: None,
        }
    }
}

impl GrpcSection {
    /// Returns the graceful shutdown deadline.
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Converts the section into transport settings.
    #[must_use]
    pub fn to_grpc_config(&self) -> GrpcConfig {
        let mut builder = GrpcConfig::builder().tcp_nodelay(self.tcp_nodelay);
        if let Some(secs) = self.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if let Some(limit) = self.concurrency_limit_per_connection {
            builder = builder.concurrency_limit_per_connection(limit);
        }
        builder.build()
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Human-readable output.
    Pretty,
}

/// Logging section (`[logging]`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSection {
    /// Install a subscriber at all.
    pub enabled: bool,

    /// Filter directives, e.g. `"info"` or `"mooring_server=debug,hyper=warn"`.
    pub level: String,

    /// Output format.
    pub format: LogFormat,

    /// Emit span open/close events.
    pub span_events: bool,

    /// Include source file and line.
    pub file_line_info: bool,

    /// Include thread ids.
    pub thread_ids: bool,

    /// Include the module path.
    pub include_target: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self::from(&LogConfig::production())
    }
}

impl From<&LogConfig> for LoggingSection {
    fn from(config: &LogConfig) -> Self {
        Self {
            enabled: config.enabled,
            level: config.level.clone(),
            format: if config.json_format {
                LogFormat::Json
            } else {
                LogFormat::Pretty
            },
            span_events: config.span_events,
            file_line_info: config.file_line_info,
            thread_ids: config.thread_ids,
            include_target: config.include_target,
        }
    }
}

impl LoggingSection {
    /// Converts the section into a [`LogConfig`] for
    /// [`init_logging`](mooring_telemetry::init_logging).
    #[must_use]
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            enabled: self.enabled,
            level: self.level.clone(),
            json_format: self.format == LogFormat::Json,
            span_events: self.span_events,
            file_line_info: self.file_line_info,
            thread_ids: self.thread_ids,
            include_target: self.include_target,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_section_defaults() {
        let section = HttpSection::default();
        assert_eq!(section.address, "0.0.0.0:8080");
        assert_eq!(section.shutdown_timeout(), Duration::from_secs(30));

        let config = section.to_http_config();
        assert_eq!(config, HttpConfig::default());
    }

    #[test]
    fn test_http_section_unknown_field_rejected() {
        let result: Result<HttpSection, _> = toml::from_str("adress = \"0.0.0.0:80\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_grpc_section_conversion() {
        let section: GrpcSection = toml::from_str(
            r"
            tcp_nodelay = false
            timeout_secs = 5
            concurrency_limit_per_connection = 64
            ",
        )
        .unwrap();

        assert_eq!(section.address, "0.0.0.0:50051");
        let config = section.to_grpc_config();
        assert!(!config.tcp_nodelay());
        assert_eq!(config.timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.concurrency_limit_per_connection(), Some(64));
    }

    #[test]
    fn test_log_format_deserialize() {
        let section: LoggingSection = serde_json::from_str(r#"{"format":"pretty"}"#).unwrap();
        assert_eq!(section.format, LogFormat::Pretty);
        assert!(serde_json::from_str::<LoggingSection>(r#"{"format":"xml"}"#).is_err());
    }

    #[test]
    fn test_logging_section_round_trips_presets() {
        let development = LogConfig::development();
        assert_eq!(LoggingSection::from(&development).to_log_config(), development);
        assert_eq!(LoggingSection::default().to_log_config(), LogConfig::production());
    }
}
