//! Subscriber construction from a [`LogConfig`].
//!
//! ```rust,ignore
//! use mooring_telemetry::logging::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development())?;
//! tracing::info!(transport = "grpc", address = "0.0.0.0:50051", "grpc server listening");
//! ```

use crate::error::TelemetryError;
use crate::TelemetryResult;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// What the fmt layer prints and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// `false` installs no subscriber at all.
    pub enabled: bool,
    /// `EnvFilter` directives, e.g. `"mooring_server=debug,hyper=warn,info"`.
    pub level: String,
    /// One JSON object per event instead of the multi-line pretty format.
    pub json_format: bool,
    /// Emit an event when a span opens and closes.
    pub span_events: bool,
    /// Source file and line of each event.
    pub file_line_info: bool,
    /// ID of the emitting thread.
    pub thread_ids: bool,
    /// Module path of each event.
    pub include_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::production()
    }
}

impl LogConfig {
    /// Creates a development configuration with human-readable output.
    #[must_use]
    pub fn development() -> Self {
        Self {
            enabled: true,
            level: "debug".to_string(),
            json_format: false,
            span_events: true,
            file_line_info: true,
            thread_ids: false,
            include_target: true,
        }
    }

    /// Creates a production configuration with JSON output.
    #[must_use]
    pub fn production() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            json_format: true,
            span_events: false,
            file_line_info: false,
            thread_ids: false,
            include_target: true,
        }
    }
}

/// A formatting layer boxed over the plain registry.
pub type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Initializes the global logging subscriber.
///
/// A disabled config installs nothing and succeeds.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] for an unparsable level and
/// [`TelemetryError::SubscriberInstalled`] if a global subscriber is
/// already set.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    let Some(layer) = logging_layer(config)? else {
        return Ok(());
    };

    tracing_subscriber::registry().with(layer).try_init()?;
    Ok(())
}

/// Builds the filtered fmt layer for `config` without installing it.
///
/// Returns `None` when logging is disabled. Useful for composing with other
/// layers or for scoping a subscriber with
/// [`tracing::subscriber::with_default`].
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] for an unparsable level.
pub fn logging_layer(config: &LogConfig) -> TelemetryResult<Option<BoxedLayer>> {
    if !config.enabled {
        return Ok(None);
    }

    let filter = create_env_filter(&config.level)?;
    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };
    let base = tracing_subscriber::fmt::layer()
        .with_span_events(span_events)
        .with_file(config.file_line_info)
        .with_line_number(config.file_line_info)
        .with_thread_ids(config.thread_ids)
        .with_target(config.include_target);

    let layer = if config.json_format {
        base.json().with_filter(filter).boxed()
    } else {
        base.pretty().with_filter(filter).boxed()
    };
    Ok(Some(layer))
}

/// Parses `EnvFilter` directives such as `"mooring_server=debug,info"`.
///
/// # Errors
///
/// Blank input is [`TelemetryError::EmptyFilter`], anything the directive
/// parser rejects is [`TelemetryError::InvalidFilter`].
pub fn create_env_filter(directives: &str) -> TelemetryResult<EnvFilter> {
    if directives.trim().is_empty() {
        return Err(TelemetryError::EmptyFilter);
    }
    EnvFilter::try_new(directives).map_err(|source| TelemetryError::InvalidFilter {
        directives: directives.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_production() {
        let config = LogConfig::default();
        assert!(config.enabled);
        assert!(config.json_format);
        assert_eq!(config.level, "info");
        assert_eq!(config, LogConfig::production());
    }

    #[test]
    fn test_development_config() {
        let config = LogConfig::development();
        assert!(!config.json_format);
        assert!(config.span_events);
        assert!(config.file_line_info);
        assert_eq!(config.level, "debug");
    }

    #[test]
    fn test_create_env_filter() {
        assert!(create_env_filter("info").is_ok());
        assert!(create_env_filter("mooring_server=debug,hyper=warn").is_ok());
        assert!(matches!(create_env_filter("  "), Err(TelemetryError::EmptyFilter)));
    }

    #[test]
    fn test_disabled_logging() {
        let config = LogConfig {
            enabled: false,
            ..Default::default()
        };

        assert!(logging_layer(&config).unwrap().is_none());
        assert!(init_logging(&config).is_ok());
    }

    #[test]
    fn test_invalid_level_is_rejected_before_install() {
        let config = LogConfig {
            level: "mooring_server=loud".to_string(),
            ..LogConfig::development()
        };
        assert!(matches!(
            logging_layer(&config),
            Err(TelemetryError::InvalidFilter { .. })
        ));
    }

    #[test]
    fn test_scoped_subscriber_receives_events() {
        use tracing_subscriber::layer::SubscriberExt;

        let layer = logging_layer(&LogConfig::production()).unwrap().unwrap();
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(transport = "http", address = "127.0.0.1:8080", "http server listening");
        });
    }
}
