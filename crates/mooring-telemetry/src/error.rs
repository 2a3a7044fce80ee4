//! Telemetry error types.

use thiserror::Error;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::util::TryInitError;

/// Why logging could not be set up.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The filter string was blank.
    #[error("log filter must not be empty")]
    EmptyFilter,

    /// The filter string is not a valid set of `EnvFilter` directives.
    #[error("invalid log filter {directives:?}: {source}")]
    InvalidFilter {
        /// The rejected directives.
        directives: String,
        /// Parser error.
        #[source]
        source: ParseError,
    },

    /// Another global subscriber won the race.
    #[error("global tracing subscriber already installed")]
    SubscriberInstalled(#[from] TryInitError),
}
