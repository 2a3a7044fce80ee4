//! Why a configuration could not be produced.

use std::path::PathBuf;
use thiserror::Error;

/// Failure while reading, merging or validating configuration layers.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required file does not exist.
    #[error("config file {path} does not exist")]
    Missing {
        /// The path that was looked up.
        path: PathBuf,
    },

    /// A config or `.env` file exists but reading it failed.
    #[error("cannot read config file {path}")]
    Io {
        /// The file being read.
        path: PathBuf,
        /// The I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Only `toml` and `json` are understood.
    #[error("unsupported config format {0:?}, expected toml or json")]
    UnsupportedFormat(String),

    /// Malformed TOML, or a key the schema does not know.
    #[error("invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    /// Malformed JSON, or a key the schema does not know.
    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    /// The merged config parsed but fails validation.
    #[error("{field}: {reason}")]
    Invalid {
        /// Dotted path of the field, e.g. `http.address`.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// An environment override names an unknown key or carries a value of
    /// the wrong type.
    #[error("environment override {var} rejected: {reason}")]
    EnvOverride {
        /// The variable name as found in the environment.
        var: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A `.env` file could not be loaded.
    #[error(".env: {0}")]
    Dotenv(#[from] dotenvy::Error),
}

impl ConfigError {
    pub(crate) fn missing(path: impl Into<PathBuf>) -> Self {
        Self::Missing { path: path.into() }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn env_override(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EnvOverride {
            var: var.into(),
            reason: reason.into(),
        }
    }
}
