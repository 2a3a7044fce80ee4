//! Layered configuration loading.
//!
//! Layers are applied in call order, each overriding only the keys it sets:
//!
//! 1. defaults (or a preset)
//! 2. files and strings (TOML or JSON)
//! 3. environment variables, when a prefix is configured

use std::env;
use std::fs;
use std::path::Path;

use serde_json::{Map, Value};

use crate::{ConfigError, MooringConfig};

/// Builds a [`MooringConfig`] from layered sources.
///
/// # Example
///
/// ```no_run
/// use mooring_config::ConfigLoader;
///
/// # fn main() -> Result<(), mooring_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_dotenv()?
///     .with_file("mooring.toml")?
///     .with_optional_file("mooring.local.toml")?
///     .with_env_prefix("MOORING")
///     .load()?;
///
/// println!("HTTP on {}", config.http.address);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: MooringConfig,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a loader starting from the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: MooringConfig::default(),
            env_prefix: None,
        }
    }

    /// Resets to the default values, dropping earlier layers.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = MooringConfig::default();
        self
    }

    /// Resets to the development preset.
    ///
    /// ```
    /// use mooring_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new().with_development().load().unwrap();
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = MooringConfig::development();
        self
    }

    /// Resets to the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = MooringConfig::production();
        self
    }

    /// Applies a configuration file. The format follows the extension
    /// (`.toml` or `.json`).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing or unreadable, has an
    /// unsupported extension, or does not parse (unknown keys included).
    pub fn with_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::missing(path));
        }

        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| ConfigError::UnsupportedFormat(path.display().to_string()))?;
        let content = fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;

        tracing::debug!(path = %path.display(), "Loading configuration file");
        self.with_string(&content, format)
    }

    /// Applies a configuration file if it exists.
    ///
    /// # Errors
    ///
    /// Same as [`with_file`](Self::with_file) for a file that exists.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Applies configuration text in the given format (`"toml"` or `"json"`).
    ///
    /// ```
    /// use mooring_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string("[http]\naddress = \"127.0.0.1:3000\"", "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.http.address, "127.0.0.1:3000");
    /// assert_eq!(config.http.read_timeout_secs, 120);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for an unsupported format or content that does
    /// not parse.
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        // Parsed once as the typed config for precise errors, once as a tree
        // so that only the keys present override the current values.
        let layer: Value = match format.to_lowercase().as_str() {
            "toml" => {
                toml::from_str::<MooringConfig>(content)?;
                toml::from_str(content)?
            }
            "json" => {
                serde_json::from_str::<MooringConfig>(content)?;
                serde_json::from_str(content)?
            }
            _ => return Err(ConfigError::UnsupportedFormat(format.to_string())),
        };

        let mut merged = serde_json::to_value(&self.config)?;
        merge_values(&mut merged, layer);
        self.config = serde_json::from_value(merged)?;
        Ok(self)
    }

    /// Enables environment overrides of the form `PREFIX__SECTION__KEY`.
    ///
    /// With prefix `MOORING`:
    /// - `MOORING__HTTP__ADDRESS=0.0.0.0:9000`
    /// - `MOORING__GRPC__TCP_NODELAY=false`
    /// - `MOORING__LOGGING__LEVEL=mooring_server=debug,info`
    ///
    /// Booleans accept `true/false`, `1/0`, `yes/no` and `on/off`; optional
    /// values are cleared with an empty string or `none`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Loads `.env` from the current directory or its parents into the
    /// process environment. A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Dotenv` if a `.env` file exists but is malformed.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(e.into()),
        }
        Ok(self)
    }

    /// Loads a specific env file into the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Dotenv` if the file is missing or malformed.
    pub fn with_dotenv_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        dotenvy::from_path(path.as_ref())?;
        Ok(self)
    }

    /// Applies environment overrides and validates the result.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an override is rejected or validation fails.
    pub fn load(self) -> Result<MooringConfig, ConfigError> {
        let config = self.load_unvalidated()?;
        config.validate()?;
        Ok(config)
    }

    /// Applies environment overrides without validating.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::EnvOverride` if an override is rejected.
    pub fn load_unvalidated(mut self) -> Result<MooringConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_vars(&prefix, env::vars())?;
        }
        Ok(self.config)
    }

    fn apply_env_vars(
        &mut self,
        prefix: &str,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<(), ConfigError> {
        let marker = format!("{prefix}__");
        let mut overrides: Vec<(String, String)> = vars
            .into_iter()
            .filter(|(key, _)| key.starts_with(&marker))
            .collect();
        overrides.sort();

        for (key, value) in overrides {
            self.apply_env_var(&key, &value, &marker)?;
            tracing::debug!(var = %key, "Applied environment override");
        }
        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, value: &str, marker: &str) -> Result<(), ConfigError> {
        let path = key
            .strip_prefix(marker)
            .map(str::to_lowercase)
            .ok_or_else(|| ConfigError::env_override(key, "invalid key format"))?;
        let (section, field) = match path.split("__").collect::<Vec<_>>().as_slice() {
            [section, field] => ((*section).to_string(), (*field).to_string()),
            _ => return Err(ConfigError::env_override(key, "expected PREFIX__SECTION__KEY")),
        };

        let base = serde_json::to_value(&self.config)?;
        if base.get(&section).and_then(|s| s.get(&field)).is_none() {
            return Err(ConfigError::env_override(key, "unknown configuration key"));
        }

        // Environment values are untyped; take the first reading the schema accepts.
        let mut last_error = None;
        for candidate in candidates(value) {
            let mut attempt = base.clone();
            attempt[section.as_str()][field.as_str()] = candidate;
            match serde_json::from_value::<MooringConfig>(attempt) {
                Ok(config) => {
                    self.config = config;
                    return Ok(());
                }
                Err(e) => last_error = Some(e),
            }
        }

        let reason = last_error.map_or_else(|| "unparsable value".to_string(), |e| e.to_string());
        Err(ConfigError::env_override(key, reason))
    }
}

/// Typed readings of an environment value, most specific first.
fn candidates(value: &str) -> Vec<Value> {
    let mut readings = Vec::with_capacity(4);
    if value.is_empty() || value.eq_ignore_ascii_case("none") {
        readings.push(Value::Null);
    }
    if let Ok(number) = value.parse::<u64>() {
        readings.push(Value::from(number));
    }
    if let Some(flag) = parse_bool(value) {
        readings.push(Value::Bool(flag));
    }
    readings.push(Value::String(value.to_string()));
    readings
}

/// Recursively overlays `layer` onto `base`. Objects merge key by key;
/// anything else replaces.
fn merge_values(base: &mut Value, layer: Value) {
    match (base, layer) {
        (Value::Object(base), Value::Object(layer)) => merge_maps(base, layer),
        (base, layer) => *base = layer,
    }
}

fn merge_maps(base: &mut Map<String, Value>, layer: Map<String, Value>) {
    for (key, value) in layer {
        match base.get_mut(&key) {
            Some(existing) => merge_values(existing, value),
            None => {
                base.insert(key, value);
            }
        }
    }
}

/// Parse a boolean from a string.
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
