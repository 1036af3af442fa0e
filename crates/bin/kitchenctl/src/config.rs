//! Configuration loading: TOML file with environment variable overrides.
//!
//! Reads `kitchenctl.toml` (or the path given on the command line). Every
//! field has a sensible default so the file is optional. Environment
//! variables take precedence over file values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use kitchenconnect_adapter_virtual::TemperatureLimits;
use kitchenconnect_domain::id::ApplianceId;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Which appliances the collection tracks.
    pub appliances: AppliancesConfig,
    /// Backend settings.
    pub remote: RemoteConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Tracked appliances.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AppliancesConfig {
    /// Appliance identifiers, in display order.
    pub ids: Vec<String>,
}

/// Virtual backend configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Directory of `<id>.json` snapshot documents. The embedded demo oven
    /// is used when unset.
    pub bundle_dir: Option<PathBuf>,
    /// Simulated latency applied to every backend call.
    pub latency_ms: u64,
    /// Lowest accepted target temperature.
    pub min_temperature: Option<i32>,
    /// Highest accepted target temperature.
    pub max_temperature: Option<i32>,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load configuration from `path` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("KITCHENCONNECT_APPLIANCES") {
            self.appliances.ids = val
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(val) = var("KITCHENCONNECT_BUNDLE_DIR") {
            self.remote.bundle_dir = Some(PathBuf::from(val));
        }
        if let Some(val) = var("KITCHENCONNECT_LATENCY_MS")
            && let Ok(latency) = val.parse()
        {
            self.remote.latency_ms = latency;
        }
        if let Some(val) = var("KITCHENCONNECT_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.appliances.ids.is_empty() {
            return Err(ConfigError::Validation(
                "at least one appliance id is required".to_string(),
            ));
        }
        if self.appliances.ids.iter().any(|id| id.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "appliance ids must not be blank".to_string(),
            ));
        }
        match (self.remote.min_temperature, self.remote.max_temperature) {
            (Some(min), Some(max)) if min > max => Err(ConfigError::Validation(format!(
                "min_temperature ({min}) is above max_temperature ({max})"
            ))),
            (Some(_), None) | (None, Some(_)) => Err(ConfigError::Validation(
                "min_temperature and max_temperature must be set together".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Tracked identifiers, trimmed.
    #[must_use]
    pub fn appliance_ids(&self) -> Vec<ApplianceId> {
        self.appliances
            .ids
            .iter()
            .map(|id| ApplianceId::new(id.trim()))
            .collect()
    }

    /// Accepted target temperature range, when both bounds are set.
    #[must_use]
    pub fn temperature_limits(&self) -> Option<TemperatureLimits> {
        TemperatureLimits::new(self.remote.min_temperature?, self.remote.max_temperature?)
    }

    #[must_use]
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.remote.latency_ms)
    }
}

impl Default for AppliancesConfig {
    fn default() -> Self {
        Self {
            ids: vec!["12CFD".to_string()],
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "kitchenctl=info,kitchenconnect=info".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
