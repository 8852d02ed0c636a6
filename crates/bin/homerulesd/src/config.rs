//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `homerules.toml` in the working directory (or the file named
//! by `HOMERULES_CONFIG`). Every field has a sensible default so the file
//! is optional. Environment variables take precedence over file values.

use std::path::PathBuf;

use homerules_adapter_sunrise_sunset::SunriseSunsetConfig;
use homerules_domain::sun::Location;
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where sun times are computed for.
    pub location: LocationConfig,
    /// Sun times API settings.
    pub sun: SunriseSunsetConfig,
    /// Rule set settings.
    pub rules: RulesConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Device layer toggles.
    pub devices: DevicesConfig,
}

/// Geographic position of the home.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    /// Degrees north, `-90..=90`.
    pub latitude: f64,
    /// Degrees east, `-180..=180`.
    pub longitude: f64,
}

/// Rule set file.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// JSON file holding the array of rules.
    pub path: PathBuf,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Device layer toggles.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DevicesConfig {
    /// Enable the simulated device layer.
    pub virtual_enabled: bool,
    /// Read `<device> on|off` lines from stdin and feed them to the
    /// simulated devices.
    pub stdin_simulation: bool,
}

impl Config {
    /// Load configuration from `homerules.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("HOMERULES_CONFIG").unwrap_or_else(|_| "homerules.toml".to_string());
        let mut config = Self::from_file(&path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("HOMERULES_LATITUDE")
            && let Ok(latitude) = val.parse()
        {
            self.location.latitude = latitude;
        }
        if let Ok(val) = std::env::var("HOMERULES_LONGITUDE")
            && let Ok(longitude) = val.parse()
        {
            self.location.longitude = longitude;
        }
        if let Ok(val) = std::env::var("HOMERULES_SUN_API_URL") {
            self.sun.api_url = val;
        }
        if let Ok(val) = std::env::var("HOMERULES_RULES_PATH") {
            self.rules.path = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("HOMERULES_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.location().is_valid() {
            return Err(ConfigError::Validation(format!(
                "location {},{} is out of range",
                self.location.latitude, self.location.longitude
            )));
        }
        if self.sun.api_url.trim().is_empty() {
            return Err(ConfigError::Validation("sun api_url must not be empty".to_string()));
        }
        if self.sun.timeout_secs == 0 {
            return Err(ConfigError::Validation("sun timeout_secs must be non-zero".to_string()));
        }
        if !self.devices.virtual_enabled {
            return Err(ConfigError::Validation("no device layer enabled".to_string()));
        }
        Ok(())
    }

    /// The configured [`Location`].
    #[must_use]
    pub fn location(&self) -> Location {
        Location {
            latitude: self.location.latitude,
            longitude: self.location.longitude,
        }
    }
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            latitude: 46.114_43,
            longitude: -64.847_092,
        }
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("rules.json"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "homerulesd=info,homerules_app=info,homerules_adapter_sunrise_sunset=info,homerules_adapter_virtual=info".to_string(),
        }
    }
}

impl Default for DevicesConfig {
    fn default() -> Self {
        Self {
            virtual_enabled: true,
            stdin_simulation: true,
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
