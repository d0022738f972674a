//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `hmbridge.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use hmbridge_domain::catalog::DeviceCatalog;
use hmbridge_domain::error::ValidationError;
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Coordinator session settings.
    pub coordinator: CoordinatorConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Integration toggles.
    pub integrations: IntegrationsConfig,
    /// Device-type profiles, merged over the ones built into adapters.
    pub catalog: DeviceCatalog,
}

/// Coordinator session configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Interface id this bridge registers under.
    pub interface_id: String,
    /// Pull every declared paramset while building devices.
    pub resolve_paramsets: bool,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Per-integration toggles.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct IntegrationsConfig {
    /// Serve the simulated devices of the virtual coordinator.
    pub virtual_enabled: bool,
}

impl Config {
    /// Load configuration from `hmbridge.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("hmbridge.toml")?;
        config.apply_overrides(|name| std::env::var(name).ok());
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

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("HMBRIDGE_INTERFACE_ID") {
            self.coordinator.interface_id = val;
        }
        if let Some(val) = var("HMBRIDGE_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.coordinator.interface_id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "interface_id must not be empty".to_string(),
            ));
        }
        self.catalog
            .validate()
            .map_err(|(device_type, source)| ConfigError::Catalog {
                device_type,
                source,
            })
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            interface_id: "hmbridge".to_string(),
            resolve_paramsets: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "hmbridged=info,hmbridge=info".to_string(),
        }
    }
}

impl Default for IntegrationsConfig {
    fn default() -> Self {
        Self {
            virtual_enabled: true,
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
    /// A catalog profile is invalid.
    #[error("invalid catalog profile for {device_type}")]
    Catalog {
        device_type: String,
        #[source]
        source: ValidationError,
    },
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
