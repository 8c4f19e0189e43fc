//! Configuration management for an account directory node
//!
//! Defaults, environment overrides, TOML files and validation. The
//! `fields` section declares the extension field keys every server in the
//! mesh must agree on.

use crate::core_account::field::{FieldKind, FieldRegistry, SerializeFormat};
use crate::logging::LogLevel;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::str::FromStr;

mod error;

pub use error::ConfigError;

/// Main node configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Node identity and wire format
    pub node: NodeConfig,

    /// Change notifier configuration
    pub notifier: NotifierConfig,

    /// Extension field declarations
    pub fields: Vec<FieldDecl>,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Metrics configuration
    pub metrics: MetricsConfig,
}

/// Node configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Name this server is known by in the mesh
    pub server_name: String,

    /// Field serialization format for peer messages
    pub format: SerializeFormat,
}

/// Notifier configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    /// Buffered messages per channel before slow receivers lag
    pub capacity: usize,
}

/// One extension field key and its type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub key: String,

    #[serde(flatten)]
    pub kind: FieldKind,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON formatting
    pub json_format: bool,

    /// Include timestamps
    pub with_timestamp: bool,

    /// Include target module
    pub with_target: bool,
}

/// Metrics configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Describe metrics at startup
    pub enabled: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self { server_name: "acctmesh.local".to_string(), format: SerializeFormat::default() }
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self { capacity: crate::core_account::notify::DEFAULT_CAPACITY }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            with_timestamp: true,
            with_target: true,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn env_parse<T>(var: &str, what: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue(format!("Invalid {}: {}", what, e))),
        Err(_) => Ok(None),
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Environment variables follow the pattern: ACCTMESH_<SECTION>_<KEY>
    /// Example: ACCTMESH_NODE_SERVER_NAME=hub.example.net
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Node config
        if let Ok(name) = env::var("ACCTMESH_NODE_SERVER_NAME") {
            config.node.server_name = name;
        }
        if let Ok(format) = env::var("ACCTMESH_NODE_FORMAT") {
            config.node.format = match format.to_lowercase().as_str() {
                "internal" => SerializeFormat::Internal,
                "network" => SerializeFormat::Network,
                other => {
                    return Err(ConfigError::InvalidValue(format!("Invalid format: {}", other)))
                }
            };
        }

        // Notifier config
        if let Some(capacity) = env_parse("ACCTMESH_NOTIFIER_CAPACITY", "notifier capacity")? {
            config.notifier.capacity = capacity;
        }

        // Logging config
        if let Ok(level) = env::var("ACCTMESH_LOGGING_LEVEL") {
            config.logging.level = level;
        }
        if let Some(json) = env_parse("ACCTMESH_LOGGING_JSON_FORMAT", "JSON flag")? {
            config.logging.json_format = json;
        }

        // Metrics config
        if let Some(enabled) = env_parse("ACCTMESH_METRICS_ENABLED", "metrics flag")? {
            config.metrics.enabled = enabled;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::FileReadError(e.to_string()))?;

        let config: Self =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node.server_name.trim().is_empty() {
            return Err(ConfigError::ValidationFailed("server_name must not be empty".to_string()));
        }

        if self.notifier.capacity == 0 {
            return Err(ConfigError::ValidationFailed(
                "notifier capacity must be greater than 0".to_string(),
            ));
        }

        let mut seen = std::collections::BTreeSet::new();
        for decl in &self.fields {
            if decl.key.is_empty() || decl.key.contains(char::is_whitespace) {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid field key: {:?}",
                    decl.key
                )));
            }
            if FieldRegistry::is_reserved(&decl.key) {
                return Err(ConfigError::ValidationFailed(format!(
                    "{} is a built-in field and cannot be declared",
                    decl.key
                )));
            }
            if !seen.insert(decl.key.as_str()) {
                return Err(ConfigError::ValidationFailed(format!(
                    "Field declared twice: {}",
                    decl.key
                )));
            }
        }

        if self.logging.level.parse::<LogLevel>().is_err() {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid log level: {}",
                self.logging.level
            )));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, contents).map_err(|e| ConfigError::FileWriteError(e.to_string()))?;

        Ok(())
    }

    /// Field registry with the built-in keys plus every declared field
    pub fn build_registry(&self) -> FieldRegistry {
        let mut registry = FieldRegistry::new();
        for decl in &self.fields {
            registry.register(&decl.key, decl.kind);
        }
        registry
    }
}
