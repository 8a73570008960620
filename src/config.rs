//! Configuration
//!
//! TOML configuration for hosts that build their dispatcher from a file.
//! Files are discovered in order of precedence and flattened into
//! `section -> key -> value` string maps; lookups fall back to `[base]`.
//!
//! ```toml
//! [base]
//! log-level = "warn"
//!
//! [dispatcher]
//! normalizer = "snake_case"
//! default-method = "handle"
//!
//! [logging]
//! log-format = "json"
//! log-file = "/var/log/app/dispatch.log"
//! file-log-level = "trace"
//! ```

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use toml::Value;

use crate::dispatcher::DEFAULT_METHOD;
use crate::logging::{LogConfig, LogDestination, LogFormat};
use crate::normalize::NormalizerKind;

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV_VAR: &str = "EVDISPATCH_CONFIG";

/// Section consulted when a key is missing from the requested one
pub const BASE_SECTION: &str = "base";

/// Configuration storage - section_name -> key -> value
pub type Configuration = HashMap<String, HashMap<String, String>>;

/// Settings used to build a [`Dispatcher`](crate::dispatcher::Dispatcher)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DispatcherConfig {
    pub normalizer: NormalizerKind,
    pub default_method: String,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            normalizer: NormalizerKind::default(),
            default_method: DEFAULT_METHOD.to_string(),
        }
    }
}

/// Configuration manager
#[derive(Debug, Default)]
pub struct ConfigManager {
    config: Configuration,
    config_file_path: Option<PathBuf>,
    selected_section: Option<String>,
}

impl ConfigManager {
    /// Create a new ConfigManager from a Configuration (primarily for testing)
    pub fn from_config(config: Configuration) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Load the first configuration file found by discovery, or an empty one
    pub fn load() -> Result<Self> {
        debug!("Starting configuration discovery");

        for path in discover_config_files() {
            debug!("Attempting to load config from: {}", path.display());
            if path.is_file() {
                return Self::load_from_file(path);
            }
        }

        info!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from explicit file path
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = parse_toml_config(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        info!("Loaded configuration from: {}", path.display());
        Ok(Self {
            config,
            config_file_path: Some(path.to_path_buf()),
            selected_section: None,
        })
    }

    /// File the configuration came from, if any
    pub fn config_file_path(&self) -> Option<&Path> {
        self.config_file_path.as_deref()
    }

    /// Get value with fallback: selected section, then `section`, then `[base]`
    pub fn get_value(&self, section: &str, key: &str) -> Option<&String> {
        let lookup = |name: &str| self.config.get(name).and_then(|s| s.get(key));

        self.selected_section
            .as_deref()
            .and_then(lookup)
            .or_else(|| lookup(section))
            .or_else(|| lookup(BASE_SECTION))
    }

    /// Prefer `section` over every other section for subsequent lookups
    pub fn select_section(&mut self, section: impl Into<String>) {
        let section = section.into();
        debug!("Selecting configuration section: {}", section);
        self.selected_section = Some(section);
    }

    /// Get a value parsed through `FromStr`
    pub fn get_parsed<T>(&self, section: &str, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get_value(section, key)
            .map(|value| {
                value
                    .parse::<T>()
                    .map_err(|e| anyhow::anyhow!("Invalid value for {}.{}: {}", section, key, e))
            })
            .transpose()
    }

    /// Get boolean value with type conversion
    pub fn get_bool(&self, section: &str, key: &str) -> Result<Option<bool>> {
        match self.get_value(section, key) {
            Some(value) => match value.to_lowercase().as_str() {
                "true" | "yes" | "on" => Ok(Some(true)),
                "false" | "no" | "off" => Ok(Some(false)),
                _ => Err(anyhow::anyhow!("Invalid boolean value for {}.{}: {}", section, key, value)),
            },
            None => Ok(None),
        }
    }

    /// Get log level value with type conversion
    pub fn get_log_level(&self, section: &str, key: &str) -> Result<Option<log::LevelFilter>> {
        self.get_value(section, key)
            .map(|value| crate::logging::parse_log_level(value))
            .transpose()
    }

    /// Get path value with type conversion
    pub fn get_path(&self, section: &str, key: &str) -> Option<PathBuf> {
        self.get_value(section, key).map(PathBuf::from)
    }

    /// Dispatcher settings from the `[dispatcher]` section
    pub fn get_dispatcher_config(&self) -> Result<DispatcherConfig> {
        let mut config = DispatcherConfig::default();

        if let Some(normalizer) = self.get_parsed::<NormalizerKind>("dispatcher", "normalizer")? {
            config.normalizer = normalizer;
        }

        if let Some(method) = self.get_value("dispatcher", "default-method") {
            let method = method.trim();
            if method.is_empty() {
                anyhow::bail!("Invalid value for dispatcher.default-method: must not be empty");
            }
            config.default_method = method.to_string();
        }

        debug!("Dispatcher configuration: {:?}", config);
        Ok(config)
    }

    /// Logging settings from the `[logging]` section
    ///
    /// `log-file` adds a file destination next to the console; its level is
    /// `file-log-level`, or `log-level` when that is absent.
    pub fn get_log_config(&self) -> Result<LogConfig> {
        let mut config = LogConfig::default();

        if let Some(level) = self.get_log_level("logging", "log-level")? {
            config.console_level = level;
        }

        if let Some(format) = self.get_parsed::<LogFormat>("logging", "log-format")? {
            config.format = format;
        }

        if let Some(path) = self.get_path("logging", "log-file") {
            config.file_level = Some(
                self.get_log_level("logging", "file-log-level")?
                    .unwrap_or(config.console_level),
            );
            config.destination = LogDestination::Both(path);
        }

        Ok(config)
    }
}

/// Candidate configuration files in order of precedence
fn discover_config_files() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        paths.push(PathBuf::from(env_path));
    }

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("evdispatch").join("config.toml"));
    }

    if let Some(home_dir) = dirs::home_dir() {
        paths.push(home_dir.join(".evdispatch.toml"));
    }

    paths.push(PathBuf::from("./.evdispatch.toml"));

    debug!("Config discovery paths: {:?}", paths);
    paths
}

/// Parse TOML content to string-based configuration
fn parse_toml_config(content: &str) -> Result<Configuration> {
    let table: toml::Table = content.parse().context("Failed to parse TOML content")?;

    let mut config = Configuration::new();
    flatten_toml_table(&table, "", &mut config);

    debug!("Parsed configuration: {:?}", config);
    Ok(config)
}

/// Flatten nested tables into `section.subsection` names.
///
/// Scalar keys at the top level belong to `[base]`.
fn flatten_toml_table(table: &toml::Table, prefix: &str, config: &mut Configuration) {
    let section = if prefix.is_empty() { BASE_SECTION } else { prefix };

    for (key, value) in table {
        match value {
            Value::Table(subtable) => {
                let name = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten_toml_table(subtable, &name, config);
            }
            scalar => {
                config
                    .entry(section.to_string())
                    .or_default()
                    .insert(key.clone(), toml_value_to_string(scalar));
            }
        }
    }
}

/// Convert TOML Value to string representation
fn toml_value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Datetime(dt) => dt.to_string(),
        Value::Array(_) | Value::Table(_) => value.to_string(),
    }
}
