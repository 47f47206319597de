//! Configuration loading for waypoint.
//!
//! Configuration follows a precedence chain:
//! 1. Command-line flags (applied by the caller, highest priority)
//! 2. Environment variables
//! 3. Config file (`--config`, or `$WAYPOINT_HOME/config.toml`)
//! 4. Defaults (lowest priority)
//!
//! All configuration is optional. With no file and no environment the
//! engine runs forever on a 30 second interval with the ambient region.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{FailOpen, Result, WaypointError};
use crate::util::{read_to_string_with_limit, MAX_DOCUMENT_SIZE};

/// Seconds between discovery cycles.
pub const DEFAULT_INTERVAL_SECONDS: u64 = 30;

/// Log level used when neither `RUST_LOG` nor config says otherwise.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Log levels accepted in `[logging] level` and `LOG_LEVEL`.
pub const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Main configuration struct for waypoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub discovery: DiscoveryConfig,
    pub cloud: CloudConfig,
    pub logging: LoggingConfig,
}

/// Polling loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Seconds to sleep between cycles.
    pub interval_seconds: u64,
    /// Run a single cycle and exit.
    pub once: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            interval_seconds: DEFAULT_INTERVAL_SECONDS,
            once: false,
        }
    }
}

/// Cloud client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CloudConfig {
    /// Region for queries that do not name one.
    pub region: Option<String>,
    /// Control-plane endpoint override.
    pub endpoint: Option<String>,
    /// Serve the cloud providers from an inventory snapshot instead.
    pub inventory: Option<PathBuf>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl LoggingConfig {
    /// Check if a level name is accepted.
    pub fn is_valid_level(value: &str) -> bool {
        VALID_LOG_LEVELS.contains(&value)
    }
}

impl Config {
    /// Load configuration with the file and environment layers.
    ///
    /// An explicit `path` must exist and parse. The home config file is
    /// optional: a missing one is skipped and a broken one is logged and
    /// skipped.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Config::default();

        match path {
            Some(path) => config = config.merge(Self::load_from_file(path)?),
            None => {
                if let Some(user_config) = Self::load_user_config() {
                    config = config.merge(user_config);
                }
            }
        }

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load the home config file, if there is one.
    fn load_user_config() -> Option<Config> {
        let config_path = waypoint_home()?.join("config.toml");
        if !config_path.exists() {
            return None;
        }
        Self::load_from_file(&config_path)
            .map(Some)
            .fail_open_default("loading user config")
    }

    /// Load config from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let content = read_to_string_with_limit(path, MAX_DOCUMENT_SIZE)?;
        toml::from_str(&content)
            .map_err(|e| WaypointError::config(format!("{}: {}", path.display(), e)))
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("WAYPOINT_INTERVAL_SECONDS") {
            match val.parse::<u64>() {
                Ok(n) if n > 0 => self.discovery.interval_seconds = n,
                _ => tracing::warn!(
                    value = %val,
                    default = self.discovery.interval_seconds,
                    "invalid WAYPOINT_INTERVAL_SECONDS, expected a positive integer"
                ),
            }
        }

        if env::var("ONCE").is_ok_and(|val| !val.is_empty()) {
            self.discovery.once = true;
        }

        if let Some(inventory) = non_empty_var("WAYPOINT_INVENTORY") {
            self.cloud.inventory = Some(PathBuf::from(inventory));
        }

        // AWS_REGION wins over AWS_DEFAULT_REGION.
        let region = non_empty_var("AWS_REGION").or_else(|| non_empty_var("AWS_DEFAULT_REGION"));
        if let Some(region) = region {
            self.cloud.region = Some(region);
        }

        if let Some(endpoint) = non_empty_var("AWS_ENDPOINT") {
            self.cloud.endpoint = Some(endpoint);
        }

        if let Some(level) = non_empty_var("LOG_LEVEL") {
            let level = level.to_ascii_lowercase();
            if LoggingConfig::is_valid_level(&level) {
                self.logging.level = level;
            } else {
                tracing::warn!(
                    value = %level,
                    default = %self.logging.level,
                    "invalid LOG_LEVEL, expected one of {:?}",
                    VALID_LOG_LEVELS
                );
            }
        }
    }

    /// Merge a higher-precedence config into this one.
    ///
    /// Only values that differ from the defaults are taken from `other`, so
    /// a layer that restates a default cannot reset a lower layer's value.
    fn merge(mut self, other: Config) -> Self {
        let default_discovery = DiscoveryConfig::default();
        if other.discovery.interval_seconds != default_discovery.interval_seconds {
            self.discovery.interval_seconds = other.discovery.interval_seconds;
        }
        if other.discovery.once != default_discovery.once {
            self.discovery.once = other.discovery.once;
        }

        if other.cloud.region.is_some() {
            self.cloud.region = other.cloud.region;
        }
        if other.cloud.endpoint.is_some() {
            self.cloud.endpoint = other.cloud.endpoint;
        }
        if other.cloud.inventory.is_some() {
            self.cloud.inventory = other.cloud.inventory;
        }

        if other.logging.level != LoggingConfig::default().level {
            self.logging.level = other.logging.level;
        }

        self
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|val| !val.is_empty())
}

/// Get the waypoint home directory.
///
/// `WAYPOINT_HOME` wins when set and non-empty; otherwise `~/.waypoint`.
/// Returns `None` when no home directory can be determined.
pub fn waypoint_home() -> Option<PathBuf> {
    if let Ok(home) = env::var("WAYPOINT_HOME") {
        if home.is_empty() {
            tracing::warn!("WAYPOINT_HOME is empty, using default");
        } else {
            return Some(PathBuf::from(home));
        }
    }
    dirs::home_dir().map(|home| home.join(".waypoint"))
}
