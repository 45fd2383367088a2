//! Configuration management for kuba-query
//!
//! This module provides configuration file support with TOML format,
//! environment variable overrides, sensible defaults, and tracing setup.

use crate::error::Error;
use crate::hydrate::DEFAULT_BATCH_SIZE;
use crate::redis::{RedisConfig, RetryPolicy};

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Redis connection settings
    #[serde(default)]
    pub redis: RedisSection,

    /// Query evaluation settings
    #[serde(default)]
    pub query: QuerySection,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSection,
}

/// Redis connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedisSection {
    /// Server URL
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Maximum concurrent operations
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,

    /// Connection timeout in milliseconds
    #[serde(default = "default_connect_timeout_ms")]
    pub connection_timeout_ms: u64,

    /// Per-command timeout in milliseconds; 0 disables it
    #[serde(default)]
    pub command_timeout_ms: u64,

    /// Retries for connection-level failures
    #[serde(default)]
    pub max_retries: u32,

    /// Use TLS (`rediss://`)
    #[serde(default)]
    pub tls: bool,
}

/// Query evaluation settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QuerySection {
    /// Ids read per hydration batch
    #[serde(default = "default_hydrate_batch_size")]
    pub hydrate_batch_size: usize,

    /// Log each query's plan at debug level
    #[serde(default)]
    pub log_plans: bool,
}

/// Logging settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingSection {
    /// Filter directive, e.g. `info` or `kuba_query=debug`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_redis_url() -> String { "redis://127.0.0.1:6379".to_string() }
fn default_pool_size() -> u32 { 16 }
fn default_connect_timeout_ms() -> u64 { 5_000 }
fn default_hydrate_batch_size() -> usize { DEFAULT_BATCH_SIZE }
fn default_log_level() -> String { "info".to_string() }

impl Default for RedisSection {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            pool_size: default_pool_size(),
            connection_timeout_ms: default_connect_timeout_ms(),
            command_timeout_ms: 0,
            max_retries: 0,
            tls: false,
        }
    }
}

impl Default for QuerySection {
    fn default() -> Self {
        Self {
            hydrate_batch_size: default_hydrate_batch_size(),
            log_plans: false,
        }
    }
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl From<&RedisSection> for RedisConfig {
    fn from(section: &RedisSection) -> Self {
        let mut config = RedisConfig::with_url(section.url.clone())
            .pool_size(section.pool_size)
            .connection_timeout(Duration::from_millis(section.connection_timeout_ms))
            .retry_policy(RetryPolicy {
                max_retries: section.max_retries,
                ..RetryPolicy::default()
            })
            .tls(section.tls);
        if section.command_timeout_ms > 0 {
            config = config.command_timeout(Duration::from_millis(section.command_timeout_ms));
        }
        config
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("Failed to read config file {}: {}", path, e))
        })?;

        toml::from_str(&contents).map_err(|e| {
            Error::Configuration(format!("Failed to parse config file {}: {}", path, e))
        })
    }

    /// Load configuration with environment variable overrides
    pub fn from_file_with_env(path: &str) -> Result<Self, Error> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from environment variables only
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("KUBA_QUERY_REDIS_URL") {
            self.redis.url = url;
        }
        if let Ok(size) = std::env::var("KUBA_QUERY_POOL_SIZE") {
            if let Ok(n) = size.parse() {
                self.redis.pool_size = n;
            }
        }
        if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), Error> {
        RedisConfig::from(&self.redis)
            .validate()
            .map_err(Error::Configuration)?;

        if self.query.hydrate_batch_size == 0 {
            return Err(Error::Configuration(
                "Hydrate batch size must be > 0".to_string(),
            ));
        }
        if self.logging.level.trim().is_empty() {
            return Err(Error::Configuration("Log level cannot be empty".to_string()));
        }

        Ok(())
    }

    /// Save configuration to TOML file
    pub fn save_to_file(&self, path: &str) -> Result<(), Error> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Configuration(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, contents).map_err(|e| {
            Error::Configuration(format!("Failed to write config file {}: {}", path, e))
        })
    }
}

/// Install a global `tracing` subscriber
///
/// `RUST_LOG` takes precedence over the configured level. Returns `false`
/// if a subscriber was already installed.
pub fn init_tracing(logging: &LoggingSection) -> bool {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if logging.json {
        builder.json().try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.redis.pool_size, 16);
        assert_eq!(config.query.hydrate_batch_size, 256);
        assert!(!config.query.log_plans);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [redis]
            url = "redis://cache:6380/2"

            [query]
            log_plans = true
            "#,
        )
        .unwrap();
        assert_eq!(config.redis.url, "redis://cache:6380/2");
        assert_eq!(config.redis.pool_size, 16);
        assert!(config.query.log_plans);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_invalid_values() {
        let mut config = Config::default();
        config.query.hydrate_batch_size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.redis.pool_size = 0;
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_redis_section_conversion() {
        let section = RedisSection {
            command_timeout_ms: 250,
            max_retries: 3,
            ..RedisSection::default()
        };
        let config = RedisConfig::from(&section);
        assert_eq!(config.command_timeout, Some(Duration::from_millis(250)));
        assert_eq!(config.retry_policy.max_retries, 3);
        assert_eq!(
            RedisConfig::from(&RedisSection::default()).command_timeout,
            None
        );
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kuba.toml");
        let path = path.to_str().unwrap();

        let mut config = Config::default();
        config.query.hydrate_batch_size = 64;
        config.save_to_file(path).unwrap();

        let loaded = Config::from_file(path).unwrap();
        assert_eq!(loaded.query.hydrate_batch_size, 64);
        assert!(Config::from_file("/nonexistent/kuba.toml").is_err());
    }

    #[test]
    fn test_env_override() {
        std::env::set_var("KUBA_QUERY_POOL_SIZE", "42");
        let config = Config::from_env();
        assert_eq!(config.redis.pool_size, 42);
        std::env::remove_var("KUBA_QUERY_POOL_SIZE");
    }
}
