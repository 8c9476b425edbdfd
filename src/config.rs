//! Process configuration.
//!
//! Values come from, in increasing priority: built-in defaults, the YAML file
//! named by `SPARROW_CONFIG`, and the `SPARROW_*` environment variables.
//!
//! ```yaml
//! server:
//!   host: 127.0.0.1
//!   port: 8080
//!   idle_timeout_ms: 5000
//! logging:
//!   level: info
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

pub const CONFIG_PATH_ENV: &str = "SPARROW_CONFIG";
pub const HOST_ENV: &str = "SPARROW_HOST";
pub const PORT_ENV: &str = "SPARROW_PORT";
pub const IDLE_TIMEOUT_ENV: &str = "SPARROW_IDLE_TIMEOUT_MS";
pub const LOG_LEVEL_ENV: &str = "SPARROW_LOG";

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Close a connection after this long without receiving a byte
    pub idle_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            idle_timeout_ms: 5_000,
        }
    }
}

impl ServerConfig {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of trace, debug, info, warn, error
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn max_level(&self) -> Result<tracing::Level> {
        self.level
            .parse()
            .with_context(|| format!("invalid log level {:?}", self.level))
    }
}

impl Config {
    /// Loads the configuration from the file named by `SPARROW_CONFIG` (if
    /// set) and applies environment overrides.
    pub fn load() -> Result<Self> {
        let mut cfg = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };

        cfg.apply_overrides(|key| std::env::var(key).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        serde_yaml::from_str(contents).context("invalid configuration")
    }

    /// Applies `SPARROW_*` overrides, reading each variable through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(HOST_ENV) {
            self.server.host = host;
        }
        if let Some(port) = lookup(PORT_ENV) {
            self.server.port = port
                .parse()
                .with_context(|| format!("{PORT_ENV} must be a port number, got {port:?}"))?;
        }
        if let Some(timeout) = lookup(IDLE_TIMEOUT_ENV) {
            self.server.idle_timeout_ms = timeout.parse().with_context(|| {
                format!("{IDLE_TIMEOUT_ENV} must be milliseconds, got {timeout:?}")
            })?;
        }
        if let Some(level) = lookup(LOG_LEVEL_ENV) {
            self.logging.level = level;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.idle_timeout_ms == 0 {
            anyhow::bail!("idle timeout must be greater than zero");
        }
        self.logging.max_level()?;
        Ok(())
    }
}
