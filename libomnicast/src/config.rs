//! Configuration management for Omnicast

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scheduler: SchedulerConfig,
    pub http: HttpConfig,
    pub alerts: AlertsConfig,
    /// Per-platform credentials, keyed by platform id
    pub credentials: HashMap<String, PlatformCredentials>,
}

/// How a job's platforms are driven during a tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FanOut {
    #[default]
    Sequential,
    Parallel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Seconds between ticks
    pub tick_interval: u64,
    /// Upper bound in seconds for a single adapter call
    pub call_timeout: u64,
    pub fan_out: FanOut,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval: 60,
            call_timeout: 12,
            fan_out: FanOut::Sequential,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 12,
            user_agent: concat!("omnicast/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    /// Number of alerts retained before the oldest are dropped
    pub capacity: usize,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self { capacity: 500 }
    }
}

/// Raw credential maps for one platform
///
/// Values may reference environment variables (`${TELEGRAM_BOT_TOKEN}`);
/// expansion happens at lookup time, see [`crate::credentials`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformCredentials {
    pub tokens: HashMap<String, String>,
    pub account: HashMap<String, String>,
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from the default location, falling back to
    /// defaults when no file exists
    pub fn load_or_default() -> Result<Self> {
        let config_path = resolve_config_path()?;
        if !config_path.exists() {
            tracing::debug!(
                "No config file at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.scheduler.tick_interval == 0 {
            return Err(ConfigError::MissingField(
                "scheduler.tick_interval must be at least 1 second".to_string(),
            )
            .into());
        }
        if self.scheduler.call_timeout == 0 || self.http.timeout_secs == 0 {
            return Err(ConfigError::MissingField(
                "timeouts must be at least 1 second".to_string(),
            )
            .into());
        }
        Ok(())
    }
}

/// Resolve the configuration file path following XDG Base Directory spec
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("OMNICAST_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("omnicast").join("config.toml"))
}
